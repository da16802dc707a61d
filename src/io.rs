//! Read and write circuits and patterns to files

mod bench;
mod hierarchy;
mod patterns;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub use bench::{read_bench, write_bench, Netlist};
pub use hierarchy::write_hierarchy;
pub use patterns::{read_patterns, write_patterns};

use crate::error::{Result, SimError};
use crate::network::LogicValue;

fn check_extension(path: &Path) -> Result<()> {
    match path.extension() {
        None => Err(SimError::UnsupportedFormat(format!(
            "no extension given for {}",
            path.display()
        ))),
        Some(s) if s == "bench" => Ok(()),
        Some(s) => Err(SimError::UnsupportedFormat(format!(
            "unknown extension {}",
            s.to_string_lossy()
        ))),
    }
}

/// Read a circuit from a file
///
/// Following extensions are supported: .bench
pub fn read_network_file(path: &Path) -> Result<Netlist> {
    check_extension(path)?;
    let f = File::open(path)?;
    read_bench(f)
}

/// Write a circuit to a file
///
/// Following extensions are supported: .bench
pub fn write_network_file(path: &Path, netlist: &Netlist) -> Result<()> {
    check_extension(path)?;
    let mut f = BufWriter::new(File::create(path)?);
    write_bench(&mut f, &netlist.circuit, &netlist.inputs, &netlist.outputs)?;
    Ok(())
}

/// Read patterns from a file
pub fn read_pattern_file(path: &Path) -> Result<Vec<Vec<LogicValue>>> {
    let f = File::open(path)?;
    read_patterns(f)
}

/// Write patterns to a file
pub fn write_pattern_file(path: &Path, patterns: &[Vec<LogicValue>]) -> Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    write_patterns(&mut f, patterns)?;
    Ok(())
}
