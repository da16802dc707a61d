//! Command line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kdam::{tqdm, BarExt};
use log::info;
use tetrasim::io::{
    read_network_file, read_pattern_file, write_hierarchy, write_network_file, write_pattern_file,
};
use tetrasim::network::stats::stats;
use tetrasim::sim::{generate_random_patterns, simulate};
use tetrasim::{Result, SimConfig};

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Command line arguments
#[derive(Subcommand)]
pub enum Commands {
    /// Show statistics about a circuit
    ///
    /// Will print statistics on the number of signals, components and levels in the circuit.
    #[clap()]
    Show(ShowArgs),

    /// Simulate a circuit
    ///
    /// This uses the same test pattern format as Atalanta, with one value per input,
    /// extended with x for unknown and z for undriven values:
    ///    1: 00011101
    ///    2: 01x10z00
    #[clap(alias = "sim")]
    Simulate(SimulateArgs),

    /// Generate random test patterns for a circuit
    #[clap()]
    Random(RandomArgs),

    /// Read a circuit and write it back
    ///
    /// The hierarchy of components can be printed instead.
    #[clap()]
    Export(ExportArgs),
}

/// Command arguments for circuit informations
#[derive(Args)]
pub struct ShowArgs {
    /// Circuit to show
    file: PathBuf,
}

impl ShowArgs {
    pub fn run(&self) -> Result<()> {
        let netlist = read_network_file(&self.file)?;
        println!(
            "Circuit with {} inputs and {} outputs",
            netlist.inputs.len(),
            netlist.outputs.len()
        );
        println!("{}", stats(&netlist.circuit));
        Ok(())
    }
}

/// Command arguments for simulation
#[derive(Args)]
pub struct SimulateArgs {
    /// Circuit to simulate
    network: PathBuf,

    /// Input patterns file
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Output file for output patterns
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Budget of each propagation wave; enough to settle the circuit by default
    #[arg(long)]
    steps: Option<usize>,

    /// Maximum depth of unbounded propagation
    #[arg(long, default_value_t = SimConfig::default().max_depth)]
    max_depth: usize,
}

impl SimulateArgs {
    pub fn run(&self) -> Result<()> {
        let mut netlist = read_network_file(&self.network)?;
        netlist.circuit.config_mut().max_depth = self.max_depth;
        let input_values = read_pattern_file(&self.input)?;
        info!(
            "Simulating {} patterns on {} inputs",
            input_values.len(),
            netlist.inputs.len()
        );
        let mut progress = tqdm!(total = input_values.len());
        progress.set_description("Patterns simulated");
        let mut output_values = Vec::new();
        for pattern in &input_values {
            let res = simulate(
                &mut netlist.circuit,
                &netlist.inputs,
                &netlist.outputs,
                std::slice::from_ref(pattern),
                self.steps,
            )?;
            output_values.extend(res);
            progress.update(1)?;
        }
        progress.refresh()?;
        eprintln!();
        write_pattern_file(&self.output, &output_values)
    }
}

/// Command arguments for random pattern generation
#[derive(Args)]
pub struct RandomArgs {
    /// Circuit to generate patterns for
    network: PathBuf,

    /// Output file for test patterns
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Number of random patterns to generate
    #[arg(short = 'n', long)]
    num_random: Option<usize>,

    /// Random seed for test pattern generation
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

impl RandomArgs {
    pub fn run(&self) -> Result<()> {
        let netlist = read_network_file(&self.network)?;
        let nb_inputs = netlist.inputs.len();
        let nb_patterns = self.num_random.unwrap_or(4 * (nb_inputs + 1));
        let patterns = generate_random_patterns(nb_inputs, nb_patterns, self.seed);
        write_pattern_file(&self.output, &patterns)
    }
}

/// Command arguments for export
#[derive(Args)]
pub struct ExportArgs {
    /// Circuit to export
    network: PathBuf,

    /// Output file for the circuit
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Print the hierarchy of components
    #[arg(long)]
    hierarchy: bool,
}

impl ExportArgs {
    pub fn run(&self) -> Result<()> {
        let netlist = read_network_file(&self.network)?;
        if self.hierarchy {
            write_hierarchy(&mut std::io::stdout().lock(), &netlist.circuit)?;
        }
        if let Some(output) = &self.output {
            write_network_file(output, &netlist)?;
        }
        Ok(())
    }
}
