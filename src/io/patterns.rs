//! IO for test pattern files
//!
//! One pattern per line, numbered from 1, with one character per primary input:
//! ```text
//!     1: 0011
//!     2: 01xz
//! ```

use std::io::{BufRead, BufReader, Read, Write};

use crate::error::{Result, SimError};
use crate::network::LogicValue;

/// Read patterns of `0`, `1`, `x` and `z` characters
///
/// The pattern number before the colon is optional and ignored. Empty lines and lines starting
/// with `#` are skipped. All patterns must have the same width.
pub fn read_patterns<R: Read>(r: R) -> Result<Vec<Vec<LogicValue>>> {
    let mut ret: Vec<Vec<LogicValue>> = Vec::new();
    for (i, l) in BufReader::new(r).lines().enumerate() {
        let line = i + 1;
        let s = l?;
        let t = s.trim();
        if t.is_empty() || t.starts_with('#') {
            continue;
        }
        let bits = match t.split_once(':') {
            Some((_, bits)) => bits.trim(),
            None => t,
        };
        let mut pattern = Vec::new();
        for c in bits.chars() {
            match LogicValue::from_char(c) {
                Some(v) => pattern.push(v),
                None => {
                    return Err(SimError::Parse {
                        line,
                        msg: format!("Invalid character {c:?} in pattern"),
                    })
                }
            }
        }
        if let Some(first) = ret.first() {
            if first.len() != pattern.len() {
                return Err(SimError::Parse {
                    line,
                    msg: format!(
                        "Pattern has {} values, expected {}",
                        pattern.len(),
                        first.len()
                    ),
                });
            }
        }
        ret.push(pattern);
    }
    Ok(ret)
}

/// Write patterns, one numbered line per pattern
pub fn write_patterns<W: Write>(w: &mut W, patterns: &[Vec<LogicValue>]) -> std::io::Result<()> {
    for (i, p) in patterns.iter().enumerate() {
        let bits: String = p.iter().map(|v| v.to_char()).collect();
        writeln!(w, "{}: {}", i + 1, bits)?;
    }
    Ok(())
}
