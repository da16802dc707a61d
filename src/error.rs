//! Error type shared by circuit construction and file handling

use thiserror::Error;

use crate::network::{ComponentKind, SignalId};

/// Errors reported by the library
///
/// Only construction-time contract violations and IO problems are errors.
/// Unknown and high-impedance values are ordinary values, and an insufficient
/// propagation budget only leaves the circuit partially settled.
#[derive(Error, Debug)]
pub enum SimError {
    /// A bus or a value vector does not have the expected width
    #[error("width mismatch: expected {expected} values, got {found}")]
    WidthMismatch {
        /// Declared width
        expected: usize,
        /// Supplied width
        found: usize,
    },

    /// A component was bound with the wrong number of inputs or outputs
    #[error("{kind} expects {expected} {port}, got {found}")]
    Arity {
        /// Kind of the component being bound
        kind: ComponentKind,
        /// "inputs" or "outputs"
        port: &'static str,
        /// Number of ports required by the component kind
        expected: usize,
        /// Number of signals supplied
        found: usize,
    },

    /// A structural component is too large for its number of ports to be represented
    #[error("{0} is too large to be built")]
    Oversized(ComponentKind),

    /// A signal index does not belong to this circuit
    #[error("signal {0} does not exist")]
    InvalidSignal(SignalId),

    /// A netlist file could not be parsed
    #[error("parse error at line {line}: {msg}")]
    Parse {
        /// Line number, starting at 1
        line: usize,
        /// Description of the problem
        msg: String,
    },

    /// A file has no extension, or one that is not supported
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type of the library
pub type Result<T> = std::result::Result<T, SimError>;
