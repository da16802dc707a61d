//! Representation of circuits: values, signals, terminals and components

mod circuit;
mod component;
mod logic;
mod signal;
pub mod stats;
mod terminal;

pub use circuit::Circuit;
pub use component::{Component, ComponentId, ComponentKind, NaryType, Primitive, Structural};
pub use logic::LogicValue;
pub use signal::{Bus, Signal, SignalId};
pub use terminal::{Direction, Terminal, TerminalId};
