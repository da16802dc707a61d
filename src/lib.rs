//! Four-valued logic simulation
//!
//! This crate simulates digital circuits built from components bound to signals, where each
//! signal carries one of four values: 0, 1, unknown (X) or undriven (Z).
//! Changes are propagated as waves: all the inputs that changed together are propagated at once,
//! and each component reached by the wave is evaluated a single time, once all its inputs have
//! their final value. Feedback loops are supported, with a bounded number of steps per wave.
//!
//! # Usage
//!
//! ```bash
//! # Show available commands
//! # At the moment, only .bench files are supported
//! tetrasim help
//! # Show statistics about a circuit
//! tetrasim show mydesign.bench
//! # Generate random input patterns, then simulate them
//! tetrasim random mydesign.bench -n 100 -o random.test
//! tetrasim simulate mydesign.bench -i random.test -o results.test
//! ```
//!
//! # Datastructures
//!
//! All the objects of a simulation belong to a single [`Circuit`], and are referred to by index:
//! * A [`SignalId`] is a wire holding a [`LogicValue`]. Connecting two signals merges them.
//! * A component is either a primitive gate, with a single output computed from its inputs, or a
//!   structural block such as a multiplexer tree or an adder, built from sub-components when it
//!   is bound.
//! * Terminals attach components to signals, and are notified when the signal changes.
//!
//! For example, here is a full adder circuit:
//! ```
//! # use tetrasim::{Circuit, LogicValue};
//! let mut c = Circuit::new();
//! let a = c.add_bus(1);
//! let b = c.add_bus(1);
//! let cin = c.add_signal();
//! let (sum, cout) = c.adder(&a, &b, cin).unwrap();
//!
//! c.assign(a[0], LogicValue::One);
//! c.assign(b[0], LogicValue::One);
//! c.assign(cin, LogicValue::Zero);
//! c.settle();
//! assert_eq!(c.value(sum[0]), LogicValue::Zero);
//! assert_eq!(c.value(cout), LogicValue::One);
//! ```
//!
//! Integers are converted to and from buses with the [`codec`] module, and circuits are read
//! and written with the [`io`] module.

#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod io;
pub mod network;
pub mod sim;

pub use error::{Result, SimError};
pub use network::{
    stats, Bus, Circuit, ComponentId, ComponentKind, LogicValue, NaryType, Primitive, SignalId,
    Structural,
};
pub use sim::{simulate, Scheduler, SimConfig, WaveStats};
