//! Compute component statistics
//!
//! ```
//! # use tetrasim::Circuit;
//! # let circuit = Circuit::new();
//! use tetrasim::network::stats::stats;
//! let stats = stats(&circuit);
//!
//! // Check that there is no Xor gate
//! assert_eq!(stats.nb_xor, 0);
//!
//! // Show the statistics
//! println!("{}", stats);
//! ```

use std::fmt;

use crate::network::{Circuit, ComponentKind, NaryType, Primitive};

/// Number of signals and components in a circuit
#[derive(Clone, Debug, Default)]
pub struct CircuitStats {
    /// Number of signals
    pub nb_signals: usize,
    /// Number of structural components
    pub nb_structural: usize,
    /// Number of And and similar gates
    pub nb_and: usize,
    /// Arity of And gates
    pub and_arity: Vec<usize>,
    /// Number of Xor and similar gates
    pub nb_xor: usize,
    /// Arity of Xor gates
    pub xor_arity: Vec<usize>,
    /// Number of Mux
    pub nb_mux: usize,
    /// Number of Maj
    pub nb_maj: usize,
    /// Number of Buf
    pub nb_buf: usize,
    /// Number of Not
    pub nb_not: usize,
    /// Number of tristate buffers
    pub nb_tristate: usize,
    /// Number of constant drivers
    pub nb_constant: usize,
    /// Number of levels of primitive components
    pub depth: usize,
}

impl CircuitStats {
    /// Total number of primitive components
    pub fn nb_primitives(&self) -> usize {
        self.nb_and
            + self.nb_xor
            + self.nb_mux
            + self.nb_maj
            + self.nb_buf
            + self.nb_not
            + self.nb_tristate
            + self.nb_constant
    }

    /// Record a new and
    fn add_and(&mut self, sz: usize) {
        self.nb_and += 1;
        while self.and_arity.len() <= sz {
            self.and_arity.push(0);
        }
        self.and_arity[sz] += 1;
    }

    /// Record a new xor
    fn add_xor(&mut self, sz: usize) {
        self.nb_xor += 1;
        while self.xor_arity.len() <= sz {
            self.xor_arity.push(0);
        }
        self.xor_arity[sz] += 1;
    }
}

impl fmt::Display for CircuitStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stats:")?;
        writeln!(f, "  Signals: {}", self.nb_signals)?;
        writeln!(f, "  Depth: {}", self.depth)?;
        writeln!(f, "  Structural: {}", self.nb_structural)?;
        writeln!(f, "  Primitives: {}", self.nb_primitives())?;
        if self.nb_and != 0 {
            writeln!(f, "    And: {}", self.nb_and)?;
            for (i, nb) in self.and_arity.iter().enumerate() {
                if *nb != 0 {
                    writeln!(f, "      And{}: {}", i, nb)?;
                }
            }
        }
        if self.nb_xor != 0 {
            writeln!(f, "    Xor: {}", self.nb_xor)?;
            for (i, nb) in self.xor_arity.iter().enumerate() {
                if *nb != 0 {
                    writeln!(f, "      Xor{}: {}", i, nb)?;
                }
            }
        }
        for (name, nb) in [
            ("Mux", self.nb_mux),
            ("Maj", self.nb_maj),
            ("Buf", self.nb_buf),
            ("Not", self.nb_not),
            ("Tristate", self.nb_tristate),
            ("Constant", self.nb_constant),
        ] {
            if nb != 0 {
                writeln!(f, "    {}: {}", name, nb)?;
            }
        }
        Ok(())
    }
}

/// Compute the statistics of the circuit
pub fn stats(circuit: &Circuit) -> CircuitStats {
    use Primitive::*;
    let mut ret = CircuitStats {
        nb_signals: circuit.nb_signals(),
        depth: circuit.depth(),
        ..Default::default()
    };
    for c in circuit.component_ids() {
        let comp = circuit.component(c);
        let p = match comp.kind() {
            ComponentKind::Structural(_) => {
                ret.nb_structural += 1;
                continue;
            }
            ComponentKind::Primitive(p) => p,
        };
        let arity = comp.inputs().len();
        match p {
            Nary(NaryType::And | NaryType::Or | NaryType::Nand | NaryType::Nor) => {
                ret.add_and(arity)
            }
            Nary(NaryType::Xor | NaryType::Xnor) => ret.add_xor(arity),
            Mux => ret.nb_mux += 1,
            Maj => ret.nb_maj += 1,
            Buf => ret.nb_buf += 1,
            Not => ret.nb_not += 1,
            Tristate => ret.nb_tristate += 1,
            Constant(_) => ret.nb_constant += 1,
        }
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::stats;
    use crate::network::Circuit;

    #[test]
    fn test_stats() {
        let mut c = Circuit::new();
        let sel = c.add_bus(2);
        let data = c.add_bus(4);
        let y = c.mux_tree(&sel, &data).unwrap();
        let a = c.add_signal();
        let x = c.and(&[y, a]).unwrap();
        c.xor(&[x, y, a]).unwrap();
        c.not(x).unwrap();
        let s = stats(&c);
        assert_eq!(s.nb_structural, 1);
        assert_eq!(s.nb_mux, 3);
        assert_eq!(s.nb_and, 1);
        assert_eq!(s.and_arity[2], 1);
        assert_eq!(s.xor_arity[3], 1);
        assert_eq!(s.nb_not, 1);
        assert_eq!(s.nb_primitives(), 6);
        assert_eq!(s.depth, 4);
        let text = format!("{s}");
        assert!(text.contains("Mux: 3"));
        assert!(text.contains("Xor3: 1"));
    }
}
