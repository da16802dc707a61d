use std::fmt;

use log::warn;

use crate::network::{Circuit, ComponentId, SignalId};

/// Index of a terminal in a [`Circuit`]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct TerminalId(pub(crate) u32);

impl TerminalId {
    /// Position of the terminal in the circuit
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl fmt::Debug for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Direction of a terminal, as seen from its component
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Direction {
    /// The component reads the signal
    Input,
    /// The component drives the signal
    Output,
}

/// Binding point of a component on a signal
///
/// The binding is fixed at construction. An input terminal may forward to downstream terminals:
/// this is how the input of a structural component is passed to the sub-components that read it.
#[derive(Debug, Clone)]
pub struct Terminal {
    pub(crate) direction: Direction,
    pub(crate) owner: ComponentId,
    pub(crate) signal: SignalId,
    pub(crate) downstream: Vec<TerminalId>,
}

impl Terminal {
    /// Direction of the terminal
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Component the terminal belongs to
    pub fn owner(&self) -> ComponentId {
        self.owner
    }

    /// Signal the terminal is bound to
    pub fn signal(&self) -> SignalId {
        self.signal
    }

    /// Terminals this one forwards to
    pub fn downstream(&self) -> &[TerminalId] {
        &self.downstream
    }
}

impl Circuit {
    /// Unbounded walk from a terminal
    ///
    /// A terminal without downstream terminals is a boundary of its owner, which re-evaluates;
    /// otherwise the walk continues through every downstream terminal.
    pub(crate) fn propagate_terminal(&mut self, t: TerminalId, depth: usize) {
        let nb_downstream = self.terminals[t.index()].downstream.len();
        if nb_downstream == 0 {
            let owner = self.terminals[t.index()].owner;
            if depth >= self.config.max_depth {
                warn!(
                    "Propagation cut at {} after {} component crossings: the circuit may contain a loop",
                    owner, depth
                );
                self.scheduler.record_cut();
                return;
            }
            if let Some(out) = self.evaluate(owner) {
                self.propagate_signal(out, depth + 1);
            }
        } else {
            for i in 0..nb_downstream {
                let d = self.terminals[t.index()].downstream[i];
                self.propagate_terminal(d, depth);
            }
        }
    }

    /// Bounded walk from a terminal
    ///
    /// `steps` is the number of component crossings left. At zero, the terminal is deferred to
    /// the end of the current wave. Otherwise its owner is scheduled with the same budget, or
    /// the walk continues through downstream terminals without consuming any.
    pub(crate) fn propagate_terminal_steps(&mut self, t: TerminalId, steps: usize) {
        if steps == 0 {
            self.scheduler.defer(t);
            return;
        }
        let nb_downstream = self.terminals[t.index()].downstream.len();
        if nb_downstream == 0 {
            let owner = self.terminals[t.index()].owner;
            if self.components[owner.index()].kind.is_primitive() {
                let rank = self.ranks[owner.index()];
                self.scheduler.schedule(owner, rank, steps);
            }
        } else {
            for i in 0..nb_downstream {
                let d = self.terminals[t.index()].downstream[i];
                self.propagate_terminal_steps(d, steps);
            }
        }
    }

    /// Components reached through a terminal, following downstream terminals
    pub(crate) fn terminal_consumers(&self, t: TerminalId, ret: &mut Vec<ComponentId>) {
        let term = &self.terminals[t.index()];
        if term.downstream.is_empty() {
            ret.push(term.owner);
        } else {
            for d in &term.downstream {
                self.terminal_consumers(*d, ret);
            }
        }
    }

    /// Primitive components that read a signal, directly or through structural inputs
    pub(crate) fn signal_consumers(&self, s: SignalId) -> Vec<ComponentId> {
        let mut ret = Vec::new();
        for t in self.fanout(s) {
            self.terminal_consumers(*t, &mut ret);
        }
        ret.retain(|c| self.components[c.index()].kind.is_primitive());
        ret
    }
}
