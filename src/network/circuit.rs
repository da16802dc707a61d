use std::fmt;

use crate::error::{Result, SimError};
use crate::network::{
    Bus, Component, ComponentId, ComponentKind, Direction, LogicValue, NaryType, Primitive,
    Signal, SignalId, Structural, Terminal, TerminalId,
};
use crate::sim::{Scheduler, SimConfig};

/// Arena holding an elaborated circuit and its simulation state
///
/// Signals, terminals and components are stored in vectors and addressed by stable indices.
/// The circuit owns its [`Scheduler`], so that independent simulations do not share any state.
///
/// ```
/// # use tetrasim::{Circuit, LogicValue};
/// let mut circuit = Circuit::new();
/// let a = circuit.add_signal();
/// let b = circuit.add_signal();
/// let x = circuit.xor(&[a, b]).unwrap();
/// circuit.assign(a, LogicValue::One);
/// circuit.assign(b, LogicValue::Zero);
/// circuit.settle();
/// assert_eq!(circuit.value(x), LogicValue::One);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    pub(crate) signals: Vec<Signal>,
    pub(crate) terminals: Vec<Terminal>,
    pub(crate) components: Vec<Component>,
    pub(crate) scheduler: Scheduler,
    pub(crate) config: SimConfig,
    /// Levelization of the components, lowest rank first
    pub(crate) ranks: Vec<u32>,
    ranks_valid: bool,
}

impl Circuit {
    /// Create a new circuit
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new circuit with a non-default configuration
    pub fn with_config(config: SimConfig) -> Self {
        Circuit {
            config,
            ..Default::default()
        }
    }

    /// Simulation parameters
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Change the simulation parameters
    pub fn config_mut(&mut self) -> &mut SimConfig {
        &mut self.config
    }

    /// Return the number of signals
    pub fn nb_signals(&self) -> usize {
        self.signals.len()
    }

    /// Return the number of terminals
    pub fn nb_terminals(&self) -> usize {
        self.terminals.len()
    }

    /// Return the number of components, including sub-components
    pub fn nb_components(&self) -> usize {
        self.components.len()
    }

    /// Get the signal at index i
    pub fn signal(&self, s: SignalId) -> &Signal {
        &self.signals[s.index()]
    }

    /// Get the terminal at index i
    pub fn terminal(&self, t: TerminalId) -> &Terminal {
        &self.terminals[t.index()]
    }

    /// Get the component at index i
    pub fn component(&self, c: ComponentId) -> &Component {
        &self.components[c.index()]
    }

    /// Iterate over all component indices
    pub fn component_ids(&self) -> impl Iterator<Item = ComponentId> {
        (0..self.components.len() as u32).map(ComponentId)
    }

    /// Components that were not instantiated by a structural component
    pub fn top_components(&self) -> Vec<ComponentId> {
        self.component_ids()
            .filter(|c| self.components[c.index()].parent.is_none())
            .collect()
    }

    /// Signals bound to the inputs of a component, in positional order
    pub fn input_signals(&self, c: ComponentId) -> Vec<SignalId> {
        self.components[c.index()]
            .inputs
            .iter()
            .map(|t| self.terminals[t.index()].signal)
            .collect()
    }

    /// Signals bound to the outputs of a component, in positional order
    pub fn output_signals(&self, c: ComponentId) -> Vec<SignalId> {
        self.components[c.index()]
            .outputs
            .iter()
            .map(|t| self.terminals[t.index()].signal)
            .collect()
    }

    /// Primitive component driving a signal, if any
    pub fn driver(&self, s: SignalId) -> Option<ComponentId> {
        self.signals[self.find(s).index()].drivers.first().copied()
    }

    /// Add a new signal, with an unknown value
    pub fn add_signal(&mut self) -> SignalId {
        let s = SignalId(self.signals.len() as u32);
        self.signals.push(Signal::new());
        s
    }

    /// Add a new bus of the given width
    pub fn add_bus(&mut self, width: usize) -> Bus {
        (0..width)
            .map(|_| self.add_signal())
            .collect::<Vec<_>>()
            .into()
    }

    /// Bind a new component to existing signals and elaborate it
    ///
    /// Inputs and outputs are positional. The binding is checked before anything is created, so
    /// an error leaves the circuit untouched.
    pub fn add_component(
        &mut self,
        kind: ComponentKind,
        inputs: &[SignalId],
        outputs: &[SignalId],
    ) -> Result<ComponentId> {
        self.bind(kind, None, inputs, outputs)
    }

    /// Bind a component, as a sub-component if a parent is given
    pub(crate) fn bind(
        &mut self,
        kind: ComponentKind,
        parent: Option<ComponentId>,
        inputs: &[SignalId],
        outputs: &[SignalId],
    ) -> Result<ComponentId> {
        kind.check_arity(inputs.len(), outputs.len())?;
        for s in inputs.iter().chain(outputs) {
            if s.index() >= self.signals.len() {
                return Err(SimError::InvalidSignal(*s));
            }
        }

        let c = ComponentId(self.components.len() as u32);
        self.components.push(Component::new(kind, parent));
        if let Some(p) = parent {
            self.components[p.index()].children.push(c);
        }
        for s in inputs {
            let t = self.add_terminal(c, Direction::Input, *s);
            self.register_input(t, parent, *s);
            self.components[c.index()].inputs.push(t);
        }
        for s in outputs {
            let t = self.add_terminal(c, Direction::Output, *s);
            if kind.is_primitive() {
                let root = self.find(*s);
                self.signals[root.index()].drivers.push(c);
            }
            self.components[c.index()].outputs.push(t);
        }
        self.invalidate_ranks();
        self.elaborate(c)?;
        Ok(c)
    }

    fn add_terminal(&mut self, owner: ComponentId, direction: Direction, s: SignalId) -> TerminalId {
        let t = TerminalId(self.terminals.len() as u32);
        self.terminals.push(Terminal {
            direction,
            owner,
            signal: s,
            downstream: Vec::new(),
        });
        t
    }

    /// Hook an input terminal into the fan-out graph
    ///
    /// If the signal enters the parent component through one of its inputs, the terminal is
    /// chained below the parent's terminal; otherwise it is registered on the signal itself.
    fn register_input(&mut self, t: TerminalId, parent: Option<ComponentId>, s: SignalId) {
        let root = self.find(s);
        if let Some(p) = parent {
            let through = self.components[p.index()]
                .inputs
                .iter()
                .copied()
                .find(|pt| self.find(self.terminals[pt.index()].signal) == root);
            if let Some(pt) = through {
                self.terminals[pt.index()].downstream.push(t);
                return;
            }
        }
        self.signals[root.index()].fanout.push(t);
    }

    /// Create a primitive gate driving a new signal
    fn add_primitive(&mut self, p: Primitive, inputs: &[SignalId]) -> Result<SignalId> {
        let out = self.add_signal();
        if let Err(e) = self.add_component(ComponentKind::Primitive(p), inputs, &[out]) {
            // Do not leave a dangling signal behind
            self.signals.pop();
            return Err(e);
        }
        Ok(out)
    }

    /// Create a constant driver
    pub fn constant(&mut self, v: LogicValue) -> Result<SignalId> {
        self.add_primitive(Primitive::Constant(v), &[])
    }

    /// Create a Buf gate
    pub fn buf(&mut self, a: SignalId) -> Result<SignalId> {
        self.add_primitive(Primitive::Buf, &[a])
    }

    /// Create a Not gate
    pub fn not(&mut self, a: SignalId) -> Result<SignalId> {
        self.add_primitive(Primitive::Not, &[a])
    }

    /// Create an n-input gate
    pub fn nary(&mut self, tp: NaryType, inputs: &[SignalId]) -> Result<SignalId> {
        self.add_primitive(Primitive::Nary(tp), inputs)
    }

    /// Create an n-input And gate
    pub fn and(&mut self, inputs: &[SignalId]) -> Result<SignalId> {
        self.nary(NaryType::And, inputs)
    }

    /// Create an n-input Or gate
    pub fn or(&mut self, inputs: &[SignalId]) -> Result<SignalId> {
        self.nary(NaryType::Or, inputs)
    }

    /// Create an n-input Xor gate
    pub fn xor(&mut self, inputs: &[SignalId]) -> Result<SignalId> {
        self.nary(NaryType::Xor, inputs)
    }

    /// Create a Mux: d0 when the select is 0, d1 when it is 1
    pub fn mux(&mut self, s: SignalId, d0: SignalId, d1: SignalId) -> Result<SignalId> {
        self.add_primitive(Primitive::Mux, &[s, d0, d1])
    }

    /// Create a Maj gate
    pub fn maj(&mut self, a: SignalId, b: SignalId, c: SignalId) -> Result<SignalId> {
        self.add_primitive(Primitive::Maj, &[a, b, c])
    }

    /// Create a tristate buffer
    pub fn tristate(&mut self, enable: SignalId, data: SignalId) -> Result<SignalId> {
        self.add_primitive(Primitive::Tristate, &[enable, data])
    }

    /// Create a selector returning `data[select]`
    ///
    /// The data bus must have 2^k bits for a k-bit select bus.
    pub fn mux_tree(&mut self, select: &Bus, data: &Bus) -> Result<SignalId> {
        let k = select.width();
        if k >= usize::BITS as usize || data.width() != 1 << k {
            return Err(SimError::WidthMismatch {
                expected: 1usize.checked_shl(k as u32).unwrap_or(0),
                found: data.width(),
            });
        }
        let nb_signals = self.signals.len();
        let out = self.add_signal();
        let inputs: Vec<SignalId> = select.iter().chain(data.iter()).collect();
        let kind = ComponentKind::Structural(Structural::MuxTree(k));
        if let Err(e) = self.add_component(kind, &inputs, &[out]) {
            self.signals.truncate(nb_signals);
            return Err(e);
        }
        Ok(out)
    }

    /// Create a ripple-carry adder; returns the sum and the carry out
    pub fn adder(&mut self, a: &Bus, b: &Bus, cin: SignalId) -> Result<(Bus, SignalId)> {
        let n = a.width();
        if b.width() != n {
            return Err(SimError::WidthMismatch {
                expected: n,
                found: b.width(),
            });
        }
        let nb_signals = self.signals.len();
        let outputs = self.add_bus(n + 1);
        let inputs: Vec<SignalId> = a.iter().chain(b.iter()).chain([cin]).collect();
        let kind = ComponentKind::Structural(Structural::RippleAdder(n));
        if let Err(e) = self.add_component(kind, &inputs, outputs.signals()) {
            self.signals.truncate(nb_signals);
            return Err(e);
        }
        let sum = Bus::from(&outputs.signals()[..n]);
        Ok((sum, outputs[n]))
    }

    pub(crate) fn invalidate_ranks(&mut self) {
        self.ranks_valid = false;
    }

    /// Recompute the levelization if the structure changed
    pub(crate) fn update_ranks(&mut self) {
        if !self.ranks_valid {
            self.ranks = self.compute_ranks();
            self.ranks_valid = true;
        }
    }

    /// Levelize the primitive components: each one gets a rank higher than its drivers
    ///
    /// Combinational loops are broken at the lowest unvisited component. Structural components
    /// get rank 0, as they are never scheduled.
    pub(crate) fn compute_ranks(&self) -> Vec<u32> {
        let n = self.components.len();
        let mut users = vec![Vec::new(); n];
        let mut count_deps = vec![0usize; n];
        for c in self.component_ids() {
            let comp = &self.components[c.index()];
            if !comp.kind.is_primitive() {
                continue;
            }
            for t in &comp.inputs {
                let root = self.find(self.terminals[t.index()].signal);
                for d in &self.signals[root.index()].drivers {
                    users[d.index()].push(c.index());
                    count_deps[c.index()] += 1;
                }
            }
        }

        let mut rank = vec![0u32; n];
        let mut visited: Vec<bool> = self
            .components
            .iter()
            .map(|c| !c.kind.is_primitive())
            .collect();
        let mut to_visit: Vec<usize> = (0..n)
            .filter(|c| count_deps[*c] == 0 && !visited[*c])
            .collect();
        let mut next_forced = 0;
        loop {
            while let Some(c) = to_visit.pop() {
                if visited[c] {
                    continue;
                }
                visited[c] = true;
                for &u in &users[c] {
                    if visited[u] {
                        continue;
                    }
                    rank[u] = rank[u].max(rank[c] + 1);
                    count_deps[u] -= 1;
                    if count_deps[u] == 0 {
                        to_visit.push(u);
                    }
                }
            }
            // Break a loop
            while next_forced < n && visited[next_forced] {
                next_forced += 1;
            }
            if next_forced == n {
                break;
            }
            to_visit.push(next_forced);
        }
        rank
    }

    /// Number of levels of primitive components
    pub fn depth(&self) -> usize {
        let ranks = self.compute_ranks();
        self.component_ids()
            .filter(|c| self.components[c.index()].kind.is_primitive())
            .map(|c| ranks[c.index()] as usize + 1)
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Circuit with {} signals, {} components:",
            self.nb_signals(),
            self.nb_components()
        )?;
        for c in self.component_ids() {
            let comp = &self.components[c.index()];
            if !comp.kind.is_primitive() {
                continue;
            }
            let deps: Vec<String> = self
                .input_signals(c)
                .iter()
                .map(|s| self.find(*s).to_string())
                .collect();
            let out = self.find(self.output_signals(c)[0]);
            writeln!(f, "\t{} = {}({})", out, comp.kind, deps.join(", "))?;
        }
        Ok(())
    }
}
