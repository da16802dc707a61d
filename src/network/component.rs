use std::fmt;

use log::trace;

use crate::error::{Result, SimError};
use crate::network::{Circuit, LogicValue, SignalId, TerminalId};

/// Index of a component in a [`Circuit`]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct ComponentId(pub(crate) u32);

impl ComponentId {
    /// Position of the component in the circuit
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Basic types of N-input gates
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum NaryType {
    /// N-input And gate
    And,
    /// N-input Or gate
    Or,
    /// N-input Nand gate
    Nand,
    /// N-input Nor gate
    Nor,
    /// N-input Xor gate
    Xor,
    /// N-input Xnor gate
    Xnor,
}

/// Primitive components, with a single output computed from the inputs
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Primitive {
    /// Constant driver, without inputs
    Constant(LogicValue),
    /// Buffer
    Buf,
    /// Inverter
    Not,
    /// N-input gate
    Nary(NaryType),
    /// Multiplexer (select, d0, d1): d0 when select is 0, d1 when select is 1
    Mux,
    /// Majority gate (a + b + c >= 2)
    Maj,
    /// Tristate buffer (enable, data): undriven when disabled
    Tristate,
}

/// Structural components, elaborated once into sub-components
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Structural {
    /// 2^k-way selector built as a tree of 2-way muxes
    ///
    /// Inputs are the k select bits, least significant first, followed by the 2^k data bits.
    MuxTree(usize),
    /// Full adder: inputs (a, b, carry in), outputs (sum, carry out)
    FullAdder,
    /// N-bit ripple-carry adder made of full adders
    ///
    /// Inputs are the N bits of a, the N bits of b and the carry in;
    /// outputs are the N bits of the sum and the carry out. Least significant bits first.
    RippleAdder(usize),
}

/// Kind of a component: a closed set of behaviours behind a single evaluation contract
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ComponentKind {
    /// Gate evaluated directly from its inputs
    Primitive(Primitive),
    /// Composite component, realized by the sub-components built during elaboration
    Structural(Structural),
}

impl NaryType {
    /// Evaluate the gate on the given values
    pub fn evaluate(&self, v: &[LogicValue]) -> LogicValue {
        let it = v.iter().copied();
        match self {
            NaryType::And => LogicValue::reduce_and(it),
            NaryType::Or => LogicValue::reduce_or(it),
            NaryType::Nand => !LogicValue::reduce_and(it),
            NaryType::Nor => !LogicValue::reduce_or(it),
            NaryType::Xor => LogicValue::reduce_xor(it),
            NaryType::Xnor => !LogicValue::reduce_xor(it),
        }
    }
}

impl Primitive {
    /// Number of inputs required, or None for any number
    pub fn nb_inputs(&self) -> Option<usize> {
        use Primitive::*;
        match self {
            Constant(_) => Some(0),
            Buf | Not => Some(1),
            Nary(_) => None,
            Tristate => Some(2),
            Mux | Maj => Some(3),
        }
    }

    /// Compute the output value from the input values
    pub fn evaluate(&self, v: &[LogicValue]) -> LogicValue {
        use LogicValue::*;
        use Primitive::*;
        match self {
            Constant(c) => *c,
            Buf => match v[0] {
                HighZ => Unknown,
                x => x,
            },
            Not => !v[0],
            Nary(tp) => tp.evaluate(v),
            Mux => match v[0] {
                Zero => Buf.evaluate(&v[1..2]),
                One => Buf.evaluate(&v[2..3]),
                _ => {
                    if v[1] == v[2] && v[1].is_known() {
                        v[1]
                    } else {
                        Unknown
                    }
                }
            },
            Maj => {
                let ab = LogicValue::reduce_and([v[0], v[1]]);
                let bc = LogicValue::reduce_and([v[1], v[2]]);
                let ac = LogicValue::reduce_and([v[0], v[2]]);
                LogicValue::reduce_or([ab, bc, ac])
            }
            Tristate => match v[0] {
                Zero => HighZ,
                One => Buf.evaluate(&v[1..2]),
                _ => Unknown,
            },
        }
    }
}

impl Structural {
    /// Number of inputs required, or None if it does not fit in a usize
    pub fn nb_inputs(&self) -> Option<usize> {
        match self {
            Structural::MuxTree(k) => u32::try_from(*k)
                .ok()
                .and_then(|k32| 1usize.checked_shl(k32))
                .and_then(|nb_data| nb_data.checked_add(*k)),
            Structural::FullAdder => Some(3),
            Structural::RippleAdder(n) => n.checked_mul(2).and_then(|x| x.checked_add(1)),
        }
    }

    /// Number of outputs required, or None if it does not fit in a usize
    pub fn nb_outputs(&self) -> Option<usize> {
        match self {
            Structural::MuxTree(_) => Some(1),
            Structural::FullAdder => Some(2),
            Structural::RippleAdder(n) => n.checked_add(1),
        }
    }
}

impl ComponentKind {
    /// Returns true for primitive components
    pub fn is_primitive(&self) -> bool {
        matches!(self, ComponentKind::Primitive(_))
    }

    /// Check the number of inputs and outputs bound to a component of this kind
    pub fn check_arity(&self, nb_inputs: usize, nb_outputs: usize) -> Result<()> {
        let (expected_inputs, expected_outputs) = match self {
            ComponentKind::Primitive(p) => (p.nb_inputs().unwrap_or(nb_inputs), 1),
            ComponentKind::Structural(s) => match (s.nb_inputs(), s.nb_outputs()) {
                (Some(i), Some(o)) => (i, o),
                _ => return Err(SimError::Oversized(*self)),
            },
        };
        if nb_inputs != expected_inputs {
            return Err(SimError::Arity {
                kind: *self,
                port: "inputs",
                expected: expected_inputs,
                found: nb_inputs,
            });
        }
        if nb_outputs != expected_outputs {
            return Err(SimError::Arity {
                kind: *self,
                port: "outputs",
                expected: expected_outputs,
                found: nb_outputs,
            });
        }
        Ok(())
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Primitive(Primitive::Constant(v)) => write!(f, "Constant({v})"),
            ComponentKind::Primitive(Primitive::Nary(tp)) => write!(f, "{tp:?}"),
            ComponentKind::Primitive(p) => write!(f, "{p:?}"),
            ComponentKind::Structural(s) => write!(f, "{s:?}"),
        }
    }
}

/// A unit of behaviour bound to signals through ordered terminals
#[derive(Debug, Clone)]
pub struct Component {
    pub(crate) kind: ComponentKind,
    pub(crate) inputs: Vec<TerminalId>,
    pub(crate) outputs: Vec<TerminalId>,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) children: Vec<ComponentId>,
    pub(crate) internal_signals: Vec<SignalId>,
    pub(crate) elaborated: bool,
    pub(crate) evaluations: u64,
}

impl Component {
    pub(crate) fn new(kind: ComponentKind, parent: Option<ComponentId>) -> Component {
        Component {
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            parent,
            children: Vec::new(),
            internal_signals: Vec::new(),
            elaborated: false,
            evaluations: 0,
        }
    }

    /// Kind of the component
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Input terminals, in positional order
    pub fn inputs(&self) -> &[TerminalId] {
        &self.inputs
    }

    /// Output terminals, in positional order
    pub fn outputs(&self) -> &[TerminalId] {
        &self.outputs
    }

    /// Structural component that instantiated this one, if any
    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    /// Sub-components built during elaboration
    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    /// Signals created during elaboration
    pub fn internal_signals(&self) -> &[SignalId] {
        &self.internal_signals
    }

    /// Whether elaboration has run
    pub fn is_elaborated(&self) -> bool {
        self.elaborated
    }

    /// Number of re-evaluations triggered by propagation; elaboration is not counted
    pub fn nb_evaluations(&self) -> u64 {
        self.evaluations
    }
}

impl Circuit {
    /// Signals bound to a list of terminals
    fn terminal_signals(&self, terminals: &[TerminalId]) -> Vec<SignalId> {
        terminals
            .iter()
            .map(|t| self.terminals[t.index()].signal)
            .collect()
    }

    /// Compute the output of a primitive from its current inputs
    fn compute(&self, c: ComponentId, p: Primitive) -> LogicValue {
        let values: Vec<LogicValue> = self.components[c.index()]
            .inputs
            .iter()
            .map(|t| self.value(self.terminals[t.index()].signal))
            .collect();
        p.evaluate(&values)
    }

    /// Re-evaluate a component after one of its inputs changed
    ///
    /// Returns the output signal if its value changed. Structural components have nothing to
    /// recompute: their sub-components are wired into the propagation graph on their own.
    pub(crate) fn evaluate(&mut self, c: ComponentId) -> Option<SignalId> {
        let p = match self.components[c.index()].kind {
            ComponentKind::Primitive(p) => p,
            ComponentKind::Structural(_) => return None,
        };
        let value = self.compute(c, p);
        let comp = &mut self.components[c.index()];
        comp.evaluations += 1;
        let out = self.terminals[comp.outputs[0].index()].signal;
        trace!("Evaluating {c} ({}) -> {value}", comp.kind);
        if self.set_value(out, value) {
            Some(out)
        } else {
            None
        }
    }

    /// Returns true if evaluating the component would change its output
    pub(crate) fn is_stale(&self, c: ComponentId) -> bool {
        let p = match self.components[c.index()].kind {
            ComponentKind::Primitive(p) => p,
            ComponentKind::Structural(_) => return false,
        };
        let out = self.terminals[self.components[c.index()].outputs[0].index()].signal;
        self.compute(c, p) != self.value(out)
    }

    /// Build the internal structure of a component; runs exactly once, when it is bound
    ///
    /// Primitives only compute their initial output, which is marked dirty if it changed.
    pub(crate) fn elaborate(&mut self, c: ComponentId) -> Result<()> {
        assert!(
            !self.components[c.index()].elaborated,
            "{c} is already elaborated"
        );
        let inputs = self.terminal_signals(&self.components[c.index()].inputs);
        let outputs = self.terminal_signals(&self.components[c.index()].outputs);
        match self.components[c.index()].kind {
            ComponentKind::Primitive(p) => {
                let value = self.compute(c, p);
                self.assign(outputs[0], value);
            }
            ComponentKind::Structural(Structural::MuxTree(k)) => {
                self.elaborate_mux_tree(c, k, &inputs, outputs[0])?;
            }
            ComponentKind::Structural(Structural::FullAdder) => {
                self.elaborate_full_adder(c, &inputs, &outputs)?;
            }
            ComponentKind::Structural(Structural::RippleAdder(n)) => {
                self.elaborate_ripple_adder(c, n, &inputs, &outputs)?;
            }
        }
        self.components[c.index()].elaborated = true;
        Ok(())
    }

    /// Create a signal owned by a structural component
    fn add_internal_signal(&mut self, parent: ComponentId) -> SignalId {
        let s = self.add_signal();
        self.components[parent.index()].internal_signals.push(s);
        s
    }

    fn elaborate_mux_tree(
        &mut self,
        c: ComponentId,
        k: usize,
        inputs: &[SignalId],
        output: SignalId,
    ) -> Result<()> {
        let (select, data) = inputs.split_at(k);
        if k == 0 {
            self.bind(ComponentKind::Primitive(Primitive::Buf), Some(c), data, &[output])?;
            return Ok(());
        }
        let mut level = data.to_vec();
        for (i, sel) in select.iter().enumerate() {
            let last = i + 1 == k;
            let mut next = Vec::new();
            for pair in level.chunks(2) {
                let o = if last {
                    output
                } else {
                    self.add_internal_signal(c)
                };
                self.bind(
                    ComponentKind::Primitive(Primitive::Mux),
                    Some(c),
                    &[*sel, pair[0], pair[1]],
                    &[o],
                )?;
                next.push(o);
            }
            level = next;
        }
        Ok(())
    }

    fn elaborate_full_adder(
        &mut self,
        c: ComponentId,
        inputs: &[SignalId],
        outputs: &[SignalId],
    ) -> Result<()> {
        use NaryType::*;
        let (a, b, cin) = (inputs[0], inputs[1], inputs[2]);
        let (sum, cout) = (outputs[0], outputs[1]);
        let half = self.add_internal_signal(c);
        let gen = self.add_internal_signal(c);
        let prop = self.add_internal_signal(c);
        let gate = |tp| ComponentKind::Primitive(Primitive::Nary(tp));
        self.bind(gate(Xor), Some(c), &[a, b], &[half])?;
        self.bind(gate(Xor), Some(c), &[half, cin], &[sum])?;
        self.bind(gate(And), Some(c), &[a, b], &[gen])?;
        self.bind(gate(And), Some(c), &[half, cin], &[prop])?;
        self.bind(gate(Or), Some(c), &[gen, prop], &[cout])?;
        Ok(())
    }

    fn elaborate_ripple_adder(
        &mut self,
        c: ComponentId,
        n: usize,
        inputs: &[SignalId],
        outputs: &[SignalId],
    ) -> Result<()> {
        let (a, rest) = inputs.split_at(n);
        let (b, cin) = rest.split_at(n);
        let mut carry = cin[0];
        if n == 0 {
            self.bind(ComponentKind::Primitive(Primitive::Buf), Some(c), &[carry], outputs)?;
            return Ok(());
        }
        for i in 0..n {
            let next = if i + 1 == n {
                outputs[n]
            } else {
                self.add_internal_signal(c)
            };
            self.bind(
                ComponentKind::Structural(Structural::FullAdder),
                Some(c),
                &[a[i], b[i], carry],
                &[outputs[i], next],
            )?;
            carry = next;
        }
        Ok(())
    }
}
