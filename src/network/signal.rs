use std::fmt;
use std::ops::Index;

use log::debug;

use crate::error::{Result, SimError};
use crate::network::{Circuit, ComponentId, LogicValue, TerminalId};

/// Index of a single-bit net in a [`Circuit`]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct SignalId(pub(crate) u32);

impl SignalId {
    /// Position of the signal in the circuit
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

impl fmt::Debug for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A single-bit net
///
/// Signals that have been connected together form an equivalence class. The value, the fan-out
/// and the drivers of the class are kept on its representative; other members only hold a link
/// towards it.
#[derive(Debug, Clone, Default)]
pub struct Signal {
    pub(crate) value: LogicValue,
    pub(crate) fanout: Vec<TerminalId>,
    pub(crate) merged: Option<SignalId>,
    pub(crate) class_size: u32,
    pub(crate) drivers: Vec<ComponentId>,
    pub(crate) name: Option<String>,
}

impl Signal {
    pub(crate) fn new() -> Signal {
        Signal {
            class_size: 1,
            ..Default::default()
        }
    }

    /// Link to the signal this one has been merged into, if any
    pub fn merged(&self) -> Option<SignalId> {
        self.merged
    }

    /// Name given to the signal, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Ordered group of signals; index 0 is the least significant bit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bus {
    signals: Box<[SignalId]>,
}

impl Bus {
    /// Number of signals in the bus
    pub fn width(&self) -> usize {
        self.signals.len()
    }

    /// Signals of the bus, least significant first
    pub fn signals(&self) -> &[SignalId] {
        &self.signals
    }

    /// Iterate over the signals of the bus
    pub fn iter(&self) -> impl Iterator<Item = SignalId> + '_ {
        self.signals.iter().copied()
    }
}

impl From<Vec<SignalId>> for Bus {
    fn from(v: Vec<SignalId>) -> Bus {
        Bus { signals: v.into() }
    }
}

impl From<&[SignalId]> for Bus {
    fn from(v: &[SignalId]) -> Bus {
        Bus { signals: v.into() }
    }
}

impl Index<usize> for Bus {
    type Output = SignalId;
    fn index(&self, i: usize) -> &SignalId {
        &self.signals[i]
    }
}

impl Circuit {
    /// Representative of the equivalence class of a signal
    pub(crate) fn find(&self, s: SignalId) -> SignalId {
        let mut s = s;
        while let Some(next) = self.signals[s.index()].merged {
            s = next;
        }
        s
    }

    /// Current value of a signal
    pub fn value(&self, s: SignalId) -> LogicValue {
        self.signals[self.find(s).index()].value
    }

    /// Current values of a bus, in declared order
    pub fn read_bus(&self, bus: &Bus) -> Vec<LogicValue> {
        bus.iter().map(|s| self.value(s)).collect()
    }

    /// Set the value without any notification; returns whether it changed
    pub(crate) fn set_value(&mut self, s: SignalId, value: LogicValue) -> bool {
        let root = self.find(s).index();
        if self.signals[root].value == value {
            return false;
        }
        self.signals[root].value = value;
        true
    }

    /// Assign a value to a signal
    ///
    /// If the value changed, the signal is recorded as dirty: its fan-out will be walked by the
    /// next call to [`Circuit::settle`]. Returns whether the value changed.
    pub fn assign(&mut self, s: SignalId, value: LogicValue) -> bool {
        let changed = self.set_value(s, value);
        if changed {
            self.scheduler.mark_dirty(s);
        }
        changed
    }

    /// Assign values to a bus, index 0 first
    ///
    /// Nothing is assigned if the number of values does not match the width of the bus.
    pub fn assign_bus(&mut self, bus: &Bus, values: &[LogicValue]) -> Result<()> {
        if bus.width() != values.len() {
            return Err(SimError::WidthMismatch {
                expected: bus.width(),
                found: values.len(),
            });
        }
        for (s, v) in bus.iter().zip(values) {
            self.assign(s, *v);
        }
        Ok(())
    }

    /// Connect two signals, making them electrically equivalent
    ///
    /// The value of the merged net is the resolution of both values, and the fan-out of both
    /// sides is joined. If the merged value differs from either side, it is propagated.
    /// Connecting a signal to itself or to a signal it is already merged with does nothing.
    pub fn connect(&mut self, a: SignalId, b: SignalId) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        // Union by size keeps the links short
        let size_a = self.signals[ra.index()].class_size;
        let size_b = self.signals[rb.index()].class_size;
        let (root, child) = if size_a >= size_b { (ra, rb) } else { (rb, ra) };
        let va = self.signals[ra.index()].value;
        let vb = self.signals[rb.index()].value;
        let merged = va.merge(vb);
        debug!("Connecting {a} ({va}) and {b} ({vb}) into {root} ({merged})");

        let child_data = &mut self.signals[child.index()];
        child_data.merged = Some(root);
        let fanout = std::mem::take(&mut child_data.fanout);
        let drivers = std::mem::take(&mut child_data.drivers);
        let size = child_data.class_size;
        let root_data = &mut self.signals[root.index()];
        root_data.fanout.extend(fanout);
        root_data.drivers.extend(drivers);
        root_data.class_size += size;
        root_data.value = merged;
        self.invalidate_ranks();

        if merged != va || merged != vb {
            self.propagate_parallel(&[root]);
        }
    }

    /// Terminals notified when the value of a signal changes
    pub fn fanout(&self, s: SignalId) -> &[TerminalId] {
        &self.signals[self.find(s).index()].fanout
    }

    /// Give a name to a signal, used when exporting
    pub fn set_name(&mut self, s: SignalId, name: &str) {
        self.signals[s.index()].name = Some(name.to_string());
    }

    /// Name of a signal for export: the name of its class representative, or its index
    pub fn signal_name(&self, s: SignalId) -> String {
        let root = self.find(s);
        match &self.signals[root.index()].name {
            Some(n) => n.clone(),
            None => root.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::network::{Circuit, LogicValue::*};

    #[test]
    fn test_assign() {
        let mut c = Circuit::new();
        let s = c.add_signal();
        assert_eq!(c.value(s), Unknown);
        assert!(c.assign(s, One));
        assert!(!c.assign(s, One));
        assert_eq!(c.value(s), One);
    }

    #[test]
    fn test_bus() {
        let mut c = Circuit::new();
        let b = c.add_bus(3);
        assert_eq!(b.width(), 3);
        c.assign_bus(&b, &[One, Zero, HighZ]).unwrap();
        assert_eq!(c.read_bus(&b), vec![One, Zero, HighZ]);
        assert_eq!(c.value(b[0]), One);

        // A mismatch leaves the bus untouched
        assert!(c.assign_bus(&b, &[Zero, Zero]).is_err());
        assert!(c.assign_bus(&b, &[Zero, Zero, Zero, Zero]).is_err());
        assert_eq!(c.read_bus(&b), vec![One, Zero, HighZ]);
    }

    #[test]
    fn test_connect() {
        let mut c = Circuit::new();
        let a = c.add_signal();
        let b = c.add_signal();
        c.assign(a, One);
        c.assign(b, HighZ);
        c.connect(a, b);
        assert_eq!(c.value(a), One);
        assert_eq!(c.value(b), One);

        // Both sides observe assignments
        c.assign(b, Zero);
        assert_eq!(c.value(a), Zero);

        let d = c.add_signal();
        c.assign(d, One);
        c.connect(d, a);
        assert_eq!(c.value(a), Unknown);
        assert_eq!(c.value(b), Unknown);
        assert_eq!(c.value(d), Unknown);
    }

    #[test]
    fn test_connect_idempotent() {
        for va in [Zero, One, Unknown, HighZ] {
            for vb in [Zero, One, Unknown, HighZ] {
                let mut c = Circuit::new();
                let a = c.add_signal();
                let b = c.add_signal();
                c.assign(a, va);
                c.assign(b, vb);
                c.connect(a, a);
                assert_eq!(c.value(a), va);
                c.connect(a, b);
                let once = c.value(a);
                c.connect(b, a);
                c.connect(a, b);
                assert_eq!(c.value(a), once);
                assert_eq!(c.value(b), once);
                assert_eq!(once, va.merge(vb));
            }
        }
    }

    #[test]
    fn test_connect_propagates() {
        let mut c = Circuit::new();
        let a = c.add_signal();
        let b = c.add_signal();
        let x = c.not(b).unwrap();
        c.assign(a, Zero);
        c.assign(b, HighZ);
        c.connect(a, b);
        assert_eq!(c.value(x), One);
        assert_eq!(c.fanout(a).len(), 1);
    }

    #[test]
    fn test_names() {
        let mut c = Circuit::new();
        let a = c.add_signal();
        let b = c.add_signal();
        c.set_name(a, "clk_en");
        assert_eq!(c.signal_name(a), "clk_en");
        assert_eq!(c.signal_name(b), "s1");
        c.connect(a, b);
        assert_eq!(c.signal_name(b), c.signal_name(a));
    }
}
