use std::cmp::Reverse;
use std::collections::BinaryHeap;

use fxhash::{FxHashMap, FxHashSet};

use crate::network::{ComponentId, SignalId, TerminalId};

/// Work queues of the propagation engine
///
/// A wave evaluates its pending components lowest rank first, each at most once however many
/// times it is scheduled. Terminals reached with an exhausted budget are deferred to the end of
/// the wave. Outside of a wave, the scheduler only records the signals assigned by the user.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    /// Queue of components to evaluate, lowest rank first
    pending: BinaryHeap<Reverse<(u32, ComponentId)>>,
    /// Remaining budget of each pending component
    budgets: FxHashMap<ComponentId, usize>,
    /// Terminals reached with no budget left
    deferred: Vec<TerminalId>,
    /// Signals assigned since they were last propagated
    dirty: Vec<SignalId>,
    /// Whether each signal is in the dirty list
    is_dirty: FxHashSet<SignalId>,
    /// Whether a wave is running
    in_wave: bool,
    /// Number of waves run so far
    nb_waves: u64,
    /// Number of unbounded walks cut by the depth limit
    nb_cuts: u64,
}

impl Scheduler {
    /// Start a wave; the queues must be empty
    pub(crate) fn begin_wave(&mut self) {
        assert!(!self.in_wave, "A propagation wave is already running");
        assert!(self.pending.is_empty() && self.budgets.is_empty() && self.deferred.is_empty());
        self.in_wave = true;
    }

    /// Finish a wave; all work must have been drained
    pub(crate) fn end_wave(&mut self) {
        assert!(self.in_wave);
        assert!(self.pending.is_empty() && self.budgets.is_empty() && self.deferred.is_empty());
        self.in_wave = false;
        self.nb_waves += 1;
    }

    /// Queue a component with a remaining budget; a component already queued keeps the larger one
    pub(crate) fn schedule(&mut self, c: ComponentId, rank: u32, steps: usize) {
        debug_assert!(self.in_wave);
        debug_assert!(steps > 0);
        let budget = self.budgets.entry(c).or_insert(0);
        if *budget == 0 {
            self.pending.push(Reverse((rank, c)));
        }
        *budget = (*budget).max(steps);
    }

    /// Next component to evaluate, with its budget
    pub(crate) fn pop(&mut self) -> Option<(ComponentId, usize)> {
        let Reverse((_, c)) = self.pending.pop()?;
        let budget = self.budgets.remove(&c).unwrap_or(0);
        Some((c, budget))
    }

    /// Defer a terminal to the end of the wave
    pub(crate) fn defer(&mut self, t: TerminalId) {
        debug_assert!(self.in_wave);
        self.deferred.push(t);
    }

    /// Take the deferred terminals, in the order they were reached
    pub(crate) fn take_deferred(&mut self) -> Vec<TerminalId> {
        std::mem::take(&mut self.deferred)
    }

    /// Record a signal whose fan-out needs a walk
    pub(crate) fn mark_dirty(&mut self, s: SignalId) {
        if self.is_dirty.insert(s) {
            self.dirty.push(s);
        }
    }

    /// Take the dirty signals, in assignment order
    pub(crate) fn take_dirty(&mut self) -> Vec<SignalId> {
        self.is_dirty.clear();
        std::mem::take(&mut self.dirty)
    }

    /// Forget signals that are about to be propagated
    pub(crate) fn clear_dirty(&mut self, signals: &[SignalId]) {
        let mut removed = false;
        for s in signals {
            removed |= self.is_dirty.remove(s);
        }
        if removed {
            let is_dirty = &self.is_dirty;
            self.dirty.retain(|s| is_dirty.contains(s));
        }
    }

    pub(crate) fn record_cut(&mut self) {
        self.nb_cuts += 1;
    }

    /// Signals assigned but not propagated yet
    pub fn dirty(&self) -> &[SignalId] {
        &self.dirty
    }

    /// Returns true if no wave is running and no work is queued
    pub fn is_idle(&self) -> bool {
        !self.in_wave && self.pending.is_empty() && self.deferred.is_empty()
    }

    /// Number of waves run so far
    pub fn nb_waves(&self) -> u64 {
        self.nb_waves
    }

    /// Number of unbounded walks that hit the depth limit
    pub fn nb_cuts(&self) -> u64 {
        self.nb_cuts
    }

    /// Drop all queued work and counters, to start an independent run
    pub fn reset(&mut self) {
        *self = Scheduler::default();
    }
}
