//! Per-tick execution state.
//!
//! The [`TickContext`] is owned by the driver and rebuilt in place at the
//! start of every tick. It carries the monotonic tick id, the interruption
//! flag, the active parameter scope, the last captured callback error and the
//! ordered execution trace consumed by inspection tooling.
//!
//! User callbacks never see the context directly; they receive a
//! [`LeafContext`] that pairs the host blackboard with a narrow view of it.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::access::AccessKeys;
use crate::config::DriverConfig;
use crate::error::CapturedError;
use crate::node::NodeId;
use crate::params::{ParamValue, Parameters};

/// Cloneable handle that interrupts the current tick from outside the tree.
///
/// The flag is checked before every child visit and cleared when the next tick
/// begins.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    fn clear(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One visited slot in the execution trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceEntry {
    pub node: NodeId,
    /// Nesting depth below the state root (the root slot is depth 0).
    pub depth: u16,
}

/// Mutable state threaded through one tick.
pub struct TickContext {
    tick_id: u64,
    interrupted: bool,
    cancel: CancelHandle,
    active_parameters: Option<Arc<Parameters>>,
    captured_error: Option<CapturedError>,
    trace: Vec<TraceEntry>,
    trace_capacity: usize,
    trace_truncated: bool,
    depth: u16,
    rng: StdRng,
    access_keys: AccessKeys,
    active_state: String,
    known_states: HashSet<String>,
    requested_state: Option<String>,
}

impl TickContext {
    pub(crate) fn new(config: &DriverConfig, access_keys: AccessKeys) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            tick_id: 0,
            interrupted: false,
            cancel: CancelHandle::default(),
            active_parameters: None,
            captured_error: None,
            trace: Vec::with_capacity(config.trace_capacity.min(256)),
            trace_capacity: config.trace_capacity.max(1),
            trace_truncated: false,
            depth: 0,
            rng,
            access_keys,
            active_state: String::new(),
            known_states: HashSet::new(),
            requested_state: None,
        }
    }

    /// Starts a new tick: bumps the id and clears all per-tick state.
    pub(crate) fn begin(&mut self) {
        self.tick_id += 1;
        self.interrupted = false;
        self.cancel.clear();
        self.active_parameters = None;
        self.captured_error = None;
        self.trace.clear();
        self.trace_truncated = false;
        self.depth = 0;
        self.requested_state = None;
    }

    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// `true` once the current tick was interrupted, either from inside the
    /// tree or through a [`CancelHandle`].
    pub fn is_interrupted(&self) -> bool {
        self.interrupted || self.cancel.is_cancelled()
    }

    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    pub fn active_parameters(&self) -> Option<&Parameters> {
        self.active_parameters.as_deref()
    }

    pub fn captured_error(&self) -> Option<&CapturedError> {
        self.captured_error.as_ref()
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// `true` if some visits of this tick did not fit into the trace.
    pub fn trace_truncated(&self) -> bool {
        self.trace_truncated
    }

    pub fn active_state(&self) -> &str {
        &self.active_state
    }

    pub fn access_keys(&self) -> &AccessKeys {
        &self.access_keys
    }

    pub(crate) fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub(crate) fn capture(&mut self, error: CapturedError) {
        self.captured_error = Some(error);
    }

    /// Records a slot visit and descends one level.
    ///
    /// Returns the parameter scope to restore in [`leave_slot`](Self::leave_slot).
    pub(crate) fn enter_slot(
        &mut self,
        node: NodeId,
        parameters: Option<&Arc<Parameters>>,
    ) -> Option<Arc<Parameters>> {
        if self.trace.len() < self.trace_capacity {
            self.trace.push(TraceEntry {
                node,
                depth: self.depth,
            });
        } else if !self.trace_truncated {
            self.trace_truncated = true;
            tracing::warn!(
                tick = self.tick_id,
                capacity = self.trace_capacity,
                "execution trace is full, further visits are not recorded"
            );
        }
        self.depth = self.depth.saturating_add(1);

        match parameters {
            Some(params) => self.active_parameters.replace(Arc::clone(params)),
            None => self.active_parameters.clone(),
        }
    }

    pub(crate) fn leave_slot(&mut self, previous: Option<Arc<Parameters>>) {
        self.depth = self.depth.saturating_sub(1);
        self.active_parameters = previous;
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub(crate) fn access_keys_mut(&mut self) -> &mut AccessKeys {
        &mut self.access_keys
    }

    pub(crate) fn set_active_state(&mut self, name: &str) {
        self.active_state.clear();
        self.active_state.push_str(name);
    }

    pub(crate) fn set_known_states<I>(&mut self, names: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.known_states = names.into_iter().map(Into::into).collect();
    }

    /// `true` if the driver has a state registered under `name`.
    pub fn is_known_state(&self, name: &str) -> bool {
        self.known_states.contains(name)
    }

    /// Only the first request of a tick is kept.
    pub(crate) fn request_state(&mut self, name: &str) -> bool {
        if self.requested_state.is_some() {
            return false;
        }
        self.requested_state = Some(name.to_owned());
        true
    }

    pub(crate) fn take_requested_state(&mut self) -> Option<String> {
        self.requested_state.take()
    }
}

/// The view a user callback gets while a leaf, condition or gate executes.
pub struct LeafContext<'a, B> {
    blackboard: &'a mut B,
    tick: &'a mut TickContext,
}

impl<'a, B> LeafContext<'a, B> {
    pub(crate) fn new(blackboard: &'a mut B, tick: &'a mut TickContext) -> Self {
        Self { blackboard, tick }
    }

    pub fn blackboard(&self) -> &B {
        &*self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut B {
        &mut *self.blackboard
    }

    pub fn tick_id(&self) -> u64 {
        self.tick.tick_id()
    }

    /// Parameters of the innermost slot in scope, if any.
    pub fn params(&self) -> Option<&Parameters> {
        self.tick.active_parameters()
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params()?.get(name)
    }

    /// Name of the state currently being ticked.
    pub fn state(&self) -> &str {
        self.tick.active_state()
    }

    /// Stops every composite from visiting further children this tick.
    pub fn interrupt(&mut self) {
        self.tick.interrupt();
    }
}
