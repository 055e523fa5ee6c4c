//! Decorator behavior nodes.
//!
//! A decorator wraps at most one child slot. It decides whether a new attempt
//! may enter the child (an optional gate predicate, then an optional access
//! key) and post-processes the child's result.
//!
//! The gate is evaluated only when an attempt starts. A decorator that was
//! `Running` on the previous tick re-enters its child directly, so a gate that
//! turned false never cuts an in-progress child short.

use crate::Status;
use crate::context::{LeafContext, TickContext};
use crate::error::BoxError;
use crate::leaf::Predicate;
use crate::node::Node;
use crate::slot::Slot;

/// Single-child gate with optional result post-processing.
pub struct Decorator<B> {
    child: Option<Box<Slot<B>>>,
    gate: Option<Predicate<B>>,
    never_fail: bool,
    access_key: Option<String>,
    holds_lock: bool,
}

impl<B> Default for Decorator<B> {
    fn default() -> Self {
        Self {
            child: None,
            gate: None,
            never_fail: false,
            access_key: None,
            holds_lock: false,
        }
    }
}

impl<B> Decorator<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(self, child: Node<B>) -> Self {
        self.slot(Slot::new(child))
    }

    pub fn slot(mut self, slot: Slot<B>) -> Self {
        self.child = Some(Box::new(slot));
        self
    }

    /// Only enter the child when `gate` holds at the start of an attempt.
    pub fn gate<F>(mut self, gate: F) -> Self
    where
        F: FnMut(&LeafContext<'_, B>) -> Result<bool, BoxError> + Send + 'static,
    {
        self.gate = Some(Box::new(gate));
        self
    }

    /// Report `Success` instead of `Failure`. `Running` passes through.
    pub fn never_fail(mut self, never_fail: bool) -> Self {
        self.never_fail = never_fail;
        self
    }

    /// Require the named key from the driver's registry before entering.
    pub fn access_key(mut self, name: impl Into<String>) -> Self {
        self.access_key = Some(name.into());
        self
    }

    pub fn child_slot(&self) -> Option<&Slot<B>> {
        self.child.as_deref()
    }

    pub fn child_slot_slice(&self) -> &[Slot<B>] {
        match self.child.as_deref() {
            Some(slot) => std::slice::from_ref(slot),
            None => &[],
        }
    }

    pub(crate) fn child_slot_slice_mut(&mut self) -> &mut [Slot<B>] {
        match self.child.as_deref_mut() {
            Some(slot) => std::slice::from_mut(slot),
            None => &mut [],
        }
    }

    pub fn has_gate(&self) -> bool {
        self.gate.is_some()
    }

    pub fn is_never_fail(&self) -> bool {
        self.never_fail
    }

    pub fn access_key_name(&self) -> Option<&str> {
        self.access_key.as_deref()
    }

    /// `true` while the decorator holds its access key.
    pub fn holds_lock(&self) -> bool {
        self.holds_lock
    }

    /// A gate error propagates as-is: the owning node records it and reports
    /// `Failure` without applying `never_fail`.
    pub(crate) fn behave(
        &mut self,
        resuming: bool,
        ctx: &mut TickContext,
        blackboard: &mut B,
    ) -> Result<Status, BoxError> {
        let Self {
            child,
            gate,
            never_fail,
            access_key,
            holds_lock,
        } = self;
        let Some(slot) = child.as_mut() else {
            return Ok(Status::Failure);
        };
        let finish = |status: Status| {
            if *never_fail && status.is_failure() {
                Status::Success
            } else {
                status
            }
        };

        if !resuming {
            if let Some(gate) = gate.as_mut() {
                let leaf = LeafContext::new(blackboard, ctx);
                if !gate(&leaf)? {
                    return Ok(finish(Status::Failure));
                }
            }
            if let Some(key) = access_key.as_deref()
                && !*holds_lock
            {
                let tick_id = ctx.tick_id();
                if !ctx.access_keys_mut().lock(key, tick_id) {
                    tracing::trace!(key, tick = tick_id, "access denied");
                    return Ok(finish(Status::Failure));
                }
                *holds_lock = true;
            }
        }

        let status = slot.execute(ctx, blackboard);

        if !status.is_running() && *holds_lock {
            release(access_key.as_deref(), holds_lock, ctx);
        }
        Ok(finish(status))
    }

    pub(crate) fn invalidate(
        &mut self,
        abandoned: bool,
        force: bool,
        ctx: &mut TickContext,
        blackboard: &mut B,
    ) {
        if let Some(slot) = self.child.as_mut() {
            slot.invalidate(force, ctx, blackboard);
        }
        if abandoned && self.holds_lock {
            release(self.access_key.as_deref(), &mut self.holds_lock, ctx);
        }
    }
}

fn release(key: Option<&str>, holds_lock: &mut bool, ctx: &mut TickContext) {
    if let Some(key) = key {
        let tick_id = ctx.tick_id();
        ctx.access_keys_mut().unlock(key, tick_id);
    }
    *holds_lock = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AccessKeys, CounterLimitKey};
    use crate::config::DriverConfig;

    #[derive(Default)]
    struct Guard {
        alerted: bool,
        steps: u32,
    }

    fn scripted(script: Vec<Status>) -> Node<Guard> {
        let mut step = 0;
        Node::action("work", move |ctx: &mut LeafContext<'_, Guard>| {
            ctx.blackboard_mut().steps += 1;
            let status = script[step.min(script.len() - 1)];
            step += 1;
            Ok(status)
        })
        .unwrap()
    }

    fn context() -> TickContext {
        let mut keys = AccessKeys::new();
        keys.insert(Box::new(CounterLimitKey::new("door", 1).unwrap()))
            .unwrap();
        TickContext::new(&DriverConfig::default(), keys)
    }

    fn decorated(decorator: Decorator<Guard>) -> Slot<Guard> {
        let mut node = Node::decorator("gate", decorator).unwrap();
        node.assign_ids(&mut 0);
        Slot::new(node)
    }

    fn tick(slot: &mut Slot<Guard>, ctx: &mut TickContext, guard: &mut Guard) -> Status {
        ctx.begin();
        slot.execute(ctx, guard)
    }

    #[test]
    fn decorator_without_child_fails() {
        let mut slot = decorated(Decorator::new().never_fail(true));
        let mut ctx = context();
        assert_eq!(tick(&mut slot, &mut ctx, &mut Guard::default()), Status::Failure);
    }

    #[test]
    fn never_fail_turns_failure_into_success() {
        let mut slot = decorated(
            Decorator::new()
                .never_fail(true)
                .child(scripted(vec![Status::Failure])),
        );
        let mut ctx = context();
        assert_eq!(tick(&mut slot, &mut ctx, &mut Guard::default()), Status::Success);
    }

    #[test]
    fn never_fail_passes_running_through() {
        let mut slot = decorated(
            Decorator::new()
                .never_fail(true)
                .child(scripted(vec![Status::Running])),
        );
        let mut ctx = context();
        assert_eq!(tick(&mut slot, &mut ctx, &mut Guard::default()), Status::Running);
    }

    #[test]
    fn closed_gate_skips_child() {
        let mut slot = decorated(
            Decorator::new()
                .gate(|ctx: &LeafContext<'_, Guard>| Ok(ctx.blackboard().alerted))
                .child(scripted(vec![Status::Success])),
        );
        let mut ctx = context();
        let mut guard = Guard::default();
        assert_eq!(tick(&mut slot, &mut ctx, &mut guard), Status::Failure);
        assert_eq!(guard.steps, 0);

        guard.alerted = true;
        assert_eq!(tick(&mut slot, &mut ctx, &mut guard), Status::Success);
        assert_eq!(guard.steps, 1);
    }

    #[test]
    fn gate_is_skipped_while_child_runs() {
        let mut slot = decorated(
            Decorator::new()
                .gate(|ctx: &LeafContext<'_, Guard>| Ok(ctx.blackboard().alerted))
                .child(scripted(vec![Status::Running, Status::Success])),
        );
        let mut ctx = context();
        let mut guard = Guard {
            alerted: true,
            ..Guard::default()
        };
        assert_eq!(tick(&mut slot, &mut ctx, &mut guard), Status::Running);

        guard.alerted = false;
        assert_eq!(tick(&mut slot, &mut ctx, &mut guard), Status::Success);
        assert_eq!(guard.steps, 2);
    }

    #[test]
    fn gate_error_is_captured_and_bypasses_never_fail() {
        let mut slot = decorated(
            Decorator::new()
                .never_fail(true)
                .gate(|_: &LeafContext<'_, Guard>| Err("sensor offline".into()))
                .child(scripted(vec![Status::Success])),
        );
        let mut ctx = context();
        assert_eq!(tick(&mut slot, &mut ctx, &mut Guard::default()), Status::Failure);
        let captured = ctx.captured_error().unwrap();
        assert_eq!(captured.node_name, "gate");
        assert_eq!(captured.source.to_string(), "sensor offline");
    }

    #[test]
    fn access_key_is_held_while_running() {
        let mut first = decorated(
            Decorator::new()
                .access_key("door")
                .child(scripted(vec![Status::Running, Status::Success])),
        );
        let mut second = decorated(
            Decorator::new()
                .access_key("door")
                .child(scripted(vec![Status::Success])),
        );
        let mut ctx = context();
        let mut guard = Guard::default();

        ctx.begin();
        assert_eq!(first.execute(&mut ctx, &mut guard), Status::Running);
        assert_eq!(second.execute(&mut ctx, &mut guard), Status::Failure);
        assert!(first.child().as_decorator().unwrap().holds_lock());

        ctx.begin();
        assert_eq!(first.execute(&mut ctx, &mut guard), Status::Success);
        assert_eq!(second.execute(&mut ctx, &mut guard), Status::Success);
        assert!(!first.child().as_decorator().unwrap().holds_lock());
    }

    #[test]
    fn abandoning_releases_the_lock() {
        let mut slot = decorated(
            Decorator::new()
                .access_key("door")
                .child(scripted(vec![Status::Running])),
        );
        let mut ctx = context();
        let mut guard = Guard::default();
        assert_eq!(tick(&mut slot, &mut ctx, &mut guard), Status::Running);

        ctx.begin();
        slot.reset(&mut ctx, &mut guard);
        assert_eq!(slot.cached_result(), Status::Failure);
        assert!(!slot.child().as_decorator().unwrap().holds_lock());
        let tick_id = ctx.tick_id();
        assert!(ctx.access_keys_mut().lock("door", tick_id));
    }

    #[test]
    fn nested_decorators_reach_the_innermost_child() {
        let inner = Node::decorator(
            "inner",
            Decorator::new().child(scripted(vec![Status::Failure])),
        )
        .unwrap();
        let mut slot = decorated(Decorator::new().never_fail(true).child(inner));
        let mut ctx = context();
        let mut guard = Guard::default();

        assert_eq!(tick(&mut slot, &mut ctx, &mut guard), Status::Success);
        assert_eq!(guard.steps, 1);

        let outer = slot.child().as_decorator().unwrap();
        let inner = outer.child_slot().unwrap().child();
        assert_eq!(outer.child_slot_slice().len(), 1);
        assert_eq!(inner.last_result(), Status::Failure);
        assert_eq!(inner.as_decorator().unwrap().child_slot_slice()[0].child().id().0, 2);
    }
}
