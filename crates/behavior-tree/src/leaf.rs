//! Leaf nodes: actions, conditions and state transitions.
//!
//! Leaves never have children. Their user-supplied callbacks may fail; the
//! owning [`Node`](crate::Node) turns such errors into `Failure` and records
//! them on the tick context.

use crate::Status;
use crate::behavior::Behavior;
use crate::context::{LeafContext, TickContext};
use crate::error::BoxError;

/// Boolean test evaluated by a [`Condition`] or a decorator gate.
pub type Predicate<B> =
    Box<dyn FnMut(&LeafContext<'_, B>) -> Result<bool, BoxError> + Send + 'static>;

/// Leaf that performs work, possibly across several ticks.
pub struct Action<B> {
    behavior: Box<dyn Behavior<B>>,
}

impl<B> Action<B> {
    pub fn new(behavior: impl Behavior<B> + 'static) -> Self {
        Self {
            behavior: Box::new(behavior),
        }
    }

    pub(crate) fn behave(
        &mut self,
        ctx: &mut TickContext,
        blackboard: &mut B,
    ) -> Result<Status, BoxError> {
        let mut leaf = LeafContext::new(blackboard, ctx);
        self.behavior.tick(&mut leaf)
    }

    pub(crate) fn abort(&mut self, blackboard: &mut B) {
        self.behavior.abort(blackboard);
    }
}

/// Leaf that tests the world without changing it.
///
/// Without a bound predicate the condition always fails, whatever `reverse`
/// says.
pub struct Condition<B> {
    predicate: Option<Predicate<B>>,
    reverse: bool,
}

impl<B> Condition<B> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: FnMut(&LeafContext<'_, B>) -> Result<bool, BoxError> + Send + 'static,
    {
        Self {
            predicate: Some(Box::new(predicate)),
            reverse: false,
        }
    }

    pub fn unbound() -> Self {
        Self {
            predicate: None,
            reverse: false,
        }
    }

    /// Succeed when the predicate is false and vice versa.
    pub fn reversed(mut self) -> Self {
        self.reverse = !self.reverse;
        self
    }

    pub fn is_reversed(&self) -> bool {
        self.reverse
    }

    pub fn is_bound(&self) -> bool {
        self.predicate.is_some()
    }

    pub(crate) fn behave(
        &mut self,
        ctx: &mut TickContext,
        blackboard: &mut B,
    ) -> Result<Status, BoxError> {
        let Some(predicate) = self.predicate.as_mut() else {
            return Ok(Status::Failure);
        };
        let leaf = LeafContext::new(blackboard, ctx);
        let holds = predicate(&leaf)?;
        Ok(Status::from_bool(holds != self.reverse))
    }
}

/// Leaf that asks the driver to switch to another named state.
///
/// Always succeeds: an unknown target is a configuration problem reported by
/// [`TreeDriver::validate`](crate::TreeDriver::validate), not a tick failure.
#[derive(Clone, Debug)]
pub struct ChangeState {
    target: String,
}

impl ChangeState {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Requesting a transition abandons the rest of the current state, so the
    /// tick is interrupted once the request is accepted. A target that is the
    /// active state or not registered at all leaves the tick untouched.
    pub(crate) fn behave(&self, ctx: &mut TickContext) -> Status {
        if ctx.active_state() == self.target {
            return Status::Success;
        }
        if !ctx.is_known_state(&self.target) {
            tracing::warn!(
                from = ctx.active_state(),
                to = %self.target,
                "ignoring transition to unknown state"
            );
            return Status::Success;
        }
        if ctx.request_state(&self.target) {
            tracing::debug!(
                from = ctx.active_state(),
                to = %self.target,
                tick = ctx.tick_id(),
                "state change requested"
            );
            ctx.interrupt();
        }
        Status::Success
    }
}
