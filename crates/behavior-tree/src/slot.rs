//! Positional binding of a child node to its parent.

use std::sync::Arc;

use crate::Status;
use crate::concurrent::ChildRole;
use crate::context::TickContext;
use crate::node::Node;
use crate::params::Parameters;

/// A child node at one position of a composite or decorator.
///
/// The slot owns the child, optionally overrides the parameter scope for the
/// child's subtree, and records itself in the execution trace every time the
/// child is entered.
pub struct Slot<B> {
    child: Node<B>,
    parameters: Option<Arc<Parameters>>,
    role: ChildRole,
    cached_result: Status,
}

impl<B> Slot<B> {
    pub fn new(child: Node<B>) -> Self {
        Self {
            child,
            parameters: None,
            role: ChildRole::default(),
            cached_result: Status::Failure,
        }
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(Arc::new(parameters));
        self
    }

    /// How this child's result counts inside a concurrent composite.
    pub fn with_role(mut self, role: ChildRole) -> Self {
        self.role = role;
        self
    }

    pub fn child(&self) -> &Node<B> {
        &self.child
    }

    pub fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_deref()
    }

    pub fn role(&self) -> ChildRole {
        self.role
    }

    /// The child's result as of its last execution or reset.
    pub fn cached_result(&self) -> Status {
        self.cached_result
    }

    pub(crate) fn child_mut(&mut self) -> &mut Node<B> {
        &mut self.child
    }

    pub(crate) fn execute(&mut self, ctx: &mut TickContext, blackboard: &mut B) -> Status {
        let outer = ctx.enter_slot(self.child.id(), self.parameters.as_ref());
        let status = self.child.execute(ctx, blackboard);
        ctx.leave_slot(outer);
        self.cached_result = status;
        status
    }

    pub(crate) fn reset(&mut self, ctx: &mut TickContext, blackboard: &mut B) {
        self.invalidate(false, ctx, blackboard);
    }

    /// Fails out the whole subtree, e.g. when its state is left.
    pub(crate) fn abort(&mut self, ctx: &mut TickContext, blackboard: &mut B) {
        self.invalidate(true, ctx, blackboard);
    }

    pub(crate) fn invalidate(&mut self, force: bool, ctx: &mut TickContext, blackboard: &mut B) {
        self.child.invalidate(force, ctx, blackboard);
        self.cached_result = self.child.last_result();
    }
}

impl<B> From<Node<B>> for Slot<B> {
    fn from(child: Node<B>) -> Self {
        Slot::new(child)
    }
}
