//! Behavior tree nodes.
//!
//! A [`Node`] pairs the bookkeeping shared by every node (identity, last
//! result, tick of that result, random-selection weight) with a closed set of
//! variants in [`NodeKind`]. Execution dispatches on the variant, so adding a
//! policy is a compile-checked change everywhere it matters.
//!
//! # Execute / Reset contract
//!
//! - `execute` stamps the node with the current tick id, runs the variant, and
//!   stores the produced status. Callback errors become `Failure` and are
//!   recorded on the tick context; they never propagate.
//! - `reset` invalidates abandoned work: a node that is `Running` but was not
//!   executed in the current tick is forced to `Failure`. Composites and
//!   decorators first forward the reset to their running children.
//! - A node found `Running` from a tick older than the previous one is reset
//!   before it executes again.

use std::fmt;

use crate::Status;
use crate::composite::Composite;
use crate::context::{LeafContext, TickContext};
use crate::decorator::Decorator;
use crate::error::{BoxError, BuildError, CapturedError, Result};
use crate::leaf::{Action, ChangeState, Condition};
use crate::slot::Slot;

/// Identity of a node inside one driver.
///
/// Ids are assigned in pre-order when the driver is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    pub const UNASSIGNED: NodeId = NodeId(u32::MAX);

    pub fn is_assigned(self) -> bool {
        self != Self::UNASSIGNED
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_assigned() {
            write!(f, "#{}", self.0)
        } else {
            f.write_str("#?")
        }
    }
}

/// Declared kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeType {
    Action,
    Condition,
    ChangeState,
    Decorator,
    Composite,
}

impl NodeType {
    pub fn is_leaf(self) -> bool {
        !matches!(self, NodeType::Decorator | NodeType::Composite)
    }
}

/// Variant-specific part of a node.
pub enum NodeKind<B> {
    Action(Action<B>),
    Condition(Condition<B>),
    ChangeState(ChangeState),
    Decorator(Decorator<B>),
    Composite(Composite<B>),
}

impl<B> NodeKind<B> {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Action(_) => NodeType::Action,
            NodeKind::Condition(_) => NodeType::Condition,
            NodeKind::ChangeState(_) => NodeType::ChangeState,
            NodeKind::Decorator(_) => NodeType::Decorator,
            NodeKind::Composite(_) => NodeType::Composite,
        }
    }
}

/// A unit of behavior.
pub struct Node<B> {
    id: NodeId,
    name: String,
    weight: f32,
    last_result: Status,
    last_tick_id: u64,
    kind: NodeKind<B>,
}

impl<B> Node<B> {
    /// Creates a node. Fails if `name` is empty, or if a change-state leaf has
    /// no target.
    pub fn new(name: impl Into<String>, kind: NodeKind<B>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(BuildError::EmptyName);
        }
        if let NodeKind::ChangeState(change) = &kind
            && change.target().is_empty()
        {
            return Err(BuildError::EmptyTransitionTarget { node: name });
        }
        Ok(Self {
            id: NodeId::UNASSIGNED,
            name,
            weight: 1.0,
            last_result: Status::Failure,
            last_tick_id: 0,
            kind,
        })
    }

    pub fn action<F>(name: impl Into<String>, body: F) -> Result<Self>
    where
        F: FnMut(&mut LeafContext<'_, B>) -> std::result::Result<Status, BoxError> + Send + 'static,
    {
        Self::new(name, NodeKind::Action(Action::new(body)))
    }

    pub fn condition<F>(name: impl Into<String>, predicate: F) -> Result<Self>
    where
        F: FnMut(&LeafContext<'_, B>) -> std::result::Result<bool, BoxError> + Send + 'static,
    {
        Self::new(name, NodeKind::Condition(Condition::new(predicate)))
    }

    pub fn change_state(name: impl Into<String>, target: impl Into<String>) -> Result<Self> {
        Self::new(name, NodeKind::ChangeState(ChangeState::new(target)))
    }

    pub fn composite(name: impl Into<String>, composite: Composite<B>) -> Result<Self> {
        Self::new(name, NodeKind::Composite(composite))
    }

    pub fn decorator(name: impl Into<String>, decorator: Decorator<B>) -> Result<Self> {
        Self::new(name, NodeKind::Decorator(decorator))
    }

    /// Relevance of this node when its parent picks a random child.
    ///
    /// Negative and non-finite weights are treated as zero.
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Result of the last execution (or reset). Only meaningful when
    /// [`last_tick_id`](Self::last_tick_id) equals the current tick.
    pub fn last_result(&self) -> Status {
        self.last_result
    }

    pub fn last_tick_id(&self) -> u64 {
        self.last_tick_id
    }

    pub fn kind(&self) -> &NodeKind<B> {
        &self.kind
    }

    pub fn as_composite(&self) -> Option<&Composite<B>> {
        match &self.kind {
            NodeKind::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    pub fn as_decorator(&self) -> Option<&Decorator<B>> {
        match &self.kind {
            NodeKind::Decorator(decorator) => Some(decorator),
            _ => None,
        }
    }

    /// Child slots in declared order. Leaves have none.
    pub fn children(&self) -> &[Slot<B>] {
        match &self.kind {
            NodeKind::Composite(composite) => composite.children(),
            NodeKind::Decorator(decorator) => decorator.child_slot_slice(),
            _ => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Slot<B>] {
        match &mut self.kind {
            NodeKind::Composite(composite) => composite.children_mut(),
            NodeKind::Decorator(decorator) => decorator.child_slot_slice_mut(),
            _ => &mut [],
        }
    }

    /// Visits this node and its descendants in pre-order with their depth.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node<B>, usize)) {
        self.walk_at(0, visit);
    }

    fn walk_at<'a>(&'a self, depth: usize, visit: &mut impl FnMut(&'a Node<B>, usize)) {
        visit(self, depth);
        for slot in self.children() {
            slot.child().walk_at(depth + 1, visit);
        }
    }

    pub(crate) fn assign_ids(&mut self, next: &mut u32) {
        self.id = NodeId(*next);
        *next += 1;
        for slot in self.children_mut() {
            slot.child_mut().assign_ids(next);
        }
    }

    pub(crate) fn execute(&mut self, ctx: &mut TickContext, blackboard: &mut B) -> Status {
        let tick_id = ctx.tick_id();
        if self.last_result.is_running() && self.last_tick_id + 1 < tick_id {
            // left running on an older tick and never reset
            self.reset(ctx, blackboard);
        }
        let resuming = self.last_result.is_running();
        self.last_tick_id = tick_id;

        let outcome = match &mut self.kind {
            NodeKind::Action(action) => action.behave(ctx, blackboard),
            NodeKind::Condition(condition) => condition.behave(ctx, blackboard),
            NodeKind::ChangeState(change) => Ok(change.behave(ctx)),
            NodeKind::Decorator(decorator) => decorator.behave(resuming, ctx, blackboard),
            NodeKind::Composite(composite) => Ok(composite.behave(ctx, blackboard)),
        };

        let status = match outcome {
            Ok(status) => status,
            Err(source) => {
                tracing::debug!(node = %self.name, id = %self.id, tick = tick_id, error = %source, "callback failed");
                ctx.capture(CapturedError {
                    node: self.id,
                    node_name: self.name.clone(),
                    tick_id,
                    source,
                });
                Status::Failure
            }
        };

        tracing::trace!(node = %self.name, id = %self.id, %status, "executed");
        self.last_result = status;
        status
    }

    /// Fails out this node if it was left `Running` by an earlier tick.
    pub(crate) fn reset(&mut self, ctx: &mut TickContext, blackboard: &mut B) {
        self.invalidate(false, ctx, blackboard);
    }

    /// `force` fails out every `Running` node of this subtree, whatever tick it
    /// ran on.
    pub(crate) fn invalidate(&mut self, force: bool, ctx: &mut TickContext, blackboard: &mut B) {
        if !self.last_result.is_running() {
            return;
        }
        let abandoned = force || self.last_tick_id != ctx.tick_id();

        match &mut self.kind {
            NodeKind::Composite(composite) => composite.invalidate(abandoned, force, ctx, blackboard),
            NodeKind::Decorator(decorator) => decorator.invalidate(abandoned, force, ctx, blackboard),
            NodeKind::Action(action) if abandoned => action.abort(blackboard),
            _ => {}
        }

        if abandoned {
            tracing::trace!(node = %self.name, id = %self.id, "abandoned running node reset");
            self.last_result = Status::Failure;
        }
    }
}

impl<B> fmt::Debug for Node<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type", &self.node_type())
            .field("last_result", &self.last_result)
            .field("last_tick_id", &self.last_tick_id)
            .finish()
    }
}

impl<B> fmt::Display for Node<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.id)
    }
}
