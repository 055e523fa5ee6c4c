//! Read-only view of a driver for debuggers and host tooling.
//!
//! A [`TreeInspector`] borrows the driver immutably, so no mutation can happen
//! through it and the borrow checker rules out inspecting a tree mid-tick.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::Status;
use crate::context::TickContext;
use crate::error::CapturedError;
use crate::node::{Node, NodeId};

/// One visited slot of the last tick, resolved to its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceView<'a> {
    pub id: NodeId,
    pub name: &'a str,
    pub depth: u16,
    pub result: Status,
}

/// Passive view over the active state of a [`TreeDriver`](crate::TreeDriver).
pub struct TreeInspector<'a, B> {
    state: &'a str,
    root: &'a Node<B>,
    ctx: &'a TickContext,
    nodes: HashMap<NodeId, &'a Node<B>>,
}

impl<'a, B> TreeInspector<'a, B> {
    pub(crate) fn new(state: &'a str, root: &'a Node<B>, ctx: &'a TickContext) -> Self {
        let mut nodes = HashMap::new();
        root.walk(&mut |node: &'a Node<B>, _depth: usize| {
            nodes.insert(node.id(), node);
        });
        Self {
            state,
            root,
            ctx,
            nodes,
        }
    }

    pub fn state(&self) -> &'a str {
        self.state
    }

    pub fn root(&self) -> &'a Node<B> {
        self.root
    }

    pub fn tick_id(&self) -> u64 {
        self.ctx.tick_id()
    }

    pub fn node(&self, id: NodeId) -> Option<&'a Node<B>> {
        self.nodes.get(&id).copied()
    }

    /// First node with the given name, in pre-order.
    pub fn find(&self, name: &str) -> Option<&'a Node<B>> {
        let mut found = None;
        self.root.walk(&mut |node: &'a Node<B>, _depth: usize| {
            if found.is_none() && node.name() == name {
                found = Some(node);
            }
        });
        found
    }

    /// Whether the node was visited during the last tick.
    pub fn is_on_path(&self, id: NodeId) -> bool {
        self.ctx.trace().iter().any(|entry| entry.node == id)
    }

    pub fn last_result(&self, id: NodeId) -> Option<Status> {
        self.node(id).map(Node::last_result)
    }

    pub fn last_tick_id(&self, id: NodeId) -> Option<u64> {
        self.node(id).map(Node::last_tick_id)
    }

    /// Visited slots of the last tick, in visit order.
    pub fn trace(&self) -> impl Iterator<Item = TraceView<'a>> + '_ {
        self.ctx.trace().iter().filter_map(|entry| {
            let node = self.node(entry.node)?;
            Some(TraceView {
                id: entry.node,
                name: node.name(),
                depth: entry.depth,
                result: node.last_result(),
            })
        })
    }

    pub fn trace_truncated(&self) -> bool {
        self.ctx.trace_truncated()
    }

    pub fn captured_error(&self) -> Option<&'a CapturedError> {
        self.ctx.captured_error()
    }

    /// Indented dump of the last tick's execution path.
    ///
    /// ```text
    /// tick 3 [Patrol]
    /// root #0: Running
    ///   walk #1: Running
    /// ```
    pub fn render_trace(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "tick {} [{}]", self.tick_id(), self.state);
        for view in self.trace() {
            let indent = usize::from(view.depth) * 2;
            let _ = writeln!(
                out,
                "{:indent$}{} {}: {}",
                "",
                view.name,
                view.id,
                view.result,
                indent = indent
            );
        }
        if self.trace_truncated() {
            out.push_str("...\n");
        }
        out
    }
}
