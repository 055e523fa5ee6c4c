//! Builder utilities for ergonomic behavior tree construction.
//!
//! This module provides helper functions to reduce boilerplate when building
//! behavior trees. Instead of writing verbose
//! `Node::composite("patrol", Composite::sequence().child(a).child(b))`, you can
//! use shorter functions like `sequence("patrol", [a, b])`.
//!
//! Every helper validates the node name, so a tree assembled with `?` fails at
//! construction time rather than at tick time.

use crate::composite::Composite;
use crate::concurrent::ConcurrentPolicy;
use crate::context::LeafContext;
use crate::decorator::Decorator;
use crate::error::{BoxError, Result};
use crate::leaf::Action;
use crate::node::{Node, NodeKind};
use crate::{Behavior, Status};

/// Creates an action leaf from any [`Behavior`], closures included.
///
/// Shorthand for `Node::new(name, NodeKind::Action(Action::new(behavior)))`.
#[inline]
pub fn action<B>(name: impl Into<String>, behavior: impl Behavior<B> + 'static) -> Result<Node<B>> {
    Node::new(name, NodeKind::Action(Action::new(behavior)))
}

/// Creates a condition leaf.
#[inline]
pub fn condition<B, F>(name: impl Into<String>, predicate: F) -> Result<Node<B>>
where
    F: FnMut(&LeafContext<'_, B>) -> std::result::Result<bool, BoxError> + Send + 'static,
{
    Node::condition(name, predicate)
}

/// Creates a leaf that requests a transition to `target`.
#[inline]
pub fn change_state<B>(name: impl Into<String>, target: impl Into<String>) -> Result<Node<B>> {
    Node::change_state(name, target)
}

/// Creates a sequence node.
///
/// Shorthand for `Node::composite(name, Composite::sequence().children_from(children))`.
#[inline]
pub fn sequence<B>(
    name: impl Into<String>,
    children: impl IntoIterator<Item = Node<B>>,
) -> Result<Node<B>> {
    Node::composite(name, Composite::sequence().children_from(children))
}

/// Creates a loop node. `limit: None` repeats forever.
#[inline]
pub fn looping<B>(
    name: impl Into<String>,
    limit: Option<u32>,
    children: impl IntoIterator<Item = Node<B>>,
) -> Result<Node<B>> {
    Node::composite(name, Composite::looping(limit).children_from(children))
}

/// Creates a priority selector. Children are listed highest priority first.
#[inline]
pub fn priority<B>(
    name: impl Into<String>,
    children: impl IntoIterator<Item = Node<B>>,
) -> Result<Node<B>> {
    Node::composite(name, Composite::priority().children_from(children))
}

/// Creates a weighted random selector. See [`Node::with_weight`].
#[inline]
pub fn random<B>(
    name: impl Into<String>,
    children: impl IntoIterator<Item = Node<B>>,
) -> Result<Node<B>> {
    Node::composite(name, Composite::random().children_from(children))
}

/// Creates a concurrent node.
#[inline]
pub fn concurrent<B>(
    name: impl Into<String>,
    policy: ConcurrentPolicy,
    children: impl IntoIterator<Item = Node<B>>,
) -> Result<Node<B>> {
    Node::composite(name, Composite::concurrent(policy).children_from(children))
}

/// Creates an always-succeed node.
///
/// The child still runs; only a `Failure` result is replaced by `Success`.
#[inline]
pub fn always_succeed<B>(name: impl Into<String>, child: Node<B>) -> Result<Node<B>> {
    Node::decorator(name, Decorator::new().never_fail(true).child(child))
}

/// Creates a decorator that only starts `child` while `gate` holds.
#[inline]
pub fn guard<B, F>(name: impl Into<String>, gate: F, child: Node<B>) -> Result<Node<B>>
where
    F: FnMut(&LeafContext<'_, B>) -> std::result::Result<bool, BoxError> + Send + 'static,
{
    Node::decorator(name, Decorator::new().gate(gate).child(child))
}

/// An action that finishes immediately with `status`.
#[inline]
pub fn constant<B: 'static>(name: impl Into<String>, status: Status) -> Result<Node<B>> {
    action(name, move |_: &mut LeafContext<'_, B>| Ok(status))
}
