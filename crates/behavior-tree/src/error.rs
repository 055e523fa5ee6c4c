//! Error types raised while building trees and captured while ticking them.
//!
//! Construction problems surface immediately as [`BuildError`]. Errors raised
//! by user callbacks never escape a tick: they are wrapped in a
//! [`CapturedError`], stored on the tick context for host diagnostics, and the
//! failing node simply reports `Failure`.

use thiserror::Error;

use crate::node::NodeId;

/// Error type returned by user-supplied leaf callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced while constructing nodes or assembling a driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("behavior node name must not be empty")]
    EmptyName,

    #[error("state name must not be empty")]
    EmptyStateName,

    #[error("change-state node `{node}` has an empty target state")]
    EmptyTransitionTarget { node: String },

    #[error("access key name must not be empty")]
    EmptyAccessKey,

    #[error("behavior tree requires at least one state")]
    NoStates,

    #[error("state `{0}` is registered more than once")]
    DuplicateState(String),

    #[error("default state `{0}` is not registered")]
    UnknownDefaultState(String),

    #[error("access key `{0}` is registered more than once")]
    DuplicateAccessKey(String),
}

pub type Result<T> = std::result::Result<T, BuildError>;

/// A callback error caught at a node boundary during a tick.
#[derive(Debug, Error)]
#[error("node `{node_name}` ({node}) failed on tick {tick_id}: {source}")]
pub struct CapturedError {
    pub node: NodeId,
    pub node_name: String,
    pub tick_id: u64,
    #[source]
    pub source: BoxError,
}
