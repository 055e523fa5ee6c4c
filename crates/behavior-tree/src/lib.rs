//! Tick-driven behavior tree engine with a state-machine overlay.
//!
//! The host calls [`TreeDriver::tick`] once per simulation step. Each tick
//! walks the active state's tree depth-first, resumes long-running actions
//! where they left off, and invalidates branches that were abandoned because
//! something with higher priority took over.
//!
//! - **Resumable**: `Running` nodes continue next tick instead of restarting
//! - **Contained failures**: callback errors become `Failure` and are kept on
//!   the tick context for diagnostics, never unwinding through the tree
//! - **Deterministic**: weighted random choices draw from a seedable RNG owned
//!   by the driver
//! - **Observable**: per-tick execution trace, read-only inspector, and
//!   state-change notifications
//!
//! # Architecture
//!
//! - [`Node`]: identity and last result, plus a [`NodeKind`] variant
//! - Leaves: [`Action`] (user [`Behavior`]), [`Condition`], [`ChangeState`]
//! - [`Composite`]: ordered [`Slot`]s under a [`CompositePolicy`]
//! - [`Decorator`]: gated single child with `never_fail` and access keys
//! - [`TickContext`]: per-tick state shared by every node
//! - [`TreeDriver`]: named states, transitions, observers
//! - [`TreeInspector`]: passive view for debuggers
//!
//! # Example
//!
//! ```
//! use behavior_tree::builder::{change_state, constant, priority, sequence, condition};
//! use behavior_tree::{LeafContext, Status, TreeDriver};
//!
//! struct Guard { sees_enemy: bool }
//!
//! let patrol = priority("patrol", [
//!     sequence("spot", [
//!         condition("enemy", |ctx: &LeafContext<'_, Guard>| Ok(ctx.blackboard().sees_enemy))?,
//!         change_state("engage", "Combat")?,
//!     ])?,
//!     constant("walk", Status::Running)?,
//! ])?;
//! let combat = constant("fight", Status::Running)?;
//!
//! let mut driver = TreeDriver::builder()
//!     .state("Patrol", patrol)
//!     .state("Combat", combat)
//!     .build()?;
//!
//! let mut guard = Guard { sees_enemy: false };
//! assert_eq!(driver.tick(&mut guard), Status::Running);
//! guard.sees_enemy = true;
//! driver.tick(&mut guard);
//! assert_eq!(driver.active_state(), "Combat");
//! # Ok::<(), behavior_tree::BuildError>(())
//! ```

pub mod access;
pub mod behavior;
pub mod builder;
pub mod composite;
pub mod concurrent;
pub mod config;
pub mod context;
pub mod decorator;
pub mod driver;
pub mod error;
pub mod events;
pub mod inspect;
pub mod leaf;
pub mod node;
pub mod params;
pub mod slot;
pub mod status;
pub mod validate;

// Re-export core types for ergonomic API
pub use access::{AccessKey, AccessKeys, CooldownKey, CounterLimitKey};
pub use behavior::Behavior;
pub use composite::{Composite, CompositePolicy};
pub use concurrent::{ChildRole, ConcurrentPolicy, FailurePolicy, SuccessPolicy};
pub use config::DriverConfig;
pub use context::{CancelHandle, LeafContext, TickContext, TraceEntry};
pub use decorator::Decorator;
pub use driver::{TreeDriver, TreeDriverBuilder};
pub use error::{BoxError, BuildError, CapturedError, Result};
pub use events::{SubscriptionId, Topic, TreeEvent};
pub use inspect::{TraceView, TreeInspector};
pub use leaf::{Action, ChangeState, Condition, Predicate};
pub use node::{Node, NodeId, NodeKind, NodeType};
pub use params::{ParamValue, Parameters};
pub use slot::Slot;
pub use status::Status;
pub use validate::ConfigIssue;
