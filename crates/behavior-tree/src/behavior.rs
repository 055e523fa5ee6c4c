//! Core behavior trait.
//!
//! This module defines the [`Behavior`] trait, the user-implemented part of an
//! action leaf. The trait is generic over a blackboard type `B`, allowing
//! actions to read and modify the host agent's state while the engine owns
//! all bookkeeping (results, tick ids, resumption, reset).

use crate::context::LeafContext;
use crate::error::BoxError;
use crate::Status;

/// Work performed by an action leaf.
pub trait Behavior<B>: Send {
    /// Perform one step of the action.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Access to the blackboard, the active parameters and the
    ///   current tick id.
    ///
    /// # Returns
    ///
    /// - `Ok(Status::Success)` if the action finished
    /// - `Ok(Status::Failure)` if the action could not be carried out
    /// - `Ok(Status::Running)` if the action wants to be continued next tick
    /// - `Err(_)` if something went wrong; the engine records the error and
    ///   treats the result as `Failure`
    fn tick(&mut self, ctx: &mut LeafContext<'_, B>) -> Result<Status, BoxError>;

    /// Called when a `Running` action is abandoned because the tree moved on
    /// (a higher-priority branch won, or the state changed).
    fn abort(&mut self, _blackboard: &mut B) {}
}

/// Blanket implementation for closures.
///
/// Any `FnMut(&mut LeafContext<B>) -> Result<Status, BoxError>` can be used
/// directly as an action body.
impl<B, F> Behavior<B> for F
where
    F: FnMut(&mut LeafContext<'_, B>) -> Result<Status, BoxError> + Send,
{
    #[inline]
    fn tick(&mut self, ctx: &mut LeafContext<'_, B>) -> Result<Status, BoxError> {
        self(ctx)
    }
}
