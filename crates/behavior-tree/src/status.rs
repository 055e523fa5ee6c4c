//! Status returned by behavior nodes.

use std::fmt;

/// The result of executing a behavior node for one tick.
///
/// # Resumable Semantics
///
/// Long-running work is expressed by returning [`Status::Running`]: the node
/// keeps its progress and is re-entered on the next tick instead of being
/// restarted. A `Running` result is only meaningful for the tick that produced
/// it; a node left `Running` while the tree moved elsewhere is treated as
/// abandoned and reset to `Failure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    /// The behavior completed successfully.
    ///
    /// For conditions: The condition was met.
    /// For actions: The action finished its work.
    Success,

    /// The behavior failed, or has never run.
    ///
    /// For conditions: The condition was not met.
    /// For actions: The action could not be carried out (or raised an error).
    #[default]
    Failure,

    /// The behavior needs more ticks to finish.
    Running,
}

impl Status {
    /// Returns `true` if this status is `Success`.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    /// Returns `true` if this status is `Failure`.
    #[inline]
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failure)
    }

    /// Returns `true` if this status is `Running`.
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, Status::Running)
    }

    /// Returns `true` for `Success` and `Failure`.
    #[inline]
    pub fn is_done(self) -> bool {
        !self.is_running()
    }

    /// Inverts the status: Success becomes Failure and vice versa.
    ///
    /// `Running` is left untouched, an unfinished behavior has no truth value yet.
    #[inline]
    pub fn invert(self) -> Self {
        match self {
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
            Status::Running => Status::Running,
        }
    }

    /// Builds a status from a predicate outcome.
    #[inline]
    pub fn from_bool(value: bool) -> Self {
        if value { Status::Success } else { Status::Failure }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Success => "Success",
            Status::Failure => "Failure",
            Status::Running => "Running",
        };
        f.write_str(label)
    }
}
