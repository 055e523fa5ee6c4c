//! Aggregation rules for concurrent composites.
//!
//! A concurrent composite runs every child each tick and then folds the
//! children's results into one. Two group-wide policies and one per-child
//! [`ChildRole`] decide how that fold behaves.

use crate::Status;

/// When the group is considered failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailurePolicy {
    /// Fail as soon as one counted child fails.
    FailOnOne,
    /// Fail only when every counted child failed.
    #[default]
    FailOnAll,
}

/// When the group is considered succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SuccessPolicy {
    /// One succeeding counted child is enough, even while others still run.
    SucceedOnOne,
    /// Succeed once no counted child is running any more.
    #[default]
    SucceedOnAll,
}

/// Group-wide policies of a concurrent composite.
///
/// If both a failure and a success condition trigger on the same tick,
/// failure wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConcurrentPolicy {
    pub failure: FailurePolicy,
    pub success: SuccessPolicy,
}

impl ConcurrentPolicy {
    pub const fn new(failure: FailurePolicy, success: SuccessPolicy) -> Self {
        Self { failure, success }
    }
}

/// How one child's result contributes to a concurrent aggregate.
///
/// Outside concurrent composites the role is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChildRole {
    /// Counted by the group policies.
    #[default]
    Normal,
    /// Its failure fails the whole group.
    Required,
    /// Its success succeeds the group, unless a required child failed.
    Sufficient,
    /// Runs with the group but never affects the aggregate.
    Informational,
}

/// Running counts of one concurrent tick.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    counted: usize,
    successes: usize,
    failures: usize,
    running: usize,
    required_failed: bool,
    sufficient_succeeded: bool,
}

impl Tally {
    pub(crate) fn record(&mut self, role: ChildRole, status: Status) {
        match role {
            ChildRole::Informational => return,
            ChildRole::Required if status.is_failure() => self.required_failed = true,
            ChildRole::Sufficient if status.is_success() => self.sufficient_succeeded = true,
            _ => {}
        }
        self.counted += 1;
        match status {
            Status::Success => self.successes += 1,
            Status::Failure => self.failures += 1,
            Status::Running => self.running += 1,
        }
    }

    pub(crate) fn fold(&self, policy: ConcurrentPolicy) -> Status {
        if self.required_failed {
            return Status::Failure;
        }
        let failed = match policy.failure {
            FailurePolicy::FailOnOne => self.failures > 0,
            FailurePolicy::FailOnAll => self.counted > 0 && self.failures == self.counted,
        };
        if failed {
            return Status::Failure;
        }
        if self.sufficient_succeeded {
            return Status::Success;
        }
        if policy.success == SuccessPolicy::SucceedOnOne && self.successes > 0 {
            return Status::Success;
        }
        if self.running > 0 {
            return Status::Running;
        }
        Status::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(policy: ConcurrentPolicy, results: &[(ChildRole, Status)]) -> Status {
        let mut tally = Tally::default();
        for (role, status) in results {
            tally.record(*role, *status);
        }
        tally.fold(policy)
    }

    const NORMAL: ChildRole = ChildRole::Normal;

    #[test]
    fn default_policy_fails_only_when_all_fail() {
        let policy = ConcurrentPolicy::default();
        assert_eq!(
            fold(policy, &[(NORMAL, Status::Failure), (NORMAL, Status::Failure)]),
            Status::Failure
        );
        assert_eq!(
            fold(policy, &[(NORMAL, Status::Failure), (NORMAL, Status::Success)]),
            Status::Success
        );
    }

    #[test]
    fn running_outranks_success() {
        let policy = ConcurrentPolicy::default();
        assert_eq!(
            fold(policy, &[(NORMAL, Status::Success), (NORMAL, Status::Running)]),
            Status::Running
        );
    }

    #[test]
    fn fail_on_one_beats_succeed_on_one() {
        let policy = ConcurrentPolicy::new(FailurePolicy::FailOnOne, SuccessPolicy::SucceedOnOne);
        assert_eq!(
            fold(policy, &[(NORMAL, Status::Success), (NORMAL, Status::Failure)]),
            Status::Failure
        );
        assert_eq!(
            fold(policy, &[(NORMAL, Status::Success), (NORMAL, Status::Running)]),
            Status::Success
        );
    }

    #[test]
    fn required_failure_overrides_everything() {
        let policy = ConcurrentPolicy::default();
        assert_eq!(
            fold(
                policy,
                &[
                    (ChildRole::Required, Status::Failure),
                    (ChildRole::Sufficient, Status::Success),
                    (NORMAL, Status::Running),
                ]
            ),
            Status::Failure
        );
    }

    #[test]
    fn sufficient_success_ends_running_group() {
        let policy = ConcurrentPolicy::default();
        assert_eq!(
            fold(
                policy,
                &[(ChildRole::Sufficient, Status::Success), (NORMAL, Status::Running)]
            ),
            Status::Success
        );
    }

    #[test]
    fn informational_children_are_ignored() {
        let policy = ConcurrentPolicy::new(FailurePolicy::FailOnOne, SuccessPolicy::SucceedOnAll);
        assert_eq!(
            fold(
                policy,
                &[(ChildRole::Informational, Status::Failure), (NORMAL, Status::Success)]
            ),
            Status::Success
        );
        assert_eq!(
            fold(policy, &[(ChildRole::Informational, Status::Running)]),
            Status::Success
        );
    }
}
