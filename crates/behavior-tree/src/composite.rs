//! Composite behavior nodes.
//!
//! Composite nodes control the execution flow of multiple child slots. Child
//! order is semantically load-bearing: it is the sequence order for
//! [`CompositePolicy::Sequence`] and [`CompositePolicy::Loop`], and the
//! priority rank for [`CompositePolicy::Priority`]. It is never reordered.
//!
//! Every policy checks the tick's interruption flag before visiting a child.
//! An interrupted composite stops, keeps its resumption point, and reports
//! `Running`, so the branch is either resumed next tick or reset as abandoned.

use rand::Rng;

use crate::Status;
use crate::concurrent::{ConcurrentPolicy, Tally};
use crate::context::TickContext;
use crate::node::{Node, NodeId};
use crate::slot::Slot;

/// Coordination policy of a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompositePolicy {
    /// Run children left to right until one fails (logical AND), resuming at
    /// the running child.
    Sequence,
    /// Like `Sequence`, restarting from the first child after a successful
    /// pass. `limit: None` loops forever.
    Loop { limit: Option<u32> },
    /// Re-evaluate children from the first every tick; the first child that
    /// does not fail wins (selector with interruption).
    Priority,
    /// Pick one child by weight and stick with it until it finishes.
    Random,
    /// Run every child each tick and fold the results.
    Concurrent(ConcurrentPolicy),
}

/// Outcome of a left-to-right pass.
enum Traversal {
    /// Every remaining child succeeded.
    Completed,
    /// A child failed or is still running, or the tick was interrupted.
    Stopped(Status),
}

/// Ordered children plus a coordination policy.
pub struct Composite<B> {
    children: Vec<Slot<B>>,
    policy: CompositePolicy,
    running_index: Option<usize>,
    loop_counter: u32,
}

impl<B> Composite<B> {
    pub fn new(policy: CompositePolicy) -> Self {
        let policy = match policy {
            CompositePolicy::Loop { limit } => CompositePolicy::Loop {
                limit: limit.map(|n| n.max(1)),
            },
            other => other,
        };
        Self {
            children: Vec::new(),
            policy,
            running_index: None,
            loop_counter: 0,
        }
    }

    pub fn sequence() -> Self {
        Self::new(CompositePolicy::Sequence)
    }

    /// `limit` is clamped to at least one pass; `None` loops forever.
    pub fn looping(limit: Option<u32>) -> Self {
        Self::new(CompositePolicy::Loop { limit })
    }

    pub fn priority() -> Self {
        Self::new(CompositePolicy::Priority)
    }

    pub fn random() -> Self {
        Self::new(CompositePolicy::Random)
    }

    pub fn concurrent(policy: ConcurrentPolicy) -> Self {
        Self::new(CompositePolicy::Concurrent(policy))
    }

    /// Appends a child. Remember to add children in priority order.
    pub fn child(mut self, child: Node<B>) -> Self {
        self.children.push(Slot::new(child));
        self
    }

    /// Appends a child slot carrying parameters or a concurrent role.
    pub fn slot(mut self, slot: Slot<B>) -> Self {
        self.children.push(slot);
        self
    }

    pub fn children_from(mut self, children: impl IntoIterator<Item = Node<B>>) -> Self {
        self.children.extend(children.into_iter().map(Slot::new));
        self
    }

    pub fn policy(&self) -> CompositePolicy {
        self.policy
    }

    pub fn children(&self) -> &[Slot<B>] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Slot<B>] {
        &mut self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Child to resume from next tick, if any.
    pub fn running_index(&self) -> Option<usize> {
        self.running_index
    }

    /// Completed passes of a loop composite since it last finished or failed.
    pub fn loop_counter(&self) -> u32 {
        self.loop_counter
    }

    /// Position of the child with the given id.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.children.iter().position(|slot| slot.child().id() == id)
    }

    /// Checks whether `second` is one of the next siblings of `first`.
    pub fn is_after(&self, first: NodeId, second: NodeId) -> bool {
        match (self.position(first), self.position(second)) {
            (Some(a), Some(b)) => b > a,
            _ => false,
        }
    }

    pub(crate) fn behave(&mut self, ctx: &mut TickContext, blackboard: &mut B) -> Status {
        match self.policy {
            CompositePolicy::Sequence => match self.traverse(ctx, blackboard) {
                Traversal::Completed => Status::Success,
                Traversal::Stopped(status) => status,
            },
            CompositePolicy::Loop { limit } => self.run_loop(limit, ctx, blackboard),
            CompositePolicy::Priority => self.run_priority(ctx, blackboard),
            CompositePolicy::Random => self.run_random(ctx, blackboard),
            CompositePolicy::Concurrent(policy) => self.run_concurrent(policy, ctx, blackboard),
        }
    }

    /// Left-to-right pass shared by `Sequence` and `Loop`.
    fn traverse(&mut self, ctx: &mut TickContext, blackboard: &mut B) -> Traversal {
        let start = self.running_index.unwrap_or(0);
        for index in start..self.children.len() {
            if ctx.is_interrupted() {
                self.running_index = Some(index);
                return Traversal::Stopped(Status::Running);
            }
            match self.children[index].execute(ctx, blackboard) {
                Status::Running => {
                    self.running_index = Some(index);
                    return Traversal::Stopped(Status::Running);
                }
                Status::Failure => {
                    self.running_index = None;
                    return Traversal::Stopped(Status::Failure);
                }
                Status::Success => self.running_index = None,
            }
        }
        Traversal::Completed
    }

    fn run_loop(&mut self, limit: Option<u32>, ctx: &mut TickContext, blackboard: &mut B) -> Status {
        match self.traverse(ctx, blackboard) {
            Traversal::Stopped(Status::Failure) => {
                // a failed pass does not count towards the limit
                self.loop_counter = 0;
                Status::Failure
            }
            Traversal::Stopped(status) => status,
            Traversal::Completed => {
                self.loop_counter = self.loop_counter.saturating_add(1);
                if let Some(limit) = limit
                    && self.loop_counter >= limit
                {
                    self.loop_counter = 0;
                    return Status::Success;
                }
                // restart from the first child on the next tick, never within this one
                self.running_index = None;
                Status::Running
            }
        }
    }

    fn run_priority(&mut self, ctx: &mut TickContext, blackboard: &mut B) -> Status {
        let previous = self.running_index;
        let mut winner = None;

        for index in 0..self.children.len() {
            if ctx.is_interrupted() {
                return Status::Running;
            }
            let status = self.children[index].execute(ctx, blackboard);
            if !status.is_failure() {
                winner = Some((index, status));
                break;
            }
        }

        let winner_index = winner.map(|(index, _)| index);
        if let Some(previous) = previous
            && winner_index != Some(previous)
        {
            self.release_previous_winner(previous, winner_index, ctx, blackboard);
        }

        match winner {
            Some((index, status)) => {
                self.running_index = status.is_running().then_some(index);
                status
            }
            None => {
                self.running_index = None;
                Status::Failure
            }
        }
    }

    /// Resets the branch that was running before priority moved elsewhere.
    fn release_previous_winner(
        &mut self,
        previous: usize,
        winner: Option<usize>,
        ctx: &mut TickContext,
        blackboard: &mut B,
    ) {
        let Some(slot) = self.children.get_mut(previous) else {
            return;
        };
        match winner {
            Some(winner) if winner < previous => tracing::debug!(
                from = slot.child().name(),
                ranks = previous - winner,
                "higher-priority child took over"
            ),
            Some(_) => tracing::debug!(from = slot.child().name(), "priority fell to a lower child"),
            None => tracing::debug!(from = slot.child().name(), "no child is eligible any more"),
        }
        slot.reset(ctx, blackboard);
    }

    fn run_random(&mut self, ctx: &mut TickContext, blackboard: &mut B) -> Status {
        let index = match self.running_index {
            Some(index) => index,
            None => match pick_weighted(&self.children, ctx) {
                Some(index) => {
                    tracing::debug!(child = self.children[index].child().name(), "random pick");
                    index
                }
                None => return Status::Failure,
            },
        };

        if ctx.is_interrupted() {
            self.running_index = Some(index);
            return Status::Running;
        }

        let status = self.children[index].execute(ctx, blackboard);
        // a finished child releases the pick; the next activation draws again
        self.running_index = status.is_running().then_some(index);
        status
    }

    fn run_concurrent(
        &mut self,
        policy: ConcurrentPolicy,
        ctx: &mut TickContext,
        blackboard: &mut B,
    ) -> Status {
        if self.children.is_empty() {
            return Status::Failure;
        }
        let mut tally = Tally::default();
        for slot in &mut self.children {
            if ctx.is_interrupted() {
                return Status::Running;
            }
            let status = slot.execute(ctx, blackboard);
            tally.record(slot.role(), status);
        }
        tally.fold(policy)
    }

    pub(crate) fn invalidate(
        &mut self,
        abandoned: bool,
        force: bool,
        ctx: &mut TickContext,
        blackboard: &mut B,
    ) {
        if abandoned {
            self.running_index = None;
            self.loop_counter = 0;
        }
        for slot in &mut self.children {
            slot.invalidate(force, ctx, blackboard);
        }
    }
}

/// Weighted draw over the children's weights. `None` when no child has a
/// positive weight.
fn pick_weighted<B>(children: &[Slot<B>], ctx: &mut TickContext) -> Option<usize> {
    // f64 so that many f32::MAX weights cannot overflow the total
    let total: f64 = children.iter().map(|slot| f64::from(slot.child().weight())).sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    let mut roll = ctx.rng().gen_range(0.0..total);
    for (index, slot) in children.iter().enumerate() {
        let weight = f64::from(slot.child().weight());
        if roll < weight {
            return Some(index);
        }
        roll -= weight;
    }
    // float rounding can leave a sliver past the last bucket
    children.iter().rposition(|slot| slot.child().weight() > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessKeys;
    use crate::config::DriverConfig;
    use crate::context::LeafContext;
    use crate::concurrent::{ChildRole, FailurePolicy, SuccessPolicy};

    #[derive(Default)]
    struct Log {
        visited: Vec<String>,
    }

    /// Action that records its name and replays `script`, repeating the last
    /// entry once the script is exhausted.
    fn scripted(name: &str, script: Vec<Status>) -> Node<Log> {
        let label = name.to_owned();
        let mut step = 0;
        Node::action(name, move |ctx: &mut LeafContext<'_, Log>| {
            ctx.blackboard_mut().visited.push(label.clone());
            let status = script[step.min(script.len() - 1)];
            step += 1;
            Ok(status)
        })
        .unwrap()
    }

    fn always(name: &str, status: Status) -> Node<Log> {
        scripted(name, vec![status])
    }

    struct Harness {
        ctx: TickContext,
        log: Log,
        root: Slot<Log>,
    }

    impl Harness {
        fn new(composite: Composite<Log>) -> Self {
            let mut root = Node::composite("root", composite).unwrap();
            root.assign_ids(&mut 0);
            Self {
                ctx: TickContext::new(&DriverConfig::default().with_seed(11), AccessKeys::new()),
                log: Log::default(),
                root: Slot::new(root),
            }
        }

        fn tick(&mut self) -> Status {
            self.log.visited.clear();
            self.ctx.begin();
            self.root.execute(&mut self.ctx, &mut self.log)
        }

        fn composite(&self) -> &Composite<Log> {
            self.root.child().as_composite().unwrap()
        }

        fn child(&self, index: usize) -> &Node<Log> {
            self.composite().children()[index].child()
        }

        fn visited(&self) -> Vec<&str> {
            self.log.visited.iter().map(String::as_str).collect()
        }
    }

    #[test]
    fn sequence_all_success() {
        let mut h = Harness::new(
            Composite::sequence()
                .child(always("a", Status::Success))
                .child(always("b", Status::Success)),
        );
        assert_eq!(h.tick(), Status::Success);
        assert_eq!(h.visited(), vec!["a", "b"]);
    }

    #[test]
    fn empty_sequence_succeeds() {
        let mut h = Harness::new(Composite::sequence());
        assert_eq!(h.tick(), Status::Success);
    }

    #[test]
    fn sequence_fails_on_first_failure() {
        let mut h = Harness::new(
            Composite::sequence()
                .child(always("a", Status::Success))
                .child(always("b", Status::Failure))
                .child(always("c", Status::Success)),
        );
        assert_eq!(h.tick(), Status::Failure);
        assert_eq!(h.visited(), vec!["a", "b"]);
        assert_eq!(h.child(2).last_tick_id(), 0);
        assert_eq!(h.composite().running_index(), None);
    }

    #[test]
    fn sequence_resumes_at_running_child() {
        let mut h = Harness::new(
            Composite::sequence()
                .child(always("a", Status::Success))
                .child(scripted("b", vec![Status::Running, Status::Running, Status::Success]))
                .child(always("c", Status::Success)),
        );
        assert_eq!(h.tick(), Status::Running);
        assert_eq!(h.composite().running_index(), Some(1));

        assert_eq!(h.tick(), Status::Running);
        assert_eq!(h.visited(), vec!["b"]);

        assert_eq!(h.tick(), Status::Success);
        assert_eq!(h.visited(), vec!["b", "c"]);
        assert_eq!(h.composite().running_index(), None);
    }

    #[test]
    fn loop_wraps_until_limit() {
        let mut h = Harness::new(
            Composite::looping(Some(3))
                .child(always("a", Status::Success))
                .child(always("b", Status::Success)),
        );
        assert_eq!(h.tick(), Status::Running);
        assert_eq!(h.composite().loop_counter(), 1);
        assert_eq!(h.tick(), Status::Running);
        assert_eq!(h.composite().loop_counter(), 2);
        assert_eq!(h.tick(), Status::Success);
        assert_eq!(h.composite().loop_counter(), 0);
        // a single pass per tick, never re-entered within the same tick
        assert_eq!(h.visited(), vec!["a", "b"]);
    }

    #[test]
    fn loop_failure_resets_counter() {
        let mut h = Harness::new(
            Composite::looping(Some(5))
                .child(always("a", Status::Success))
                .child(scripted("b", vec![Status::Success, Status::Failure])),
        );
        assert_eq!(h.tick(), Status::Running);
        assert_eq!(h.composite().loop_counter(), 1);
        assert_eq!(h.tick(), Status::Failure);
        assert_eq!(h.composite().loop_counter(), 0);
    }

    #[test]
    fn infinite_loop_keeps_running() {
        let mut h = Harness::new(Composite::looping(None).child(always("a", Status::Success)));
        for _ in 0..10 {
            assert_eq!(h.tick(), Status::Running);
        }
        assert_eq!(h.composite().loop_counter(), 10);
    }

    #[test]
    fn priority_takes_first_non_failing_child() {
        let mut h = Harness::new(
            Composite::priority()
                .child(always("flee", Status::Failure))
                .child(always("attack", Status::Success))
                .child(always("idle", Status::Success)),
        );
        assert_eq!(h.tick(), Status::Success);
        assert_eq!(h.visited(), vec!["flee", "attack"]);
    }

    #[test]
    fn priority_fails_when_all_fail() {
        let mut h = Harness::new(
            Composite::priority()
                .child(always("a", Status::Failure))
                .child(always("b", Status::Failure)),
        );
        assert_eq!(h.tick(), Status::Failure);
    }

    #[test]
    fn priority_resets_previous_winner_when_higher_child_takes_over() {
        let mut h = Harness::new(
            Composite::priority()
                .child(scripted("alert", vec![Status::Failure, Status::Running]))
                .child(always("patrol", Status::Running)),
        );
        assert_eq!(h.tick(), Status::Running);
        assert_eq!(h.composite().running_index(), Some(1));
        assert_eq!(h.child(1).last_result(), Status::Running);

        assert_eq!(h.tick(), Status::Running);
        assert_eq!(h.visited(), vec!["alert"]);
        assert_eq!(h.composite().running_index(), Some(0));
        assert_eq!(h.child(1).last_result(), Status::Failure);
        assert_eq!(h.composite().children()[1].cached_result(), Status::Failure);
    }

    #[test]
    fn is_after_follows_declared_order() {
        let h = Harness::new(
            Composite::priority()
                .child(always("a", Status::Failure))
                .child(always("b", Status::Failure)),
        );
        let (a, b) = (h.child(0).id(), h.child(1).id());
        assert!(h.composite().is_after(a, b));
        assert!(!h.composite().is_after(b, a));
        assert!(!h.composite().is_after(a, NodeId(99)));
    }

    #[test]
    fn random_sticks_with_running_pick() {
        let mut h = Harness::new(
            Composite::random()
                .child(scripted("a", vec![Status::Running, Status::Success]))
                .child(scripted("b", vec![Status::Running, Status::Success])),
        );
        assert_eq!(h.tick(), Status::Running);
        let first = h.visited()[0].to_owned();
        assert_eq!(h.tick(), Status::Success);
        assert_eq!(h.visited(), vec![first.as_str()]);
        assert_eq!(h.composite().running_index(), None);
    }

    #[test]
    fn random_never_picks_zero_weight_children() {
        let mut h = Harness::new(
            Composite::random()
                .child(always("never", Status::Success).with_weight(0.0))
                .child(always("always", Status::Success).with_weight(2.0)),
        );
        for _ in 0..20 {
            assert_eq!(h.tick(), Status::Success);
            assert_eq!(h.visited(), vec!["always"]);
        }
    }

    #[test]
    fn random_without_weight_fails() {
        let mut h = Harness::new(
            Composite::random().child(always("a", Status::Success).with_weight(-1.0)),
        );
        assert_eq!(h.tick(), Status::Failure);
        assert!(h.visited().is_empty());
    }

    #[test]
    fn random_handles_huge_weights() {
        let mut h = Harness::new(
            Composite::random()
                .child(always("a", Status::Success).with_weight(f32::MAX))
                .child(always("b", Status::Success).with_weight(f32::MAX))
                .child(always("c", Status::Success).with_weight(f32::MAX)),
        );
        for _ in 0..10 {
            assert_eq!(h.tick(), Status::Success);
            assert_eq!(h.visited().len(), 1);
        }
    }

    #[test]
    fn unbounded_loop_counter_saturates() {
        let mut composite = Composite::looping(None).child(always("a", Status::Success));
        composite.loop_counter = u32::MAX - 1;
        let mut h = Harness::new(composite);
        assert_eq!(h.tick(), Status::Running);
        assert_eq!(h.tick(), Status::Running);
        assert_eq!(h.composite().loop_counter(), u32::MAX);
    }

    #[test]
    fn concurrent_visits_every_child() {
        let mut h = Harness::new(
            Composite::concurrent(ConcurrentPolicy::default())
                .child(always("a", Status::Failure))
                .child(always("b", Status::Running))
                .child(always("c", Status::Success)),
        );
        assert_eq!(h.tick(), Status::Running);
        assert_eq!(h.visited(), vec!["a", "b", "c"]);
    }

    #[test]
    fn concurrent_required_child_fails_group() {
        let mut h = Harness::new(
            Composite::concurrent(ConcurrentPolicy::new(
                FailurePolicy::FailOnAll,
                SuccessPolicy::SucceedOnAll,
            ))
            .slot(Slot::new(always("guard", Status::Failure)).with_role(ChildRole::Required))
            .child(always("work", Status::Running)),
        );
        assert_eq!(h.tick(), Status::Failure);
        assert_eq!(h.visited(), vec!["guard", "work"]);
    }

    #[test]
    fn empty_concurrent_fails() {
        let mut h = Harness::new(Composite::concurrent(ConcurrentPolicy::default()));
        assert_eq!(h.tick(), Status::Failure);
    }

    #[test]
    fn interruption_stops_siblings_and_keeps_cursor() {
        let mut h = Harness::new(
            Composite::sequence()
                .child(always("a", Status::Success))
                .child(
                    Node::action("stop", |ctx: &mut LeafContext<'_, Log>| {
                        ctx.blackboard_mut().visited.push("stop".into());
                        ctx.interrupt();
                        Ok(Status::Success)
                    })
                    .unwrap(),
                )
                .child(always("c", Status::Success)),
        );
        assert_eq!(h.tick(), Status::Running);
        assert_eq!(h.visited(), vec!["a", "stop"]);
        assert_eq!(h.composite().running_index(), Some(2));
        assert_eq!(h.child(2).last_tick_id(), 0);

        assert_eq!(h.tick(), Status::Success);
        assert_eq!(h.visited(), vec!["c"]);
    }

    #[test]
    fn abandoned_loop_restarts_count() {
        let mut h = Harness::new(
            Composite::looping(Some(4))
                .child(always("a", Status::Success)),
        );
        h.tick();
        h.tick();
        assert_eq!(h.composite().loop_counter(), 2);

        // skip a tick entirely: the loop's running result is now stale
        h.ctx.begin();
        h.ctx.begin();
        h.root.reset(&mut h.ctx, &mut h.log);
        assert_eq!(h.root.child().last_result(), Status::Failure);
        assert_eq!(h.composite().loop_counter(), 0);
    }
}
