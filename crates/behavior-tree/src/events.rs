//! Topic-based notifications published by a [`TreeDriver`](crate::TreeDriver).
//!
//! Observers are plain callbacks registered per topic. They run synchronously
//! at the end of the tick that produced the event, after the tree has settled,
//! so an observer always sees the driver's final state for that tick.

/// Topics for event routing.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Topic {
    /// Fired after every tick.
    Updated,
    /// Fired whenever the active state changes.
    StateChanged,
}

/// Event published to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TreeEvent {
    Updated { tick_id: u64, status: crate::Status },
    StateChanged { previous: String, next: String },
}

impl TreeEvent {
    pub fn topic(&self) -> Topic {
        match self {
            TreeEvent::Updated { .. } => Topic::Updated,
            TreeEvent::StateChanged { .. } => Topic::StateChanged,
        }
    }
}

/// Handle returned by [`TreeDriver::subscribe`](crate::TreeDriver::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&TreeEvent) + Send>;

struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    callback: Callback,
}

/// Registered observers, notified in subscription order.
#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl Observers {
    pub(crate) fn subscribe(
        &mut self,
        topic: Topic,
        callback: impl FnMut(&TreeEvent) + Send + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            topic,
            callback: Box::new(callback),
        });
        id
    }

    /// Returns `false` if the subscription was already gone.
    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|sub| sub.id != id);
        self.subscriptions.len() != before
    }

    pub(crate) fn publish(&mut self, event: &TreeEvent) {
        let topic = event.topic();
        let mut delivered = 0usize;
        for sub in self.subscriptions.iter_mut().filter(|sub| sub.topic == topic) {
            (sub.callback)(event);
            delivered += 1;
        }
        if delivered == 0 {
            tracing::trace!(?topic, "no observers for topic");
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.subscriptions.len()
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("subscriptions", &self.len())
            .finish()
    }
}
