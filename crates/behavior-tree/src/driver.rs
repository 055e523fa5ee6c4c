//! Tree driver and state overlay.
//!
//! A [`TreeDriver`] owns a set of named states, each a root node, and ticks
//! the active one. A `ChangeState` leaf requests a transition; the driver
//! applies it once the tick has unwound, so a state's tree is never swapped
//! out while it is still executing.
//!
//! One driver per agent. Drivers share nothing, so independent agents may be
//! ticked in parallel.

use std::collections::HashMap;

use crate::Status;
use crate::access::{AccessKey, AccessKeys};
use crate::config::DriverConfig;
use crate::context::{CancelHandle, TickContext};
use crate::error::{BuildError, CapturedError, Result};
use crate::events::{Observers, SubscriptionId, Topic, TreeEvent};
use crate::inspect::TreeInspector;
use crate::node::Node;
use crate::slot::Slot;
use crate::validate::{ConfigIssue, validate_state};

struct State<B> {
    name: String,
    root: Slot<B>,
}

/// Builder for [`TreeDriver`].
pub struct TreeDriverBuilder<B> {
    config: DriverConfig,
    states: Vec<State<B>>,
    default_state: Option<String>,
    access_keys: Vec<Box<dyn AccessKey>>,
}

impl<B> Default for TreeDriverBuilder<B> {
    fn default() -> Self {
        Self {
            config: DriverConfig::default(),
            states: Vec::new(),
            default_state: None,
            access_keys: Vec::new(),
        }
    }
}

impl<B> TreeDriverBuilder<B> {
    pub fn config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a named state. States are kept in registration order.
    pub fn state(mut self, name: impl Into<String>, root: Node<B>) -> Self {
        self.states.push(State {
            name: name.into(),
            root: Slot::new(root),
        });
        self
    }

    /// State the driver starts in and returns to on [`TreeDriver::reset`].
    /// Defaults to the first registered state.
    pub fn default_state(mut self, name: impl Into<String>) -> Self {
        self.default_state = Some(name.into());
        self
    }

    pub fn access_key(mut self, key: impl AccessKey + 'static) -> Self {
        self.access_keys.push(Box::new(key));
        self
    }

    pub fn build(self) -> Result<TreeDriver<B>> {
        let Self {
            config,
            mut states,
            default_state,
            access_keys,
        } = self;

        if states.is_empty() {
            return Err(BuildError::NoStates);
        }

        let mut index = HashMap::with_capacity(states.len());
        for (position, state) in states.iter().enumerate() {
            if state.name.is_empty() {
                return Err(BuildError::EmptyStateName);
            }
            if index.insert(state.name.clone(), position).is_some() {
                return Err(BuildError::DuplicateState(state.name.clone()));
            }
        }

        let default = match default_state {
            Some(name) => *index
                .get(&name)
                .ok_or(BuildError::UnknownDefaultState(name))?,
            None => 0,
        };

        let mut keys = AccessKeys::new();
        for key in access_keys {
            keys.insert(key)?;
        }

        let mut next_id = 0;
        for state in &mut states {
            state.root.child_mut().assign_ids(&mut next_id);
        }

        let mut ctx = TickContext::new(&config, keys);
        ctx.set_active_state(&states[default].name);
        ctx.set_known_states(states.iter().map(|state| state.name.as_str()));

        tracing::debug!(
            states = states.len(),
            nodes = next_id,
            default = %states[default].name,
            "behavior tree built"
        );

        Ok(TreeDriver {
            states,
            index,
            active: default,
            ticked: default,
            default_state: default,
            ctx,
            status: Status::Failure,
            config,
            observers: Observers::default(),
        })
    }
}

/// Ticks the active state of one agent and switches states on request.
pub struct TreeDriver<B> {
    states: Vec<State<B>>,
    index: HashMap<String, usize>,
    active: usize,
    /// State the last tick ran in; differs from `active` right after a transition.
    ticked: usize,
    default_state: usize,
    ctx: TickContext,
    status: Status,
    config: DriverConfig,
    observers: Observers,
}

impl<B> TreeDriver<B> {
    pub fn builder() -> TreeDriverBuilder<B> {
        TreeDriverBuilder::default()
    }

    /// Runs one tick of the active state and returns its root result.
    ///
    /// Observers are notified after the tree has settled: `StateChanged` first
    /// if a transition was applied, then `Updated`.
    pub fn tick(&mut self, blackboard: &mut B) -> Status {
        self.ctx.begin();
        let tick_id = self.ctx.tick_id();
        self.ticked = self.active;

        let root = &mut self.states[self.active].root;
        let status = root.execute(&mut self.ctx, blackboard);
        if !self.ctx.is_interrupted() {
            // fail out running nodes this tick did not reach
            root.reset(&mut self.ctx, blackboard);
        }
        self.status = status;

        if self.config.log_captured_errors
            && let Some(error) = self.ctx.captured_error()
        {
            tracing::warn!(
                node = %error.node_name,
                id = %error.node,
                tick = error.tick_id,
                error = %error.source,
                "leaf callback failed"
            );
        }

        let transition = self
            .ctx
            .take_requested_state()
            .and_then(|target| self.resolve_target(&target));
        if let Some(next) = transition {
            self.switch_to(next, blackboard);
        }

        self.observers.publish(&TreeEvent::Updated { tick_id, status });
        status
    }

    /// Aborts the active state and returns to the default state.
    pub fn reset(&mut self, blackboard: &mut B) {
        if self.active == self.default_state {
            self.states[self.active].root.abort(&mut self.ctx, blackboard);
            self.status = Status::Failure;
            return;
        }
        self.switch_to(self.default_state, blackboard);
        self.status = Status::Failure;
    }

    /// Requests are only recorded for registered states other than the active one.
    fn resolve_target(&self, target: &str) -> Option<usize> {
        self.index
            .get(target)
            .copied()
            .filter(|&next| next != self.active)
    }

    fn switch_to(&mut self, next: usize, blackboard: &mut B) {
        self.states[self.active].root.abort(&mut self.ctx, blackboard);

        let previous = std::mem::replace(&mut self.active, next);
        let event = TreeEvent::StateChanged {
            previous: self.states[previous].name.clone(),
            next: self.states[next].name.clone(),
        };
        self.ctx.set_active_state(&self.states[next].name);
        tracing::debug!(
            from = %self.states[previous].name,
            to = %self.states[next].name,
            tick = self.ctx.tick_id(),
            "state changed"
        );
        self.observers.publish(&event);
    }

    pub fn active_state(&self) -> &str {
        &self.states[self.active].name
    }

    pub fn default_state(&self) -> &str {
        &self.states[self.default_state].name
    }

    pub fn active_root(&self) -> &Node<B> {
        self.states[self.active].root.child()
    }

    /// Root of a registered state.
    pub fn state(&self, name: &str) -> Option<&Node<B>> {
        let &position = self.index.get(name)?;
        Some(self.states[position].root.child())
    }

    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|state| state.name.as_str())
    }

    /// Result of the last tick (`Failure` before the first one).
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn tick_id(&self) -> u64 {
        self.ctx.tick_id()
    }

    /// Most recent callback error of the last tick.
    pub fn captured_error(&self) -> Option<&CapturedError> {
        self.ctx.captured_error()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn access_keys(&self) -> &AccessKeys {
        self.ctx.access_keys()
    }

    /// Handle that interrupts the tick in progress from another thread or a
    /// host callback.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.ctx.cancel_handle()
    }

    pub fn subscribe(
        &mut self,
        topic: Topic,
        callback: impl FnMut(&TreeEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(topic, callback)
    }

    /// Returns `false` if the subscription did not exist.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Read-only view of the state the last tick ran in, so the trace still
    /// resolves right after a transition.
    pub fn inspector(&self) -> TreeInspector<'_, B> {
        let state = &self.states[self.ticked];
        TreeInspector::new(&state.name, state.root.child(), &self.ctx)
    }

    /// Checks every state for misconfigurations the engine tolerates at
    /// runtime but the host most likely did not intend.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        for state in &self.states {
            validate_state(
                &state.name,
                state.root.child(),
                |name| self.index.contains_key(name),
                self.ctx.access_keys(),
                &mut issues,
            );
        }
        issues
    }
}

impl<B> std::fmt::Debug for TreeDriver<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeDriver")
            .field("active", &self.active_state())
            .field("states", &self.states.len())
            .field("tick_id", &self.ctx.tick_id())
            .field("status", &self.status)
            .field("observers", &self.observers)
            .finish()
    }
}
