//! Access keys shared by access-limited decorators.
//!
//! A decorator bound to a key must lock it before entering its child and keeps
//! the lock while the child is `Running`. Keys are owned by the driver's
//! [`AccessKeys`] registry, so every decorator in one tree sees the same key
//! state while independent trees never share any.

use std::collections::HashMap;
use std::fmt;

use crate::error::{BuildError, Result};

/// A lockable resource guarding the entry of decorated branches.
pub trait AccessKey: fmt::Debug + Send {
    /// Unique key name inside one driver.
    fn name(&self) -> &str;

    /// Tries to acquire the key. Returns `true` on success.
    fn lock(&mut self, tick_id: u64) -> bool;

    /// Releases a previously acquired lock.
    fn unlock(&mut self, tick_id: u64);
}

/// Only `max_holders` decorators may hold this key at the same time.
#[derive(Debug, Clone)]
pub struct CounterLimitKey {
    name: String,
    max_holders: u32,
    holders: u32,
}

impl CounterLimitKey {
    /// `max_holders` is clamped to at least one.
    pub fn new(name: impl Into<String>, max_holders: u32) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(BuildError::EmptyAccessKey);
        }
        Ok(Self {
            name,
            max_holders: max_holders.max(1),
            holders: 0,
        })
    }

    pub fn holders(&self) -> u32 {
        self.holders
    }
}

impl AccessKey for CounterLimitKey {
    fn name(&self) -> &str {
        &self.name
    }

    fn lock(&mut self, _tick_id: u64) -> bool {
        if self.holders >= self.max_holders {
            return false;
        }
        self.holders += 1;
        true
    }

    fn unlock(&mut self, _tick_id: u64) {
        self.holders = self.holders.saturating_sub(1);
    }
}

/// One holder at a time, and a new lock is granted only `interval_ticks`
/// after the previous holder released the key.
#[derive(Debug, Clone)]
pub struct CooldownKey {
    name: String,
    interval_ticks: u64,
    locked: bool,
    released_at: Option<u64>,
}

impl CooldownKey {
    /// `interval_ticks` is clamped to at least one.
    pub fn new(name: impl Into<String>, interval_ticks: u64) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(BuildError::EmptyAccessKey);
        }
        Ok(Self {
            name,
            interval_ticks: interval_ticks.max(1),
            locked: false,
            released_at: None,
        })
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl AccessKey for CooldownKey {
    fn name(&self) -> &str {
        &self.name
    }

    fn lock(&mut self, tick_id: u64) -> bool {
        if self.locked {
            return false;
        }
        if let Some(released) = self.released_at
            && tick_id < released + self.interval_ticks
        {
            return false;
        }
        self.locked = true;
        true
    }

    fn unlock(&mut self, tick_id: u64) {
        if self.locked {
            self.locked = false;
            self.released_at = Some(tick_id);
        }
    }
}

/// Registry of the keys available to one tree.
#[derive(Debug, Default)]
pub struct AccessKeys {
    keys: HashMap<String, Box<dyn AccessKey>>,
}

impl AccessKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: Box<dyn AccessKey>) -> Result<()> {
        let name = key.name().to_owned();
        if name.is_empty() {
            return Err(BuildError::EmptyAccessKey);
        }
        if self.keys.contains_key(&name) {
            return Err(BuildError::DuplicateAccessKey(name));
        }
        self.keys.insert(name, key);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keys.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&dyn AccessKey> {
        self.keys.get(name).map(|key| key.as_ref())
    }

    /// Unknown keys can never be locked.
    pub(crate) fn lock(&mut self, name: &str, tick_id: u64) -> bool {
        match self.keys.get_mut(name) {
            Some(key) => key.lock(tick_id),
            None => false,
        }
    }

    pub(crate) fn unlock(&mut self, name: &str, tick_id: u64) {
        if let Some(key) = self.keys.get_mut(name) {
            key.unlock(tick_id);
        }
    }
}
