//! Driver configuration structures and loaders.

use std::env;

/// Runtime knobs of a [`TreeDriver`](crate::TreeDriver).
#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// Maximum number of slots recorded in the execution trace per tick.
    ///
    /// Visits past this limit still execute, they are just not recorded.
    pub trace_capacity: usize,
    /// Seed for weighted random selection. `None` seeds from OS entropy.
    pub rng_seed: Option<u64>,
    /// Emit a `warn!` event whenever a leaf callback error is captured.
    pub log_captured_errors: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            trace_capacity: 200,
            rng_seed: None,
            log_captured_errors: true,
        }
    }
}

impl DriverConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `BT_TRACE_CAPACITY` - Execution trace slots per tick (default: 200)
    /// - `BT_RNG_SEED` - Seed for random composites (default: entropy)
    /// - `BT_LOG_CAPTURED_ERRORS` - Log captured leaf errors (default: true)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(capacity) = read_env::<usize>("BT_TRACE_CAPACITY") {
            config.trace_capacity = capacity.max(1);
        }
        if let Some(seed) = read_env::<u64>("BT_RNG_SEED") {
            config.rng_seed = Some(seed);
        }
        if let Some(log) = read_env_bool("BT_LOG_CAPTURED_ERRORS") {
            config.log_captured_errors = log;
        }

        config
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_trace_capacity(mut self, capacity: usize) -> Self {
        self.trace_capacity = capacity.max(1);
        self
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

fn read_env_bool(key: &str) -> Option<bool> {
    match env::var(key).ok()?.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
