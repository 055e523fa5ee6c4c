//! Demo configuration.
use std::env;

/// How long the demo runs and when the intruder shows up.
#[derive(Clone, Debug)]
pub struct DemoConfig {
    /// Number of ticks to run.
    pub ticks: u64,
    /// Tick on which the intruder becomes visible.
    pub alert_tick: u64,
    /// Hit points of the intruder.
    pub intruder_health: i32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            ticks: 12,
            alert_tick: 4,
            intruder_health: 9,
        }
    }
}

impl DemoConfig {
    /// Construct demo configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GUARD_TICKS` - Ticks to simulate (default: 12)
    /// - `GUARD_ALERT_TICK` - Tick the intruder appears on (default: 4)
    /// - `GUARD_INTRUDER_HEALTH` - Intruder hit points (default: 9)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ticks) = read_env::<u64>("GUARD_TICKS") {
            config.ticks = ticks.max(1);
        }
        if let Some(tick) = read_env::<u64>("GUARD_ALERT_TICK") {
            config.alert_tick = tick;
        }
        if let Some(health) = read_env::<i32>("GUARD_INTRUDER_HEALTH") {
            config.intruder_health = health.max(1);
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
