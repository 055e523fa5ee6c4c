//! Guard demo binary.
//!
//! Embeds the behavior tree engine in a tiny host loop: a guard patrols its
//! route, switches to combat when an intruder appears, and returns to patrol
//! once the intruder is down.
//!
//! ```bash
//! RUST_LOG=behavior_tree=debug GUARD_TICKS=20 cargo run -p guard-demo
//! ```

mod agent;
mod config;

use anyhow::Result;
use behavior_tree::{DriverConfig, Topic, TreeDriver, TreeEvent};

use crate::agent::Guard;
use crate::config::DemoConfig;

fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let demo = DemoConfig::from_env();
    let driver_config = DriverConfig::from_env();
    tracing::info!(?demo, ?driver_config, "starting guard demo");

    let mut driver = agent::build(TreeDriver::builder().config(driver_config))?;
    for issue in driver.validate() {
        tracing::warn!(%issue, "tree configuration issue");
    }

    driver.subscribe(Topic::StateChanged, |event| {
        if let TreeEvent::StateChanged { previous, next } = event {
            tracing::info!(%previous, %next, "guard switched state");
        }
    });
    driver.subscribe(Topic::Updated, |event| {
        if let TreeEvent::Updated { tick_id, status } = event {
            tracing::debug!(tick = tick_id, %status, "tree updated");
        }
    });

    let mut guard = Guard::default();
    for tick in 1..=demo.ticks {
        if tick == demo.alert_tick {
            tracing::info!(tick, "intruder spotted");
            guard.intruder_visible = true;
            guard.intruder_health = demo.intruder_health;
        }

        let status = driver.tick(&mut guard);
        tracing::info!(tick, state = driver.active_state(), %status, "tick finished");
        tracing::debug!("\n{}", driver.inspector().render_trace());

        if let Some(error) = driver.captured_error() {
            tracing::error!(%error, "guard behavior failed");
        }
    }

    tracing::info!(
        waypoint = guard.current_waypoint(),
        alarms = guard.alarms_raised,
        state = driver.active_state(),
        "demo finished"
    );
    Ok(())
}
