//! The guard's blackboard and its two states.

use behavior_tree::builder::{action, always_succeed, change_state, condition, priority, sequence};
use behavior_tree::{
    Behavior, BoxError, Composite, CooldownKey, Decorator, LeafContext, Node, Parameters, Slot,
    Status, TreeDriver, TreeDriverBuilder,
};

pub const PATROL: &str = "Patrol";
pub const COMBAT: &str = "Combat";

/// World state the guard reads and writes.
#[derive(Debug, Default)]
pub struct Guard {
    pub waypoint: usize,
    pub intruder_visible: bool,
    pub intruder_health: i32,
    pub alarms_raised: u32,
}

impl Guard {
    const ROUTE: [&'static str; 3] = ["gate", "tower", "courtyard"];

    pub fn current_waypoint(&self) -> &'static str {
        Self::ROUTE[self.waypoint % Self::ROUTE.len()]
    }
}

/// Walks to the next waypoint over several ticks.
#[derive(Default)]
struct WalkToWaypoint {
    remaining: Option<i64>,
}

impl Behavior<Guard> for WalkToWaypoint {
    fn tick(&mut self, ctx: &mut LeafContext<'_, Guard>) -> Result<Status, BoxError> {
        let steps = ctx
            .params()
            .and_then(|params| params.get_int("steps"))
            .ok_or("walk needs a `steps` parameter")?;
        let remaining = self.remaining.get_or_insert(steps);
        *remaining -= 1;
        if *remaining > 0 {
            return Ok(Status::Running);
        }

        self.remaining = None;
        let guard = ctx.blackboard_mut();
        guard.waypoint += 1;
        tracing::info!(waypoint = guard.current_waypoint(), "reached waypoint");
        Ok(Status::Success)
    }

    fn abort(&mut self, guard: &mut Guard) {
        if self.remaining.take().is_some() {
            tracing::info!(towards = guard.current_waypoint(), "walk interrupted");
        }
    }
}

fn patrol() -> behavior_tree::Result<Node<Guard>> {
    let walk = action("walk", WalkToWaypoint::default())?;
    let route = Node::composite(
        "route",
        Composite::looping(None)
            .slot(Slot::new(walk).with_parameters(Parameters::new().with("steps", 2)))
            .child(Node::action("look-around", |_: &mut LeafContext<'_, Guard>| {
                Ok(Status::Success)
            })?),
    )?;

    priority(
        "patrol",
        [
            sequence(
                "spot-intruder",
                [
                    condition("intruder-visible", |ctx: &LeafContext<'_, Guard>| {
                        Ok(ctx.blackboard().intruder_visible)
                    })?,
                    change_state("engage", COMBAT)?,
                ],
            )?,
            route,
        ],
    )
}

fn combat() -> behavior_tree::Result<Node<Guard>> {
    let raise_alarm = Node::decorator(
        "alarm-cooldown",
        Decorator::new()
            .access_key("alarm")
            .child(Node::action("raise-alarm", |ctx: &mut LeafContext<'_, Guard>| {
                ctx.blackboard_mut().alarms_raised += 1;
                tracing::info!("alarm raised");
                Ok(Status::Success)
            })?),
    )?;

    let attack = Node::action("attack", |ctx: &mut LeafContext<'_, Guard>| {
        let damage = ctx.param("damage").and_then(|v| v.as_int()).unwrap_or(1) as i32;
        let guard = ctx.blackboard_mut();
        guard.intruder_health -= damage;
        tracing::info!(health = guard.intruder_health, "attacking intruder");
        if guard.intruder_health > 0 {
            Ok(Status::Running)
        } else {
            guard.intruder_visible = false;
            Ok(Status::Success)
        }
    })?;

    priority(
        "combat",
        [
            sequence(
                "stand-down",
                [
                    condition("intruder-down", |ctx: &LeafContext<'_, Guard>| {
                        Ok(ctx.blackboard().intruder_health <= 0)
                    })?,
                    change_state("resume-patrol", PATROL)?,
                ],
            )?,
            Node::composite(
                "fight",
                Composite::sequence()
                    .child(always_succeed("try-alarm", raise_alarm)?)
                    .slot(Slot::new(attack).with_parameters(Parameters::new().with("damage", 4))),
            )?,
        ],
    )
}

/// Builds the guard's driver: patrol until an intruder shows up, fight it,
/// then go back to patrolling.
pub fn build(builder: TreeDriverBuilder<Guard>) -> anyhow::Result<TreeDriver<Guard>> {
    let driver = builder
        .state(PATROL, patrol()?)
        .state(COMBAT, combat()?)
        .default_state(PATROL)
        .access_key(CooldownKey::new("alarm", 5)?)
        .build()?;
    Ok(driver)
}
