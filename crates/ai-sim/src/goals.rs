//! Goal catalog of the reference world.

use ai_core::{Vec3, WorldMut, WorldView};
use ai_goals::{Goal, GoalContext, GoalError, GoalId, Priority, PriorityContext, Runtime};

use crate::fields::{
    FORAGED, HOME, HOME_CLAIMED, LAST_MEAL, MEALS, NEAREST_FOOD, NEAREST_THREAT, PEACEFUL_MODE,
};
use crate::world::{FoodId, GridWorld};

pub const IDLE: GoalId = GoalId("idle");
pub const WANDER: GoalId = GoalId("wander");
pub const FORAGE: GoalId = GoalId("forage");
pub const FLEE: GoalId = GoalId("flee");
pub const GO_HOME: GoalId = GoalId("go_home");

/// Units per second.
pub const WALK_SPEED: f32 = 2.0;
pub const RUN_SPEED: f32 = 4.0;

pub const IDLE_BEFORE_WANDER: u64 = 40;
pub const HUNGER_THRESHOLD: u64 = 300;
pub const HARVEST_TICKS: u64 = 10;
pub const HOME_RANGE: f32 = 8.0;

/// Milestone published when an agent has harvested this many distinct items.
pub const WELL_FED: &str = "well_fed";
pub const WELL_FED_ITEMS: usize = 3;

const HARVEST_GROUP: &str = "harvest";
const WANDER_STREAM: u64 = 0x5741_4e44;
const FLEE_DISTANCE: f32 = 3.0;
const SAFE_FACTOR: f32 = 1.5;

pub fn sense_threat(
    rt: &mut Runtime<GridWorld>,
    world: &GridWorld,
    tick: u64,
    agent: u64,
) -> Option<(Vec3, f32)> {
    let position = world.position(agent)?;
    rt.sensors
        .cached(agent, NEAREST_THREAT, tick, || world.nearest_threat(position))
}

pub fn sense_food(
    rt: &mut Runtime<GridWorld>,
    world: &GridWorld,
    tick: u64,
    agent: u64,
) -> Option<(FoodId, Vec3)> {
    let position = world.position(agent)?;
    rt.sensors
        .cached(agent, NEAREST_FOOD, tick, || world.nearest_food(position))
}

pub fn hunger(rt: &mut Runtime<GridWorld>, tick: u64, agent: u64) -> u64 {
    let last = rt.memory.get(agent, LAST_MEAL);
    tick.saturating_sub(u64::try_from(last).unwrap_or(0))
}

/// The agent's home, claimed at its current position the first time it is asked for.
pub fn home_of(rt: &mut Runtime<GridWorld>, world: &GridWorld, agent: u64) -> Vec3 {
    if rt.memory.get(agent, HOME_CLAIMED) {
        return rt.memory.get(agent, HOME);
    }
    let home = world
        .position(agent)
        .unwrap_or_else(|| world.default_spawn());
    let claimed = rt
        .memory
        .set(agent, HOME, home)
        .and_then(|()| rt.memory.set(agent, HOME_CLAIMED, true));
    if let Err(err) = claimed {
        tracing::warn!(agent, error = %err, "could not persist home");
    }
    home
}

fn threatened(cx: &mut PriorityContext<'_, GridWorld>) -> bool {
    if cx.rt.registry.get(PEACEFUL_MODE) {
        return false;
    }
    let radius = cx.world.threat_radius();
    sense_threat(cx.rt, cx.world, cx.tick.tick, cx.agent).is_some_and(|(_, d)| d <= radius)
}

pub fn idle_priority(_cx: &mut PriorityContext<'_, GridWorld>) -> Priority {
    Priority::of(1.0)
}

pub fn wander_priority(cx: &mut PriorityContext<'_, GridWorld>) -> Priority {
    if cx.is_current(WANDER) {
        return Priority::when(!cx.completed(WANDER), 2.0);
    }
    let bored = cx.is_current(IDLE) && cx.state_time().unwrap_or(0) >= IDLE_BEFORE_WANDER;
    Priority::when(bored, 2.0)
}

pub fn forage_priority(cx: &mut PriorityContext<'_, GridWorld>) -> Priority {
    if cx.completed(FORAGE) {
        return Priority::Ineligible;
    }
    let hunger = hunger(cx.rt, cx.tick.tick, cx.agent);
    if hunger < HUNGER_THRESHOLD {
        return Priority::Ineligible;
    }
    let food = sense_food(cx.rt, cx.world, cx.tick.tick, cx.agent);
    Priority::when(food.is_some(), 3.0 + (hunger as f32 / 1000.0).min(2.0))
}

pub fn flee_priority(cx: &mut PriorityContext<'_, GridWorld>) -> Priority {
    let still_fleeing = cx.is_current(FLEE) && !cx.completed(FLEE);
    if still_fleeing && cx.rt.registry.get(PEACEFUL_MODE) {
        return Priority::Ineligible;
    }
    Priority::when(still_fleeing || threatened(cx), 10.0)
}

pub fn go_home_priority(cx: &mut PriorityContext<'_, GridWorld>) -> Priority {
    let Some(position) = cx.world.position(cx.agent) else {
        return Priority::Ineligible;
    };
    let home = home_of(cx.rt, cx.world, cx.agent);
    let heading_home = cx.is_current(GO_HOME) && !cx.completed(GO_HOME);
    Priority::when(heading_home || position.distance(home) > HOME_RANGE, 4.0)
}

fn walk_step(cx: &GoalContext<'_, GridWorld>) -> f32 {
    WALK_SPEED * cx.tick.dt_seconds
}

/// Stands still.
pub struct Idle;

impl Goal<GridWorld> for Idle {
    fn process(&mut self, _cx: &mut GoalContext<'_, GridWorld>) -> Result<(), GoalError> {
        Ok(())
    }
}

/// Walks to one random point, possibly out of the loaded area.
#[derive(Default)]
pub struct Wander {
    target: Option<Vec3>,
    arrived: bool,
}

impl Goal<GridWorld> for Wander {
    fn on_enter(&mut self, cx: &mut GoalContext<'_, GridWorld>) -> Result<(), GoalError> {
        let mut rng = cx.tick.rng_for_agent(cx.agent, WANDER_STREAM);
        self.target = Some(cx.world.roam_target(&mut rng));
        Ok(())
    }

    fn process(&mut self, cx: &mut GoalContext<'_, GridWorld>) -> Result<(), GoalError> {
        let Some(target) = self.target else {
            return Ok(());
        };
        let step = walk_step(cx);
        self.arrived = cx.world.move_towards(cx.agent, target, step);
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.arrived
    }
}

/// Walks to the nearest food, harvests it over a few ticks and eats.
#[derive(Default)]
pub struct Forage {
    harvest_due: Option<u64>,
    fed: bool,
}

impl Forage {
    fn eat(
        &mut self,
        cx: &mut GoalContext<'_, GridWorld>,
        meals: &[FoodId],
    ) -> Result<(), GoalError> {
        let agent = cx.agent;
        for &item in meals {
            cx.rt.memory.set(agent, LAST_MEAL, cx.tick.tick as i64)?;
            let eaten = cx.rt.memory.get(agent, MEALS);
            cx.rt.memory.set(agent, MEALS, eaten + 1)?;
            let new_item = cx
                .rt
                .memory
                .push_to_array(agent, FORAGED, i64::from(item), true)?;
            if new_item && cx.rt.memory.get(agent, FORAGED).len() == WELL_FED_ITEMS {
                cx.milestone(WELL_FED, true);
            }
        }
        tracing::debug!(agent, items = meals.len(), "ate");
        self.harvest_due = None;
        self.fed = true;
        Ok(())
    }
}

impl Goal<GridWorld> for Forage {
    fn process(&mut self, cx: &mut GoalContext<'_, GridWorld>) -> Result<(), GoalError> {
        let meals = cx.world.take_meals(cx.agent);
        if !meals.is_empty() {
            return self.eat(cx, &meals);
        }
        if let Some(due) = self.harvest_due {
            if cx.now() <= due {
                return Ok(());
            }
            // The item was taken by someone else before the harvest finished.
            self.harvest_due = None;
        }

        let Some((item, at)) = sense_food(cx.rt, cx.world, cx.tick.tick, cx.agent) else {
            return Ok(());
        };
        let step = walk_step(cx);
        if cx.world.move_towards(cx.agent, at, step) {
            let agent = cx.agent;
            cx.after(HARVEST_TICKS, HARVEST_GROUP, move |ctx, world: &mut GridWorld| {
                if !world.harvest(agent, item, ctx.tick) {
                    tracing::debug!(agent, item, "harvest came to nothing");
                }
            });
            self.harvest_due = Some(cx.now() + HARVEST_TICKS);
        }
        Ok(())
    }

    fn on_exit(&mut self, cx: &mut GoalContext<'_, GridWorld>) -> Result<(), GoalError> {
        cx.cancel_timers(HARVEST_GROUP);
        Ok(())
    }

    fn destroy(&mut self, cx: &mut GoalContext<'_, GridWorld>) {
        cx.cancel_timers(HARVEST_GROUP);
        self.harvest_due = None;
    }

    fn is_complete(&self) -> bool {
        self.fed
    }
}

/// Runs directly away from the nearest threat until well outside its reach.
#[derive(Default)]
pub struct Flee {
    safe: bool,
}

impl Goal<GridWorld> for Flee {
    fn process(&mut self, cx: &mut GoalContext<'_, GridWorld>) -> Result<(), GoalError> {
        let agent = cx.agent;
        let position = cx
            .world
            .position(agent)
            .ok_or(GoalError::AgentGone(agent))?;
        let radius = cx.world.threat_radius();
        let Some((threat, distance)) = sense_threat(cx.rt, cx.world, cx.tick.tick, agent) else {
            self.safe = true;
            return Ok(());
        };
        self.safe = distance > radius * SAFE_FACTOR;
        if self.safe {
            return Ok(());
        }

        let mut away = (position - threat).normalize_or_zero();
        if away == Vec3::ZERO {
            away = Vec3::new(1.0, 0.0, 0.0);
        }
        let target = cx.world.clamp(position + away * FLEE_DISTANCE);
        let step = RUN_SPEED * cx.tick.dt_seconds;
        cx.world.move_towards(agent, target, step);
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.safe
    }
}

/// Walks back to the claimed home.
#[derive(Default)]
pub struct GoHome {
    arrived: bool,
}

impl Goal<GridWorld> for GoHome {
    fn process(&mut self, cx: &mut GoalContext<'_, GridWorld>) -> Result<(), GoalError> {
        let home = home_of(cx.rt, cx.world, cx.agent);
        let step = walk_step(cx);
        self.arrived = cx.world.move_towards(cx.agent, home, step);
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.arrived
    }
}
