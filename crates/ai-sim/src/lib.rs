//! Reference world for the agent simulation: a flat map with patrolling
//! threats and regrowing food, a five-goal catalog, two archetypes, and the
//! wiring that turns a [`SimConfig`] into a running [`Simulation`].

#![forbid(unsafe_code)]

pub mod archetypes;
pub mod config;
pub mod fields;
pub mod goals;
pub mod world;

use ai_goals::Runtime;
use ai_lifecycle::{LifecycleError, Simulation};

pub use config::SimConfig;
pub use world::GridWorld;

/// Build a simulation over `rt`, resuming tick and entity numbering from the registry.
pub fn build_simulation(
    config: &SimConfig,
    mut rt: Runtime<GridWorld>,
) -> Result<Simulation<GridWorld>, LifecycleError> {
    rt.registry
        .initialize(fields::PEACEFUL_MODE, config.peaceful_mode)?;
    let next_id = u64::try_from(rt.registry.get(fields::NEXT_ENTITY)).unwrap_or(1);
    let tick = u64::try_from(rt.registry.get(fields::SIM_TICK)).unwrap_or(0);

    let world = GridWorld::generate(&config.world, config.seed, next_id);
    let sim = Simulation::new(world, rt, archetypes::catalog(), config.simulation())?;
    Ok(sim.starting_at(tick))
}

/// One world step plus one simulation tick. Threats are harmless in peaceful mode.
pub fn step(sim: &mut Simulation<GridWorld>) -> ai_lifecycle::TickReport {
    let peaceful = sim.runtime_mut().registry.get(fields::PEACEFUL_MODE);
    let tick = sim.tick();
    let world = sim.world_mut();
    world.set_lethal(!peaceful);
    world.step(tick);
    sim.advance()
}

/// Persist what a later run needs to continue: the tick and the next entity id.
pub fn persist_progress(sim: &mut Simulation<GridWorld>) -> Result<(), LifecycleError> {
    let tick = i64::try_from(sim.tick()).unwrap_or(i64::MAX);
    let next_id = i64::try_from(sim.world().next_id()).unwrap_or(i64::MAX);
    let registry = &mut sim.runtime_mut().registry;
    if registry.get(fields::NEXT_ENTITY) != next_id {
        registry.set(fields::NEXT_ENTITY, next_id)?;
    }
    registry.set(fields::SIM_TICK, tick)?;
    Ok(())
}
