use ai_core::DeterministicRng;
use ai_goals::{Archetype, ArchetypeCatalog, ArchetypeId, Priority};

use crate::goals::{
    flee_priority, forage_priority, go_home_priority, idle_priority, wander_priority, Flee,
    Forage, GoHome, Idle, Wander, FLEE, FORAGE, GO_HOME, IDLE, WANDER,
};
use crate::world::GridWorld;

pub const FORAGER: ArchetypeId = ArchetypeId("forager");
pub const HOMEBODY: ArchetypeId = ArchetypeId("homebody");

const ARCHETYPE_STREAM: u64 = 0x4152_4348;

/// Roams the map and eats whatever it finds.
pub fn forager() -> Archetype<GridWorld> {
    Archetype::new(FORAGER)
        .goal(IDLE, idle_priority, || Idle)
        .goal(WANDER, wander_priority, Wander::default)
        .goal(FORAGE, forage_priority, Forage::default)
        .goal(FLEE, flee_priority, Flee::default)
}

/// Stays near the spot it first called home.
pub fn homebody() -> Archetype<GridWorld> {
    Archetype::new(HOMEBODY)
        .goal(IDLE, idle_priority, || Idle)
        .goal(GO_HOME, go_home_priority, GoHome::default)
        .goal(FORAGE, forage_priority, Forage::default)
        .goal(FLEE, flee_priority, Flee::default)
}

/// Fresh agents become foragers with a per-agent random score above 0.5, homebodies otherwise.
pub fn catalog() -> ArchetypeCatalog<GridWorld> {
    ArchetypeCatalog::new()
        .candidate(forager(), |cx| {
            let mut rng = cx.tick.rng_for_agent(cx.agent, ARCHETYPE_STREAM);
            Priority::of(rng.next_f32_unit())
        })
        .candidate(homebody(), |_| Priority::of(0.5))
}
