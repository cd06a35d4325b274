//! Umbrella crate that re-exports the `ai-*` building blocks.
//!
//! - [`core`]: tick context, agent identity, world traits, events, timers
//! - [`memory`]: per-agent memory, world registry, sensor cache
//! - [`goals`]: goal lifecycle and priority arbitration
//! - [`lifecycle`]: snapshots, population control and the tick driver

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use ai_core as core;

#[cfg(feature = "memory")]
#[cfg_attr(docsrs, doc(cfg(feature = "memory")))]
pub use ai_memory as memory;

#[cfg(feature = "goals")]
#[cfg_attr(docsrs, doc(cfg(feature = "goals")))]
pub use ai_goals as goals;

#[cfg(feature = "lifecycle")]
#[cfg_attr(docsrs, doc(cfg(feature = "lifecycle")))]
pub use ai_lifecycle as lifecycle;

/// The types most simulations need.
#[cfg(feature = "lifecycle")]
#[cfg_attr(docsrs, doc(cfg(feature = "lifecycle")))]
pub mod prelude {
    pub use ai_core::{AgentId, TickContext, Vec3, WorldMut, WorldView};
    pub use ai_goals::{
        Archetype, ArchetypeCatalog, ArchetypeId, Goal, GoalContext, GoalError, GoalId, Priority,
        PriorityContext, Runtime,
    };
    pub use ai_lifecycle::{Removal, Simulation, SimulationConfig};
    pub use ai_memory::{Field, SensorKey};
}
