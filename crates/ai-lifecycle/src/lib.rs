//! Bridges durable logical agents across despawn/respawn.
//!
//! Agents that leave simulation are captured into [`SerializedSnapshot`]s and
//! queued (FIFO) in the world registry; population control restores the
//! oldest snapshot when there is room. [`Simulation`] drives the whole tick:
//! timers, arbitration, population control, checkpoints and sweeps.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod error;
pub mod fields;
pub mod manager;
pub mod queue;
pub mod simulation;
pub mod snapshot;

pub use error::{LifecycleError, SnapshotError};
pub use fields::{
    logical_name_of, AGENT_CHECKPOINTS, LAST_RELOCATED, LOGICAL_NAME, MAX_POPULATION,
    SNAPSHOT_QUEUE,
};
pub use manager::{LifecycleConfig, LifecycleManager, PopulationPlan};
pub use queue::SnapshotQueue;
pub use simulation::{Removal, Simulation, SimulationConfig, SimulationStatus, TickReport};
pub use snapshot::{SerializedSnapshot, SnapshotSchema};
