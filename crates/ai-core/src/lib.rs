//! Deterministic, engine-agnostic kernel primitives for tick-driven agent simulation.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod event;
pub mod math;
pub mod rng;
pub mod tick;
pub mod timer;
pub mod world;

pub use agent::{AgentId, LogicalName};
pub use event::{EventBus, EventKind, EventLog, EventSink, SimEvent};
pub use math::Vec3;
pub use rng::{DeterministicRng, SplitMix64};
pub use tick::TickContext;
pub use timer::{Scheduler, TimerControl, TimerHandle};
pub use world::{Departure, DepartureKind, WorldMut, WorldView};
