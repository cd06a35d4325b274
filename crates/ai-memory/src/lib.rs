//! Memory layer for tick-driven agents.
//!
//! - [`MemoryStore`]: per-agent cells, Persistent (write-through) or Transient (process only).
//! - [`WorldRegistry`]: the same contract at world scope.
//! - [`SensorCache`]: tick-stamped memoization of expensive per-agent queries.
//!
//! All of it assumes the single-threaded tick model: array helpers are
//! read-modify-write sequences and are not atomic against concurrent mutators.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod durable;
pub mod error;
pub mod field;
pub mod registry;
pub mod sensor;
pub mod store;
pub mod value;

pub use durable::{DurableStore, DurableValue, InMemoryStore, JsonFileStore, Scope};
pub use error::{MemoryError, StoreError};
pub use field::{Field, FieldSpec, Persistence};
pub use registry::WorldRegistry;
pub use sensor::{SensorCache, SensorKey};
pub use store::{MemoryConfig, MemoryStore, SweepReport};
pub use value::{CellValue, MemoryValue};
