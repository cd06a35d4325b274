//! Goal arbitration.
//!
//! An [`Archetype`] is a closed table of `(goal id, priority fn, factory)`
//! entries. Each cycle the [`Arbiter`] of an agent scores every entry and
//! switches to the strict maximum. Ties go to the current goal, then to the
//! lowest registration index. Goals never see each other; they coordinate
//! through memory, sensors and the `complete` flag.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod arbiter;
pub mod archetype;
pub mod error;
pub mod fields;
pub mod goal;
pub mod priority;
pub mod runtime;

pub use arbiter::{Arbiter, GoalSwitch};
pub use archetype::{Archetype, ArchetypeCatalog, ArchetypeId};
pub use error::GoalError;
pub use fields::{ARCHETYPE, CURRENT_GOAL};
pub use goal::{CurrentGoal, Goal, GoalContext, GoalId};
pub use priority::{select_winner, Priority, PriorityContext};
pub use runtime::Runtime;
