use core::fmt::{self, Debug, Display};
use core::hash::Hash;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Transient identifier for a live agent entity.
///
/// The id is only meaningful while the entity exists. It is *not* stable
/// across despawn/respawn; use [`LogicalName`] for that.
///
/// Deterministic simulation requires:
/// - stable ordering (`Ord`), used as the per-tick enumeration order
/// - a numeric ID (`stable_id`) for durable scopes, seeding and logs
pub trait AgentId: Copy + Ord + Eq + Hash + Debug + 'static {
    fn stable_id(self) -> u64;
}

impl AgentId for u64 {
    fn stable_id(self) -> u64 {
        self
    }
}

impl AgentId for u32 {
    fn stable_id(self) -> u64 {
        self as u64
    }
}

/// Durable identity of a logical agent, carried through snapshots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct LogicalName(String);

impl LogicalName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// A fresh random name for an agent that has never been named.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for LogicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
