use ai_memory::MemoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("cannot encode snapshot")]
    Encode(#[source] serde_json::Error),
    #[error("malformed snapshot blob")]
    Decode(#[source] serde_json::Error),
    #[error("snapshot has an empty logical name")]
    MissingName,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("agent {0} is not alive")]
    UnknownAgent(u64),
    #[error("population cap must be non-negative, got {0}")]
    InvalidCap(i64),
}
