use ai_memory::MemoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GoalError {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error("agent {0} is no longer alive")]
    AgentGone(u64),
    #[error("{0}")]
    Behavior(String),
}
