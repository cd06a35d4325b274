use ai_core::{AgentId, LogicalName};
use ai_memory::{Field, MemoryError, MemoryStore};

/// Durable logical identity of the agent occupying an entity.
pub const LOGICAL_NAME: Field<String> = Field::persistent("logical_name", String::new);

/// Tick at which the agent last (re-)entered simulation.
pub const LAST_RELOCATED: Field<i64> = Field::persistent("last_relocated_tick", || 0);

/// World registry: population cap, authoritative once written.
pub const MAX_POPULATION: Field<i64> = Field::persistent("max_population", || 10);

/// World registry: FIFO of independently serialized snapshot blobs, oldest first.
pub const SNAPSHOT_QUEUE: Field<Vec<String>> = Field::persistent("snapshot_queue", Vec::new);

/// World registry: latest periodic snapshot of every live agent.
pub const AGENT_CHECKPOINTS: Field<Vec<String>> =
    Field::persistent("agent_checkpoints", Vec::new);

/// The agent's logical name, generating and persisting one on first use.
pub fn logical_name_of<A: AgentId>(
    memory: &mut MemoryStore<A>,
    agent: A,
) -> Result<LogicalName, MemoryError> {
    let stored = memory.get(agent, LOGICAL_NAME);
    if !stored.is_empty() {
        return Ok(LogicalName::new(stored));
    }
    let name = LogicalName::generate();
    memory.set(agent, LOGICAL_NAME, name.as_str().to_string())?;
    Ok(name)
}
