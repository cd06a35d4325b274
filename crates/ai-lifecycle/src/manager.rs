use ai_core::{AgentId, Vec3};
use ai_memory::MemoryStore;
use chrono::Utc;

use crate::{logical_name_of, LifecycleError, SerializedSnapshot, SnapshotSchema, LAST_RELOCATED};

#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
    /// Cadence of population control.
    pub check_every_ticks: u64,
    /// Cadence of checkpoints of every live agent; 0 disables them.
    pub checkpoint_every_ticks: u64,
    /// Written to the registry only if no cap was ever stored.
    pub initial_max_population: i64,
    pub schema: SnapshotSchema,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            check_every_ticks: 20,
            checkpoint_every_ticks: 600,
            initial_max_population: 10,
            schema: SnapshotSchema::default(),
        }
    }
}

/// What population control should do on this check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulationPlan {
    Hold,
    /// Restore the oldest queued snapshot.
    Restore,
    /// Queue is empty: spawn a brand-new agent.
    SpawnFresh,
    /// Evict this many live agents.
    Evict(usize),
}

/// Population decisions plus snapshot capture/replay.
///
/// Holds no world state itself; [`crate::Simulation`] applies the decisions.
#[derive(Debug, Clone)]
pub struct LifecycleManager {
    config: LifecycleConfig,
    last_check: Option<u64>,
    last_checkpoint: Option<u64>,
}

impl LifecycleManager {
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            config,
            last_check: None,
            last_checkpoint: None,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn schema(&self) -> &SnapshotSchema {
        &self.config.schema
    }

    /// Whether population control runs this tick; marks it as run if so.
    pub fn check_due(&mut self, tick: u64) -> bool {
        Self::due(&mut self.last_check, tick, self.config.check_every_ticks)
    }

    pub fn checkpoint_due(&mut self, tick: u64) -> bool {
        if self.config.checkpoint_every_ticks == 0 {
            return false;
        }
        Self::due(&mut self.last_checkpoint, tick, self.config.checkpoint_every_ticks)
    }

    fn due(last: &mut Option<u64>, tick: u64, every: u64) -> bool {
        let every = every.max(1);
        let due = last.map_or(true, |l| tick.saturating_sub(l) >= every);
        if due {
            *last = Some(tick);
        }
        due
    }

    /// Never lets `live + queued` grow: restores keep the sum, fresh spawns
    /// only happen with an empty queue and room under the cap.
    pub fn plan(live: usize, queued: usize, cap: usize) -> PopulationPlan {
        if live > cap {
            PopulationPlan::Evict(live - cap)
        } else if live == cap {
            PopulationPlan::Hold
        } else if queued > 0 {
            PopulationPlan::Restore
        } else {
            PopulationPlan::SpawnFresh
        }
    }

    /// Capture the schema fields of `agent`. Reads go through the cache or durable storage,
    /// so this also works for an entity that has already despawned.
    pub fn capture<A: AgentId>(
        &self,
        agent: A,
        position: Vec3,
        memory: &mut MemoryStore<A>,
        tick: u64,
    ) -> Result<SerializedSnapshot, LifecycleError> {
        let logical_name = logical_name_of(memory, agent)?;
        let fields = self
            .config
            .schema
            .fields()
            .iter()
            .map(|spec| (spec.name.to_string(), memory.get_raw(agent, spec)))
            .collect();
        Ok(SerializedSnapshot {
            logical_name,
            position,
            captured_tick: tick,
            captured_at: Utc::now(),
            fields,
        })
    }

    /// Replay every captured field into the memory of the freshly spawned `agent`.
    pub fn restore_into<A: AgentId>(
        &self,
        snapshot: &SerializedSnapshot,
        agent: A,
        memory: &mut MemoryStore<A>,
        tick: u64,
    ) -> Result<(), LifecycleError> {
        for (name, value) in snapshot.fields.iter() {
            match self.config.schema.get(name) {
                Some(spec) => memory.set_raw(agent, spec, value.clone())?,
                None => tracing::warn!(
                    logical_name = %snapshot.logical_name,
                    field = %name,
                    "snapshot field not in schema, skipped"
                ),
            }
        }
        memory.set(
            agent,
            crate::LOGICAL_NAME,
            snapshot.logical_name.as_str().to_string(),
        )?;
        memory.set(agent, LAST_RELOCATED, tick as i64)?;
        Ok(())
    }
}
