use std::collections::BTreeMap;

use ai_core::AgentId;

use crate::durable::load_or_default;
use crate::{
    CellValue, DurableStore, DurableValue, Field, FieldSpec, MemoryError, MemoryValue, Persistence,
    Scope,
};

type Cells = BTreeMap<&'static str, CellValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Cadence of the dead-agent cache sweep.
    pub sweep_every_ticks: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            sweep_every_ticks: 200,
        }
    }
}

/// Cache entries reaped by one sweep, per partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub persistent: usize,
    pub transient: usize,
}

/// Per-agent memory cells.
///
/// Persistent cells are cached and mirrored synchronously to the durable
/// backend under [`Scope::Agent`]; a cache miss loads from the backend, or
/// writes the field default through on first use. A rejected write leaves
/// the cached value unchanged. Transient cells never reach the backend.
pub struct MemoryStore<A: AgentId> {
    persistent: BTreeMap<A, Cells>,
    transient: BTreeMap<A, Cells>,
    durable: Box<dyn DurableStore>,
    config: MemoryConfig,
    last_sweep: u64,
}

impl<A: AgentId> MemoryStore<A> {
    pub fn new(durable: impl DurableStore + 'static) -> Self {
        Self::with_config(durable, MemoryConfig::default())
    }

    pub fn with_config(durable: impl DurableStore + 'static, config: MemoryConfig) -> Self {
        Self {
            persistent: BTreeMap::new(),
            transient: BTreeMap::new(),
            durable: Box::new(durable),
            config,
            last_sweep: 0,
        }
    }

    pub fn config(&self) -> MemoryConfig {
        self.config
    }

    /// Typed read. A missing or mistyped value yields the field default.
    pub fn get<T: MemoryValue>(&mut self, agent: A, field: Field<T>) -> T {
        let cell = self.cell(agent, field.name(), field.persistence(), || {
            field.default_value().into_cell()
        });
        T::from_cell(&cell).unwrap_or_else(|| {
            tracing::warn!(
                agent = agent.stable_id(),
                field = field.name(),
                found = cell.kind(),
                "memory cell has unexpected type, using default"
            );
            field.default_value()
        })
    }

    pub fn set<T: MemoryValue>(
        &mut self,
        agent: A,
        field: Field<T>,
        value: T,
    ) -> Result<(), MemoryError> {
        self.write(agent, field.name(), field.persistence(), value.into_cell())
    }

    pub fn get_raw(&mut self, agent: A, spec: &FieldSpec) -> CellValue {
        self.cell(agent, spec.name, spec.persistence, || spec.default.clone())
    }

    pub fn set_raw(
        &mut self,
        agent: A,
        spec: &FieldSpec,
        value: CellValue,
    ) -> Result<(), MemoryError> {
        self.write(agent, spec.name, spec.persistence, value)
    }

    fn cell(
        &mut self,
        agent: A,
        name: &'static str,
        persistence: Persistence,
        default: impl FnOnce() -> CellValue,
    ) -> CellValue {
        let cells = match persistence {
            Persistence::Persistent => self.persistent.entry(agent).or_default(),
            Persistence::Transient => self.transient.entry(agent).or_default(),
        };
        if let Some(value) = cells.get(name) {
            return value.clone();
        }

        let value = match persistence {
            Persistence::Persistent => load_or_default(
                self.durable.as_mut(),
                Scope::Agent(agent.stable_id()),
                name,
                default,
            ),
            Persistence::Transient => default(),
        };
        cells.insert(name, value.clone());
        value
    }

    fn write(
        &mut self,
        agent: A,
        name: &'static str,
        persistence: Persistence,
        value: CellValue,
    ) -> Result<(), MemoryError> {
        match persistence {
            Persistence::Transient => {
                self.transient.entry(agent).or_default().insert(name, value);
                Ok(())
            }
            Persistence::Persistent => {
                // The cache only ever holds what the backend accepted.
                DurableValue::encode(&value)
                    .and_then(|d| self.durable.store(Scope::Agent(agent.stable_id()), name, d))
                    .map_err(|source| MemoryError::WriteThrough {
                        field: name,
                        source,
                    })?;
                self.persistent.entry(agent).or_default().insert(name, value);
                Ok(())
            }
        }
    }

    pub fn is_in_array<T>(&mut self, agent: A, field: Field<Vec<T>>, value: &T) -> bool
    where
        T: MemoryValue + PartialEq,
    {
        self.get(agent, field).contains(value)
    }

    /// Append `value`; with `unique`, an existing equal element makes this a no-op.
    /// Returns whether the array changed.
    pub fn push_to_array<T>(
        &mut self,
        agent: A,
        field: Field<Vec<T>>,
        value: T,
        unique: bool,
    ) -> Result<bool, MemoryError>
    where
        T: MemoryValue + PartialEq,
    {
        let mut items = self.get(agent, field);
        if unique && items.contains(&value) {
            return Ok(false);
        }
        items.push(value);
        self.set(agent, field, items)?;
        Ok(true)
    }

    /// Remove every element equal to `value`. Returns whether the array changed.
    pub fn remove_from_array<T>(
        &mut self,
        agent: A,
        field: Field<Vec<T>>,
        value: &T,
    ) -> Result<bool, MemoryError>
    where
        T: MemoryValue + PartialEq,
    {
        let mut items = self.get(agent, field);
        let before = items.len();
        items.retain(|item| item != value);
        if items.len() == before {
            return Ok(false);
        }
        self.set(agent, field, items)?;
        Ok(true)
    }

    /// Drop cached cells of agents that are no longer alive. Durable storage is untouched.
    pub fn sweep(&mut self, is_alive: impl Fn(A) -> bool) -> SweepReport {
        let p = self.persistent.len();
        let t = self.transient.len();
        self.persistent.retain(|agent, _| is_alive(*agent));
        self.transient.retain(|agent, _| is_alive(*agent));
        SweepReport {
            persistent: p - self.persistent.len(),
            transient: t - self.transient.len(),
        }
    }

    /// Run [`Self::sweep`] if `sweep_every_ticks` elapsed since the previous one.
    pub fn sweep_if_due(&mut self, tick: u64, is_alive: impl Fn(A) -> bool) -> Option<SweepReport> {
        if tick.saturating_sub(self.last_sweep) < self.config.sweep_every_ticks.max(1) {
            return None;
        }
        self.last_sweep = tick;
        let report = self.sweep(is_alive);
        if report != SweepReport::default() {
            tracing::debug!(
                persistent = report.persistent,
                transient = report.transient,
                "swept memory of despawned agents"
            );
        }
        Some(report)
    }

    /// Drop every cached cell of `agent` now.
    pub fn forget(&mut self, agent: A) {
        self.persistent.remove(&agent);
        self.transient.remove(&agent);
    }

    /// Drop the whole cache, as after a restart. Transient values are lost.
    pub fn clear_cache(&mut self) {
        self.persistent.clear();
        self.transient.clear();
    }

    /// Agents with at least one cached cell in either partition.
    pub fn cached_agents(&self) -> usize {
        let mut agents: Vec<&A> = self.persistent.keys().chain(self.transient.keys()).collect();
        agents.sort();
        agents.dedup();
        agents.len()
    }
}
