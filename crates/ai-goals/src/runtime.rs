use ai_core::{AgentId, EventBus, EventKind, Scheduler, SimEvent, WorldMut};
use ai_memory::{InMemoryStore, MemoryStore, SensorCache, WorldRegistry};

/// Everything a goal can touch besides the world itself.
pub struct Runtime<W>
where
    W: WorldMut + 'static,
{
    pub memory: MemoryStore<W::Agent>,
    pub registry: WorldRegistry,
    pub sensors: SensorCache<W::Agent>,
    pub timers: Scheduler<W>,
    pub events: EventBus,
}

impl<W> Runtime<W>
where
    W: WorldMut + 'static,
{
    pub fn new(memory: MemoryStore<W::Agent>, registry: WorldRegistry) -> Self {
        Self {
            memory,
            registry,
            sensors: SensorCache::new(),
            timers: Scheduler::new(),
            events: EventBus::new(),
        }
    }

    /// Ephemeral runtime over one shared in-memory backend, recording events.
    pub fn in_memory() -> Self {
        let backend = InMemoryStore::shared();
        let mut rt = Self::new(MemoryStore::new(backend.clone()), WorldRegistry::new(backend));
        rt.events = EventBus::recording();
        rt
    }

    pub fn publish(&mut self, tick: u64, agent: Option<W::Agent>, kind: EventKind) {
        let event = match agent {
            Some(agent) => SimEvent::for_agent(tick, agent.stable_id(), kind),
            None => SimEvent::new(tick, kind),
        };
        self.events.publish(event);
    }

    /// Drop every per-agent cache entry of agents that are gone.
    pub fn forget(&mut self, agent: W::Agent) {
        self.memory.forget(agent);
        self.sensors.forget(agent);
        self.timers.cancel_owned_by(agent);
    }
}
