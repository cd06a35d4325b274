#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use ai_core::{Departure, DepartureKind, DeterministicRng, Vec3, WorldMut, WorldView};
use ai_goals::{
    Archetype, ArchetypeCatalog, ArchetypeId, Goal, GoalContext, GoalError, GoalId, Priority,
    Runtime,
};
use ai_lifecycle::{LifecycleConfig, Simulation, SimulationConfig, SnapshotSchema};
use ai_memory::{
    DurableStore, DurableValue, Field, InMemoryStore, MemoryStore, Scope, StoreError,
    WorldRegistry,
};

pub const SCORE: Field<i64> = Field::persistent("score", || 0);
pub const TAGS: Field<Vec<String>> = Field::persistent("tags", Vec::new);
pub const WORK: GoalId = GoalId("work");

pub const DEFAULT_SPAWN: Vec3 = Vec3 {
    x: 1.0,
    y: 0.0,
    z: 1.0,
};

/// Ids are never reused. Spawns with negative `x` are invalid.
pub struct TestWorld {
    pub positions: BTreeMap<u64, Vec3>,
    pub next_id: u64,
    pub blocked: bool,
    pub departures: Vec<Departure<u64>>,
}

impl TestWorld {
    pub fn starting_at(next_id: u64) -> Self {
        Self {
            positions: BTreeMap::new(),
            next_id,
            blocked: false,
            departures: Vec::new(),
        }
    }

    pub fn unload(&mut self, agent: u64) {
        if let Some(last_position) = self.positions.remove(&agent) {
            self.departures.push(Departure {
                agent,
                kind: DepartureKind::Unloaded,
                last_position,
            });
        }
    }

    pub fn kill(&mut self, agent: u64) {
        if let Some(last_position) = self.positions.remove(&agent) {
            self.departures.push(Departure {
                agent,
                kind: DepartureKind::Died,
                last_position,
            });
        }
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl WorldView for TestWorld {
    type Agent = u64;

    fn is_alive(&self, agent: u64) -> bool {
        self.positions.contains_key(&agent)
    }

    fn agents(&self) -> Vec<u64> {
        self.positions.keys().copied().collect()
    }

    fn position(&self, agent: u64) -> Option<Vec3> {
        self.positions.get(&agent).copied()
    }

    fn is_valid_spawn(&self, at: Vec3) -> bool {
        at.x >= 0.0
    }

    fn default_spawn(&self) -> Vec3 {
        DEFAULT_SPAWN
    }
}

impl WorldMut for TestWorld {
    fn spawn(&mut self, at: Vec3) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.positions.insert(id, at);
        id
    }

    fn despawn(&mut self, agent: u64) {
        self.positions.remove(&agent);
    }

    fn find_spawn_location(&mut self, _rng: &mut dyn DeterministicRng) -> Option<Vec3> {
        (!self.blocked).then_some(DEFAULT_SPAWN)
    }

    fn move_towards(&mut self, agent: u64, target: Vec3, _speed: f32) -> bool {
        if let Some(p) = self.positions.get_mut(&agent) {
            *p = target;
        }
        true
    }

    fn take_departures(&mut self) -> Vec<Departure<u64>> {
        std::mem::take(&mut self.departures)
    }
}

/// Bumps the persistent score every cycle.
pub struct Work;

impl Goal<TestWorld> for Work {
    fn process(&mut self, cx: &mut GoalContext<'_, TestWorld>) -> Result<(), GoalError> {
        let score = cx.rt.memory.get(cx.agent, SCORE);
        cx.rt.memory.set(cx.agent, SCORE, score + 1)?;
        Ok(())
    }
}

pub fn catalog() -> ArchetypeCatalog<TestWorld> {
    ArchetypeCatalog::new().candidate(
        Archetype::new(ArchetypeId("worker")).goal(WORK, |_| Priority::of(1.0), || Work),
        |_| Priority::of(1.0),
    )
}

pub fn config(cap: i64) -> SimulationConfig {
    SimulationConfig {
        lifecycle: LifecycleConfig {
            check_every_ticks: 1,
            checkpoint_every_ticks: 0,
            initial_max_population: cap,
            schema: SnapshotSchema::new().field(SCORE).field(TAGS),
        },
        ..SimulationConfig::default()
    }
}

pub fn runtime_on(backend: &Rc<RefCell<InMemoryStore>>) -> Runtime<TestWorld> {
    let mut rt = Runtime::new(
        MemoryStore::new(backend.clone()),
        WorldRegistry::new(backend.clone()),
    );
    rt.events = ai_core::EventBus::recording();
    rt
}

pub fn simulation(cap: i64) -> Simulation<TestWorld> {
    Simulation::new(TestWorld::default(), Runtime::in_memory(), catalog(), config(cap)).unwrap()
}

/// Shared backend that rejects world-scope writes while `fail_world` is set.
#[derive(Clone)]
pub struct FlakyStore {
    pub inner: Rc<RefCell<InMemoryStore>>,
    pub fail_world: Rc<Cell<bool>>,
}

impl DurableStore for FlakyStore {
    fn load(&mut self, scope: Scope, field: &str) -> Result<Option<DurableValue>, StoreError> {
        self.inner.borrow_mut().load(scope, field)
    }

    fn store(&mut self, scope: Scope, field: &str, value: DurableValue) -> Result<(), StoreError> {
        if scope == Scope::World && self.fail_world.get() {
            return Err(StoreError::Io {
                path: "world.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.inner.borrow_mut().store(scope, field, value)
    }
}

/// Simulation over a [`FlakyStore`], plus the switch that makes registry writes fail.
pub fn flaky_simulation(cap: i64) -> (Simulation<TestWorld>, Rc<Cell<bool>>) {
    let store = FlakyStore {
        inner: InMemoryStore::shared(),
        fail_world: Rc::new(Cell::new(false)),
    };
    let fail_world = store.fail_world.clone();
    let mut rt = Runtime::new(
        MemoryStore::new(store.clone()),
        WorldRegistry::new(store),
    );
    rt.events = ai_core::EventBus::recording();
    let sim = Simulation::new(TestWorld::default(), rt, catalog(), config(cap)).unwrap();
    (sim, fail_world)
}
