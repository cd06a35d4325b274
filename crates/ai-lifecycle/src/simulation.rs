use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use ai_core::{AgentId, DepartureKind, EventKind, LogicalName, TickContext, Vec3, WorldMut};
use ai_goals::{Arbiter, ArchetypeCatalog, Runtime, ARCHETYPE};
use serde::Serialize;

use crate::{
    logical_name_of, LifecycleConfig, LifecycleError, LifecycleManager, PopulationPlan,
    SerializedSnapshot, SnapshotQueue, AGENT_CHECKPOINTS, LAST_RELOCATED, LOGICAL_NAME,
    MAX_POPULATION,
};

const SPAWN_STREAM: u64 = 0x5350_4157;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub dt_seconds: f32,
    pub seed: u64,
    pub lifecycle: LifecycleConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt_seconds: 0.05,
            seed: 0,
            lifecycle: LifecycleConfig::default(),
        }
    }
}

/// How an agent is taken out of simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Snapshot and queue it for a later restore.
    Evict,
    /// Gone for good.
    Discard,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub timers_fired: usize,
    pub switches: usize,
    pub departed: usize,
    pub restored: usize,
    pub spawned: usize,
    pub evicted: usize,
    pub dropped_snapshots: usize,
    pub checkpointed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStatus {
    pub id: u64,
    pub logical_name: String,
    pub archetype: String,
    pub goal: Option<String>,
    pub position: Option<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationStatus {
    pub tick: u64,
    pub live: usize,
    pub queued: usize,
    pub max_population: i64,
    pub pending_timers: usize,
    pub agents: Vec<AgentStatus>,
}

/// Single-threaded tick driver tying world, brains and lifecycle together.
///
/// Each [`Simulation::advance`] runs, in order: due timers, world-reported
/// departures, brain reconciliation, one arbitration cycle per live agent in
/// ascending id order, population control, checkpoints, and cache sweeps.
pub struct Simulation<W>
where
    W: WorldMut + 'static,
{
    world: W,
    rt: Runtime<W>,
    catalog: ArchetypeCatalog<W>,
    brains: BTreeMap<W::Agent, Arbiter<W>>,
    lifecycle: LifecycleManager,
    config: SimulationConfig,
    tick: u64,
}

impl<W> Simulation<W>
where
    W: WorldMut + 'static,
{
    pub fn new(
        world: W,
        mut rt: Runtime<W>,
        catalog: ArchetypeCatalog<W>,
        config: SimulationConfig,
    ) -> Result<Self, LifecycleError> {
        if rt
            .registry
            .initialize(MAX_POPULATION, config.lifecycle.initial_max_population)?
        {
            tracing::info!(
                cap = config.lifecycle.initial_max_population,
                "population cap initialized"
            );
        }
        let lifecycle = LifecycleManager::new(config.lifecycle.clone());
        Ok(Self {
            world,
            rt,
            catalog,
            brains: BTreeMap::new(),
            lifecycle,
            config,
            tick: 0,
        })
    }

    /// Resume counting from `tick`, e.g. after reloading a persisted world.
    pub fn starting_at(mut self, tick: u64) -> Self {
        self.tick = tick;
        self
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn runtime(&self) -> &Runtime<W> {
        &self.rt
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime<W> {
        &mut self.rt
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The next tick [`Simulation::advance`] will run.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn brain(&self, agent: W::Agent) -> Option<&Arbiter<W>> {
        self.brains.get(&agent)
    }

    pub fn tick_context(&self) -> TickContext {
        TickContext::new(self.tick, self.config.dt_seconds, self.config.seed)
    }

    pub fn max_population(&mut self) -> usize {
        usize::try_from(self.rt.registry.get(MAX_POPULATION)).unwrap_or(0)
    }

    pub fn queued(&mut self) -> usize {
        SnapshotQueue::new(&mut self.rt.registry).len()
    }

    pub fn advance(&mut self) -> TickReport {
        let ctx = self.tick_context();
        let mut report = TickReport {
            tick: ctx.tick,
            ..TickReport::default()
        };

        report.timers_fired = self.rt.timers.run_due(&ctx, &mut self.world);
        report.departed = self.handle_departures(&ctx);
        self.reconcile(&ctx);

        for agent in self.world.agents() {
            // An earlier agent's goal may have removed this one.
            if !self.world.is_alive(agent) {
                continue;
            }
            let Some(brain) = self.brains.get_mut(&agent) else {
                continue;
            };
            if brain.tick(&ctx, agent, &mut self.world, &mut self.rt).is_some() {
                report.switches += 1;
            }
        }

        if self.lifecycle.check_due(ctx.tick) {
            self.control_population(&ctx, &mut report);
        }
        if self.lifecycle.checkpoint_due(ctx.tick) {
            match self.checkpoint() {
                Ok(n) => report.checkpointed = n,
                Err(err) => tracing::warn!(error = %err, "checkpoint failed"),
            }
        }

        let world = &self.world;
        if let Some(swept) = self.rt.memory.sweep_if_due(ctx.tick, |a| world.is_alive(a)) {
            let sensors = self.rt.sensors.sweep(|a| world.is_alive(a));
            tracing::trace!(
                persistent = swept.persistent,
                transient = swept.transient,
                sensors,
                "memory swept"
            );
        }

        self.tick += 1;
        report
    }

    fn handle_departures(&mut self, ctx: &TickContext) -> usize {
        let departures = self.world.take_departures();
        for departure in departures.iter() {
            let agent = departure.agent;
            self.drop_brain(ctx, agent);
            self.rt.timers.cancel_owned_by(agent);
            self.rt.sensors.forget(agent);
            match departure.kind {
                DepartureKind::Died => {
                    let name = self.rt.memory.get(agent, LOGICAL_NAME);
                    if let Err(err) = self.forget_checkpoint(&name) {
                        tracing::warn!(
                            agent = agent.stable_id(),
                            error = %err,
                            "could not drop checkpoint of dead agent"
                        );
                    }
                    tracing::debug!(agent = agent.stable_id(), logical_name = %name, "agent died");
                }
                DepartureKind::Unloaded => {
                    match self.enqueue(ctx, agent, departure.last_position) {
                        Ok(name) => tracing::info!(
                            agent = agent.stable_id(),
                            logical_name = %name,
                            "unloaded agent queued"
                        ),
                        Err(err) => tracing::warn!(
                            agent = agent.stable_id(),
                            error = %err,
                            "could not queue unloaded agent"
                        ),
                    }
                    self.rt.memory.forget(agent);
                }
            }
        }
        departures.len()
    }

    /// Give every live agent a brain and retire brains of agents that vanished.
    fn reconcile(&mut self, ctx: &TickContext) {
        let world = &self.world;
        let gone: Vec<W::Agent> = self
            .brains
            .keys()
            .copied()
            .filter(|a| !world.is_alive(*a))
            .collect();
        for agent in gone {
            self.drop_brain(ctx, agent);
            self.rt.timers.cancel_owned_by(agent);
            self.rt.sensors.forget(agent);
        }

        for agent in self.world.agents() {
            if !self.brains.contains_key(&agent) {
                self.attach(ctx, agent);
            }
        }
    }

    fn attach(&mut self, ctx: &TickContext, agent: W::Agent) -> bool {
        if let Err(err) = logical_name_of(&mut self.rt.memory, agent) {
            tracing::warn!(
                agent = agent.stable_id(),
                error = %err,
                "could not persist logical name"
            );
        }
        let Some(archetype) = self.catalog.assign(ctx, agent, &self.world, &mut self.rt) else {
            tracing::warn!(
                agent = agent.stable_id(),
                "no eligible archetype, agent left idle"
            );
            return false;
        };
        let mut brain = Arbiter::new(archetype);
        brain.resume(ctx, agent, &mut self.world, &mut self.rt);
        self.brains.insert(agent, brain);
        true
    }

    fn drop_brain(&mut self, ctx: &TickContext, agent: W::Agent) {
        if let Some(mut brain) = self.brains.remove(&agent) {
            brain.shutdown(ctx, agent, &mut self.world, &mut self.rt);
        }
    }

    fn control_population(&mut self, ctx: &TickContext, report: &mut TickReport) {
        let cap = self.max_population();
        let live = self.world.live_count();
        let queued = self.queued();
        let plan = LifecycleManager::plan(live, queued, cap);
        tracing::trace!(live, queued, cap, ?plan, "population check");

        match plan {
            PopulationPlan::Hold => {}
            PopulationPlan::Evict(n) => {
                let mut agents = self.world.agents();
                agents.sort_by_key(|a| Reverse(a.stable_id()));
                for agent in agents.into_iter().take(n) {
                    match self.remove_at(ctx, agent, Removal::Evict) {
                        Ok(_) => report.evicted += 1,
                        Err(err) => tracing::warn!(
                            agent = agent.stable_id(),
                            error = %err,
                            "eviction failed"
                        ),
                    }
                }
            }
            PopulationPlan::Restore | PopulationPlan::SpawnFresh => {
                let mut rng = ctx.rng_for_world(SPAWN_STREAM);
                let Some(at) = self.world.find_spawn_location(&mut rng) else {
                    tracing::debug!("no spawn location this check");
                    return;
                };
                if plan == PopulationPlan::Restore {
                    match self.restore_next(ctx, report) {
                        Ok(Some(_)) => report.restored += 1,
                        Ok(None) => {}
                        Err(err) => tracing::warn!(
                            error = %err,
                            "restore failed, retrying on a later check"
                        ),
                    }
                } else {
                    self.spawn_fresh(ctx, at);
                    report.spawned += 1;
                }
            }
        }
    }

    /// Restore the oldest decodable snapshot. Malformed blobs ahead of it are dropped.
    fn restore_next(
        &mut self,
        ctx: &TickContext,
        report: &mut TickReport,
    ) -> Result<Option<W::Agent>, LifecycleError> {
        loop {
            let Some(blob) = SnapshotQueue::new(&mut self.rt.registry).front() else {
                return Ok(None);
            };
            let snapshot = match SerializedSnapshot::decode(&blob) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    tracing::warn!(error = %err, "dropping malformed snapshot");
                    SnapshotQueue::new(&mut self.rt.registry).pop_front_if(&blob)?;
                    self.rt.publish(
                        ctx.tick,
                        None,
                        EventKind::SnapshotDropped {
                            reason: err.to_string(),
                        },
                    );
                    report.dropped_snapshots += 1;
                    continue;
                }
            };

            let location = if self.world.is_valid_spawn(snapshot.position) {
                snapshot.position
            } else {
                let fallback = self.world.default_spawn();
                tracing::warn!(
                    logical_name = %snapshot.logical_name,
                    "snapshot position is not a valid spawn, using default"
                );
                fallback
            };

            let agent = self.world.spawn(location);
            let replayed = self
                .lifecycle
                .restore_into(&snapshot, agent, &mut self.rt.memory, ctx.tick)
                .and_then(|()| {
                    SnapshotQueue::new(&mut self.rt.registry).pop_front_if(&blob)?;
                    Ok(())
                });
            if let Err(err) = replayed {
                self.world.despawn(agent);
                self.rt.forget(agent);
                return Err(err);
            }

            self.attach(ctx, agent);
            self.rt.publish(
                ctx.tick,
                Some(agent),
                EventKind::AgentRestored {
                    logical_name: snapshot.logical_name.to_string(),
                },
            );
            tracing::info!(
                agent = agent.stable_id(),
                logical_name = %snapshot.logical_name,
                captured_tick = snapshot.captured_tick,
                "agent restored"
            );
            return Ok(Some(agent));
        }
    }

    fn spawn_fresh(&mut self, ctx: &TickContext, at: Vec3) -> W::Agent {
        let agent = self.world.spawn(at);
        let name = match logical_name_of(&mut self.rt.memory, agent) {
            Ok(name) => name.into_string(),
            Err(err) => {
                tracing::warn!(
                    agent = agent.stable_id(),
                    error = %err,
                    "could not persist logical name"
                );
                String::new()
            }
        };
        if let Err(err) = self.rt.memory.set(agent, LAST_RELOCATED, ctx.tick as i64) {
            tracing::warn!(
                agent = agent.stable_id(),
                error = %err,
                "could not persist relocation tick"
            );
        }
        self.attach(ctx, agent);
        self.rt.publish(
            ctx.tick,
            Some(agent),
            EventKind::AgentSpawned {
                logical_name: name.clone(),
            },
        );
        tracing::info!(agent = agent.stable_id(), logical_name = %name, "agent spawned");
        agent
    }

    fn enqueue(
        &mut self,
        ctx: &TickContext,
        agent: W::Agent,
        position: Vec3,
    ) -> Result<LogicalName, LifecycleError> {
        let snapshot = self
            .lifecycle
            .capture(agent, position, &mut self.rt.memory, ctx.tick)?;
        let blob = snapshot.encode()?;
        let bound = self.max_population();
        SnapshotQueue::new(&mut self.rt.registry).push_back(blob, bound)?;
        Ok(snapshot.logical_name)
    }

    /// Take a live agent out of simulation. Returns its logical name when evicted.
    pub fn remove_agent(
        &mut self,
        agent: W::Agent,
        removal: Removal,
    ) -> Result<Option<LogicalName>, LifecycleError> {
        let ctx = self.tick_context();
        self.remove_at(&ctx, agent, removal)
    }

    fn remove_at(
        &mut self,
        ctx: &TickContext,
        agent: W::Agent,
        removal: Removal,
    ) -> Result<Option<LogicalName>, LifecycleError> {
        if !self.world.is_alive(agent) {
            return Err(LifecycleError::UnknownAgent(agent.stable_id()));
        }
        // on_exit may still write fields that belong in the snapshot.
        self.drop_brain(ctx, agent);

        let name = match removal {
            Removal::Evict => {
                let position = self
                    .world
                    .position(agent)
                    .unwrap_or_else(|| self.world.default_spawn());
                match self.enqueue(ctx, agent, position) {
                    Ok(name) => Some(name),
                    Err(err) => {
                        self.attach(ctx, agent);
                        return Err(err);
                    }
                }
            }
            Removal::Discard => {
                let discarded = self.rt.memory.get(agent, LOGICAL_NAME);
                if let Err(err) = self.forget_checkpoint(&discarded) {
                    self.attach(ctx, agent);
                    return Err(err);
                }
                None
            }
        };

        self.world.despawn(agent);
        self.rt.forget(agent);
        match &name {
            Some(name) => {
                self.rt.publish(
                    ctx.tick,
                    Some(agent),
                    EventKind::AgentEvicted {
                        logical_name: name.to_string(),
                    },
                );
                tracing::info!(agent = agent.stable_id(), logical_name = %name, "agent evicted");
            }
            None => tracing::info!(agent = agent.stable_id(), "agent discarded"),
        }
        Ok(name)
    }

    /// Write a snapshot of every live agent into the checkpoint cell.
    pub fn checkpoint(&mut self) -> Result<usize, LifecycleError> {
        let tick = self.tick;
        let mut blobs = Vec::new();
        for agent in self.world.agents() {
            let position = self
                .world
                .position(agent)
                .unwrap_or_else(|| self.world.default_spawn());
            let blob = self
                .lifecycle
                .capture(agent, position, &mut self.rt.memory, tick)
                .and_then(|s| Ok(s.encode()?));
            match blob {
                Ok(blob) => blobs.push(blob),
                Err(err) => tracing::warn!(
                    agent = agent.stable_id(),
                    error = %err,
                    "checkpoint capture failed"
                ),
            }
        }
        let n = blobs.len();
        self.rt.registry.set(AGENT_CHECKPOINTS, blobs)?;
        tracing::debug!(agents = n, tick, "checkpoint written");
        Ok(n)
    }

    /// Remove `logical_name` from the checkpoint cell so a crash cannot bring it back.
    fn forget_checkpoint(&mut self, logical_name: &str) -> Result<bool, LifecycleError> {
        if logical_name.is_empty() {
            return Ok(false);
        }
        let mut blobs = self.rt.registry.get(AGENT_CHECKPOINTS);
        let before = blobs.len();
        blobs.retain(|blob| {
            SerializedSnapshot::decode(blob)
                .map_or(true, |s| s.logical_name.as_str() != logical_name)
        });
        if blobs.len() == before {
            return Ok(false);
        }
        self.rt.registry.set(AGENT_CHECKPOINTS, blobs)?;
        Ok(true)
    }

    /// Re-queue checkpointed agents that are neither live nor already queued,
    /// e.g. after a crash lost every live entity. Clears the checkpoint cell.
    pub fn recover_from_checkpoints(&mut self) -> Result<usize, LifecycleError> {
        let mut known: BTreeSet<String> = BTreeSet::new();
        for agent in self.world.agents() {
            known.insert(self.rt.memory.get(agent, LOGICAL_NAME));
        }
        for blob in SnapshotQueue::new(&mut self.rt.registry).blobs() {
            if let Ok(snapshot) = SerializedSnapshot::decode(&blob) {
                known.insert(snapshot.logical_name.into_string());
            }
        }

        let bound = self.max_population();
        let mut requeued = 0;
        for blob in self.rt.registry.get(AGENT_CHECKPOINTS) {
            let snapshot = match SerializedSnapshot::decode(&blob) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping malformed checkpoint");
                    continue;
                }
            };
            if !known.insert(snapshot.logical_name.into_string()) {
                continue;
            }
            SnapshotQueue::new(&mut self.rt.registry).push_back(blob, bound)?;
            requeued += 1;
        }
        self.rt.registry.set(AGENT_CHECKPOINTS, Vec::new())?;
        tracing::info!(requeued, "recovered agents from checkpoints");
        Ok(requeued)
    }

    pub fn clear_snapshot_queue(&mut self) -> Result<usize, LifecycleError> {
        let cleared = SnapshotQueue::new(&mut self.rt.registry).clear()?;
        tracing::info!(cleared, "snapshot queue cleared");
        Ok(cleared)
    }

    /// Change the authoritative cap. Excess queued snapshots (oldest first) are dropped;
    /// excess live agents are evicted by the next population check.
    pub fn set_population_cap(&mut self, cap: i64) -> Result<(), LifecycleError> {
        let bound = usize::try_from(cap).map_err(|_| LifecycleError::InvalidCap(cap))?;
        self.rt.registry.set(MAX_POPULATION, cap)?;
        let dropped = SnapshotQueue::new(&mut self.rt.registry).retain_newest(bound)?;
        if dropped > 0 {
            tracing::warn!(dropped, cap, "queued snapshots dropped to fit new cap");
        }
        self.rt
            .publish(self.tick, None, EventKind::PopulationCapChanged { cap });
        tracing::info!(cap, "population cap changed");
        Ok(())
    }

    pub fn status(&mut self) -> SimulationStatus {
        let agents = self
            .world
            .agents()
            .into_iter()
            .map(|agent| AgentStatus {
                id: agent.stable_id(),
                logical_name: self.rt.memory.get(agent, LOGICAL_NAME),
                archetype: self.rt.memory.get(agent, ARCHETYPE),
                goal: self
                    .brains
                    .get(&agent)
                    .and_then(|b| b.current_goal())
                    .map(|g| g.0.to_string()),
                position: self.world.position(agent),
            })
            .collect::<Vec<_>>();
        SimulationStatus {
            tick: self.tick,
            live: agents.len(),
            queued: self.queued(),
            max_population: self.rt.registry.get(MAX_POPULATION),
            pending_timers: self.rt.timers.len(),
            agents,
        }
    }
}
