use crate::{AgentId, DeterministicRng, Vec3};

/// Read-only world access.
///
/// The core crate only prescribes what the decision engine itself needs:
/// liveness, enumeration and positions. Perception queries belong in
/// extension traits defined next to the behaviors that use them.
pub trait WorldView {
    type Agent: AgentId;

    /// Whether `agent` still refers to a live entity.
    fn is_alive(&self, agent: Self::Agent) -> bool;

    /// Live agents in ascending `Ord` order.
    fn agents(&self) -> Vec<Self::Agent>;

    fn position(&self, agent: Self::Agent) -> Option<Vec3>;

    /// Whether an agent may be placed at `at`.
    fn is_valid_spawn(&self, at: Vec3) -> bool;

    /// Fallback location for restores whose captured position is no longer
    /// valid. Should pass [`WorldView::is_valid_spawn`] whenever the world can
    /// offer such a location at all.
    fn default_spawn(&self) -> Vec3;

    fn live_count(&self) -> usize {
        self.agents().len()
    }
}

/// Why an agent left the world without being removed by the lifecycle manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartureKind {
    /// Permanently gone; nothing is carried forward.
    Died,
    /// Left simulation range; its state should be queued for restore.
    Unloaded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Departure<A> {
    pub agent: A,
    pub kind: DepartureKind,
    pub last_position: Vec3,
}

/// Write access / effect sink.
pub trait WorldMut: WorldView {
    fn spawn(&mut self, at: Vec3) -> Self::Agent;

    fn despawn(&mut self, agent: Self::Agent);

    /// Pick a spawn location for population control, if one exists right now.
    fn find_spawn_location(&mut self, rng: &mut dyn DeterministicRng) -> Option<Vec3>;

    /// Movement primitive (pathfinding is the world's business).
    /// Returns `true` once `target` is reached.
    fn move_towards(&mut self, agent: Self::Agent, target: Vec3, speed: f32) -> bool;

    /// Drain agents that left since the previous call.
    fn take_departures(&mut self) -> Vec<Departure<Self::Agent>> {
        Vec::new()
    }
}
