use core::fmt;
use std::rc::Rc;

use ai_core::{AgentId, TickContext, WorldMut};

use crate::{select_winner, Goal, GoalId, Priority, PriorityContext, Runtime, ARCHETYPE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchetypeId(pub &'static str);

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

pub type PriorityFn<W> = Box<dyn Fn(&mut PriorityContext<'_, W>) -> Priority>;
pub type GoalFactory<W> = Box<dyn Fn() -> Box<dyn Goal<W>>>;

pub(crate) struct GoalEntry<W>
where
    W: WorldMut + 'static,
{
    pub(crate) id: GoalId,
    pub(crate) priority: PriorityFn<W>,
    pub(crate) factory: GoalFactory<W>,
}

/// A closed goal set plus the priority rules of one behavior category.
pub struct Archetype<W>
where
    W: WorldMut + 'static,
{
    id: ArchetypeId,
    pub(crate) goals: Vec<GoalEntry<W>>,
}

impl<W> Archetype<W>
where
    W: WorldMut + 'static,
{
    pub fn new(id: ArchetypeId) -> Self {
        Self {
            id,
            goals: Vec::new(),
        }
    }

    /// Register a goal. Registration order is the tie-break order.
    pub fn goal<G>(
        mut self,
        id: GoalId,
        priority: impl Fn(&mut PriorityContext<'_, W>) -> Priority + 'static,
        factory: impl Fn() -> G + 'static,
    ) -> Self
    where
        G: Goal<W>,
    {
        if self.index_of(id.0).is_some() {
            tracing::warn!(archetype = %self.id, goal = %id, "duplicate goal id ignored");
            return self;
        }
        self.goals.push(GoalEntry {
            id,
            priority: Box::new(priority),
            factory: Box::new(move || Box::new(factory()) as Box<dyn Goal<W>>),
        });
        self
    }

    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    pub fn goal_ids(&self) -> impl Iterator<Item = GoalId> + '_ {
        self.goals.iter().map(|g| g.id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.goals.iter().position(|g| g.id.0 == id)
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }
}

/// Closed set of archetype candidates, resolved once per fresh agent.
pub struct ArchetypeCatalog<W>
where
    W: WorldMut + 'static,
{
    candidates: Vec<(Rc<Archetype<W>>, PriorityFn<W>)>,
}

impl<W> Default for ArchetypeCatalog<W>
where
    W: WorldMut + 'static,
{
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }
}

impl<W> ArchetypeCatalog<W>
where
    W: WorldMut + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn candidate(
        mut self,
        archetype: Archetype<W>,
        priority: impl Fn(&mut PriorityContext<'_, W>) -> Priority + 'static,
    ) -> Self {
        self.candidates
            .push((Rc::new(archetype), Box::new(priority)));
        self
    }

    pub fn get(&self, id: &str) -> Option<Rc<Archetype<W>>> {
        self.candidates
            .iter()
            .find(|(a, _)| a.id().0 == id)
            .map(|(a, _)| a.clone())
    }

    pub fn ids(&self) -> impl Iterator<Item = ArchetypeId> + '_ {
        self.candidates.iter().map(|(a, _)| a.id())
    }

    /// Same rule as goal selection: strict maximum, lowest index on ties.
    pub fn select(&self, cx: &mut PriorityContext<'_, W>) -> Option<Rc<Archetype<W>>> {
        let scores: Vec<Priority> = self.candidates.iter().map(|(_, p)| p(&mut *cx)).collect();
        select_winner(&scores, None).map(|i| self.candidates[i].0.clone())
    }

    /// Archetype for `agent`: the persisted one if it is still in the catalog,
    /// otherwise a fresh selection, persisted.
    pub fn assign(
        &self,
        tick: &TickContext,
        agent: W::Agent,
        world: &W,
        rt: &mut Runtime<W>,
    ) -> Option<Rc<Archetype<W>>> {
        let persisted = rt.memory.get(agent, ARCHETYPE);
        if !persisted.is_empty() {
            if let Some(found) = self.get(&persisted) {
                return Some(found);
            }
            tracing::warn!(
                agent = agent.stable_id(),
                archetype = %persisted,
                "persisted archetype no longer exists, reselecting"
            );
        }

        let mut cx = PriorityContext {
            tick,
            agent,
            world,
            rt: &mut *rt,
            current: None,
        };
        let chosen = self.select(&mut cx)?;
        if let Err(err) = rt.memory.set(agent, ARCHETYPE, chosen.id().0.to_string()) {
            tracing::warn!(agent = agent.stable_id(), error = %err, "could not persist archetype");
        }
        tracing::debug!(agent = agent.stable_id(), archetype = %chosen.id(), "archetype assigned");
        Some(chosen)
    }
}
