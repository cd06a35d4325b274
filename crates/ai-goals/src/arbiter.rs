use std::rc::Rc;

use ai_core::{AgentId, EventKind, TickContext, WorldMut};

use crate::{
    select_winner, Archetype, CurrentGoal, Goal, GoalContext, GoalId, Priority, PriorityContext,
    Runtime, CURRENT_GOAL,
};

struct ActiveGoal<W>
where
    W: WorldMut + 'static,
{
    index: usize,
    goal: Box<dyn Goal<W>>,
    entered_tick: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalSwitch {
    pub from: Option<GoalId>,
    pub to: GoalId,
}

/// Owns the active goal of one agent.
pub struct Arbiter<W>
where
    W: WorldMut + 'static,
{
    archetype: Rc<Archetype<W>>,
    active: Option<ActiveGoal<W>>,
    scores: Vec<Priority>,
}

impl<W> Arbiter<W>
where
    W: WorldMut + 'static,
{
    pub fn new(archetype: Rc<Archetype<W>>) -> Self {
        let scores = Vec::with_capacity(archetype.len());
        Self {
            archetype,
            active: None,
            scores,
        }
    }

    pub fn archetype(&self) -> &Archetype<W> {
        &self.archetype
    }

    pub fn current_goal(&self) -> Option<GoalId> {
        self.active
            .as_ref()
            .map(|a| self.archetype.goals[a.index].id)
    }

    pub fn state_time(&self, tick: u64) -> Option<u64> {
        self.active
            .as_ref()
            .map(|a| tick.saturating_sub(a.entered_tick))
    }

    /// Scores of the last arbitration cycle, in registration order.
    pub fn last_scores(&self) -> &[Priority] {
        &self.scores
    }

    fn current_view(&self, tick: u64) -> Option<CurrentGoal> {
        self.active.as_ref().map(|a| CurrentGoal {
            id: self.archetype.goals[a.index].id,
            state_time: tick.saturating_sub(a.entered_tick),
            complete: a.goal.is_complete(),
        })
    }

    /// Re-enter the persisted goal after a restart or restore. No switch is reported.
    pub fn resume(
        &mut self,
        tick: &TickContext,
        agent: W::Agent,
        world: &mut W,
        rt: &mut Runtime<W>,
    ) -> Option<GoalId> {
        if self.active.is_some() {
            return None;
        }
        let persisted = rt.memory.get(agent, CURRENT_GOAL);
        if persisted.is_empty() {
            return None;
        }
        let Some(index) = self.archetype.index_of(&persisted) else {
            tracing::warn!(
                agent = agent.stable_id(),
                goal = %persisted,
                archetype = %self.archetype.id(),
                "persisted goal not in archetype, ignoring"
            );
            return None;
        };

        let entry = &self.archetype.goals[index];
        let mut goal = (entry.factory)();
        let mut cx = GoalContext::new(tick, agent, world, rt);
        if let Err(err) = goal.on_enter(&mut cx) {
            tracing::warn!(
                agent = agent.stable_id(),
                goal = %entry.id,
                error = %err,
                "on_enter failed"
            );
        }
        self.active = Some(ActiveGoal {
            index,
            goal,
            entered_tick: tick.tick,
        });
        tracing::debug!(agent = agent.stable_id(), goal = %entry.id, "resumed goal");
        Some(entry.id)
    }

    /// Score every goal and switch if the winner differs from the active goal.
    ///
    /// When nothing is eligible the active goal (if any) is kept.
    pub fn arbitrate(
        &mut self,
        tick: &TickContext,
        agent: W::Agent,
        world: &mut W,
        rt: &mut Runtime<W>,
    ) -> Option<GoalSwitch> {
        let current = self.current_view(tick.tick);
        let current_index = self.active.as_ref().map(|a| a.index);

        self.scores.clear();
        {
            let mut cx = PriorityContext {
                tick,
                agent,
                world: &*world,
                rt: &mut *rt,
                current,
            };
            for entry in self.archetype.goals.iter() {
                self.scores.push((entry.priority)(&mut cx));
            }
        }

        let winner = select_winner(&self.scores, current_index)?;
        if Some(winner) == current_index {
            return None;
        }
        Some(self.switch_to(winner, tick, agent, world, rt))
    }

    fn switch_to(
        &mut self,
        index: usize,
        tick: &TickContext,
        agent: W::Agent,
        world: &mut W,
        rt: &mut Runtime<W>,
    ) -> GoalSwitch {
        let archetype = self.archetype.clone();
        let entry = &archetype.goals[index];
        let from = self.current_goal();

        if let Some(mut outgoing) = self.active.take() {
            let mut cx = GoalContext::new(tick, agent, &mut *world, &mut *rt);
            if let Err(err) = outgoing.goal.on_exit(&mut cx) {
                tracing::warn!(
                    agent = agent.stable_id(),
                    goal = ?from,
                    error = %err,
                    "on_exit failed"
                );
            }
            outgoing.goal.destroy(&mut cx);
        }
        rt.publish(tick.tick, Some(agent), EventKind::TargetReset);

        let mut goal = (entry.factory)();
        {
            let mut cx = GoalContext::new(tick, agent, &mut *world, &mut *rt);
            if let Err(err) = goal.on_enter(&mut cx) {
                tracing::warn!(
                    agent = agent.stable_id(),
                    goal = %entry.id,
                    error = %err,
                    "on_enter failed"
                );
            }
        }
        self.active = Some(ActiveGoal {
            index,
            goal,
            entered_tick: tick.tick,
        });

        if let Err(err) = rt.memory.set(agent, CURRENT_GOAL, entry.id.0.to_string()) {
            tracing::warn!(agent = agent.stable_id(), error = %err, "could not persist goal id");
        }
        rt.publish(
            tick.tick,
            Some(agent),
            EventKind::GoalSwitched {
                from: from.map(|g| g.0.into()),
                to: entry.id.0.into(),
            },
        );
        tracing::debug!(
            agent = agent.stable_id(),
            from = from.map(|g| g.0).unwrap_or("-"),
            to = %entry.id,
            "goal switched"
        );

        GoalSwitch { from, to: entry.id }
    }

    /// Run `process` on the active goal. Errors are logged, never propagated.
    pub fn process(
        &mut self,
        tick: &TickContext,
        agent: W::Agent,
        world: &mut W,
        rt: &mut Runtime<W>,
    ) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let mut cx = GoalContext::new(tick, agent, world, rt);
        if let Err(err) = active.goal.process(&mut cx) {
            tracing::warn!(
                agent = agent.stable_id(),
                goal = %self.archetype.goals[active.index].id,
                error = %err,
                "goal process failed"
            );
        }
    }

    /// One arbitration cycle: arbitrate, then process the (possibly new) active goal.
    pub fn tick(
        &mut self,
        tick: &TickContext,
        agent: W::Agent,
        world: &mut W,
        rt: &mut Runtime<W>,
    ) -> Option<GoalSwitch> {
        let switch = self.arbitrate(tick, agent, world, rt);
        self.process(tick, agent, world, rt);
        switch
    }

    /// Exit and destroy the active goal because the agent leaves simulation.
    /// The persisted goal id is kept so a restored agent can resume.
    pub fn shutdown(
        &mut self,
        tick: &TickContext,
        agent: W::Agent,
        world: &mut W,
        rt: &mut Runtime<W>,
    ) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        let mut cx = GoalContext::new(tick, agent, world, rt);
        if let Err(err) = active.goal.on_exit(&mut cx) {
            tracing::warn!(
                agent = agent.stable_id(),
                error = %err,
                "on_exit failed during shutdown"
            );
        }
        active.goal.destroy(&mut cx);
    }
}
