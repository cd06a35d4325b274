use core::fmt;

use ai_core::{EventKind, TickContext, TimerControl, TimerHandle, WorldMut};

use crate::{GoalError, Runtime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GoalId(pub &'static str);

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// What priority functions may know about the active goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentGoal {
    pub id: GoalId,
    /// Ticks since `on_enter`.
    pub state_time: u64,
    pub complete: bool,
}

/// A stateful behavior with a fixed lifecycle:
///
/// `on_enter` once, `process` once per arbitration cycle while active,
/// `on_exit` once, then `destroy` once, all before the next goal's `on_enter`.
///
/// `destroy` must release anything the goal scheduled; owned timers of a
/// despawned agent are dropped by the scheduler, but a goal that is switched
/// away from while its agent lives must cancel its own.
pub trait Goal<W>: 'static
where
    W: WorldMut + 'static,
{
    fn on_enter(&mut self, _cx: &mut GoalContext<'_, W>) -> Result<(), GoalError> {
        Ok(())
    }

    fn process(&mut self, cx: &mut GoalContext<'_, W>) -> Result<(), GoalError>;

    fn on_exit(&mut self, _cx: &mut GoalContext<'_, W>) -> Result<(), GoalError> {
        Ok(())
    }

    fn destroy(&mut self, _cx: &mut GoalContext<'_, W>) {}

    /// Set once the goal achieved what it was selected for; sibling priority
    /// functions read it to avoid re-triggering right after success.
    fn is_complete(&self) -> bool {
        false
    }
}

pub struct GoalContext<'a, W>
where
    W: WorldMut + 'static,
{
    pub tick: &'a TickContext,
    pub agent: W::Agent,
    pub world: &'a mut W,
    pub rt: &'a mut Runtime<W>,
}

impl<'a, W> GoalContext<'a, W>
where
    W: WorldMut + 'static,
{
    pub fn new(
        tick: &'a TickContext,
        agent: W::Agent,
        world: &'a mut W,
        rt: &'a mut Runtime<W>,
    ) -> Self {
        Self {
            tick,
            agent,
            world,
            rt,
        }
    }

    pub fn now(&self) -> u64 {
        self.tick.tick
    }

    pub fn milestone(&mut self, name: &'static str, reached: bool) {
        self.rt.publish(
            self.tick.tick,
            Some(self.agent),
            EventKind::Milestone {
                name: name.into(),
                reached,
            },
        );
    }

    /// One-shot timer owned by this agent, tagged with `group`.
    pub fn after(
        &mut self,
        delay: u64,
        group: &'static str,
        callback: impl FnOnce(&TickContext, &mut W) + 'static,
    ) -> TimerHandle {
        self.rt
            .timers
            .once(self.tick.tick, delay, Some(self.agent), Some(group), callback)
    }

    pub fn every(
        &mut self,
        period: u64,
        group: &'static str,
        callback: impl FnMut(&TickContext, &mut W) -> TimerControl + 'static,
    ) -> TimerHandle {
        self.rt
            .timers
            .repeating(self.tick.tick, period, Some(self.agent), Some(group), callback)
    }

    pub fn cancel_timers(&mut self, group: &'static str) -> usize {
        self.rt.timers.cancel_group(self.agent, group)
    }
}
