//! Delayed and repeating callbacks.
//!
//! A callback may outlive the agent that scheduled it. Owned timers are
//! checked against [`WorldView::is_alive`] right before firing and are
//! dropped, not fired, once their owner is gone.

use std::collections::BTreeMap;

use crate::{AgentId, TickContext, WorldView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

/// Returned by a callback to decide whether a repeating timer keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerControl {
    Continue,
    Stop,
}

type Callback<W> = Box<dyn FnMut(&TickContext, &mut W) -> TimerControl>;

struct Timer<W>
where
    W: WorldView + 'static,
{
    due: u64,
    every: Option<u64>,
    owner: Option<W::Agent>,
    group: Option<&'static str>,
    callback: Callback<W>,
}

/// Single-threaded timer set. Due timers fire in due-tick order, ties in
/// scheduling order.
pub struct Scheduler<W>
where
    W: WorldView + 'static,
{
    next_id: u64,
    timers: BTreeMap<TimerHandle, Timer<W>>,
}

impl<W> Default for Scheduler<W>
where
    W: WorldView + 'static,
{
    fn default() -> Self {
        Self {
            next_id: 0,
            timers: BTreeMap::new(),
        }
    }
}

impl<W> Scheduler<W>
where
    W: WorldView + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn contains(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle)
    }

    /// Fire once, `delay` ticks after `now` (a zero delay fires on the next `run_due`).
    pub fn once(
        &mut self,
        now: u64,
        delay: u64,
        owner: Option<W::Agent>,
        group: Option<&'static str>,
        callback: impl FnOnce(&TickContext, &mut W) + 'static,
    ) -> TimerHandle {
        let mut callback = Some(callback);
        self.insert(
            now.saturating_add(delay),
            None,
            owner,
            group,
            Box::new(move |ctx: &TickContext, world: &mut W| {
                if let Some(cb) = callback.take() {
                    cb(ctx, world);
                }
                TimerControl::Stop
            }),
        )
    }

    /// Fire every `every` ticks (minimum 1) starting `every` ticks after `now`.
    pub fn repeating(
        &mut self,
        now: u64,
        every: u64,
        owner: Option<W::Agent>,
        group: Option<&'static str>,
        callback: impl FnMut(&TickContext, &mut W) -> TimerControl + 'static,
    ) -> TimerHandle {
        let every = every.max(1);
        self.insert(
            now.saturating_add(every),
            Some(every),
            owner,
            group,
            Box::new(callback),
        )
    }

    fn insert(
        &mut self,
        due: u64,
        every: Option<u64>,
        owner: Option<W::Agent>,
        group: Option<&'static str>,
        callback: Callback<W>,
    ) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.timers.insert(
            handle,
            Timer {
                due,
                every,
                owner,
                group,
                callback,
            },
        );
        handle
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(&handle).is_some()
    }

    /// Cancel every timer owned by `agent` and tagged with `group`.
    pub fn cancel_group(&mut self, agent: W::Agent, group: &'static str) -> usize {
        self.cancel_where(|t| t.owner == Some(agent) && t.group == Some(group))
    }

    pub fn cancel_owned_by(&mut self, agent: W::Agent) -> usize {
        self.cancel_where(|t| t.owner == Some(agent))
    }

    fn cancel_where(&mut self, pred: impl Fn(&Timer<W>) -> bool) -> usize {
        let before = self.timers.len();
        self.timers.retain(|_, t| !pred(t));
        before - self.timers.len()
    }

    /// Fire every timer due at or before `ctx.tick`, earliest due first.
    /// Returns how many callbacks ran.
    pub fn run_due(&mut self, ctx: &TickContext, world: &mut W) -> usize {
        let mut due: Vec<(u64, TimerHandle)> = self
            .timers
            .iter()
            .filter(|(_, t)| t.due <= ctx.tick)
            .map(|(h, t)| (t.due, *h))
            .collect();
        due.sort_unstable();

        let mut fired = 0;
        for (_, handle) in due {
            let Some(mut timer) = self.timers.remove(&handle) else {
                continue;
            };

            // The owner may have despawned since scheduling, or earlier this tick.
            if let Some(owner) = timer.owner {
                if !world.is_alive(owner) {
                    tracing::debug!(
                        agent = owner.stable_id(),
                        group = timer.group.unwrap_or("-"),
                        "dropping timer for despawned agent"
                    );
                    continue;
                }
            }

            fired += 1;
            let control = (timer.callback)(ctx, world);
            if let (Some(every), TimerControl::Continue) = (timer.every, control) {
                timer.due = ctx.tick.saturating_add(every);
                self.timers.insert(handle, timer);
            }
        }
        fired
    }
}
