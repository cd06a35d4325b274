//! Typed publish/subscribe channel for simulation notifications.
//!
//! Goals and the lifecycle manager publish; sinks subscribe. Publishers never
//! know who listens.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventKind {
    /// The arbiter replaced the active goal.
    GoalSwitched {
        from: Option<Cow<'static, str>>,
        to: Cow<'static, str>,
    },
    /// Whatever the previous goal was targeting is no longer targeted.
    TargetReset,
    /// A goal-defined threshold was crossed (`reached`) or lost.
    Milestone {
        name: Cow<'static, str>,
        reached: bool,
    },
    AgentSpawned {
        logical_name: String,
    },
    AgentRestored {
        logical_name: String,
    },
    AgentEvicted {
        logical_name: String,
    },
    SnapshotDropped {
        reason: String,
    },
    PopulationCapChanged {
        cap: i64,
    },
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimEvent {
    pub tick: u64,
    /// `stable_id` of the agent concerned, if any.
    pub agent: Option<u64>,
    pub kind: EventKind,
}

impl SimEvent {
    pub fn new(tick: u64, kind: EventKind) -> Self {
        Self {
            tick,
            agent: None,
            kind,
        }
    }

    pub fn for_agent(tick: u64, agent: u64, kind: EventKind) -> Self {
        Self {
            tick,
            agent: Some(agent),
            kind,
        }
    }
}

pub trait EventSink {
    fn on_event(&mut self, event: &SimEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&SimEvent),
{
    fn on_event(&mut self, event: &SimEvent) {
        self(event)
    }
}

#[derive(Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventLog {
    pub events: Vec<SimEvent>,
}

impl EventLog {
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }
}

#[derive(Default)]
pub struct EventBus {
    sinks: Vec<Box<dyn EventSink>>,
    log: Option<EventLog>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus that also records every event in memory.
    pub fn recording() -> Self {
        Self {
            sinks: Vec::new(),
            log: Some(EventLog::default()),
        }
    }

    pub fn subscribe(&mut self, sink: impl EventSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn publish(&mut self, event: SimEvent) {
        for sink in self.sinks.iter_mut() {
            sink.on_event(&event);
        }
        if let Some(log) = self.log.as_mut() {
            log.push(event);
        }
    }

    pub fn log(&self) -> Option<&EventLog> {
        self.log.as_ref()
    }

    /// Take everything recorded so far (empty when not recording).
    pub fn drain_log(&mut self) -> Vec<SimEvent> {
        self.log.as_mut().map(EventLog::drain).unwrap_or_default()
    }
}
