use ai_core::{TickContext, WorldMut};

use crate::{CurrentGoal, GoalId, Runtime};

/// Result of a priority function: a score, or "not eligible this cycle".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Priority {
    Ineligible,
    Value(f32),
}

impl Priority {
    /// NaN is treated as ineligible.
    pub fn of(value: f32) -> Self {
        if value.is_nan() {
            Priority::Ineligible
        } else {
            Priority::Value(value)
        }
    }

    pub fn when(condition: bool, value: f32) -> Self {
        if condition {
            Priority::of(value)
        } else {
            Priority::Ineligible
        }
    }

    pub fn value(self) -> Option<f32> {
        match self {
            Priority::Ineligible => None,
            Priority::Value(v) => Some(v),
        }
    }

    pub fn is_eligible(self) -> bool {
        self.value().is_some()
    }
}

/// Index of the winning score.
///
/// The maximum eligible value wins. Among equal maxima the `current` index
/// wins if it is one of them, otherwise the lowest index. `None` when nothing
/// is eligible.
pub fn select_winner(scores: &[Priority], current: Option<usize>) -> Option<usize> {
    let best = scores
        .iter()
        .filter_map(|p| p.value())
        .fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |a| a.max(v))))?;

    if let Some(i) = current {
        if scores.get(i).and_then(|p| p.value()) == Some(best) {
            return Some(i);
        }
    }
    scores.iter().position(|p| p.value() == Some(best))
}

/// Read access to the world plus the runtime, for priority functions.
pub struct PriorityContext<'a, W>
where
    W: WorldMut + 'static,
{
    pub tick: &'a TickContext,
    pub agent: W::Agent,
    pub world: &'a W,
    pub rt: &'a mut Runtime<W>,
    /// The active goal, if any (always `None` during archetype selection).
    pub current: Option<CurrentGoal>,
}

impl<'a, W> PriorityContext<'a, W>
where
    W: WorldMut + 'static,
{
    pub fn is_current(&self, id: GoalId) -> bool {
        self.current.is_some_and(|c| c.id == id)
    }

    /// `id` is active and has flagged itself complete.
    pub fn completed(&self, id: GoalId) -> bool {
        self.current.is_some_and(|c| c.id == id && c.complete)
    }

    pub fn state_time(&self) -> Option<u64> {
        self.current.map(|c| c.state_time)
    }
}
