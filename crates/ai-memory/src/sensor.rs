use std::any::Any;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use ai_core::AgentId;

/// Typed key for a memoized sensor query.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SensorKey<T: 'static> {
    name: &'static str,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for SensorKey<T> {}

impl<T: 'static> Clone for SensorKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> SensorKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _phantom: PhantomData,
        }
    }

    pub fn name(self) -> &'static str {
        self.name
    }
}

struct Stamped {
    tick: u64,
    value: Box<dyn Any>,
}

/// Per-agent, tick-stamped memoization of expensive queries.
///
/// Several priority functions evaluated in one arbitration pass can share one
/// result; a value computed on an earlier tick is always recomputed.
pub struct SensorCache<A: AgentId> {
    entries: BTreeMap<A, BTreeMap<&'static str, Stamped>>,
}

impl<A: AgentId> Default for SensorCache<A> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<A: AgentId> SensorCache<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value stamped with `tick`, or compute, stamp and return a fresh one.
    pub fn cached<T: Clone + 'static>(
        &mut self,
        agent: A,
        key: SensorKey<T>,
        tick: u64,
        compute: impl FnOnce() -> T,
    ) -> T {
        let slot = self.entries.entry(agent).or_default();
        if let Some(stamped) = slot.get(key.name) {
            if stamped.tick == tick {
                if let Some(value) = stamped.value.downcast_ref::<T>() {
                    return value.clone();
                }
                tracing::warn!(
                    sensor = key.name,
                    "sensor key reused with another type, recomputing"
                );
            }
        }

        let value = compute();
        slot.insert(
            key.name,
            Stamped {
                tick,
                value: Box::new(value.clone()),
            },
        );
        value
    }

    /// Last stored value and its tick, regardless of freshness.
    pub fn peek<T: 'static>(&self, agent: A, key: SensorKey<T>) -> Option<(u64, &T)> {
        let stamped = self.entries.get(&agent)?.get(key.name)?;
        Some((stamped.tick, stamped.value.downcast_ref::<T>()?))
    }

    pub fn invalidate<T: 'static>(&mut self, agent: A, key: SensorKey<T>) {
        if let Some(slot) = self.entries.get_mut(&agent) {
            slot.remove(key.name);
        }
    }

    pub fn forget(&mut self, agent: A) {
        self.entries.remove(&agent);
    }

    pub fn sweep(&mut self, is_alive: impl Fn(A) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|agent, _| is_alive(*agent));
        before - self.entries.len()
    }
}
