use std::collections::BTreeMap;

use ai_core::{DeterministicRng, Scheduler, TickContext, TimerControl, Vec3, WorldMut, WorldView};

#[derive(Default)]
struct RecordingWorld {
    alive: BTreeMap<u64, Vec3>,
    fired: Vec<(u64, &'static str)>,
    next_id: u64,
}

impl WorldView for RecordingWorld {
    type Agent = u64;

    fn is_alive(&self, agent: u64) -> bool {
        self.alive.contains_key(&agent)
    }

    fn agents(&self) -> Vec<u64> {
        self.alive.keys().copied().collect()
    }

    fn position(&self, agent: u64) -> Option<Vec3> {
        self.alive.get(&agent).copied()
    }

    fn is_valid_spawn(&self, _at: Vec3) -> bool {
        true
    }

    fn default_spawn(&self) -> Vec3 {
        Vec3::ZERO
    }
}

impl WorldMut for RecordingWorld {
    fn spawn(&mut self, at: Vec3) -> u64 {
        self.next_id += 1;
        self.alive.insert(self.next_id, at);
        self.next_id
    }

    fn despawn(&mut self, agent: u64) {
        self.alive.remove(&agent);
    }

    fn find_spawn_location(&mut self, _rng: &mut dyn DeterministicRng) -> Option<Vec3> {
        Some(Vec3::ZERO)
    }

    fn move_towards(&mut self, _agent: u64, _target: Vec3, _speed: f32) -> bool {
        true
    }
}

fn ctx(tick: u64) -> TickContext {
    TickContext::new(tick, 0.05, 7)
}

#[test]
fn once_fires_when_due_and_only_once() {
    let mut world = RecordingWorld::default();
    let mut timers = Scheduler::<RecordingWorld>::new();
    timers.once(0, 3, None, None, |ctx, w: &mut RecordingWorld| {
        w.fired.push((ctx.tick, "once"))
    });

    for tick in 0..6 {
        timers.run_due(&ctx(tick), &mut world);
    }

    assert_eq!(world.fired, vec![(3, "once")]);
    assert!(timers.is_empty());
}

#[test]
fn owned_timer_is_dropped_after_owner_despawns() {
    let mut world = RecordingWorld::default();
    let agent = world.spawn(Vec3::ZERO);
    let mut timers = Scheduler::<RecordingWorld>::new();
    timers.once(0, 2, Some(agent), Some("harvest"), |ctx, w: &mut RecordingWorld| {
        w.fired.push((ctx.tick, "harvest"))
    });

    timers.run_due(&ctx(1), &mut world);
    world.despawn(agent);
    let fired = timers.run_due(&ctx(2), &mut world);

    assert_eq!(fired, 0);
    assert!(world.fired.is_empty());
    assert!(timers.is_empty());
}

#[test]
fn repeating_timer_runs_until_stopped() {
    let mut world = RecordingWorld::default();
    let mut timers = Scheduler::<RecordingWorld>::new();
    let mut remaining = 3;
    timers.repeating(0, 2, None, None, move |ctx, w: &mut RecordingWorld| {
        w.fired.push((ctx.tick, "tick"));
        remaining -= 1;
        if remaining == 0 {
            TimerControl::Stop
        } else {
            TimerControl::Continue
        }
    });

    for tick in 0..20 {
        timers.run_due(&ctx(tick), &mut world);
    }

    assert_eq!(world.fired, vec![(2, "tick"), (4, "tick"), (6, "tick")]);
    assert!(timers.is_empty());
}

#[test]
fn cancel_group_only_touches_matching_timers() {
    let mut world = RecordingWorld::default();
    let a = world.spawn(Vec3::ZERO);
    let b = world.spawn(Vec3::ZERO);
    let mut timers = Scheduler::<RecordingWorld>::new();
    timers.once(0, 1, Some(a), Some("wander"), |_, w: &mut RecordingWorld| {
        w.fired.push((0, "a-wander"))
    });
    timers.once(0, 1, Some(a), Some("forage"), |_, w: &mut RecordingWorld| {
        w.fired.push((0, "a-forage"))
    });
    timers.once(0, 1, Some(b), Some("wander"), |_, w: &mut RecordingWorld| {
        w.fired.push((0, "b-wander"))
    });

    assert_eq!(timers.cancel_group(a, "wander"), 1);
    timers.run_due(&ctx(1), &mut world);

    assert_eq!(world.fired, vec![(0, "a-forage"), (0, "b-wander")]);
}

#[test]
fn cancel_by_handle_and_owner() {
    let mut world = RecordingWorld::default();
    let a = world.spawn(Vec3::ZERO);
    let mut timers = Scheduler::<RecordingWorld>::new();
    let h = timers.once(0, 1, None, None, |_, w: &mut RecordingWorld| w.fired.push((0, "free")));
    timers.repeating(0, 1, Some(a), None, |_, _: &mut RecordingWorld| TimerControl::Continue);

    assert!(timers.cancel(h));
    assert!(!timers.cancel(h));
    assert_eq!(timers.cancel_owned_by(a), 1);
    assert_eq!(timers.run_due(&ctx(5), &mut world), 0);
}

#[test]
fn skipped_ticks_fire_in_due_order() {
    let mut world = RecordingWorld::default();
    let mut timers = Scheduler::<RecordingWorld>::new();
    timers.once(0, 5, None, None, |_, w: &mut RecordingWorld| {
        w.fired.push((5, "late"))
    });
    timers.once(0, 2, None, None, |_, w: &mut RecordingWorld| {
        w.fired.push((2, "early"))
    });
    timers.once(1, 1, None, None, |_, w: &mut RecordingWorld| {
        w.fired.push((2, "tied"))
    });

    assert_eq!(timers.run_due(&ctx(10), &mut world), 3);
    assert_eq!(world.fired, vec![(2, "early"), (2, "tied"), (5, "late")]);
}
