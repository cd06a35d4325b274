use std::cell::Cell;

use ai_memory::{SensorCache, SensorKey};

const NEAREST_THREAT: SensorKey<Option<f32>> = SensorKey::new("nearest_threat");

#[test]
fn recomputes_only_when_tick_changes() {
    let mut sensors = SensorCache::<u64>::new();
    let calls = Cell::new(0);
    let probe = |v: f32| {
        calls.set(calls.get() + 1);
        Some(v)
    };

    assert_eq!(sensors.cached(1, NEAREST_THREAT, 10, || probe(3.0)), Some(3.0));
    assert_eq!(sensors.cached(1, NEAREST_THREAT, 10, || probe(99.0)), Some(3.0));
    assert_eq!(calls.get(), 1);

    assert_eq!(sensors.cached(1, NEAREST_THREAT, 11, || probe(4.0)), Some(4.0));
    assert_eq!(calls.get(), 2);
    assert_eq!(sensors.peek(1, NEAREST_THREAT), Some((11, &Some(4.0))));
}

#[test]
fn entries_are_per_agent_and_swept() {
    let mut sensors = SensorCache::<u64>::new();
    sensors.cached(1, NEAREST_THREAT, 1, || Some(1.0));
    sensors.cached(2, NEAREST_THREAT, 1, || None);

    assert_eq!(sensors.peek(2, NEAREST_THREAT), Some((1, &None)));
    assert_eq!(sensors.sweep(|a| a == 2), 1);
    assert!(sensors.peek(1, NEAREST_THREAT).is_none());

    sensors.invalidate(2, NEAREST_THREAT);
    assert!(sensors.peek(2, NEAREST_THREAT).is_none());
}
