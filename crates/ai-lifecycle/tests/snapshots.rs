mod support;

use ai_core::{EventKind, Vec3, WorldMut, WorldView};
use ai_goals::{ARCHETYPE, CURRENT_GOAL};
use ai_lifecycle::{
    LifecycleError, Removal, SerializedSnapshot, SnapshotError, SnapshotSchema, LAST_RELOCATED,
    LOGICAL_NAME, SNAPSHOT_QUEUE,
};
use ai_memory::{CellValue, Field};
use support::{simulation, DEFAULT_SPAWN, SCORE, TAGS};

#[test]
fn evict_then_restore_replays_every_field_and_dequeues_once() {
    let mut sim = simulation(3);
    sim.world_mut().blocked = true;
    let a = sim.world_mut().spawn(Vec3::new(2.0, 0.0, 3.0));
    sim.advance();
    sim.advance();
    sim.runtime_mut()
        .memory
        .push_to_array(a, TAGS, "veteran".to_string(), true)
        .unwrap();
    let name = sim.runtime_mut().memory.get(a, LOGICAL_NAME);
    assert!(!name.is_empty());

    let evicted = sim.remove_agent(a, Removal::Evict).unwrap().unwrap();
    assert_eq!(evicted.as_str(), name);
    assert!(!sim.world().is_alive(a));
    assert_eq!(sim.queued(), 1);

    sim.world_mut().blocked = false;
    let report = sim.advance();
    assert_eq!(report.restored, 1);
    assert_eq!(report.spawned, 0);
    assert_eq!(sim.queued(), 0);

    let agents = sim.world().agents();
    assert_eq!(agents.len(), 1);
    let b = agents[0];
    assert_ne!(a, b);
    assert_eq!(sim.world().position(b), Some(Vec3::new(2.0, 0.0, 3.0)));

    let memory = &mut sim.runtime_mut().memory;
    assert_eq!(memory.get(b, LOGICAL_NAME), name);
    assert_eq!(memory.get(b, SCORE), 2);
    assert_eq!(memory.get(b, TAGS), vec!["veteran"]);
    assert_eq!(memory.get(b, ARCHETYPE), "worker");
    assert_eq!(memory.get(b, CURRENT_GOAL), "work");
    assert_eq!(memory.get(b, LAST_RELOCATED), report.tick as i64);

    let events = sim.runtime_mut().events.drain_log();
    let restored: Vec<_> = events
        .iter()
        .filter(|e| {
            matches!(&e.kind, EventKind::AgentRestored { logical_name } if *logical_name == name)
        })
        .collect();
    assert_eq!(restored.len(), 1);

    // The resumed goal keeps running without a switch; the queue stays empty.
    let report = sim.advance();
    assert_eq!(report.restored, 0);
    assert_eq!(report.switches, 0);
    assert_eq!(sim.runtime_mut().memory.get(b, SCORE), 3);
    let named: Vec<u64> = sim
        .world()
        .agents()
        .into_iter()
        .filter(|&agent| sim.runtime_mut().memory.get(agent, LOGICAL_NAME) == name)
        .collect();
    assert_eq!(named, vec![b]);
}

#[test]
fn malformed_snapshot_is_dropped_and_the_next_one_restored() {
    let mut sim = simulation(3);
    sim.world_mut().blocked = true;
    let a = sim.world_mut().spawn(Vec3::new(4.0, 0.0, 0.0));
    sim.advance();
    let name = sim.remove_agent(a, Removal::Evict).unwrap().unwrap();

    let mut blobs = sim.runtime_mut().registry.get(SNAPSHOT_QUEUE);
    blobs.insert(0, "{not a snapshot".to_string());
    sim.runtime_mut().registry.set(SNAPSHOT_QUEUE, blobs).unwrap();
    sim.runtime_mut().events.drain_log();

    sim.world_mut().blocked = false;
    let report = sim.advance();
    assert_eq!(report.dropped_snapshots, 1);
    assert_eq!(report.restored, 1);
    assert_eq!(sim.queued(), 0);

    let b = sim.world().agents()[0];
    assert_eq!(sim.runtime_mut().memory.get(b, LOGICAL_NAME), name.as_str());
    let events = sim.runtime_mut().events.drain_log();
    assert!(events
        .iter()
        .any(|e| matches!(e.kind, EventKind::SnapshotDropped { .. })));
}

#[test]
fn invalid_restore_location_falls_back_to_default_spawn() {
    let mut sim = simulation(3);
    sim.world_mut().blocked = true;
    let a = sim.world_mut().spawn(Vec3::new(-5.0, 0.0, 0.0));
    sim.advance();
    sim.remove_agent(a, Removal::Evict).unwrap();

    sim.world_mut().blocked = false;
    assert_eq!(sim.advance().restored, 1);
    let b = sim.world().agents()[0];
    assert_eq!(sim.world().position(b), Some(DEFAULT_SPAWN));
    assert_eq!(sim.queued(), 0);
}

#[test]
fn unloaded_departure_is_captured_and_queued() {
    let mut sim = simulation(3);
    sim.world_mut().blocked = true;
    let a = sim.world_mut().spawn(Vec3::new(3.0, 0.0, 7.0));
    sim.advance();
    let name = sim.runtime_mut().memory.get(a, LOGICAL_NAME);

    sim.world_mut().unload(a);
    let report = sim.advance();
    assert_eq!(report.departed, 1);
    assert!(sim.brain(a).is_none());
    assert_eq!(sim.queued(), 1);

    let blob = sim.runtime_mut().registry.get(SNAPSHOT_QUEUE).remove(0);
    let snapshot = SerializedSnapshot::decode(&blob).unwrap();
    assert_eq!(snapshot.logical_name.as_str(), name);
    assert_eq!(snapshot.position, Vec3::new(3.0, 0.0, 7.0));
    assert_eq!(snapshot.field("score"), Some(&CellValue::Int(1)));
    assert_eq!(
        snapshot.field("goal_id"),
        Some(&CellValue::Text("work".to_string()))
    );
}

#[test]
fn died_departure_is_not_queued() {
    let mut sim = simulation(3);
    sim.world_mut().blocked = true;
    let a = sim.world_mut().spawn(Vec3::ZERO);
    sim.advance();

    sim.world_mut().kill(a);
    let report = sim.advance();
    assert_eq!(report.departed, 1);
    assert!(sim.brain(a).is_none());
    assert_eq!(sim.queued(), 0);
}

#[test]
fn removing_a_dead_agent_is_an_error() {
    let mut sim = simulation(3);
    let err = sim.remove_agent(42, Removal::Discard).unwrap_err();
    assert!(matches!(err, LifecycleError::UnknownAgent(42)));
}

#[test]
fn discard_does_not_queue() {
    let mut sim = simulation(3);
    sim.world_mut().blocked = true;
    let a = sim.world_mut().spawn(Vec3::ZERO);
    sim.advance();

    assert!(sim.remove_agent(a, Removal::Discard).unwrap().is_none());
    assert!(!sim.world().is_alive(a));
    assert_eq!(sim.queued(), 0);
}

#[test]
fn decode_rejects_garbage_and_empty_names() {
    assert!(matches!(
        SerializedSnapshot::decode("[]"),
        Err(SnapshotError::Decode(_))
    ));
    let blob = concat!(
        r#"{"logical_name":"","position":{"x":0.0,"y":0.0,"z":0.0},"#,
        r#""captured_tick":1,"captured_at":"2026-01-01T00:00:00Z","fields":{}}"#
    );
    assert!(matches!(
        SerializedSnapshot::decode(blob),
        Err(SnapshotError::MissingName)
    ));
}

#[test]
fn schema_keeps_persistent_fields_once() {
    const MOOD: Field<f64> = Field::transient("mood", || 0.0);

    let schema = SnapshotSchema::new().field(SCORE).field(SCORE).field(MOOD);
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["archetype", "goal_id", "score"]);
    assert!(schema.get("mood").is_none());
}
