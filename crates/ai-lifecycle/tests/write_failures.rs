mod support;

use ai_core::{Vec3, WorldMut, WorldView};
use ai_lifecycle::{LifecycleError, Removal, LOGICAL_NAME};
use support::{flaky_simulation, WORK};

#[test]
fn failed_eviction_keeps_the_agent_and_never_duplicates_it() {
    let (mut sim, fail_world) = flaky_simulation(3);
    sim.world_mut().blocked = true;
    let a = sim.world_mut().spawn(Vec3::new(2.0, 0.0, 0.0));
    let b = sim.world_mut().spawn(Vec3::new(3.0, 0.0, 0.0));
    sim.advance();
    let name = sim.runtime_mut().memory.get(a, LOGICAL_NAME);

    fail_world.set(true);
    let evicted = sim.remove_agent(a, Removal::Evict);
    assert!(matches!(evicted, Err(LifecycleError::Memory(_))));
    assert!(sim.world().is_alive(a));
    assert_eq!(sim.brain(a).and_then(|brain| brain.current_goal()), Some(WORK));
    assert_eq!(sim.queued(), 0);

    fail_world.set(false);
    sim.remove_agent(b, Removal::Discard).unwrap();
    sim.world_mut().blocked = false;
    for _ in 0..5 {
        sim.advance();
    }

    assert_eq!(sim.world().live_count(), 3);
    let mut named_a = 0;
    for agent in sim.world().agents() {
        if sim.runtime_mut().memory.get(agent, LOGICAL_NAME) == name {
            named_a += 1;
        }
    }
    assert_eq!(named_a, 1);
}

#[test]
fn failed_dequeue_undoes_the_restore_and_retries() {
    let (mut sim, fail_world) = flaky_simulation(3);
    sim.world_mut().blocked = true;
    let a = sim.world_mut().spawn(Vec3::new(2.0, 0.0, 0.0));
    sim.advance();
    let name = sim.remove_agent(a, Removal::Evict).unwrap().unwrap();
    assert_eq!(sim.queued(), 1);

    fail_world.set(true);
    sim.world_mut().blocked = false;
    let report = sim.advance();
    assert_eq!(report.restored, 0);
    assert!(sim.world().agents().is_empty());
    assert_eq!(sim.queued(), 1);

    fail_world.set(false);
    let report = sim.advance();
    assert_eq!(report.restored, 1);
    assert_eq!(sim.queued(), 0);
    let agents = sim.world().agents();
    assert_eq!(agents.len(), 1);
    assert_eq!(sim.runtime_mut().memory.get(agents[0], LOGICAL_NAME), name.as_str());
}
