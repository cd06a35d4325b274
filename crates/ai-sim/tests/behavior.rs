use ai_core::{EventKind, Vec3, WorldMut, WorldView};
use ai_goals::{Runtime, ARCHETYPE};
use ai_lifecycle::Simulation;
use ai_sim::archetypes::HOMEBODY;
use ai_sim::config::{PopulationConfig, WorldConfig};
use ai_sim::fields::{FORAGED, MEALS, SIM_TICK};
use ai_sim::goals::{FLEE, FORAGE, IDLE, WELL_FED};
use ai_sim::{build_simulation, step, GridWorld, SimConfig};

fn config(peaceful_mode: bool) -> SimConfig {
    SimConfig {
        peaceful_mode,
        world: WorldConfig {
            threats: 0,
            food: 0,
            food_regrow_ticks: 100_000,
            ..WorldConfig::default()
        },
        population: PopulationConfig {
            max_population: 1,
            ..PopulationConfig::default()
        },
        ..SimConfig::default()
    }
}

fn one_agent(config: &SimConfig, rt: Runtime<GridWorld>) -> (Simulation<GridWorld>, u64) {
    let mut sim = build_simulation(config, rt).unwrap();
    let agent = sim.world_mut().spawn(Vec3::new(10.0, 0.0, 10.0));
    (sim, agent)
}

#[test]
fn nearby_threat_switches_to_flee_then_back_to_idle() {
    let (mut sim, a) = one_agent(&config(false), Runtime::in_memory());
    sim.world_mut().add_threat(Vec3::new(12.0, 0.0, 10.0));

    step(&mut sim);
    assert_eq!(sim.brain(a).and_then(|b| b.current_goal()), Some(FLEE));

    for _ in 0..30 {
        step(&mut sim);
    }
    assert!(sim.world().is_alive(a));
    assert_eq!(sim.brain(a).and_then(|b| b.current_goal()), Some(IDLE));
    let position = sim.world().position(a).unwrap();
    assert!(position.distance(Vec3::new(12.0, 0.0, 10.0)) > 6.0);

    let switches: Vec<String> = sim
        .runtime_mut()
        .events
        .drain_log()
        .into_iter()
        .filter_map(|e| match e.kind {
            EventKind::GoalSwitched { to, .. } => Some(to.into_owned()),
            _ => None,
        })
        .collect();
    assert_eq!(switches, vec!["flee", "idle"]);
}

#[test]
fn peaceful_mode_ignores_threats() {
    let (mut sim, a) = one_agent(&config(true), Runtime::in_memory());
    sim.world_mut().add_threat(Vec3::new(10.3, 0.0, 10.0));

    for _ in 0..10 {
        step(&mut sim);
        assert_ne!(sim.brain(a).and_then(|b| b.current_goal()), Some(FLEE));
    }
    assert!(sim.world().is_alive(a));
}

#[test]
fn homebody_forages_three_items_and_reaches_the_milestone() {
    let mut rt = Runtime::in_memory();
    rt.registry.set(SIM_TICK, 1_000).unwrap();
    let (mut sim, a) = one_agent(&config(false), rt);
    sim.runtime_mut()
        .memory
        .set(a, ARCHETYPE, HOMEBODY.0.to_string())
        .unwrap();
    for dx in [0.0, 1.0, 2.0] {
        sim.world_mut().add_food(Vec3::new(10.0 + dx, 0.0, 10.0));
    }

    step(&mut sim);
    assert_eq!(sim.brain(a).and_then(|b| b.current_goal()), Some(FORAGE));

    let mut milestone_at = None;
    for _ in 0..1_500 {
        step(&mut sim);
        let reached = sim.runtime_mut().events.drain_log().into_iter().any(|e| {
            e.agent == Some(a)
                && e.kind
                    == EventKind::Milestone {
                        name: WELL_FED.into(),
                        reached: true,
                    }
        });
        if reached {
            milestone_at = Some(sim.tick());
            break;
        }
    }

    assert!(milestone_at.is_some());
    let memory = &mut sim.runtime_mut().memory;
    assert_eq!(memory.get(a, FORAGED), vec![0, 1, 2]);
    assert_eq!(memory.get(a, MEALS), 3);
}
