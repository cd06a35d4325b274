use ai_core::world::WorldView;
use ai_goals::Runtime;
use ai_lifecycle::MAX_POPULATION;
use ai_memory::{JsonFileStore, MemoryStore, WorldRegistry};
use ai_sim::{build_simulation, persist_progress, step, GridWorld, SimConfig};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn partial_yaml_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent-sim.yaml");
    std::fs::write(
        &path,
        "seed: 99\npopulation:\n  max_population: 4\nworld:\n  threats: 0\n",
    )
    .unwrap();

    let config = SimConfig::load(&path).unwrap();
    assert_eq!(config.seed, 99);
    assert_eq!(config.population.max_population, 4);
    assert_eq!(config.population.check_every_ticks, 20);
    assert_eq!(config.world.threats, 0);
    assert_eq!(config.world.food, 12);
    assert_eq!(config.memory.sweep_every_ticks, 200);
    assert!((config.dt_seconds() - 0.05).abs() < 1e-6);

    let sim = config.simulation();
    assert_eq!(sim.lifecycle.initial_max_population, 4);
    assert!(sim.lifecycle.schema.get("foraged_items").is_some());
}

#[test]
fn missing_file_yields_defaults_and_bad_yaml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = SimConfig::load_or_default(&dir.path().join("absent.yaml")).unwrap();
    assert_eq!(config.seed, 7);

    let bad = dir.path().join("bad.yaml");
    std::fs::write(&bad, "population: [1, 2").unwrap();
    assert!(SimConfig::load_or_default(&bad).is_err());
}

fn file_runtime(config: &SimConfig, dir: &std::path::Path) -> Runtime<GridWorld> {
    let backend = Rc::new(RefCell::new(JsonFileStore::open(dir).unwrap()));
    Runtime::new(
        MemoryStore::with_config(backend.clone(), config.memory()),
        WorldRegistry::new(backend),
    )
}

#[test]
fn restart_resumes_tick_ids_and_agents_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SimConfig::default();
    config.population.max_population = 3;
    config.world.threats = 0;

    let (live, queued, next_id) = {
        let mut sim = build_simulation(&config, file_runtime(&config, dir.path())).unwrap();
        for _ in 0..60 {
            step(&mut sim);
        }
        sim.checkpoint().unwrap();
        persist_progress(&mut sim).unwrap();
        (sim.world().agents().len(), sim.queued(), sim.world().next_id())
    };
    // Spawns at ticks 0, 20 and 40; a wanderer may have walked off the map since.
    assert_eq!(live + queued, 3);

    let mut sim = build_simulation(&config, file_runtime(&config, dir.path())).unwrap();
    assert_eq!(sim.tick(), 60);
    assert_eq!(sim.world().next_id(), next_id);
    assert_eq!(sim.runtime_mut().registry.get(MAX_POPULATION), 3);
    assert_eq!(sim.recover_from_checkpoints().unwrap(), live);
    assert_eq!(sim.queued(), 3);
}
