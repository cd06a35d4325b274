//! agent-sim: run and administer the reference agent world.
//!
//! - `agent-sim run` - advance the world (as fast as possible, or `--realtime`)
//! - `agent-sim status` - population, queue and checkpoint summary
//! - `agent-sim queue clear` - drop every queued snapshot
//! - `agent-sim cap set <N>` - change the population cap
//! - `agent-sim peaceful <true|false>` - toggle the global peaceful mode

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use ai_core::{EventKind, SimEvent};
use ai_goals::Runtime;
use ai_lifecycle::{SerializedSnapshot, SimulationStatus, SnapshotQueue, AGENT_CHECKPOINTS};
use ai_memory::{CellValue, JsonFileStore, MemoryStore, WorldRegistry};
use ai_sim::fields::PEACEFUL_MODE;
use ai_sim::{build_simulation, persist_progress, step, GridWorld, SimConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FAST_TICKS: u64 = 1_000;
const PERSIST_EVERY: u64 = 100;

#[derive(Parser)]
#[command(name = "agent-sim")]
#[command(about = "Tick-driven agent simulation", version)]
struct Cli {
    /// Config file
    #[arg(short, long, global = true, default_value = ai_sim::config::CONFIG_FILE)]
    config: PathBuf,

    /// Durable storage directory (overrides the config)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// RNG seed (overrides the config)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation
    Run {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,

        /// Pace ticks at the configured rate until interrupted
        #[arg(long)]
        realtime: bool,
    },

    /// Show population and queue status
    Status {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Snapshot queue administration
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },

    /// Population cap administration
    Cap {
        #[command(subcommand)]
        command: CapCommands,
    },

    /// Toggle peaceful mode (agents ignore threats)
    Peaceful {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

#[derive(Subcommand)]
enum QueueCommands {
    /// Drop every queued snapshot
    Clear,
}

#[derive(Subcommand)]
enum CapCommands {
    /// Set the population cap
    Set {
        #[arg(allow_negative_numbers = true)]
        cap: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let mut config = SimConfig::load_or_default(&cli.config)?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    let data_dir = resolve_data_dir(cli.data_dir.or(config.data_dir.clone()));

    match cli.command {
        Commands::Run { ticks, realtime } => run(&config, &data_dir, ticks, realtime).await,
        Commands::Status { json } => show_status(&config, &data_dir, json),
        Commands::Queue {
            command: QueueCommands::Clear,
        } => {
            let mut sim = build_simulation(&config, open_runtime(&config, &data_dir)?)?;
            let cleared = sim.clear_snapshot_queue()?;
            println!("Cleared {cleared} queued snapshot(s)");
            Ok(())
        }
        Commands::Cap {
            command: CapCommands::Set { cap },
        } => {
            let mut sim = build_simulation(&config, open_runtime(&config, &data_dir)?)?;
            sim.set_population_cap(cap)
                .with_context(|| format!("Failed to set population cap to {cap}"))?;
            println!("Population cap set to {cap}");
            Ok(())
        }
        Commands::Peaceful { enabled } => {
            let mut rt = open_runtime(&config, &data_dir)?;
            rt.registry.set(PEACEFUL_MODE, enabled)?;
            println!("Peaceful mode {}", if enabled { "on" } else { "off" });
            Ok(())
        }
    }
}

fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        directories::ProjectDirs::from("", "", "agent-sim")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".agent-sim"))
    })
}

fn open_runtime(config: &SimConfig, data_dir: &Path) -> Result<Runtime<GridWorld>> {
    let store = JsonFileStore::open(data_dir)
        .with_context(|| format!("Failed to open data dir {}", data_dir.display()))?;
    let backend = Rc::new(RefCell::new(store));
    let mut rt = Runtime::new(
        MemoryStore::with_config(backend.clone(), config.memory()),
        WorldRegistry::new(backend),
    );
    rt.events.subscribe(log_event);
    Ok(rt)
}

fn log_event(event: &SimEvent) {
    match &event.kind {
        EventKind::Milestone { name, reached } => {
            tracing::info!(
                tick = event.tick,
                agent = ?event.agent,
                milestone = %name,
                reached,
                "milestone"
            )
        }
        EventKind::SnapshotDropped { reason } => {
            tracing::warn!(tick = event.tick, reason = %reason, "snapshot dropped")
        }
        other => tracing::trace!(tick = event.tick, agent = ?event.agent, event = ?other, "event"),
    }
}

async fn run(
    config: &SimConfig,
    data_dir: &Path,
    ticks: Option<u64>,
    realtime: bool,
) -> Result<()> {
    tracing::info!(data_dir = %data_dir.display(), seed = config.seed, "Starting simulation");

    let rt = open_runtime(config, data_dir)?;
    let mut sim = build_simulation(config, rt).context("Failed to build simulation")?;
    let recovered = sim.recover_from_checkpoints()?;
    if recovered > 0 {
        tracing::info!(recovered, "re-queued agents from the last checkpoint");
    }

    let limit = match (ticks, realtime) {
        (Some(n), _) => Some(n),
        (None, true) => None,
        (None, false) => Some(DEFAULT_FAST_TICKS),
    };

    let mut interval = tokio::time::interval(Duration::from_secs_f32(config.dt_seconds()));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut ran = 0u64;
    while limit.map_or(true, |n| ran < n) {
        if realtime {
            tokio::select! {
                _ = interval.tick() => {}
                _ = &mut shutdown => {
                    tracing::info!("Interrupted");
                    break;
                }
            }
        }

        let report = step(&mut sim);
        ran += 1;
        if report.spawned + report.restored + report.evicted + report.departed > 0 {
            tracing::debug!(?report, "population changed");
            persist_progress(&mut sim)?;
        } else if ran % PERSIST_EVERY == 0 {
            persist_progress(&mut sim)?;
        }
    }

    sim.checkpoint()?;
    persist_progress(&mut sim)?;
    let status = sim.status();
    tracing::info!(
        tick = status.tick,
        live = status.live,
        queued = status.queued,
        ran,
        "Simulation stopped"
    );
    Ok(())
}

#[derive(Serialize)]
struct AgentSummary {
    logical_name: String,
    captured_tick: u64,
    archetype: Option<String>,
    goal: Option<String>,
}

impl From<SerializedSnapshot> for AgentSummary {
    fn from(snapshot: SerializedSnapshot) -> Self {
        let text = |name: &str| match snapshot.field(name) {
            Some(CellValue::Text(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };
        Self {
            archetype: text("archetype"),
            goal: text("goal_id"),
            logical_name: snapshot.logical_name.to_string(),
            captured_tick: snapshot.captured_tick,
        }
    }
}

#[derive(Serialize)]
struct StatusReport {
    #[serde(flatten)]
    simulation: SimulationStatus,
    peaceful_mode: bool,
    queue: Vec<AgentSummary>,
    checkpoint: Vec<AgentSummary>,
}

fn decode_all(blobs: Vec<String>) -> Vec<AgentSummary> {
    blobs
        .iter()
        .filter_map(|blob| SerializedSnapshot::decode(blob).ok())
        .map(AgentSummary::from)
        .collect()
}

fn show_status(config: &SimConfig, data_dir: &Path, json: bool) -> Result<()> {
    let mut sim = build_simulation(config, open_runtime(config, data_dir)?)?;
    let simulation = sim.status();
    let registry = &mut sim.runtime_mut().registry;
    let peaceful_mode = registry.get(PEACEFUL_MODE);
    let checkpoint = decode_all(registry.get(AGENT_CHECKPOINTS));
    let queue = decode_all(SnapshotQueue::new(registry).blobs());
    let report = StatusReport {
        simulation,
        peaceful_mode,
        queue,
        checkpoint,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Agent Simulation Status");
    println!("=======================");
    println!();
    println!("Data dir: {}", data_dir.display());
    println!("Tick: {}", report.simulation.tick);
    println!("Population cap: {}", report.simulation.max_population);
    println!("Peaceful mode: {}", report.peaceful_mode);
    println!();
    println!("Queued snapshots: {}", report.queue.len());
    for agent in &report.queue {
        print_agent(agent);
    }
    println!();
    println!("Last checkpoint: {} agent(s)", report.checkpoint.len());
    for agent in report.checkpoint.iter().take(10) {
        print_agent(agent);
    }
    if report.checkpoint.len() > 10 {
        println!("  ... and {} more", report.checkpoint.len() - 10);
    }
    Ok(())
}

fn print_agent(agent: &AgentSummary) {
    println!(
        "  - {} [{}] goal={} (tick {})",
        agent.logical_name,
        agent.archetype.as_deref().unwrap_or("-"),
        agent.goal.as_deref().unwrap_or("-"),
        agent.captured_tick
    );
}
