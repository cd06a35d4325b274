//! Simulation configuration, loaded from `agent-sim.yaml`.

use std::path::{Path, PathBuf};

use ai_lifecycle::{LifecycleConfig, SimulationConfig};
use ai_memory::MemoryConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::fields::snapshot_schema;

pub const CONFIG_FILE: &str = "agent-sim.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Global RNG seed
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Ticks per second in realtime mode
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: f32,

    /// Durable storage directory; platform data dir when unset
    pub data_dir: Option<PathBuf>,

    /// Agents ignore threats while set (initial value only)
    pub peaceful_mode: bool,

    #[serde(default)]
    pub world: WorldConfig,

    #[serde(default)]
    pub population: PopulationConfig,

    #[serde(default)]
    pub memory: MemorySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    #[serde(default = "default_extent")]
    pub width: f32,

    #[serde(default = "default_extent")]
    pub depth: f32,

    #[serde(default = "default_threats")]
    pub threats: usize,

    #[serde(default = "default_food")]
    pub food: usize,

    /// Ticks before a harvested item grows back
    #[serde(default = "default_regrow")]
    pub food_regrow_ticks: u64,

    /// Distance at which agents notice a threat
    #[serde(default = "default_threat_radius")]
    pub threat_radius: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Initial cap; the stored cap wins once written
    #[serde(default = "default_max_population")]
    pub max_population: i64,

    #[serde(default = "default_check_every")]
    pub check_every_ticks: u64,

    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every_ticks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    #[serde(default = "default_sweep_every")]
    pub sweep_every_ticks: u64,
}

fn default_seed() -> u64 {
    7
}
fn default_tick_rate() -> f32 {
    20.0
}
fn default_extent() -> f32 {
    32.0
}
fn default_threats() -> usize {
    2
}
fn default_food() -> usize {
    12
}
fn default_regrow() -> u64 {
    400
}
fn default_threat_radius() -> f32 {
    4.0
}
fn default_max_population() -> i64 {
    10
}
fn default_check_every() -> u64 {
    20
}
fn default_checkpoint_every() -> u64 {
    600
}
fn default_sweep_every() -> u64 {
    200
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            tick_rate_hz: default_tick_rate(),
            data_dir: None,
            peaceful_mode: false,
            world: WorldConfig::default(),
            population: PopulationConfig::default(),
            memory: MemorySection::default(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_extent(),
            depth: default_extent(),
            threats: default_threats(),
            food: default_food(),
            food_regrow_ticks: default_regrow(),
            threat_radius: default_threat_radius(),
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            max_population: default_max_population(),
            check_every_ticks: default_check_every(),
            checkpoint_every_ticks: default_checkpoint_every(),
        }
    }
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            sweep_every_ticks: default_sweep_every(),
        }
    }
}

impl SimConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn dt_seconds(&self) -> f32 {
        if self.tick_rate_hz.is_finite() && self.tick_rate_hz > 0.0 {
            1.0 / self.tick_rate_hz.max(0.01)
        } else {
            1.0 / default_tick_rate()
        }
    }

    pub fn simulation(&self) -> SimulationConfig {
        SimulationConfig {
            dt_seconds: self.dt_seconds(),
            seed: self.seed,
            lifecycle: LifecycleConfig {
                check_every_ticks: self.population.check_every_ticks,
                checkpoint_every_ticks: self.population.checkpoint_every_ticks,
                initial_max_population: self.population.max_population,
                schema: snapshot_schema(),
            },
        }
    }

    pub fn memory(&self) -> MemoryConfig {
        MemoryConfig {
            sweep_every_ticks: self.memory.sweep_every_ticks,
        }
    }
}
