//! Simulation configuration.
//!
//! Defaults can be overridden by a JSON file, and the file in turn by
//! command-line flags.

use std::path::Path;

use anyhow::{Context, Result, ensure};
use ecs_store::WorldConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the simulation tick loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
    /// Number of particles kept alive.
    pub particles: usize,
    /// Ticks a particle lives before it is replaced.
    pub lifetime: u32,
    /// Particle speed in units per second.
    pub speed: f32,
    /// Capacity hints for the simulation world.
    pub world: WorldConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
            particles: 256,
            lifetime: 120,
            speed: 4.0,
            world: WorldConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid simulation config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Reject settings the tick loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.tick_rate.is_finite() && self.tick_rate > 0.0,
            "tick_rate must be positive, got {}",
            self.tick_rate
        );
        ensure!(self.lifetime > 0, "lifetime must be at least one tick");
        Ok(())
    }
}
