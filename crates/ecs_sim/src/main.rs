//! # ecs_sim: particle simulation driver
//!
//! Runs a fixed-timestep particle simulation on top of `ecs_store`: every
//! tick moves particles through a mutable query, expires old particles via
//! deferred destruction and lets the engine's update sweep them.
//!
//! ## Startup Sequence
//!
//! 1. Load the JSON config (optional) and apply command-line overrides.
//! 2. Create the simulation world and spawn the initial particles.
//! 3. Enter the fixed-timestep tick loop.

mod components;
mod config;
mod tick;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::SimConfig;
use tick::TickLoop;

#[derive(Parser)]
#[command(name = "ecs_sim", about = "Particle simulation on the packed ECS store")]
struct Args {
    /// Path to a JSON simulation config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of ticks to run (0 = unlimited)
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Target ticks per second
    #[arg(long)]
    tick_rate: Option<f64>,

    /// Number of particles kept alive
    #[arg(short, long)]
    particles: Option<usize>,

    /// Particle lifetime in ticks
    #[arg(short, long)]
    lifetime: Option<u32>,
}

impl Args {
    fn into_config(self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => {
                info!(path = %path.display(), "loading simulation config");
                SimConfig::load(path)?
            }
            None => SimConfig::default(),
        };

        if let Some(ticks) = self.ticks {
            config.max_ticks = ticks;
        }
        if let Some(tick_rate) = self.tick_rate {
            config.tick_rate = tick_rate;
        }
        if let Some(particles) = self.particles {
            config.particles = particles;
        }
        if let Some(lifetime) = self.lifetime {
            config.lifetime = lifetime;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ecs_sim=info,ecs_store=warn")),
        )
        .init();

    let config = Args::parse().into_config()?;
    info!(?config, "simulation starting");

    let mut tick_loop = TickLoop::new(config)?;
    let summary = tick_loop.run()?;

    let world = tick_loop.ecs().world();
    info!(
        ticks = summary.ticks,
        expired = summary.expired,
        entities = world.map_or(0, |w| w.entity_count()),
        "simulation shut down"
    );
    Ok(())
}
