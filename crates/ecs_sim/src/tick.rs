//! Simulation tick loop.
//!
//! Each tick:
//!
//! 1. Integrate positions of every entity with a velocity.
//! 2. Age every particle; expired ones are destroyed (deferred) and replaced.
//! 3. Run the engine's update, which sweeps the deferred destructions.
//! 4. Advance the tick counter.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, ensure};
use ecs_store::{Ecs, Entity, UpdateReport};
use glam::Vec2;
use tracing::{debug, info, warn};

use crate::components::{ComponentIds, Lifetime, Position, Velocity};
use crate::config::SimConfig;

/// Golden angle in radians, spreads spawn directions evenly.
const GOLDEN_ANGLE: f32 = 2.399_963;

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Entities whose position was integrated.
    pub moved: usize,
    /// Particles that expired and were replaced.
    pub expired: usize,
    /// Deferred destructions executed by the update.
    pub swept: UpdateReport,
}

/// Particle totals over a whole [`TickLoop::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub expired: usize,
    pub entities_swept: usize,
}

impl RunSummary {
    fn record(&mut self, stats: &TickStats) {
        self.ticks += 1;
        self.expired += stats.expired;
        self.entities_swept += stats.swept.entities_destroyed;
    }
}

/// The simulation's tick loop state.
#[derive(Debug)]
pub struct TickLoop {
    /// Current tick counter.
    tick_id: u64,
    /// Loop configuration.
    config: SimConfig,
    /// Engine state; the simulation world is its current world.
    ecs: Ecs,
    /// Component types registered in the simulation world.
    ids: ComponentIds,
    /// Particles spawned so far, drives spawn direction.
    spawned: u64,
}

impl TickLoop {
    /// Create the simulation world and spawn the initial particles.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        let mut ecs = Ecs::new();
        let world = ecs.create_world_with(&config.world);
        let ids = ComponentIds::register(&mut ecs)?;

        let mut tick_loop = Self {
            tick_id: 0,
            config,
            ecs,
            ids,
            spawned: 0,
        };
        for _ in 0..tick_loop.config.particles {
            tick_loop.spawn().context("failed to spawn initial particles")?;
        }

        info!(
            %world,
            particles = tick_loop.config.particles,
            "simulation world ready"
        );
        Ok(tick_loop)
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns the engine state.
    #[must_use]
    pub fn ecs(&self) -> &Ecs {
        &self.ecs
    }

    /// Returns the simulation's component ids.
    #[must_use]
    pub fn ids(&self) -> ComponentIds {
        self.ids
    }

    /// Spawn one particle at the origin.
    fn spawn(&mut self) -> Result<Entity> {
        let entity = self.ecs.create_entity();
        ensure!(entity.is_valid(), "simulation world is gone");

        let lifetime = self.config.lifetime;
        let angle = self.spawned as f32 * GOLDEN_ANGLE;
        // Stagger initial lifetimes so expiry is spread across ticks.
        let remaining = lifetime - (self.spawned % u64::from(lifetime)) as u32;
        self.spawned += 1;

        self.ecs.insert(entity, self.ids.position, &Position(Vec2::ZERO));
        self.ecs.insert(
            entity,
            self.ids.velocity,
            &Velocity(Vec2::from_angle(angle) * self.config.speed),
        );
        self.ecs.insert(entity, self.ids.lifetime, &Lifetime { remaining });
        Ok(entity)
    }

    fn integrate(&mut self, dt: f32) -> usize {
        let Some(mut moving) = self.ecs.query_mut(&[self.ids.position, self.ids.velocity]) else {
            return 0;
        };
        moving.for_each(|_, columns| {
            let (Ok(Position(p)), Ok(Velocity(v))) = (
                bytemuck::try_pod_read_unaligned::<Position>(&columns[0][..]),
                bytemuck::try_pod_read_unaligned::<Velocity>(&columns[1][..]),
            ) else {
                return;
            };
            columns[0].copy_from_slice(bytemuck::bytes_of(&Position(p + v * dt)));
        });
        moving.len()
    }

    fn age(&mut self) -> Vec<Entity> {
        let mut expired = Vec::new();
        let Some(mut particles) = self.ecs.query_mut(&[self.ids.lifetime]) else {
            return expired;
        };
        particles.for_each(|entity, columns| {
            let Ok(mut lifetime) = bytemuck::try_pod_read_unaligned::<Lifetime>(&columns[0][..])
            else {
                return;
            };
            lifetime.remaining = lifetime.remaining.saturating_sub(1);
            columns[0].copy_from_slice(bytemuck::bytes_of(&lifetime));
            if lifetime.remaining == 0 {
                expired.push(entity);
            }
        });
        expired
    }

    /// Run one tick of the simulation.
    pub fn tick(&mut self, dt: f64) -> Result<TickStats> {
        self.tick_id += 1;

        let moved = self.integrate(dt as f32);
        let expired = self.age();
        for &entity in &expired {
            self.ecs.destroy_entity(entity);
            self.spawn()?;
        }
        let swept = self.ecs.update();

        let stats = TickStats {
            moved,
            expired: expired.len(),
            swept,
        };
        debug!(
            tick_id = self.tick_id,
            dt,
            moved = stats.moved,
            expired = stats.expired,
            swept = stats.swept.entities_destroyed,
            "tick complete"
        );
        Ok(stats)
    }

    /// Run ticks paced at `tick_rate` until `max_ticks` is reached
    /// (0 = unlimited), returning the particle totals.
    pub fn run(&mut self) -> Result<RunSummary> {
        let budget = Duration::from_secs_f64(1.0 / self.config.tick_rate);
        let dt = budget.as_secs_f64();
        let mut summary = RunSummary::default();

        info!(
            particles = self.config.particles,
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "simulation loop starting"
        );

        loop {
            let started = Instant::now();
            let stats = self.tick(dt)?;
            summary.record(&stats);

            if self.config.max_ticks > 0 && summary.ticks >= self.config.max_ticks {
                break;
            }

            let spent = started.elapsed();
            match budget.checked_sub(spent) {
                Some(rest) => std::thread::sleep(rest),
                None => warn!(
                    tick_id = self.tick_id,
                    moved = stats.moved,
                    expired = stats.expired,
                    spent_ms = spent.as_millis() as u64,
                    budget_ms = budget.as_millis() as u64,
                    "particle tick overran its budget"
                ),
            }
        }

        info!(
            ticks = summary.ticks,
            expired = summary.expired,
            swept = summary.entities_swept,
            "simulation loop finished"
        );
        Ok(summary)
    }
}
