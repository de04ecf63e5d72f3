//! Component types of the particle simulation.

use anyhow::{Result, ensure};
use bytemuck::{Pod, Zeroable};
use ecs_store::{ComponentId, Ecs};
use glam::Vec2;

/// World-space position.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Position(pub Vec2);

/// Displacement per second.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Velocity(pub Vec2);

/// Ticks left before the particle expires.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Lifetime {
    pub remaining: u32,
}

/// Ids of the simulation's component types in its world.
#[derive(Debug, Clone, Copy)]
pub struct ComponentIds {
    pub position: ComponentId,
    pub velocity: ComponentId,
    pub lifetime: ComponentId,
}

impl ComponentIds {
    /// Register every simulation component in the current world of `ecs`.
    pub fn register(ecs: &mut Ecs) -> Result<Self> {
        let ids = Self {
            position: ecs.register_component(size_of::<Position>()),
            velocity: ecs.register_component(size_of::<Velocity>()),
            lifetime: ecs.register_component(size_of::<Lifetime>()),
        };
        ensure!(
            ids.position.is_valid() && ids.velocity.is_valid() && ids.lifetime.is_valid(),
            "component registration failed: no current world"
        );
        Ok(ids)
    }
}
