//! Convenience surface that routes every call to a "current" world.
//!
//! [`Ecs`] owns a [`WorldRegistry`] and the id of the world calls are routed
//! to. Failures fold into the sentinel contract: the zero id for creating
//! calls, `None` for accessors, silent no-ops for mutators. The underlying
//! error is logged at `debug` level.

use tracing::debug;

use crate::component::ComponentId;
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::query::{QueryResult, QueryResultMut};
use crate::registry::{UpdateReport, WorldRegistry};
use crate::world::{World, WorldConfig, WorldId};

/// A world registry plus a selected current world.
#[derive(Debug, Default)]
pub struct Ecs {
    worlds: WorldRegistry,
    current: WorldId,
}

impl Ecs {
    /// Create a context with no worlds and nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The world registry.
    #[must_use]
    pub fn worlds(&self) -> &WorldRegistry {
        &self.worlds
    }

    /// The mutable world registry.
    pub fn worlds_mut(&mut self) -> &mut WorldRegistry {
        &mut self.worlds
    }

    // -- World lifecycle --

    /// Create a world and select it.
    pub fn create_world(&mut self) -> WorldId {
        self.create_world_with(&WorldConfig::default())
    }

    /// Create a world with the capacity hints of `config` and select it.
    pub fn create_world_with(&mut self, config: &WorldConfig) -> WorldId {
        let id = self.worlds.create_with(config);
        self.current = id;
        id
    }

    /// Request teardown of `id` at the next [`update`](Self::update).
    pub fn destroy_world(&mut self, id: WorldId) {
        if !self.worlds.destroy(id) {
            debug!(world = %id, "destroy of unknown world ignored");
        }
    }

    /// Route subsequent calls to `id`.
    pub fn set_current_world(&mut self, id: WorldId) {
        self.current = id;
    }

    /// The selected world id, or [`WorldId::INVALID`] if none.
    #[must_use]
    pub fn current_world(&self) -> WorldId {
        self.current
    }

    /// The selected world, if it still exists.
    #[must_use]
    pub fn world(&self) -> Option<&World> {
        self.worlds.get(self.current)
    }

    /// The selected world, mutably, if it still exists.
    pub fn world_mut(&mut self) -> Option<&mut World> {
        self.worlds.get_mut(self.current)
    }

    fn with_world<T>(&mut self, f: impl FnOnce(&mut World) -> Result<T>) -> Result<T> {
        let current = self.current;
        let world = self
            .worlds
            .get_mut(current)
            .ok_or(EcsError::UnknownWorld(current))?;
        f(world)
    }

    fn log_failure(&self, op: &'static str, result: Result<()>) {
        if let Err(err) = result {
            debug!(world = %self.current, op, %err, "operation ignored");
        }
    }

    // -- Entity lifecycle --

    /// Create an entity in the current world, or [`Entity::INVALID`].
    pub fn create_entity(&mut self) -> Entity {
        self.with_world(|world| Ok(world.create_entity()))
            .unwrap_or(Entity::INVALID)
    }

    /// Request destruction of `entity` at the next [`update`](Self::update).
    pub fn destroy_entity(&mut self, entity: Entity) {
        let result = self.with_world(|world| {
            world
                .mark_entity_dead(entity)
                .then_some(())
                .ok_or(EcsError::UnknownEntity(entity))
        });
        self.log_failure("destroy_entity", result);
    }

    // -- Component types --

    /// Register a component type, or return [`ComponentId::INVALID`].
    pub fn register_component(&mut self, item_size: usize) -> ComponentId {
        match self.with_world(|world| world.register_component(item_size)) {
            Ok(id) => id,
            Err(err) => {
                debug!(world = %self.current, item_size, %err, "component registration rejected");
                ComponentId::INVALID
            }
        }
    }

    /// Unregister a component type of the current world.
    pub fn unregister_component(&mut self, component: ComponentId) {
        let result = self.with_world(|world| {
            world
                .unregister_component(component)
                .then_some(())
                .ok_or(EcsError::UnknownComponent(component))
        });
        self.log_failure("unregister_component", result);
    }

    // -- Membership --

    /// Attach a zeroed `component` to `entity`.
    pub fn attach(&mut self, entity: Entity, component: ComponentId) {
        let result = self.with_world(|world| world.attach_component(entity, component));
        self.log_failure("attach", result);
    }

    /// Detach `component` from `entity`.
    pub fn detach(&mut self, entity: Entity, component: ComponentId) {
        let result = self.with_world(|world| world.detach_component(entity, component));
        self.log_failure("detach", result);
    }

    /// Returns `true` if `entity` holds `component` in the current world.
    #[must_use]
    pub fn has(&self, entity: Entity, component: ComponentId) -> bool {
        self.world()
            .is_some_and(|world| world.has_component(entity, component))
    }

    /// Bytes of `component` on `entity`.
    #[must_use]
    pub fn get(&self, entity: Entity, component: ComponentId) -> Option<&[u8]> {
        self.world()?.component(entity, component)
    }

    /// Mutable bytes of `component` on `entity`.
    pub fn get_mut(&mut self, entity: Entity, component: ComponentId) -> Option<&mut [u8]> {
        self.world_mut()?.component_mut(entity, component)
    }

    /// Copy of `component` on `entity` reinterpreted as `T`.
    #[must_use]
    pub fn read<T: bytemuck::Pod>(&self, entity: Entity, component: ComponentId) -> Option<T> {
        self.world()?.read(entity, component)
    }

    /// Overwrite `component` on `entity` with `value`.
    pub fn write<T: bytemuck::Pod>(
        &mut self,
        entity: Entity,
        component: ComponentId,
        value: &T,
    ) -> bool {
        self.world_mut()
            .is_some_and(|world| world.write(entity, component, value))
    }

    /// Attach `component` to `entity` if needed and store `value` in it.
    pub fn insert<T: bytemuck::Pod>(&mut self, entity: Entity, component: ComponentId, value: &T) {
        let result = self.with_world(|world| world.insert(entity, component, value));
        self.log_failure("insert", result);
    }

    // -- Queries --

    /// Query the current world. `None` if it is missing or dead.
    pub fn query(&mut self, components: &[ComponentId]) -> Option<QueryResult<'_>> {
        self.worlds.get_mut(self.current)?.query(components)
    }

    /// Mutable query of the current world. `None` if it is missing or dead.
    pub fn query_mut(&mut self, components: &[ComponentId]) -> Option<QueryResultMut<'_>> {
        self.worlds.get_mut(self.current)?.query_mut(components)
    }

    // -- Tick --

    /// Sweep dead entities of the current world, then dead worlds.
    pub fn update(&mut self) -> UpdateReport {
        self.worlds.update(self.current)
    }
}
