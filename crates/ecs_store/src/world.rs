//! A world: one isolated namespace of entities and component types.
//!
//! The [`World`] composes an [`EntityTable`], a [`ComponentRegistry`] and a
//! reusable query buffer, and keeps each entity's [`ComponentMask`] in step
//! with the stores it has instances in.
//!
//! [`ComponentMask`]: crate::entity::ComponentMask

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::component::{ComponentId, ComponentRegistry};
use crate::entity::{Entity, EntityTable};
use crate::error::{EcsError, Result};
use crate::query::{QueryBuffer, QueryResult, QueryResultMut};

/// A unique world identifier within one [`WorldRegistry`](crate::WorldRegistry).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct WorldId(pub u64);

impl WorldId {
    /// The null / invalid world sentinel.
    pub const INVALID: WorldId = WorldId(0);

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) world id.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for WorldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "world#{}", self.0)
    }
}

/// Capacity hints applied when a world is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Entity slots reserved up front.
    pub entity_capacity: usize,
    /// Query result rows reserved up front.
    pub query_capacity: usize,
}

impl WorldConfig {
    /// Create a config that grows everything on demand.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve room for `capacity` entities.
    #[must_use]
    pub fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }

    /// Reserve room for `capacity` query rows.
    #[must_use]
    pub fn with_query_capacity(mut self, capacity: usize) -> Self {
        self.query_capacity = capacity;
        self
    }
}

/// Entity and component storage for one world.
#[derive(Debug)]
pub struct World {
    id: WorldId,
    entities: EntityTable,
    components: ComponentRegistry,
    query_buffer: QueryBuffer,
    dead: bool,
    destroyed: bool,
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new(id: WorldId) -> Self {
        Self::with_config(id, &WorldConfig::default())
    }

    /// Create an empty world with the capacity hints of `config`.
    #[must_use]
    pub fn with_config(id: WorldId, config: &WorldConfig) -> Self {
        Self {
            id,
            entities: EntityTable::with_capacity(config.entity_capacity),
            components: ComponentRegistry::new(),
            query_buffer: QueryBuffer::with_capacity(config.query_capacity),
            dead: false,
            destroyed: false,
        }
    }

    /// This world's id.
    #[must_use]
    pub fn id(&self) -> WorldId {
        self.id
    }

    /// Returns `true` once destruction has been requested.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Returns `true` once the world has been torn down.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub(crate) fn mark_dead(&mut self) {
        self.dead = true;
    }

    /// The entity table.
    #[must_use]
    pub fn entities(&self) -> &EntityTable {
        &self.entities
    }

    /// The component registry.
    #[must_use]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    // -- Entity lifecycle --

    /// Allocate a new entity with no components.
    pub fn create_entity(&mut self) -> Entity {
        self.entities.create()
    }

    /// Destroy `entity` now: reclaim its slot and drop all its instances.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if !self.entities.destroy(entity) {
            return false;
        }
        self.components.entity_destroyed(entity);
        true
    }

    /// Request destruction of `entity` at the next sweep.
    ///
    /// The entity reads as having no components from now on.
    pub fn mark_entity_dead(&mut self, entity: Entity) -> bool {
        self.entities.mark_dead(entity)
    }

    /// Destroy every entity whose destruction was requested.
    pub fn sweep_dead_entities(&mut self) -> usize {
        let dead = self.entities.dead_entities();
        for &entity in &dead {
            self.destroy_entity(entity);
        }
        if !dead.is_empty() {
            debug!(world = %self.id, count = dead.len(), "swept dead entities");
        }
        dead.len()
    }

    /// Returns `true` if `entity` is mapped and not flagged dead.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.get(entity).is_some_and(|r| r.is_alive())
    }

    /// Number of mapped entities, including those awaiting a sweep.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // -- Component types --

    /// Register a component type of `item_size` bytes.
    pub fn register_component(&mut self, item_size: usize) -> Result<ComponentId> {
        self.components.register(item_size)
    }

    /// Unregister a component type and clear it from every entity mask.
    pub fn unregister_component(&mut self, component: ComponentId) -> bool {
        if !self.components.unregister(component) {
            return false;
        }
        self.entities.clear_component(component);
        true
    }

    /// Number of registered component types.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    // -- Membership --

    /// Attach a zeroed instance of `component` to `entity`.
    ///
    /// Attaching a component the entity already has is a no-op.
    pub fn attach_component(&mut self, entity: Entity, component: ComponentId) -> Result<()> {
        let record = self
            .entities
            .get_mut(entity)
            .ok_or(EcsError::UnknownEntity(entity))?;
        self.components.attach(entity, component)?;
        record.mask.insert(component);
        Ok(())
    }

    /// Attach an instance of `component` initialised from `bytes`.
    ///
    /// An instance the entity already has keeps its current bytes.
    pub fn attach_component_with(
        &mut self,
        entity: Entity,
        component: ComponentId,
        bytes: &[u8],
    ) -> Result<()> {
        let record = self
            .entities
            .get_mut(entity)
            .ok_or(EcsError::UnknownEntity(entity))?;
        self.components.attach_with(entity, component, bytes)?;
        record.mask.insert(component);
        Ok(())
    }

    /// Attach `component` to `entity` if needed and store `value` in it.
    pub fn insert<T: bytemuck::Pod>(
        &mut self,
        entity: Entity,
        component: ComponentId,
        value: &T,
    ) -> Result<()> {
        let bytes = bytemuck::bytes_of(value);
        self.attach_component_with(entity, component, bytes)?;
        if let Some(slot) = self.components.get_mut(entity, component) {
            slot.copy_from_slice(bytes);
        }
        Ok(())
    }

    /// Detach `component` from `entity`, dropping its instance.
    pub fn detach_component(&mut self, entity: Entity, component: ComponentId) -> Result<()> {
        let record = self
            .entities
            .get_mut(entity)
            .ok_or(EcsError::UnknownEntity(entity))?;
        self.components.detach(entity, component)?;
        record.mask.remove(component);
        Ok(())
    }

    /// Returns `true` if `entity` is alive and its mask holds `component`.
    #[must_use]
    pub fn has_component(&self, entity: Entity, component: ComponentId) -> bool {
        self.entities
            .get(entity)
            .is_some_and(|r| r.is_alive() && r.mask.contains(component))
    }

    /// Bytes of the instance of `component` owned by `entity`.
    #[must_use]
    pub fn component(&self, entity: Entity, component: ComponentId) -> Option<&[u8]> {
        if !self.has_component(entity, component) {
            return None;
        }
        self.components.get(entity, component)
    }

    /// Mutable bytes of the instance of `component` owned by `entity`.
    pub fn component_mut(&mut self, entity: Entity, component: ComponentId) -> Option<&mut [u8]> {
        if !self.has_component(entity, component) {
            return None;
        }
        self.components.get_mut(entity, component)
    }

    /// Copy of the instance of `component` reinterpreted as `T`.
    #[must_use]
    pub fn read<T: bytemuck::Pod>(&self, entity: Entity, component: ComponentId) -> Option<T> {
        bytemuck::try_pod_read_unaligned(self.component(entity, component)?).ok()
    }

    /// Overwrite the instance of `component` with `value`.
    ///
    /// Returns `false` if the entity lacks the component or the sizes differ.
    pub fn write<T: bytemuck::Pod>(
        &mut self,
        entity: Entity,
        component: ComponentId,
        value: &T,
    ) -> bool {
        let bytes = bytemuck::bytes_of(value);
        match self.component_mut(entity, component) {
            Some(slot) if slot.len() == bytes.len() => {
                slot.copy_from_slice(bytes);
                true
            }
            _ => false,
        }
    }

    // -- Queries --

    /// Every live entity holding all of `components`, with their bytes.
    ///
    /// Returns `None` for a world that is dead or torn down.
    pub fn query(&mut self, components: &[ComponentId]) -> Option<QueryResult<'_>> {
        if self.dead || self.destroyed {
            return None;
        }
        self.query_buffer
            .fill(&self.entities, &self.components, components);
        Some(QueryResult::new(&self.query_buffer, &self.components))
    }

    /// Like [`World::query`], with mutable access to the matched instances.
    pub fn query_mut(&mut self, components: &[ComponentId]) -> Option<QueryResultMut<'_>> {
        if self.dead || self.destroyed {
            return None;
        }
        self.query_buffer
            .fill(&self.entities, &self.components, components);
        let stores = self.components.stores_mut(self.query_buffer.components());
        Some(QueryResultMut::new(&self.query_buffer, stores))
    }

    // -- Teardown --

    /// Destroy every entity, unregister every type and free all storage.
    pub fn teardown(&mut self) {
        if self.destroyed {
            return;
        }
        let entities: Vec<Entity> = self.entities.ids().collect();
        for entity in entities {
            self.destroy_entity(entity);
        }
        self.components.release();
        self.entities.release();
        self.query_buffer.release();
        self.dead = true;
        self.destroyed = true;
        debug!(world = %self.id, "world torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        World::new(WorldId(1))
    }

    #[test]
    fn test_fresh_entity_has_nothing() {
        let mut world = world();
        let a = world.register_component(4).unwrap();
        let e = world.create_entity();
        assert!(e.is_valid());
        assert!(!world.has_component(e, a));
        assert!(world.component(e, a).is_none());
    }

    #[test]
    fn test_attach_then_has() {
        let mut world = world();
        let a = world.register_component(12).unwrap();
        let e = world.create_entity();
        world.attach_component(e, a).unwrap();
        assert!(world.has_component(e, a));
        assert_eq!(world.component(e, a).unwrap(), &[0u8; 12][..]);
    }

    #[test]
    fn test_attach_unknown_component_leaves_mask_clear() {
        let mut world = world();
        let e = world.create_entity();
        let missing = ComponentId(3);
        assert_eq!(
            world.attach_component(e, missing),
            Err(EcsError::UnknownComponent(missing))
        );
        assert!(!world.has_component(e, missing));
    }

    #[test]
    fn test_attach_unknown_entity() {
        let mut world = world();
        let a = world.register_component(4).unwrap();
        assert_eq!(
            world.attach_component(Entity(9), a),
            Err(EcsError::UnknownEntity(Entity(9)))
        );
        assert!(world.components().store(a).unwrap().is_empty());
    }

    #[test]
    fn test_detach_clears_mask_and_storage() {
        let mut world = world();
        let a = world.register_component(4).unwrap();
        let e = world.create_entity();
        world.attach_component(e, a).unwrap();
        world.detach_component(e, a).unwrap();
        assert!(!world.has_component(e, a));
        assert!(world.component(e, a).is_none());
        assert!(world.components().store(a).unwrap().is_empty());
    }

    #[test]
    fn test_insert_and_read_typed() {
        let mut world = world();
        let a = world.register_component(std::mem::size_of::<[f32; 2]>()).unwrap();
        let e = world.create_entity();
        world.insert(e, a, &[1.5f32, -2.0]).unwrap();
        assert_eq!(world.read::<[f32; 2]>(e, a), Some([1.5, -2.0]));

        world.insert(e, a, &[3.0f32, 4.0]).unwrap();
        assert_eq!(world.read::<[f32; 2]>(e, a), Some([3.0, 4.0]));
        assert_eq!(world.components().store(a).unwrap().len(), 1);
    }

    #[test]
    fn test_insert_wrong_size() {
        let mut world = world();
        let a = world.register_component(4).unwrap();
        let e = world.create_entity();
        assert_eq!(
            world.insert(e, a, &7u64),
            Err(EcsError::SizeMismatch { expected: 4, actual: 8 })
        );
        assert!(!world.has_component(e, a));
    }

    #[test]
    fn test_failed_growth_keeps_mask_and_other_components() {
        let mut world = world();
        let small = world.register_component(4).unwrap();
        let huge = world.register_component(isize::MAX as usize + 1).unwrap();
        let e = world.create_entity();
        world.insert(e, small, &7u32).unwrap();

        assert_eq!(
            world.attach_component(e, huge),
            Err(EcsError::AllocationFailed {
                component: huge,
                requested: 1,
            })
        );
        assert!(!world.has_component(e, huge));
        assert!(!world.entities().get(e).unwrap().mask.contains(huge));
        let store = world.components().store(huge).unwrap();
        assert_eq!(store.capacity(), 0);
        assert_eq!(store.len(), 0);

        assert!(world.has_component(e, small));
        assert_eq!(world.read::<u32>(e, small), Some(7));
        assert_eq!(world.components().store(small).unwrap().len(), 1);
    }

    #[test]
    fn test_write_requires_component() {
        let mut world = world();
        let a = world.register_component(4).unwrap();
        let e = world.create_entity();
        assert!(!world.write(e, a, &1u32));
        world.attach_component(e, a).unwrap();
        assert!(world.write(e, a, &1u32));
        assert!(!world.write(e, a, &1u64));
        assert_eq!(world.read::<u32>(e, a), Some(1));
    }

    #[test]
    fn test_mark_dead_hides_components_until_sweep() {
        let mut world = world();
        let a = world.register_component(4).unwrap();
        let e = world.create_entity();
        world.attach_component(e, a).unwrap();

        assert!(world.mark_entity_dead(e));
        assert!(!world.has_component(e, a));
        assert!(!world.is_alive(e));
        assert_eq!(world.entity_count(), 1);
        assert_eq!(world.components().store(a).unwrap().len(), 1);

        assert_eq!(world.sweep_dead_entities(), 1);
        assert_eq!(world.entity_count(), 0);
        assert!(world.components().store(a).unwrap().is_empty());
        assert_eq!(world.sweep_dead_entities(), 0);
    }

    #[test]
    fn test_unregister_clears_masks() {
        let mut world = world();
        let a = world.register_component(4).unwrap();
        let e = world.create_entity();
        world.attach_component(e, a).unwrap();
        assert!(world.unregister_component(a));
        assert!(!world.has_component(e, a));
        assert!(!world.unregister_component(a));
        assert_eq!(world.component_count(), 0);
    }

    #[test]
    fn test_query_on_dead_world() {
        let mut world = world();
        world.create_entity();
        world.mark_dead();
        assert!(world.query(&[]).is_none());
        assert!(world.query_mut(&[]).is_none());
    }

    #[test]
    fn test_teardown_releases_everything() {
        let mut world = world();
        let a = world.register_component(4).unwrap();
        let e = world.create_entity();
        world.attach_component(e, a).unwrap();
        world.teardown();
        assert!(world.is_destroyed());
        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.component_count(), 0);
        assert!(world.query(&[]).is_none());
    }

    #[test]
    fn test_config_builder_and_json() {
        let config = WorldConfig::new()
            .with_entity_capacity(128)
            .with_query_capacity(32);
        let parsed: WorldConfig =
            serde_json::from_str(r#"{"entity_capacity":128,"query_capacity":32}"#).unwrap();
        assert_eq!(config, parsed);
        let partial: WorldConfig = serde_json::from_str(r#"{"query_capacity":4}"#).unwrap();
        assert_eq!(partial.entity_capacity, 0);
    }
}
