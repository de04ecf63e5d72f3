//! Component type identifiers and packed per-type storage.
//!
//! Every registered component type owns one [`ComponentStore`]: a densely
//! packed byte buffer holding `len()` instances of `item_size` bytes each,
//! with no holes. Removal is a swap-remove, so a slot index is only stable
//! until the next detach on the same store.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::index_map::{IdIndex, IndexMap};

/// Identifier of a registered component type, unique within one world.
///
/// Ids are handed out by [`ComponentRegistry::register`] starting at 1 and
/// are not reused after [`ComponentRegistry::unregister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub u64);

impl ComponentId {
    /// The null / invalid component sentinel.
    pub const INVALID: ComponentId = ComponentId(0);

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) component id.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Packed storage for every instance of one component type.
#[derive(Debug, Clone)]
pub struct ComponentStore {
    id: ComponentId,
    item_size: usize,
    /// Raw bytes. Length is always `item_size * count`.
    data: Vec<u8>,
    count: usize,
    capacity: usize,
    entity_to_slot: IndexMap<Entity, usize>,
    slot_to_entity: IndexMap<usize, Entity>,
    destroyed: bool,
}

impl ComponentStore {
    /// Create an empty store for instances of `item_size` bytes.
    #[must_use]
    pub fn new(id: ComponentId, item_size: usize) -> Self {
        Self {
            id,
            item_size,
            data: Vec::new(),
            count: 0,
            capacity: 0,
            entity_to_slot: IndexMap::new(),
            slot_to_entity: IndexMap::new(),
            destroyed: false,
        }
    }

    /// The component type stored here.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Size of one instance in bytes.
    #[must_use]
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Number of stored instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no instance is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of instances the store can hold before growing.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` once the store has been released.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Returns `true` if `entity` has an instance in this store.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entity_to_slot.get(&entity).is_some()
    }

    /// Dense slot holding the instance of `entity`.
    #[must_use]
    pub fn slot_of(&self, entity: Entity) -> Option<usize> {
        self.entity_to_slot.get(&entity)
    }

    /// Entity owning the instance at `slot`.
    #[must_use]
    pub fn entity_at(&self, slot: usize) -> Option<Entity> {
        self.slot_to_entity.get(&slot)
    }

    fn byte_range(&self, slot: usize) -> Option<std::ops::Range<usize>> {
        if slot >= self.count {
            return None;
        }
        let start = slot * self.item_size;
        Some(start..start + self.item_size)
    }

    /// Bytes of the instance at `slot`.
    #[must_use]
    pub fn get_at(&self, slot: usize) -> Option<&[u8]> {
        let range = self.byte_range(slot)?;
        Some(&self.data[range])
    }

    /// Mutable bytes of the instance at `slot`.
    pub fn get_at_mut(&mut self, slot: usize) -> Option<&mut [u8]> {
        let range = self.byte_range(slot)?;
        Some(&mut self.data[range])
    }

    /// Bytes of the instance owned by `entity`.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&[u8]> {
        self.get_at(self.slot_of(entity)?)
    }

    /// Mutable bytes of the instance owned by `entity`.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut [u8]> {
        let slot = self.slot_of(entity)?;
        self.get_at_mut(slot)
    }

    /// Make room for one more instance, growing capacity to `capacity * 2 + 1`.
    ///
    /// On failure nothing has changed.
    fn reserve_one(&mut self) -> Result<()> {
        if self.count < self.capacity {
            return Ok(());
        }

        let component = self.id;
        let failed = |requested| EcsError::AllocationFailed {
            component,
            requested,
        };
        let new_capacity = self
            .capacity
            .checked_mul(2)
            .and_then(|c| c.checked_add(1))
            .ok_or_else(|| failed(usize::MAX))?;
        let additional = (new_capacity - self.count)
            .checked_mul(self.item_size)
            .ok_or_else(|| failed(new_capacity))?;

        if let Err(err) = self.data.try_reserve_exact(additional) {
            warn!(%component, new_capacity, %err, "component storage growth failed");
            return Err(failed(new_capacity));
        }
        self.capacity = new_capacity;
        Ok(())
    }

    /// Attach a zero-initialised instance to `entity`.
    ///
    /// Returns `Ok(false)` if the entity already had an instance.
    pub fn attach(&mut self, entity: Entity) -> Result<bool> {
        if self.contains(entity) {
            return Ok(false);
        }
        self.reserve_one()?;
        self.data.resize(self.data.len() + self.item_size, 0);
        self.link(entity);
        Ok(true)
    }

    /// Attach an instance initialised from `bytes` to `entity`.
    ///
    /// An existing instance is left untouched and `Ok(false)` is returned.
    pub fn attach_with(&mut self, entity: Entity, bytes: &[u8]) -> Result<bool> {
        if bytes.len() != self.item_size {
            return Err(EcsError::SizeMismatch {
                expected: self.item_size,
                actual: bytes.len(),
            });
        }
        if self.contains(entity) {
            return Ok(false);
        }
        self.reserve_one()?;
        self.data.extend_from_slice(bytes);
        self.link(entity);
        Ok(true)
    }

    fn link(&mut self, entity: Entity) {
        let slot = self.count;
        self.entity_to_slot.set(entity, slot);
        self.slot_to_entity.set(slot, entity);
        self.count += 1;
        trace!(component = %self.id, %entity, slot, "attached");
    }

    /// Remove the instance of `entity` by moving the last instance into its
    /// slot. Returns `false` if the entity had no instance.
    pub fn detach(&mut self, entity: Entity) -> bool {
        let Some(slot) = self.slot_of(entity) else {
            return false;
        };
        let last = self.count - 1;
        let moved = self.slot_to_entity.get(&last);

        // Self-copy when `slot == last`.
        let last_start = last * self.item_size;
        self.data
            .copy_within(last_start..last_start + self.item_size, slot * self.item_size);
        self.data.truncate(last_start);

        self.entity_to_slot.unset(&entity);
        self.slot_to_entity.unset(&last);
        if slot != last
            && let Some(moved) = moved
        {
            self.entity_to_slot.set(moved, slot);
            self.slot_to_entity.set(slot, moved);
        }
        self.count = last;
        trace!(component = %self.id, %entity, slot, "detached");
        true
    }

    /// Drop the instance of a destroyed entity, if it has one.
    pub fn entity_destroyed(&mut self, entity: Entity) {
        self.detach(entity);
    }

    /// Free the buffer and both index maps.
    pub fn release(&mut self) {
        self.data = Vec::new();
        self.count = 0;
        self.capacity = 0;
        self.entity_to_slot.clear();
        self.slot_to_entity.clear();
        self.destroyed = true;
    }
}

/// All component stores of one world, addressed by [`ComponentId`].
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    last_id: u64,
    stores: Vec<ComponentStore>,
    id_to_index: IndexMap<ComponentId, usize>,
    index_to_id: IndexMap<usize, ComponentId>,
    free_slots: Vec<usize>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type whose instances are `item_size` bytes.
    pub fn register(&mut self, item_size: usize) -> Result<ComponentId> {
        if item_size == 0 {
            return Err(EcsError::ZeroSizedComponent);
        }

        self.last_id += 1;
        let id = ComponentId(self.last_id);
        let store = ComponentStore::new(id, item_size);

        let index = match self.free_slots.pop() {
            Some(index) => {
                self.stores[index] = store;
                index
            }
            None => {
                self.stores.push(store);
                self.stores.len() - 1
            }
        };

        self.id_to_index.set(id, index);
        self.index_to_id.set(index, id);
        debug!(component = %id, item_size, "registered component type");
        Ok(id)
    }

    /// Release the store of `id`. Returns `false` for an unknown id.
    pub fn unregister(&mut self, id: ComponentId) -> bool {
        let Some(index) = self.id_to_index.get(&id) else {
            return false;
        };

        self.stores[index].release();
        self.free_slots.push(index);
        self.id_to_index.unset(&id);
        self.index_to_id.unset(&index);
        debug!(component = %id, "unregistered component type");
        true
    }

    /// Returns `true` if `id` names a registered type.
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.id_to_index.get(&id).is_some()
    }

    /// The store of a registered type.
    #[must_use]
    pub fn store(&self, id: ComponentId) -> Option<&ComponentStore> {
        self.id_to_index.get(&id).map(|index| &self.stores[index])
    }

    /// The mutable store of a registered type.
    pub fn store_mut(&mut self, id: ComponentId) -> Option<&mut ComponentStore> {
        let index = self.id_to_index.get(&id)?;
        self.stores.get_mut(index)
    }

    fn store_or_err(&mut self, id: ComponentId) -> Result<&mut ComponentStore> {
        self.store_mut(id).ok_or(EcsError::UnknownComponent(id))
    }

    /// Instance size of a registered type.
    #[must_use]
    pub fn item_size(&self, id: ComponentId) -> Option<usize> {
        self.store(id).map(ComponentStore::item_size)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_index.len()
    }

    /// Returns `true` if no type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_index.is_empty()
    }

    /// Registered ids in registry-slot order.
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        (0..self.stores.len()).filter_map(|index| self.index_to_id.get(&index))
    }

    /// Attach a zeroed instance of `id` to `entity`.
    pub fn attach(&mut self, entity: Entity, id: ComponentId) -> Result<bool> {
        self.store_or_err(id)?.attach(entity)
    }

    /// Attach an instance of `id` initialised from `bytes`.
    pub fn attach_with(&mut self, entity: Entity, id: ComponentId, bytes: &[u8]) -> Result<bool> {
        self.store_or_err(id)?.attach_with(entity, bytes)
    }

    /// Detach the instance of `id` from `entity`.
    pub fn detach(&mut self, entity: Entity, id: ComponentId) -> Result<bool> {
        Ok(self.store_or_err(id)?.detach(entity))
    }

    /// Bytes of the instance of `id` owned by `entity`.
    #[must_use]
    pub fn get(&self, entity: Entity, id: ComponentId) -> Option<&[u8]> {
        self.store(id)?.get(entity)
    }

    /// Mutable bytes of the instance of `id` owned by `entity`.
    pub fn get_mut(&mut self, entity: Entity, id: ComponentId) -> Option<&mut [u8]> {
        self.store_mut(id)?.get_mut(entity)
    }

    /// Remove every instance owned by `entity`.
    pub fn entity_destroyed(&mut self, entity: Entity) {
        for store in self.stores.iter_mut().filter(|s| !s.is_destroyed()) {
            store.entity_destroyed(entity);
        }
    }

    /// Unregister every type and release all stores.
    pub(crate) fn release(&mut self) {
        let ids: Vec<ComponentId> = self.ids().collect();
        for id in ids {
            self.unregister(id);
        }
        self.stores = Vec::new();
        self.free_slots = Vec::new();
        self.id_to_index.clear();
        self.index_to_id.clear();
    }

    /// Mutable stores for `ids`, in the same order.
    ///
    /// `ids` must be registered and free of duplicates.
    pub(crate) fn stores_mut(&mut self, ids: &[ComponentId]) -> Vec<&mut ComponentStore> {
        let mut picked: Vec<Option<&mut ComponentStore>> = ids.iter().map(|_| None).collect();
        for store in self.stores.iter_mut().filter(|s| !s.is_destroyed()) {
            if let Some(col) = ids.iter().position(|&id| id == store.id()) {
                picked[col] = Some(store);
            }
        }
        picked.into_iter().flatten().collect()
    }
}
