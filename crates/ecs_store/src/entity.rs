//! Entity identifiers, component masks and the per-world entity table.
//!
//! Each world's [`EntityTable`] issues ids starting at 1 and never issues the
//! same id twice, even though the table's storage slots are recycled.

use serde::{Deserialize, Serialize};

use crate::component::ComponentId;
use crate::index_map::{IdIndex, IndexMap};

/// Row identifier issued by an [`EntityTable`].
///
/// The id carries no data. Component membership lives in the table's
/// [`EntityRecord`], instance bytes in the world's component stores.
/// `Entity(0)` never names a row and stands for "no entity".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Entity(pub u64);

impl Entity {
    /// Returned in place of an entity when creation fails.
    pub const INVALID: Entity = Entity(0);

    /// The raw id.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// `false` only for [`Entity::INVALID`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// The id a table issues after this one.
    const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Number of component bits held by one mask word.
pub const MASK_WORD_BITS: u64 = u64::BITS as u64;

/// Per-entity bitset of attached component types.
///
/// Component id `c` lives at bit `(c - 1) % 64` of word `(c - 1) / 64`. The
/// word array grows on demand and is never shrunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentMask {
    words: Vec<u64>,
}

impl ComponentMask {
    /// Create an all-zero mask.
    #[must_use]
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    fn locate(component: ComponentId) -> Option<(usize, u64)> {
        if !component.is_valid() {
            return None;
        }
        let bit = component.id() - 1;
        Some(((bit / MASK_WORD_BITS) as usize, 1u64 << (bit % MASK_WORD_BITS)))
    }

    fn grow_to(&mut self, word: usize) {
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
    }

    /// Set the bit for `component`. The zero id is ignored.
    pub fn insert(&mut self, component: ComponentId) {
        if let Some((word, bit)) = Self::locate(component) {
            self.grow_to(word);
            self.words[word] |= bit;
        }
    }

    /// Clear the bit for `component`, growing the word array if it is short.
    pub fn remove(&mut self, component: ComponentId) {
        if let Some((word, bit)) = Self::locate(component) {
            self.grow_to(word);
            self.words[word] &= !bit;
        }
    }

    /// Returns `true` if the bit for `component` is set.
    #[must_use]
    pub fn contains(&self, component: ComponentId) -> bool {
        match Self::locate(component) {
            Some((word, bit)) => self.words.get(word).is_some_and(|w| w & bit != 0),
            None => false,
        }
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Number of allocated words.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

/// State kept for each entity slot.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    /// The entity occupying (or last occupying) this slot.
    pub id: Entity,
    /// Attached component types.
    pub mask: ComponentMask,
    /// Destruction has been requested.
    pub dead: bool,
    /// The slot has been reclaimed.
    pub destroyed: bool,
}

impl EntityRecord {
    fn new(id: Entity) -> Self {
        Self {
            id,
            mask: ComponentMask::new(),
            dead: false,
            destroyed: false,
        }
    }

    /// Returns `true` unless destruction was requested or has completed.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.dead && !self.destroyed
    }
}

/// Issues entity ids and stores per-entity records in reusable slots.
#[derive(Debug, Default)]
pub struct EntityTable {
    /// Last id issued; ids are never handed out twice.
    last: Entity,
    records: Vec<EntityRecord>,
    id_to_index: IndexMap<Entity, usize>,
    index_to_id: IndexMap<usize, Entity>,
    free_slots: Vec<usize>,
}

impl EntityTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with room for `capacity` entities.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            id_to_index: IndexMap::with_capacity(capacity),
            index_to_id: IndexMap::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Allocate a fresh entity, reusing the most recently freed slot if any.
    pub fn create(&mut self) -> Entity {
        let entity = self.last.next();
        self.last = entity;
        let record = EntityRecord::new(entity);

        let index = match self.free_slots.pop() {
            Some(index) => {
                self.records[index] = record;
                index
            }
            None => {
                self.records.push(record);
                self.records.len() - 1
            }
        };

        self.id_to_index.set(entity, index);
        self.index_to_id.set(index, entity);
        entity
    }

    /// Reclaim the slot of `entity` immediately.
    ///
    /// This does not touch component storage; see
    /// [`World::destroy_entity`](crate::world::World::destroy_entity).
    pub fn destroy(&mut self, entity: Entity) -> bool {
        let Some(index) = self.id_to_index.get(&entity) else {
            return false;
        };

        self.free_slots.push(index);
        self.id_to_index.unset(&entity);
        self.index_to_id.unset(&index);
        self.records[index].destroyed = true;
        true
    }

    /// Flag `entity` for destruction at the next sweep.
    pub fn mark_dead(&mut self, entity: Entity) -> bool {
        match self.get_mut(entity) {
            Some(record) => {
                record.dead = true;
                true
            }
            None => false,
        }
    }

    /// Slot index of a mapped entity.
    #[must_use]
    pub fn index_of(&self, entity: Entity) -> Option<usize> {
        self.id_to_index.get(&entity)
    }

    /// Entity mapped at slot `index`, if the slot is occupied.
    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<Entity> {
        self.index_to_id.get(&index)
    }

    /// Record at slot `index`, occupied or not.
    #[must_use]
    pub fn get_at(&self, index: usize) -> Option<&EntityRecord> {
        self.records.get(index)
    }

    /// Record of a mapped entity.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&EntityRecord> {
        self.index_of(entity).and_then(|index| self.records.get(index))
    }

    /// Mutable record of a mapped entity.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        let index = self.index_of(entity)?;
        self.records.get_mut(index)
    }

    /// Number of slots ever allocated, occupied or free.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Number of mapped entities, including those awaiting a sweep.
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_index.len()
    }

    /// Returns `true` if no entity is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_index.is_empty()
    }

    /// Mapped entities in ascending slot order.
    pub fn ids(&self) -> impl Iterator<Item = Entity> + '_ {
        (0..self.records.len()).filter_map(|index| self.id_at(index))
    }

    /// Entities flagged dead whose slots have not been reclaimed yet.
    #[must_use]
    pub fn dead_entities(&self) -> Vec<Entity> {
        self.records
            .iter()
            .filter(|record| record.dead && !record.destroyed)
            .map(|record| record.id)
            .collect()
    }

    /// Clear `component` from every record's mask.
    pub(crate) fn clear_component(&mut self, component: ComponentId) {
        for record in &mut self.records {
            if record.mask.contains(component) {
                record.mask.remove(component);
            }
        }
    }

    /// Release every slot and both index maps.
    pub(crate) fn release(&mut self) {
        self.records = Vec::new();
        self.free_slots = Vec::new();
        self.id_to_index.clear();
        self.index_to_id.clear();
    }
}
