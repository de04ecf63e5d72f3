//! Ownership of every world, and the deferred-destruction sweep.
//!
//! Worlds are created and destroyed through the [`WorldRegistry`]. Destroying
//! a world, like destroying an entity through the convenience surface, only
//! records the request; the actual teardown happens in [`WorldRegistry::update`].

use tracing::debug;

use crate::index_map::{IdIndex, IndexMap};
use crate::world::{World, WorldConfig, WorldId};

/// What one [`WorldRegistry::update`] call destroyed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Entities swept from the current world.
    pub entities_destroyed: usize,
    /// Worlds torn down.
    pub worlds_destroyed: usize,
}

impl UpdateReport {
    /// Returns `true` if the update had nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities_destroyed == 0 && self.worlds_destroyed == 0
    }
}

/// Owns all worlds and reuses the slots of torn-down ones.
#[derive(Debug, Default)]
pub struct WorldRegistry {
    last_id: u64,
    worlds: Vec<World>,
    id_to_index: IndexMap<WorldId, usize>,
    index_to_id: IndexMap<usize, WorldId>,
    free_slots: Vec<usize>,
}

impl WorldRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty world.
    pub fn create(&mut self) -> WorldId {
        self.create_with(&WorldConfig::default())
    }

    /// Create an empty world with the capacity hints of `config`.
    pub fn create_with(&mut self, config: &WorldConfig) -> WorldId {
        self.last_id += 1;
        let id = WorldId(self.last_id);
        let world = World::with_config(id, config);

        let index = match self.free_slots.pop() {
            Some(index) => {
                self.worlds[index] = world;
                index
            }
            None => {
                self.worlds.push(world);
                self.worlds.len() - 1
            }
        };

        self.id_to_index.set(id, index);
        self.index_to_id.set(index, id);
        debug!(world = %id, slot = index, "created world");
        id
    }

    /// Request teardown of `id` at the next [`update`](Self::update).
    pub fn destroy(&mut self, id: WorldId) -> bool {
        match self.get_mut(id) {
            Some(world) => {
                world.mark_dead();
                true
            }
            None => false,
        }
    }

    /// Tear `id` down now and free its slot.
    pub fn teardown(&mut self, id: WorldId) -> bool {
        let Some(index) = self.id_to_index.get(&id) else {
            return false;
        };

        self.worlds[index].teardown();
        self.free_slots.push(index);
        self.id_to_index.unset(&id);
        self.index_to_id.unset(&index);
        true
    }

    /// The world `id`, unless unknown or torn down.
    #[must_use]
    pub fn get(&self, id: WorldId) -> Option<&World> {
        self.id_to_index.get(&id).map(|index| &self.worlds[index])
    }

    /// The mutable world `id`, unless unknown or torn down.
    pub fn get_mut(&mut self, id: WorldId) -> Option<&mut World> {
        let index = self.id_to_index.get(&id)?;
        self.worlds.get_mut(index)
    }

    /// Number of worlds not yet torn down.
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_index.len()
    }

    /// Returns `true` if every world has been torn down.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_index.is_empty()
    }

    /// Ids of worlds not yet torn down, in slot order.
    pub fn ids(&self) -> impl Iterator<Item = WorldId> + '_ {
        (0..self.worlds.len()).filter_map(|index| self.index_to_id.get(&index))
    }

    /// Run deferred destruction.
    ///
    /// Sweeps dead entities of `current` (if it still exists), then tears
    /// down every world whose destruction was requested.
    pub fn update(&mut self, current: WorldId) -> UpdateReport {
        let mut report = UpdateReport::default();

        if let Some(world) = self.get_mut(current) {
            report.entities_destroyed = world.sweep_dead_entities();
        }

        let dead: Vec<WorldId> = self
            .ids()
            .filter(|&id| self.get(id).is_some_and(|w| w.is_dead() && !w.is_destroyed()))
            .collect();
        for id in dead {
            if self.teardown(id) {
                report.worlds_destroyed += 1;
            }
        }

        if !report.is_empty() {
            debug!(
                entities = report.entities_destroyed,
                worlds = report.worlds_destroyed,
                "update swept deferred destructions"
            );
        }
        report
    }
}
