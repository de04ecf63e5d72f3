//! Bitmask queries over a world's live entities.
//!
//! A query names a set of component types and yields every live entity that
//! holds all of them, together with the bytes of each requested component.
//! Results are materialised into a buffer owned by the world and reused by
//! the next query, so a result borrows its world: the borrow checker rejects
//! any mutation of the world while a result is still in use.

use tracing::warn;

use crate::component::{ComponentId, ComponentRegistry, ComponentStore};
use crate::entity::{Entity, EntityTable};

/// Reusable result storage owned by a [`World`](crate::world::World).
///
/// Grows to the largest result seen and is never shrunk.
#[derive(Debug, Default)]
pub(crate) struct QueryBuffer {
    /// Requested ids, zero ids dropped, first occurrence kept.
    components: Vec<ComponentId>,
    /// Matching entities in slot-scan order.
    entities: Vec<Entity>,
    /// Row-major dense slots, `entities.len() * components.len()` long.
    slots: Vec<usize>,
}

impl QueryBuffer {
    pub(crate) fn with_capacity(rows: usize) -> Self {
        Self {
            components: Vec::new(),
            entities: Vec::with_capacity(rows),
            slots: Vec::new(),
        }
    }

    pub(crate) fn components(&self) -> &[ComponentId] {
        &self.components
    }

    fn set_components(&mut self, requested: &[ComponentId]) {
        self.components.clear();
        for &id in requested {
            if id.is_valid() && !self.components.contains(&id) {
                self.components.push(id);
            }
        }
    }

    /// Scan `table` and record every live entity holding all `requested` types.
    pub(crate) fn fill(
        &mut self,
        table: &EntityTable,
        registry: &ComponentRegistry,
        requested: &[ComponentId],
    ) {
        self.set_components(requested);
        self.entities.clear();
        self.slots.clear();

        'scan: for index in 0..table.capacity() {
            let Some(entity) = table.id_at(index) else {
                continue;
            };
            let Some(record) = table.get_at(index) else {
                continue;
            };
            if !record.is_alive() || !self.components.iter().all(|&c| record.mask.contains(c)) {
                continue;
            }

            let row_start = self.slots.len();
            for &component in &self.components {
                match registry.store(component).and_then(|s| s.slot_of(entity)) {
                    Some(slot) => self.slots.push(slot),
                    None => {
                        warn!(%entity, %component, "mask bit set without a stored instance");
                        self.slots.truncate(row_start);
                        continue 'scan;
                    }
                }
            }
            self.entities.push(entity);
        }
    }

    fn slot(&self, row: usize, col: usize) -> Option<usize> {
        let width = self.components.len();
        if row >= self.entities.len() || col >= width {
            return None;
        }
        self.slots.get(row * width + col).copied()
    }

    pub(crate) fn release(&mut self) {
        *self = Self::default();
    }
}

/// Read-only view of the latest query on a world.
#[derive(Debug, Clone, Copy)]
pub struct QueryResult<'w> {
    buffer: &'w QueryBuffer,
    registry: &'w ComponentRegistry,
}

impl<'w> QueryResult<'w> {
    pub(crate) fn new(buffer: &'w QueryBuffer, registry: &'w ComponentRegistry) -> Self {
        Self { buffer, registry }
    }

    /// Number of matching entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.entities.len()
    }

    /// Returns `true` if no entity matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.entities.is_empty()
    }

    /// Matching entities in row order.
    #[must_use]
    pub fn entities(&self) -> &'w [Entity] {
        &self.buffer.entities
    }

    /// Column order of the result.
    #[must_use]
    pub fn component_ids(&self) -> &'w [ComponentId] {
        &self.buffer.components
    }

    /// Bytes of column `col` in row `row`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<&'w [u8]> {
        let slot = self.buffer.slot(row, col)?;
        self.registry
            .store(self.buffer.components[col])?
            .get_at(slot)
    }

    /// Row `row` of the result.
    #[must_use]
    pub fn row(&self, row: usize) -> Option<QueryRow<'w>> {
        (row < self.len()).then_some(QueryRow { result: *self, row })
    }

    /// Iterate over the rows of the result.
    pub fn iter(&self) -> impl Iterator<Item = QueryRow<'w>> + use<'w> {
        let result = *self;
        (0..result.len()).map(move |row| QueryRow { result, row })
    }
}

/// One matching entity and its requested components.
#[derive(Debug, Clone, Copy)]
pub struct QueryRow<'w> {
    result: QueryResult<'w>,
    row: usize,
}

impl<'w> QueryRow<'w> {
    /// The matching entity.
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.result.buffer.entities[self.row]
    }

    /// Bytes of column `col`.
    #[must_use]
    pub fn get(&self, col: usize) -> Option<&'w [u8]> {
        self.result.get(self.row, col)
    }

    /// Copy of column `col` reinterpreted as `T`.
    ///
    /// `None` if the column size differs from `size_of::<T>()`.
    #[must_use]
    pub fn read<T: bytemuck::Pod>(&self, col: usize) -> Option<T> {
        bytemuck::try_pod_read_unaligned(self.get(col)?).ok()
    }

    /// Every column of the row, in request order.
    pub fn columns(&self) -> impl Iterator<Item = &'w [u8]> + use<'w> {
        let row = *self;
        (0..row.result.component_ids().len()).filter_map(move |col| row.get(col))
    }
}

/// Mutable view of the latest query on a world.
///
/// Columns refer to distinct stores, so one row can hand out every column
/// mutably at once.
#[derive(Debug)]
pub struct QueryResultMut<'w> {
    buffer: &'w QueryBuffer,
    stores: Vec<&'w mut ComponentStore>,
}

impl<'w> QueryResultMut<'w> {
    pub(crate) fn new(buffer: &'w QueryBuffer, stores: Vec<&'w mut ComponentStore>) -> Self {
        Self { buffer, stores }
    }

    /// Number of matching entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.entities.len()
    }

    /// Returns `true` if no entity matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.entities.is_empty()
    }

    /// Matching entities in row order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.buffer.entities
    }

    /// Column order of the result.
    #[must_use]
    pub fn component_ids(&self) -> &[ComponentId] {
        &self.buffer.components
    }

    /// Bytes of column `col` in row `row`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<&[u8]> {
        let slot = self.buffer.slot(row, col)?;
        self.stores.get(col)?.get_at(slot)
    }

    /// Mutable bytes of column `col` in row `row`.
    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut [u8]> {
        let slot = self.buffer.slot(row, col)?;
        self.stores.get_mut(col)?.get_at_mut(slot)
    }

    /// Call `f` with every matching entity and all of its columns.
    pub fn for_each<F>(&mut self, mut f: F)
    where
        F: FnMut(Entity, &mut [&mut [u8]]),
    {
        let buffer = self.buffer;
        for (row, &entity) in buffer.entities.iter().enumerate() {
            let mut columns: Vec<&mut [u8]> = self
                .stores
                .iter_mut()
                .enumerate()
                .filter_map(|(col, store)| store.get_at_mut(buffer.slot(row, col)?))
                .collect();
            f(entity, &mut columns);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ids_dropped_and_duplicates_merged() {
        let mut buffer = QueryBuffer::default();
        buffer.set_components(&[
            ComponentId(2),
            ComponentId::INVALID,
            ComponentId(1),
            ComponentId(2),
        ]);
        assert_eq!(buffer.components(), &[ComponentId(2), ComponentId(1)]);
    }

    #[test]
    fn test_slot_out_of_range() {
        let mut buffer = QueryBuffer::default();
        buffer.set_components(&[ComponentId(1)]);
        buffer.entities.push(Entity(1));
        buffer.slots.push(4);
        assert_eq!(buffer.slot(0, 0), Some(4));
        assert_eq!(buffer.slot(0, 1), None);
        assert_eq!(buffer.slot(1, 0), None);
    }

    #[test]
    fn test_fill_skips_unmapped_slots() {
        let mut table = EntityTable::new();
        let registry = ComponentRegistry::new();
        let e1 = table.create();
        let e2 = table.create();
        table.destroy(e1);

        let mut buffer = QueryBuffer::default();
        buffer.fill(&table, &registry, &[]);
        assert_eq!(buffer.entities, vec![e2]);
        assert!(buffer.slots.is_empty());
    }

    #[test]
    fn test_release_drops_capacity() {
        let mut buffer = QueryBuffer::with_capacity(32);
        buffer.release();
        assert_eq!(buffer.entities.capacity(), 0);
    }
}
