//! Per-kind component storage.
//!
//! Each registered kind gets one [`SparseSet`]: a sparse array from entity
//! slot to dense position, and two parallel dense arrays holding the owning
//! entities and the values. Lookups, inserts and removals are O(1); iteration
//! is a linear walk over contiguous memory.
//!
//! Removal swap-erases, so dense order is **not** insertion order and can
//! change after any remove. Callers that need a stable order sort by entity.

use std::any::Any;

use crate::component::{Component, ComponentTypeId, decode_component, encode_component};
use crate::entity::Entity;
use crate::error::{EcsError, EcsResult};

/// Sparse-set storage for one component kind.
#[derive(Debug, Clone)]
pub struct SparseSet<T> {
    /// Entity slot -> dense position.
    sparse: Vec<Option<usize>>,
    /// Owning entity per dense position.
    entities: Vec<Entity>,
    /// Value per dense position, parallel with `entities`.
    values: Vec<T>,
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self {
            sparse: Vec::new(),
            entities: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<T> SparseSet<T> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn dense_index(&self, entity: Entity) -> Option<usize> {
        let dense = (*self.sparse.get(entity.index() as usize)?)?;
        // A stale handle shares the slot but not the generation.
        (self.entities[dense] == entity).then_some(dense)
    }

    /// Insert or overwrite the value for `entity`, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::OutOfMemory`] if the store cannot grow; nothing is
    /// inserted in that case.
    pub fn insert(&mut self, entity: Entity, value: T) -> EcsResult<Option<T>> {
        let slot = entity.index() as usize;
        if let Some(Some(dense)) = self.sparse.get(slot).copied() {
            let previous = std::mem::replace(&mut self.values[dense], value);
            if self.entities[dense] == entity {
                return Ok(Some(previous));
            }
            // The slot held a value for an older generation; it is not ours to return.
            self.entities[dense] = entity;
            return Ok(None);
        }

        if slot >= self.sparse.len() {
            self.sparse
                .try_reserve(slot + 1 - self.sparse.len())
                .map_err(|e| EcsError::OutOfMemory(e.to_string()))?;
        }
        self.entities
            .try_reserve(1)
            .and_then(|()| self.values.try_reserve(1))
            .map_err(|e| EcsError::OutOfMemory(e.to_string()))?;

        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, None);
        }
        self.sparse[slot] = Some(self.entities.len());
        self.entities.push(entity);
        self.values.push(value);
        Ok(None)
    }

    /// Remove the value for `entity`, swap-erasing the dense arrays.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let dense = self.dense_index(entity)?;
        let value = self.values.swap_remove(dense);
        self.entities.swap_remove(dense);
        if let Some(&moved) = self.entities.get(dense) {
            self.sparse[moved.index() as usize] = Some(dense);
        }
        self.sparse[entity.index() as usize] = None;
        Some(value)
    }

    /// The value for `entity`, if present.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity).map(|dense| &self.values[dense])
    }

    /// Mutable access to the value for `entity`, if present.
    #[must_use]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.dense_index(entity).map(|dense| &mut self.values[dense])
    }

    /// Returns `true` if `entity` has a value here.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Drop every value.
    pub fn clear(&mut self) {
        self.sparse.clear();
        self.entities.clear();
        self.values.clear();
    }

    /// `(entity, value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.values.iter())
    }

    /// `(entity, value)` pairs in dense order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.values.iter_mut())
    }

    /// Owning entities in dense order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Values in dense order.
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }
}

/// Type-erased access to a [`SparseSet`], used by the world for operations
/// that span every kind: destroy, clear, snapshots and replication diffs.
pub trait ErasedStore: Send + Sync {
    /// The stored kind.
    fn kind_id(&self) -> ComponentTypeId;
    /// The stored kind's name.
    fn kind_name(&self) -> &'static str;
    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
    /// Downcast support.
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Returns `true` if `entity` has a value here.
    fn contains(&self, entity: Entity) -> bool;
    /// Remove `entity`'s value, returning whether one existed.
    fn remove_entity(&mut self, entity: Entity) -> bool;
    /// Number of stored values.
    fn len(&self) -> usize;
    /// Returns `true` if the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Drop every value.
    fn clear(&mut self);
    /// Owning entities in dense order.
    fn entities(&self) -> &[Entity];
    /// Encode `entity`'s value, if present.
    fn encode_entry(&self, entity: Entity) -> Option<EcsResult<Vec<u8>>>;
    /// Decode `bytes` and store the value for `entity`.
    fn insert_encoded(&mut self, entity: Entity, bytes: &[u8]) -> EcsResult<()>;
    /// Deep copy into a new boxed store.
    fn boxed_clone(&self) -> Box<dyn ErasedStore>;
}

impl<T: Component> ErasedStore for SparseSet<T> {
    fn kind_id(&self) -> ComponentTypeId {
        T::component_type_id()
    }

    fn kind_name(&self) -> &'static str {
        T::type_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn contains(&self, entity: Entity) -> bool {
        SparseSet::contains(self, entity)
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn len(&self) -> usize {
        SparseSet::len(self)
    }

    fn clear(&mut self) {
        SparseSet::clear(self);
    }

    fn entities(&self) -> &[Entity] {
        SparseSet::entities(self)
    }

    fn encode_entry(&self, entity: Entity) -> Option<EcsResult<Vec<u8>>> {
        self.get(entity).map(encode_component)
    }

    fn insert_encoded(&mut self, entity: Entity, bytes: &[u8]) -> EcsResult<()> {
        let value: T = decode_component(bytes)?;
        self.insert(entity, value)?;
        Ok(())
    }

    fn boxed_clone(&self) -> Box<dyn ErasedStore> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Position {
        x: f32,
        y: f32,
    }

    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    fn pos(x: f32, y: f32) -> Position {
        Position { x, y }
    }

    #[test]
    fn test_insert_get_remove() {
        let mut store = SparseSet::new();
        let e = Entity::new(3, 0);
        assert_eq!(store.insert(e, pos(1.0, 2.0)).unwrap(), None);
        assert_eq!(store.get(e), Some(&pos(1.0, 2.0)));
        assert_eq!(store.remove(e), Some(pos(1.0, 2.0)));
        assert_eq!(store.get(e), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_insert_overwrites_instead_of_duplicating() {
        let mut store = SparseSet::new();
        let e = Entity::new(0, 0);
        store.insert(e, pos(1.0, 1.0)).unwrap();
        let old = store.insert(e, pos(2.0, 2.0)).unwrap();
        assert_eq!(old, Some(pos(1.0, 1.0)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(e), Some(&pos(2.0, 2.0)));
    }

    #[test]
    fn test_stale_generation_is_not_visible() {
        let mut store = SparseSet::new();
        let old = Entity::new(5, 0);
        let new = Entity::new(5, 1);
        store.insert(old, pos(1.0, 1.0)).unwrap();
        assert!(store.get(new).is_none());
        assert!(store.remove(new).is_none());
        assert!(store.contains(old));
    }

    #[test]
    fn test_swap_erase_keeps_other_entries_reachable() {
        let mut store = SparseSet::new();
        let a = Entity::new(0, 0);
        let b = Entity::new(1, 0);
        let c = Entity::new(2, 0);
        store.insert(a, pos(0.0, 0.0)).unwrap();
        store.insert(b, pos(1.0, 1.0)).unwrap();
        store.insert(c, pos(2.0, 2.0)).unwrap();

        store.remove(a);
        assert_eq!(store.get(b), Some(&pos(1.0, 1.0)));
        assert_eq!(store.get(c), Some(&pos(2.0, 2.0)));
        assert_eq!(store.len(), 2);

        let mut seen: Vec<_> = store.iter().map(|(e, _)| e).collect();
        seen.sort();
        assert_eq!(seen, vec![b, c]);
    }

    #[test]
    fn test_iter_mut_writes_through() {
        let mut store = SparseSet::new();
        store.insert(Entity::new(0, 0), pos(1.0, 1.0)).unwrap();
        store.insert(Entity::new(1, 0), pos(2.0, 2.0)).unwrap();
        for (_, p) in store.iter_mut() {
            p.x *= 10.0;
        }
        assert_eq!(store.get(Entity::new(1, 0)).map(|p| p.x), Some(20.0));
    }

    #[test]
    fn test_erased_encode_and_insert() {
        let mut store: Box<dyn ErasedStore> = Box::new(SparseSet::<Position>::new());
        let e = Entity::new(1, 0);
        let bytes = encode_component(&pos(4.0, 5.0)).unwrap();
        store.insert_encoded(e, &bytes).unwrap();
        assert!(store.contains(e));
        assert_eq!(store.encode_entry(e).unwrap().unwrap(), bytes);

        let typed = store
            .as_any()
            .downcast_ref::<SparseSet<Position>>()
            .unwrap();
        assert_eq!(typed.get(e), Some(&pos(4.0, 5.0)));

        assert!(store.remove_entity(e));
        assert!(!store.remove_entity(e));
    }

    #[test]
    fn test_erased_insert_rejects_garbage() {
        let mut store: Box<dyn ErasedStore> = Box::new(SparseSet::<Position>::new());
        assert!(store.insert_encoded(Entity::new(0, 0), &[0xc1]).is_err());
        assert!(store.is_empty());
    }
}
