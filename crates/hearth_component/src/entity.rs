//! Entity type and the generational entity table.
//!
//! An [`Entity`] is a slot index plus a generation counter. The
//! [`EntityTable`] owns liveness: a handle is valid only while its generation
//! matches the live generation stored in its slot.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// A generational entity identifier.
///
/// Entities are pure identifiers. Components are attached to entities to give
/// them meaning. Reused slots always carry a strictly larger generation, so a
/// stale handle is detected instead of silently addressing the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// The null sentinel. Never issued by an [`EntityTable`].
    pub const NULL: Entity = Entity {
        index: u32::MAX,
        generation: u32::MAX,
    };

    /// Build an entity from its parts.
    ///
    /// Mostly useful for tests and for restoring persisted handles; liveness is
    /// only ever decided by the table.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation the slot had when this handle was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Pack into the boundary representation: `generation << 32 | index`.
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    /// Unpack from the boundary representation.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }

    /// Returns `true` for the [`Entity::NULL`] sentinel.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.index == u32::MAX && self.generation == u32::MAX
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Persisted form of an [`EntityTable`]: every slot's generation plus the
/// free-list order. Slots that are neither live nor free are retired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTableState {
    /// Generation per slot, indexed by slot.
    pub generations: Vec<u32>,
    /// Free slots, front is reused first.
    pub free: Vec<u32>,
}

/// Owns entity identity and liveness.
///
/// Freed slots are recycled first-in first-out, which spreads generation
/// growth evenly across slots and keeps reuse latency predictable.
#[derive(Debug, Default, Clone)]
pub struct EntityTable {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: VecDeque<u32>,
    alive_count: usize,
}

impl EntityTable {
    /// Largest number of slots; `u32::MAX` itself is reserved for [`Entity::NULL`].
    pub const MAX_SLOTS: usize = u32::MAX as usize;

    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an entity, reusing the oldest freed slot or growing the table.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::OutOfMemory`] when the table cannot grow. The table
    /// is unchanged in that case.
    pub fn create(&mut self) -> EcsResult<Entity> {
        if let Some(index) = self.free.pop_front() {
            let slot = index as usize;
            self.alive[slot] = true;
            self.alive_count += 1;
            return Ok(Entity::new(index, self.generations[slot]));
        }

        let slot = self.generations.len();
        if slot >= Self::MAX_SLOTS {
            return Err(EcsError::OutOfMemory(format!(
                "entity table is full ({} slots)",
                Self::MAX_SLOTS
            )));
        }
        // Reserve everything up front so a failure leaves no partial growth and
        // a later destroy never has to allocate.
        self.generations
            .try_reserve(1)
            .and_then(|()| self.alive.try_reserve(1))
            .and_then(|()| self.free.try_reserve(1))
            .map_err(|e| EcsError::OutOfMemory(e.to_string()))?;

        self.generations.push(0);
        self.alive.push(true);
        self.alive_count += 1;
        Ok(Entity::new(slot as u32, 0))
    }

    /// Destroy a live entity, bumping its slot's generation.
    ///
    /// A slot whose generation is exhausted is retired instead of recycled.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidHandle`] if the entity is not alive.
    pub fn destroy(&mut self, entity: Entity) -> EcsResult<()> {
        if !self.is_alive(entity) {
            return Err(EcsError::InvalidHandle(entity));
        }
        let slot = entity.index() as usize;
        self.alive[slot] = false;
        self.alive_count -= 1;
        // An exhausted slot keeps its final generation and is never reissued.
        if let Some(next) = self.generations[slot].checked_add(1) {
            self.generations[slot] = next;
            self.free.push_back(entity.index());
        }
        Ok(())
    }

    /// Returns `true` if the handle's generation matches its live slot.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        let slot = entity.index() as usize;
        slot < self.generations.len()
            && self.alive[slot]
            && self.generations[slot] == entity.generation()
    }

    /// Number of live entities. O(1).
    #[must_use]
    pub fn count(&self) -> usize {
        self.alive_count
    }

    /// Returns `true` if no entity is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alive_count == 0
    }

    /// Total slots ever allocated, live or not.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.generations.len()
    }

    /// Live entities in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.generations
            .iter()
            .zip(self.alive.iter())
            .enumerate()
            .filter(|(_, (_, alive))| **alive)
            .map(|(slot, (&generation, _))| Entity::new(slot as u32, generation))
    }

    /// Destroy every live entity, in slot order.
    pub fn clear(&mut self) {
        let live: Vec<Entity> = self.iter().collect();
        for entity in live {
            // Every handle came from `iter`, so it is alive.
            let _ = self.destroy(entity);
        }
    }

    /// Capture slot generations and free-list order.
    #[must_use]
    pub fn state(&self) -> EntityTableState {
        EntityTableState {
            generations: self.generations.clone(),
            free: self.free.iter().copied().collect(),
        }
    }

    /// Rebuild a table from persisted state and the set of live entities.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::OperationFailed`] if the state is inconsistent: a
    /// live entity outside the table or with a mismatched generation, a slot
    /// listed twice, or a slot both live and free.
    pub fn from_state(
        state: EntityTableState,
        live: impl IntoIterator<Item = Entity>,
    ) -> EcsResult<Self> {
        let len = state.generations.len();
        if len > Self::MAX_SLOTS {
            return Err(EcsError::failed("persisted entity table exceeds slot limit"));
        }
        let mut alive = vec![false; len];
        let mut alive_count = 0;
        for entity in live {
            let slot = entity.index() as usize;
            if slot >= len || state.generations[slot] != entity.generation() {
                return Err(EcsError::failed(format!(
                    "persisted entity {entity} does not match its slot"
                )));
            }
            if alive[slot] {
                return Err(EcsError::failed(format!("entity {entity} listed twice")));
            }
            alive[slot] = true;
            alive_count += 1;
        }

        let mut seen = vec![false; len];
        for &index in &state.free {
            let slot = index as usize;
            if slot >= len || alive[slot] || seen[slot] {
                return Err(EcsError::failed(format!(
                    "persisted free slot {index} is out of range or in use"
                )));
            }
            seen[slot] = true;
        }

        let mut free = VecDeque::new();
        free.try_reserve(len)
            .map_err(|e| EcsError::OutOfMemory(e.to_string()))?;
        free.extend(state.free);

        Ok(Self {
            generations: state.generations,
            alive,
            free,
            alive_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_sequential_slots() {
        let mut table = EntityTable::new();
        let e1 = table.create().unwrap();
        let e2 = table.create().unwrap();
        let e3 = table.create().unwrap();
        assert_eq!(e1, Entity::new(0, 0));
        assert_eq!(e2, Entity::new(1, 0));
        assert_eq!(e3, Entity::new(2, 0));
        assert_eq!(table.count(), 3);
    }

    #[test]
    fn test_destroy_invalidates_handle_forever() {
        let mut table = EntityTable::new();
        let e = table.create().unwrap();
        assert!(table.is_alive(e));
        table.destroy(e).unwrap();
        assert!(!table.is_alive(e));

        // Reusing the slot must not revive the old handle.
        let reused = table.create().unwrap();
        assert_eq!(reused.index(), e.index());
        assert!(reused.generation() > e.generation());
        assert!(!table.is_alive(e));
        assert!(table.is_alive(reused));
    }

    #[test]
    fn test_double_destroy_is_invalid_handle() {
        let mut table = EntityTable::new();
        let e = table.create().unwrap();
        table.destroy(e).unwrap();
        assert!(matches!(table.destroy(e), Err(EcsError::InvalidHandle(h)) if h == e));
    }

    #[test]
    fn test_free_list_is_fifo() {
        let mut table = EntityTable::new();
        let a = table.create().unwrap();
        let b = table.create().unwrap();
        let c = table.create().unwrap();
        table.destroy(b).unwrap();
        table.destroy(a).unwrap();
        table.destroy(c).unwrap();

        assert_eq!(table.create().unwrap().index(), b.index());
        assert_eq!(table.create().unwrap().index(), a.index());
        assert_eq!(table.create().unwrap().index(), c.index());
    }

    #[test]
    fn test_iter_is_slot_ordered() {
        let mut table = EntityTable::new();
        let a = table.create().unwrap();
        let b = table.create().unwrap();
        let c = table.create().unwrap();
        table.destroy(b).unwrap();
        let live: Vec<_> = table.iter().collect();
        assert_eq!(live, vec![a, c]);
    }

    #[test]
    fn test_clear_bumps_generations() {
        let mut table = EntityTable::new();
        let a = table.create().unwrap();
        let b = table.create().unwrap();
        table.clear();
        assert_eq!(table.count(), 0);
        assert!(!table.is_alive(a));
        assert!(!table.is_alive(b));
        assert_eq!(table.capacity(), 2);
    }

    #[test]
    fn test_exhausted_generation_retires_slot() {
        let state = EntityTableState {
            generations: vec![u32::MAX],
            free: Vec::new(),
        };
        let last = Entity::new(0, u32::MAX);
        let mut table = EntityTable::from_state(state, [last]).unwrap();
        table.destroy(last).unwrap();
        assert!(!table.is_alive(last));

        // Slot 0 is retired, so a fresh slot is issued.
        let next = table.create().unwrap();
        assert_eq!(next.index(), 1);
    }

    #[test]
    fn test_state_roundtrip_preserves_identity_and_reuse_order() {
        let mut table = EntityTable::new();
        let a = table.create().unwrap();
        let b = table.create().unwrap();
        let c = table.create().unwrap();
        table.destroy(a).unwrap();
        table.destroy(c).unwrap();

        let live: Vec<_> = table.iter().collect();
        let mut restored = EntityTable::from_state(table.state(), live).unwrap();
        assert!(restored.is_alive(b));
        assert!(!restored.is_alive(a));
        assert_eq!(restored.count(), 1);
        assert_eq!(restored.create().unwrap(), table.create().unwrap());
    }

    #[test]
    fn test_from_state_rejects_mismatched_generation() {
        let state = EntityTableState {
            generations: vec![3],
            free: Vec::new(),
        };
        assert!(EntityTable::from_state(state, [Entity::new(0, 2)]).is_err());
    }

    #[test]
    fn test_bits_roundtrip() {
        let entity = Entity::new(42, 7);
        assert_eq!(Entity::from_bits(entity.to_bits()), entity);
        assert!(Entity::from_bits(u64::MAX).is_null());
    }

    #[test]
    fn test_entity_serialization_roundtrip() {
        let entity = Entity::new(999, 4);
        let bytes = rmp_serde::to_vec(&entity).unwrap();
        let restored: Entity = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(entity, restored);
    }
}
