//! World snapshots.
//!
//! A snapshot is one MessagePack document:
//!
//! ```text
//! version
//! kinds     manifest entry for every kind with a value in the stream
//! table     slot generations and free-list order
//! entities  (entity, {kind -> encoded value}) per live entity, slot order
//! ```
//!
//! Loading restores entity identities exactly, so handles saved by the
//! caller stay valid against the loaded world. Non-serializable kinds are
//! never written.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use hearth_component::{
    ComponentRegistry, ComponentTypeId, EcsError, EcsResult, Entity, EntityTable,
    EntityTableState, ErasedStore, KindManifest,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::WorldConfig;
use crate::world::World;

/// Format version written by [`save`]; [`load`] rejects anything else.
pub const SNAPSHOT_VERSION: u32 = 1;

/// One live entity and its persisted components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity: Entity,
    pub components: BTreeMap<ComponentTypeId, Vec<u8>>,
}

/// The persisted form of a [`World`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub kinds: Vec<KindManifest>,
    pub table: EntityTableState,
    pub entities: Vec<EntityRecord>,
}

impl Snapshot {
    /// Capture `world`.
    ///
    /// # Errors
    ///
    /// [`EcsError::Encode`] if a component fails to encode.
    pub fn capture(world: &World) -> EcsResult<Self> {
        let persisted: Vec<(ComponentTypeId, &dyn ErasedStore)> = world
            .stores
            .iter()
            .filter(|(id, _)| {
                world
                    .registry
                    .descriptor(**id)
                    .is_some_and(|d| d.serializable)
            })
            .map(|(id, store)| (*id, store.as_ref()))
            .collect();

        let mut present = BTreeSet::new();
        let mut entities = Vec::with_capacity(world.entity_count());
        for entity in world.entities() {
            let mut components = BTreeMap::new();
            for &(type_id, store) in &persisted {
                if let Some(bytes) = store.encode_entry(entity).transpose()? {
                    present.insert(type_id);
                    components.insert(type_id, bytes);
                }
            }
            entities.push(EntityRecord { entity, components });
        }

        let kinds = present
            .into_iter()
            .filter_map(|id| world.registry.manifest_entry(id))
            .collect();

        Ok(Self {
            version: SNAPSHOT_VERSION,
            kinds,
            table: world.entities.state(),
            entities,
        })
    }

    /// Build a world from this snapshot.
    ///
    /// # Errors
    ///
    /// See [`load`].
    pub fn restore(self, registry: &ComponentRegistry, config: WorldConfig) -> EcsResult<World> {
        if self.version != SNAPSHOT_VERSION {
            return Err(EcsError::failed(format!(
                "snapshot version {} is not supported (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        for kind in &self.kinds {
            registry.check_compatible(kind)?;
        }
        let listed: BTreeSet<ComponentTypeId> = self.kinds.iter().map(|k| k.type_id).collect();

        let mut world = World::from_registry(registry, config);
        world.entities = EntityTable::from_state(self.table, self.entities.iter().map(|r| r.entity))?;

        for record in &self.entities {
            for (type_id, bytes) in &record.components {
                if !listed.contains(type_id) {
                    return Err(EcsError::failed(format!(
                        "component {type_id} on {} is missing from the manifest",
                        record.entity
                    )));
                }
                let store = world.stores.get_mut(type_id).ok_or_else(|| {
                    EcsError::failed(format!("no store for component {type_id}"))
                })?;
                store.insert_encoded(record.entity, bytes)?;
            }
        }
        world.reindex_names()?;
        world.check_hierarchy()?;
        Ok(world)
    }
}

/// Write `world` to `sink`.
///
/// # Errors
///
/// [`EcsError::Encode`] or [`EcsError::Io`].
pub fn save(world: &World, mut sink: impl Write) -> EcsResult<()> {
    let snapshot = Snapshot::capture(world)?;
    rmp_serde::encode::write_named(&mut sink, &snapshot)?;
    sink.flush()?;
    info!(
        world = %world.id(),
        entities = snapshot.entities.len(),
        kinds = snapshot.kinds.len(),
        "world saved"
    );
    Ok(())
}

/// Write `world` to a file, replacing it.
///
/// # Errors
///
/// As [`save`].
pub fn save_to_path(world: &World, path: impl AsRef<Path>) -> EcsResult<()> {
    let file = File::create(path)?;
    save(world, BufWriter::new(file))
}

/// Read a world from `source`, storing the kinds in `registry`, with default
/// configuration.
///
/// # Errors
///
/// [`EcsError::Decode`] for a malformed stream, and `OperationFailed`-coded
/// errors for a version mismatch, a kind that is unregistered or registered
/// differently, or an inconsistent entity table.
pub fn load(source: impl Read, registry: &ComponentRegistry) -> EcsResult<World> {
    load_with_config(source, registry, WorldConfig::default())
}

/// As [`load`], with explicit configuration.
///
/// # Errors
///
/// As [`load`].
pub fn load_with_config(
    source: impl Read,
    registry: &ComponentRegistry,
    config: WorldConfig,
) -> EcsResult<World> {
    let snapshot: Snapshot = rmp_serde::decode::from_read(source)?;
    let world = snapshot.restore(registry, config)?;
    info!(world = %world.id(), entities = world.entity_count(), "world loaded");
    Ok(world)
}

/// Read a world from a file.
///
/// # Errors
///
/// As [`load`], plus [`EcsError::Io`].
pub fn load_from_path(path: impl AsRef<Path>, registry: &ComponentRegistry) -> EcsResult<World> {
    let file = File::open(path)?;
    load(BufReader::new(file), registry)
}

#[cfg(test)]
mod tests {
    use hearth_component::{Component, ErrorCode};
    use hearth_math::{Name, Transform2D, Velocity2D};

    use super::*;
    use crate::animation::BlendWeights;
    use crate::world::builtin_registry;

    fn sample() -> (World, Entity, Entity) {
        let mut world = World::new();
        let a = world.create_entity().unwrap();
        let b = world.create_entity().unwrap();
        world.add(a, Transform2D::from_xy(1.0, 2.0)).unwrap();
        world.add(a, BlendWeights::default()).unwrap();
        world.set_name(b, "bob").unwrap();
        (world, a, b)
    }

    fn bytes(world: &World) -> Vec<u8> {
        let mut out = Vec::new();
        save(world, &mut out).unwrap();
        out
    }

    #[test]
    fn test_round_trip_skips_transient_kinds() {
        let (world, a, b) = sample();
        let loaded = load(bytes(&world).as_slice(), &builtin_registry().unwrap()).unwrap();
        assert!(loaded.is_alive(a));
        assert_eq!(loaded.find_by_name("bob"), Some(b));
        assert_eq!(loaded.get::<Transform2D>(a), world.get::<Transform2D>(a));
        assert!(!loaded.has::<BlendWeights>(a));
    }

    #[test]
    fn test_manifest_lists_only_present_kinds() {
        let (world, _, _) = sample();
        let snapshot = Snapshot::capture(&world).unwrap();
        let mut names: Vec<_> = snapshot.kinds.iter().map(|k| k.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Name", "Transform2D"]);
    }

    #[test]
    fn test_free_list_order_survives() {
        let mut world = World::new();
        let entities: Vec<_> = (0..4).map(|_| world.create_entity().unwrap()).collect();
        world.destroy_entity(entities[2]).unwrap();
        world.destroy_entity(entities[0]).unwrap();

        let mut loaded = load(bytes(&world).as_slice(), &builtin_registry().unwrap()).unwrap();
        let first = loaded.create_entity().unwrap();
        let second = loaded.create_entity().unwrap();
        assert_eq!((first.index(), first.generation()), (2, 1));
        assert_eq!((second.index(), second.generation()), (0, 1));
    }

    #[test]
    fn test_version_mismatch_fails() {
        let (world, _, _) = sample();
        let mut snapshot = Snapshot::capture(&world).unwrap();
        snapshot.version += 1;
        let err = snapshot
            .restore(&builtin_registry().unwrap(), WorldConfig::default())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::OperationFailed);
    }

    #[test]
    fn test_unregistered_kind_fails() {
        let (world, _, _) = sample();
        let mut registry = ComponentRegistry::new();
        registry.register_kind(Transform2D::default(), true).unwrap();
        let err = load(bytes(&world).as_slice(), &registry).unwrap_err();
        assert_eq!(err.code(), ErrorCode::OperationFailed);
    }

    #[test]
    fn test_changed_default_fails() {
        let (world, _, _) = sample();
        let mut changed = ComponentRegistry::new();
        changed.register_kind(Name::default(), true).unwrap();
        changed.register_kind(Transform2D::from_xy(9.0, 9.0), true).unwrap();
        let err = load(bytes(&world).as_slice(), &changed).unwrap_err();
        assert_eq!(err.code(), ErrorCode::OperationFailed);
    }

    #[test]
    fn test_kinds_absent_from_stream_may_differ() {
        let (world, _, _) = sample();
        let mut registry = ComponentRegistry::new();
        registry.register_kind(Name::default(), true).unwrap();
        registry.register_kind(Transform2D::default(), true).unwrap();
        registry.register_kind(Velocity2D::new(5.0, 5.0), false).unwrap();
        let loaded = load(bytes(&world).as_slice(), &registry).unwrap();
        assert_eq!(loaded.entity_count(), 2);
        assert!(!loaded.registry().contains(BlendWeights::component_type_id()));
    }

    #[test]
    fn test_file_round_trip() {
        let (world, a, _) = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.hearth");
        save_to_path(&world, &path).unwrap();
        let loaded = load_from_path(&path, &builtin_registry().unwrap()).unwrap();
        assert_eq!(loaded.entity_count(), 2);
        assert_eq!(loaded.get::<Transform2D>(a).map(|t| t.position.x), Some(1.0));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = load([0xc1u8, 0x00].as_slice(), &builtin_registry().unwrap()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::OperationFailed);
        assert!(matches!(err, EcsError::Decode(_)));
    }
}
