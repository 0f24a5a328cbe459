//! Core [`Component`] trait and the per-kind descriptor kept by the registry.
//!
//! ## Type identity
//!
//! [`ComponentTypeId`] is derived from the component's **string name** using
//! the FNV-1a 64-bit hash. The id is therefore stable across builds and
//! processes, which is what lets a snapshot written by one run be matched
//! against the registry of another.

use std::alloc::Layout;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::EcsResult;
use crate::storage::{ErasedStore, SparseSet};

/// A unique identifier for a component kind, derived from its name with
/// FNV-1a 64-bit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Hash a kind name.
    ///
    /// ```text
    /// hash = 0xcbf29ce484222325
    /// for each byte in name.as_bytes():
    ///     hash = (hash ^ byte) * 0x00000100000001b3
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// The id of component kind `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::from_name(T::type_name())
    }
}

impl std::fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// The core component trait.
///
/// Components are plain values: cloneable, comparable (replication diffs and
/// registry defaults rely on it), serialisable for snapshots and replication,
/// and `Send + Sync` so a world can move to another thread.
///
/// # Examples
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use hearth_component::Component;
///
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
/// ```
pub trait Component:
    Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static + Serialize + DeserializeOwned
{
    /// A stable, human-readable name for this kind.
    fn type_name() -> &'static str;

    /// FNV-1a hash of [`Component::type_name`].
    fn component_type_id() -> ComponentTypeId {
        ComponentTypeId::from_name(Self::type_name())
    }
}

/// Encode a component value with field names, the form used in snapshots
/// and replication payloads.
///
/// # Errors
///
/// Returns [`EcsError::Encode`](crate::EcsError::Encode) if serialisation fails.
pub fn encode_component<T: Serialize>(value: &T) -> EcsResult<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Decode a component value produced by [`encode_component`].
///
/// # Errors
///
/// Returns [`EcsError::Decode`](crate::EcsError::Decode) if the bytes do not
/// describe a `T`.
pub fn decode_component<T: DeserializeOwned>(bytes: &[u8]) -> EcsResult<T> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Storage policy for one registered kind.
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    /// The kind's id.
    pub type_id: ComponentTypeId,
    /// The kind's name.
    pub name: &'static str,
    /// In-memory layout of one value.
    pub layout: Layout,
    /// Whether values of this kind are written to snapshots and replicated.
    pub serializable: bool,
    /// The registered default value, encoded with [`encode_component`].
    pub default_bytes: Vec<u8>,
    new_store: fn() -> Box<dyn ErasedStore>,
}

impl ComponentDescriptor {
    /// Describe kind `T` with the given default value.
    ///
    /// # Errors
    ///
    /// Fails if the default cannot be encoded.
    pub fn of<T: Component>(default: &T, serializable: bool) -> EcsResult<Self> {
        Ok(Self {
            type_id: T::component_type_id(),
            name: T::type_name(),
            layout: Layout::new::<T>(),
            serializable,
            default_bytes: encode_component(default)?,
            new_store: || Box::new(SparseSet::<T>::new()),
        })
    }

    /// Create an empty store for this kind.
    #[must_use]
    pub fn new_store(&self) -> Box<dyn ErasedStore> {
        (self.new_store)()
    }

    /// Returns `true` if both descriptors define the same kind the same way.
    #[must_use]
    pub fn same_definition(&self, other: &ComponentDescriptor) -> bool {
        self.type_id == other.type_id
            && self.name == other.name
            && self.layout == other.layout
            && self.serializable == other.serializable
            && self.default_bytes == other.default_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
    struct Health {
        current: f32,
        max: f32,
    }

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[test]
    fn test_component_type_id_matches_from_name() {
        assert_eq!(Health::component_type_id(), ComponentTypeId::from_name("Health"));
        assert_eq!(ComponentTypeId::of::<Health>(), Health::component_type_id());
    }

    #[test]
    fn test_fnv1a_known_vectors() {
        // FNV-1a 64-bit of the empty string is the offset basis itself.
        assert_eq!(
            ComponentTypeId::from_name(""),
            ComponentTypeId(0xcbf2_9ce4_8422_2325)
        );
        assert_eq!(
            ComponentTypeId::from_name("a"),
            ComponentTypeId(0xaf63_dc4c_8601_ec8c)
        );
    }

    #[test]
    fn test_descriptor_equality_ignores_store_factory() {
        let a = ComponentDescriptor::of(&Health { current: 1.0, max: 1.0 }, true).unwrap();
        let b = ComponentDescriptor::of(&Health { current: 1.0, max: 1.0 }, true).unwrap();
        assert!(a.same_definition(&b));
    }

    #[test]
    fn test_descriptor_detects_default_drift() {
        let a = ComponentDescriptor::of(&Health { current: 1.0, max: 1.0 }, true).unwrap();
        let b = ComponentDescriptor::of(&Health { current: 2.0, max: 1.0 }, true).unwrap();
        let c = ComponentDescriptor::of(&Health { current: 1.0, max: 1.0 }, false).unwrap();
        assert!(!a.same_definition(&b));
        assert!(!a.same_definition(&c));
    }

    #[test]
    fn test_descriptor_store_factory_produces_matching_store() {
        let desc = ComponentDescriptor::of(&Health { current: 0.0, max: 0.0 }, true).unwrap();
        let store = desc.new_store();
        assert_eq!(store.kind_id(), Health::component_type_id());
        assert!(store.is_empty());
    }

    #[test]
    fn test_encode_decode_component() {
        let health = Health {
            current: 80.0,
            max: 100.0,
        };
        let bytes = encode_component(&health).unwrap();
        let restored: Health = decode_component(&bytes).unwrap();
        assert_eq!(health, restored);
    }
}
