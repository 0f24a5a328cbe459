//! Component registry: the set of kinds a world can store.
//!
//! A kind must be registered before any store operation on it. The owning
//! world locks the registry on its first update, after which the cached
//! iteration plans depend on the registered set staying fixed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentDescriptor, ComponentTypeId, decode_component};
use crate::error::{EcsError, EcsResult};

/// What a snapshot records about one kind, checked against the loader's
/// registry before any value is decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindManifest {
    /// The kind's id.
    pub type_id: ComponentTypeId,
    /// The kind's name.
    pub name: String,
    /// Whether the kind is persisted.
    pub serializable: bool,
    /// The registered default value, encoded.
    pub default: Vec<u8>,
}

/// Registered component kinds, ordered by type id.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    kinds: BTreeMap<ComponentTypeId, ComponentDescriptor>,
    locked: bool,
}

impl ComponentRegistry {
    /// Create an empty, unlocked registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind.
    ///
    /// Registering an identical descriptor again is a no-op, locked or not.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidArgument`] if a different descriptor is already
    ///   registered under the same id.
    /// - [`EcsError::RegistryLocked`] if the kind is new and the registry is
    ///   locked.
    pub fn register(&mut self, descriptor: ComponentDescriptor) -> EcsResult<()> {
        if let Some(existing) = self.kinds.get(&descriptor.type_id) {
            if existing.same_definition(&descriptor) {
                return Ok(());
            }
            return Err(EcsError::invalid_argument(format!(
                "component kind `{}` is already registered with a different definition",
                descriptor.name
            )));
        }
        if self.locked {
            return Err(EcsError::RegistryLocked(descriptor.name.to_string()));
        }
        self.kinds.insert(descriptor.type_id, descriptor);
        Ok(())
    }

    /// Register kind `T` with a default value.
    ///
    /// # Errors
    ///
    /// See [`ComponentRegistry::register`].
    pub fn register_kind<T: Component>(&mut self, default: T, serializable: bool) -> EcsResult<()> {
        self.register(ComponentDescriptor::of(&default, serializable)?)
    }

    /// The descriptor for `type_id`.
    #[must_use]
    pub fn descriptor(&self, type_id: ComponentTypeId) -> Option<&ComponentDescriptor> {
        self.kinds.get(&type_id)
    }

    /// The descriptor for `type_id`, or [`EcsError::Unregistered`].
    ///
    /// # Errors
    ///
    /// Fails if the kind was never registered.
    pub fn require(&self, type_id: ComponentTypeId) -> EcsResult<&ComponentDescriptor> {
        self.kinds
            .get(&type_id)
            .ok_or_else(|| EcsError::Unregistered(type_id.to_string()))
    }

    /// Returns `true` if `type_id` is registered.
    #[must_use]
    pub fn contains(&self, type_id: ComponentTypeId) -> bool {
        self.kinds.contains_key(&type_id)
    }

    /// Registered descriptors in type-id order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.kinds.values()
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Returns `true` once the owning world has run its first update.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Refuse further new kinds.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// An unlocked copy carrying the same kinds, for building a new world.
    #[must_use]
    pub fn unlocked(&self) -> Self {
        Self {
            kinds: self.kinds.clone(),
            locked: false,
        }
    }

    /// The decoded default value registered for `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::Unregistered`] if `T` is unknown, or a decode error if the
    /// stored default no longer decodes as `T`.
    pub fn default_value<T: Component>(&self) -> EcsResult<T> {
        let descriptor = self
            .kinds
            .get(&T::component_type_id())
            .ok_or_else(|| EcsError::Unregistered(T::type_name().to_string()))?;
        decode_component(&descriptor.default_bytes)
    }

    /// The manifest entry a snapshot writes for `type_id`.
    #[must_use]
    pub fn manifest_entry(&self, type_id: ComponentTypeId) -> Option<KindManifest> {
        self.kinds.get(&type_id).map(|d| KindManifest {
            type_id: d.type_id,
            name: d.name.to_string(),
            serializable: d.serializable,
            default: d.default_bytes.clone(),
        })
    }

    /// Check a persisted kind against this registry.
    ///
    /// # Errors
    ///
    /// [`EcsError::Incompatible`] if the kind is unknown here or was
    /// registered with a different name, serializability or default.
    pub fn check_compatible(&self, manifest: &KindManifest) -> EcsResult<()> {
        let incompatible = |reason: &str| EcsError::Incompatible {
            name: manifest.name.clone(),
            reason: reason.to_string(),
        };
        let Some(descriptor) = self.kinds.get(&manifest.type_id) else {
            return Err(incompatible("not registered"));
        };
        if descriptor.name != manifest.name {
            return Err(incompatible("registered under a different name"));
        }
        if descriptor.serializable != manifest.serializable {
            return Err(incompatible("serializable flag differs"));
        }
        if descriptor.default_bytes != manifest.default {
            return Err(incompatible("default value differs"));
        }
        Ok(())
    }
}
