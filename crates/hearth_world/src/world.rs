//! The world: entities, their components, and the name index.
//!
//! A [`World`] owns one [`EntityTable`], one [`ComponentRegistry`] and one
//! store per registered kind. It is the single source of truth for entity
//! state; everything else (pipeline phases, the serializer, the boundary
//! layer) reads and writes through it.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};

use hearth_component::{
    Component, ComponentRegistry, ComponentTypeId, EcsError, EcsResult, Entity, EntityTable,
    ErasedStore, IterationPlan, QueryDescriptor, SparseSet,
};
use hearth_math::{
    Collider2D, Collider3D, Name, RigidBody2D, RigidBody3D, SpriteRef, Transform2D, Transform3D,
    Velocity2D, Velocity3D,
};
use tracing::{debug, error};
use uuid::Uuid;

use crate::ai::{BehaviorTree, StateMachine, Steering};
use crate::animation::{Animator, BlendWeights};
use crate::config::WorldConfig;
use crate::hierarchy::{Children, GlobalTransform2D, GlobalTransform3D, Parent};
use crate::input::{InputLatch, InputState};
use crate::pipeline::PhasePlans;
use crate::replication::Replication;
use crate::time::TimeController;

/// Identifies one world instance in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldId(Uuid);

impl WorldId {
    /// A fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WorldId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Register every built-in kind.
///
/// # Errors
///
/// Fails only if a default value cannot be encoded or a conflicting kind is
/// already registered under a built-in name.
pub fn register_builtin_kinds(registry: &mut ComponentRegistry) -> EcsResult<()> {
    registry.register_kind(Name::default(), true)?;
    registry.register_kind(SpriteRef::default(), true)?;
    registry.register_kind(Transform2D::default(), true)?;
    registry.register_kind(Transform3D::default(), true)?;
    registry.register_kind(Velocity2D::default(), true)?;
    registry.register_kind(Velocity3D::default(), true)?;
    registry.register_kind(RigidBody2D::default(), true)?;
    registry.register_kind(RigidBody3D::default(), true)?;
    registry.register_kind(Collider2D::default(), true)?;
    registry.register_kind(Collider3D::default(), true)?;
    registry.register_kind(BehaviorTree::default(), true)?;
    registry.register_kind(StateMachine::default(), true)?;
    registry.register_kind(Steering::default(), true)?;
    registry.register_kind(Animator::default(), true)?;
    registry.register_kind(BlendWeights::default(), false)?;
    registry.register_kind(Parent::default(), true)?;
    registry.register_kind(Children::default(), true)?;
    registry.register_kind(GlobalTransform2D::default(), false)?;
    registry.register_kind(GlobalTransform3D::default(), false)?;
    Ok(())
}

/// A registry holding every built-in kind.
///
/// # Errors
///
/// As [`register_builtin_kinds`].
pub fn builtin_registry() -> EcsResult<ComponentRegistry> {
    let mut registry = ComponentRegistry::new();
    register_builtin_kinds(&mut registry)?;
    Ok(registry)
}

/// Entities, their components, and the per-frame state around them.
pub struct World {
    pub(crate) id: WorldId,
    pub(crate) config: WorldConfig,
    pub(crate) entities: EntityTable,
    pub(crate) registry: ComponentRegistry,
    /// One store per registered kind, ordered by type id.
    pub(crate) stores: BTreeMap<ComponentTypeId, Box<dyn ErasedStore>>,
    pub(crate) names: HashMap<String, Entity>,
    pub(crate) time: TimeController,
    pub(crate) input: InputLatch,
    pub(crate) replication: Replication,
    /// Built on the first update.
    pub(crate) plans: Option<PhasePlans>,
}

impl World {
    /// An empty world with every built-in kind registered and default config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// An empty world with every built-in kind registered.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        let mut registry = ComponentRegistry::new();
        if let Err(err) = register_builtin_kinds(&mut registry) {
            error!(error = %err, "failed to register built-in component kinds");
        }
        Self::from_registry(&registry, config)
    }

    /// An empty world storing exactly the kinds in `registry`. The registry
    /// is copied unlocked.
    #[must_use]
    pub fn from_registry(registry: &ComponentRegistry, config: WorldConfig) -> Self {
        let registry = registry.unlocked();
        let stores = registry
            .iter()
            .map(|descriptor| (descriptor.type_id, descriptor.new_store()))
            .collect();
        let id = WorldId::new();
        debug!(world = %id, kinds = registry.len(), "world created");
        Self {
            id,
            time: TimeController::new(config.time),
            replication: Replication::new(config.replication),
            config,
            entities: EntityTable::new(),
            registry,
            stores,
            names: HashMap::new(),
            input: InputLatch::default(),
            plans: None,
        }
    }

    /// This world's log id.
    #[must_use]
    pub fn id(&self) -> WorldId {
        self.id
    }

    /// The configuration the world was built with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The registered kinds.
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Register a custom kind and create its store.
    ///
    /// # Errors
    ///
    /// See [`ComponentRegistry::register`]; after the first update only
    /// already-registered kinds are accepted.
    pub fn register_kind<T: Component>(&mut self, default: T, serializable: bool) -> EcsResult<()> {
        self.registry.register_kind(default, serializable)?;
        self.stores
            .entry(T::component_type_id())
            .or_insert_with(|| Box::new(SparseSet::<T>::new()));
        Ok(())
    }

    // ── Entity lifecycle ────────────────────────────────────────────────────

    /// Create an entity with no components.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfMemory`] if the entity table cannot grow.
    pub fn create_entity(&mut self) -> EcsResult<Entity> {
        self.entities.create()
    }

    /// Destroy an entity: detach it from its parent, orphan its children,
    /// remove every component, drop its name, then retire the handle. Use
    /// [`World::destroy_recursive`] to take the children too.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidHandle`] if the entity is not alive.
    pub fn destroy_entity(&mut self, entity: Entity) -> EcsResult<()> {
        self.ensure_alive(entity)?;
        self.unlink(entity);
        if let Some(name) = self.get::<Name>(entity).map(|n| n.0.clone()) {
            self.names.remove(&name);
        }
        for store in self.stores.values_mut() {
            store.remove_entity(entity);
        }
        self.replication.forget(entity);
        self.entities.destroy(entity)?;
        debug!(world = %self.id, entity = %entity, "entity destroyed");
        Ok(())
    }

    /// Returns `true` if `entity` is alive.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.count()
    }

    /// Live entities in slot order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter()
    }

    /// Destroy every live entity. Registered kinds and configuration stay.
    pub fn clear(&mut self) {
        let live: Vec<Entity> = self.entities.iter().collect();
        for &entity in &live {
            self.replication.forget(entity);
        }
        for store in self.stores.values_mut() {
            store.clear();
        }
        self.names.clear();
        self.entities.clear();
        debug!(world = %self.id, destroyed = live.len(), "world cleared");
    }

    pub(crate) fn ensure_alive(&self, entity: Entity) -> EcsResult<()> {
        if self.entities.is_alive(entity) {
            Ok(())
        } else {
            Err(EcsError::InvalidHandle(entity))
        }
    }

    // ── Typed component access ──────────────────────────────────────────────

    /// The store for kind `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::Unregistered`] if `T` was never registered.
    pub fn store<T: Component>(&self) -> EcsResult<&SparseSet<T>> {
        self.stores
            .get(&T::component_type_id())
            .and_then(|store| store.as_any().downcast_ref::<SparseSet<T>>())
            .ok_or_else(|| EcsError::Unregistered(T::type_name().to_string()))
    }

    pub(crate) fn store_mut<T: Component>(&mut self) -> EcsResult<&mut SparseSet<T>> {
        self.stores
            .get_mut(&T::component_type_id())
            .and_then(|store| store.as_any_mut().downcast_mut::<SparseSet<T>>())
            .ok_or_else(|| EcsError::Unregistered(T::type_name().to_string()))
    }

    /// Attach `value` to `entity`, overwriting any previous value of the kind.
    ///
    /// Adding a [`Name`] goes through [`World::set_name`] and adding a
    /// [`Parent`] through [`World::set_parent`]. [`Children`] cannot be
    /// added directly.
    ///
    /// # Errors
    ///
    /// [`EcsError::Unregistered`] for an unknown kind,
    /// [`EcsError::InvalidHandle`] for a dead entity,
    /// [`EcsError::InvalidArgument`] for [`Children`].
    pub fn add<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        self.store::<T>()?;
        self.ensure_alive(entity)?;
        let any = &value as &dyn Any;
        if let Some(name) = any.downcast_ref::<Name>() {
            return self.set_name(entity, name.as_str());
        }
        if let Some(&Parent(parent)) = any.downcast_ref::<Parent>() {
            return self.set_parent(entity, parent);
        }
        if any.is::<Children>() {
            return Err(EcsError::invalid_argument(
                "children are attached with `set_parent`",
            ));
        }
        self.store_mut::<T>()?.insert(entity, value)?;
        Ok(())
    }

    /// Overwrite an existing value. Never adds.
    ///
    /// # Errors
    ///
    /// As [`World::add`], plus [`EcsError::MissingComponent`] if the entity
    /// does not carry `T`; nothing is stored in that case.
    pub fn set<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        self.store::<T>()?;
        self.ensure_alive(entity)?;
        if !self.has::<T>(entity) {
            return Err(EcsError::MissingComponent {
                entity,
                component: T::type_name(),
            });
        }
        self.add(entity, value)
    }

    /// The value of `T` on `entity`.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.store::<T>().ok()?.get(entity)
    }

    /// Mutable access to the value of `T` on `entity`.
    ///
    /// Always `None` for [`Name`], [`Parent`] and [`Children`]: the world
    /// keeps indexes over them, so they change only through
    /// [`World::set_name`] and [`World::set_parent`].
    #[must_use]
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if is_indexed_kind::<T>() {
            return None;
        }
        self.store_mut::<T>().ok()?.get_mut(entity)
    }

    /// Detach and return the value of `T` on `entity`. Removing [`Parent`]
    /// or [`Children`] unlinks the entity from the hierarchy.
    ///
    /// # Errors
    ///
    /// [`EcsError::Unregistered`] for an unknown kind.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> EcsResult<Option<T>> {
        self.store::<T>()?;
        if T::component_type_id() == Parent::component_type_id() {
            if !self.is_alive(entity) {
                return Ok(None);
            }
            return Ok(self.remove_parent(entity)?.and_then(|p| cast(Parent(p))));
        }
        if T::component_type_id() == Children::component_type_id() {
            return Ok(self.release_children(entity).and_then(cast));
        }
        let removed = self.store_mut::<T>()?.remove(entity);
        if let Some(name) = removed
            .as_ref()
            .and_then(|v| (v as &dyn Any).downcast_ref::<Name>())
        {
            if self.names.get(name.as_str()) == Some(&entity) {
                self.names.remove(name.as_str());
            }
        }
        Ok(removed)
    }

    /// Returns `true` if `entity` carries `T`.
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.get::<T>(entity).is_some()
    }

    /// Every `(entity, value)` of kind `T`, in storage order.
    pub fn iter<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.store::<T>().ok().into_iter().flat_map(SparseSet::iter)
    }

    // ── Names ───────────────────────────────────────────────────────────────

    /// Give `entity` a unique name. A previous holder of the name loses both
    /// the index entry and its [`Name`] component; the entity's own old name
    /// is released.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidHandle`] for a dead entity,
    /// [`EcsError::InvalidArgument`] for an empty name.
    pub fn set_name(&mut self, entity: Entity, name: &str) -> EcsResult<()> {
        self.ensure_alive(entity)?;
        if name.is_empty() {
            return Err(EcsError::invalid_argument("entity names must not be empty"));
        }
        let evicted = self.names.get(name).copied().filter(|&holder| {
            holder != entity && self.get::<Name>(holder).is_some_and(|n| n.as_str() == name)
        });

        let store = self.store_mut::<Name>()?;
        let previous = store.insert(entity, Name::new(name))?;
        if let Some(holder) = evicted {
            store.remove(holder);
        }
        if let Some(old) = previous {
            if old.as_str() != name {
                self.names.remove(old.as_str());
            }
        }
        self.names.insert(name.to_string(), entity);

        if let Some(holder) = evicted {
            debug!(world = %self.id, name, entity = %entity, evicted = %holder, "name rebound");
        }
        Ok(())
    }

    /// The entity currently holding `name`. O(1).
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Entity> {
        let entity = *self.names.get(name)?;
        self.get::<Name>(entity)
            .is_some_and(|n| n.as_str() == name)
            .then_some(entity)
    }

    /// The name of `entity`, if it has one.
    #[must_use]
    pub fn name_of(&self, entity: Entity) -> Option<&str> {
        self.get::<Name>(entity).map(Name::as_str)
    }

    /// Rebuild the name index from the `Name` store.
    pub(crate) fn reindex_names(&mut self) -> EcsResult<()> {
        let mut names = HashMap::new();
        if let Ok(store) = self.store::<Name>() {
            for (entity, name) in store.iter() {
                if let Some(other) = names.insert(name.0.clone(), entity) {
                    return Err(EcsError::failed(format!(
                        "name `{name}` is held by both {other} and {entity}"
                    )));
                }
            }
        }
        self.names = names;
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    /// Entities matching `query`, in slot order.
    ///
    /// # Errors
    ///
    /// [`EcsError::Unregistered`] if the query names an unknown kind.
    pub fn query(&self, query: &QueryDescriptor) -> EcsResult<Vec<Entity>> {
        let plan = query.resolve(&self.registry)?;
        Ok(self.matching(&plan))
    }

    /// Entities matching a resolved plan, in slot order.
    pub(crate) fn matching(&self, plan: &IterationPlan) -> Vec<Entity> {
        let has = |entity: Entity| {
            move |id: ComponentTypeId| self.stores.get(&id).is_some_and(|s| s.contains(entity))
        };
        let driver = plan
            .required
            .iter()
            .filter_map(|id| self.stores.get(id))
            .min_by_key(|store| store.len());

        let mut matched: Vec<Entity> = match driver {
            Some(store) => store
                .entities()
                .iter()
                .copied()
                .filter(|&e| plan.matches(has(e)))
                .collect(),
            None if plan.required.is_empty() => {
                self.entities.iter().filter(|&e| plan.matches(has(e))).collect()
            }
            None => Vec::new(),
        };
        matched.sort_unstable();
        matched
    }

    // ── Time and input ──────────────────────────────────────────────────────

    /// The time controller.
    #[must_use]
    pub fn time(&self) -> &TimeController {
        &self.time
    }

    /// Mutable access to the time controller, for its setters.
    pub fn time_mut(&mut self) -> &mut TimeController {
        &mut self.time
    }

    /// Input latched for the current frame.
    #[must_use]
    pub fn input(&self) -> &InputState {
        self.input.latched()
    }

    /// Input the host is writing for the next frame.
    pub fn pending_input_mut(&mut self) -> &mut InputState {
        self.input.pending_mut()
    }
}

/// Kinds the world indexes, which only its own methods may write.
fn is_indexed_kind<T: Component>() -> bool {
    let id = T::component_type_id();
    id == Name::component_type_id()
        || id == Parent::component_type_id()
        || id == Children::component_type_id()
}

/// `value` as `T`, when `T` is `U`.
fn cast<T: Component, U: Component>(value: U) -> Option<T> {
    (Box::new(value) as Box<dyn Any>)
        .downcast::<T>()
        .ok()
        .map(|boxed| *boxed)
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("entities", &self.entities.count())
            .field("kinds", &self.registry.len())
            .field("frame", &self.time.frame_count())
            .finish_non_exhaustive()
    }
}
