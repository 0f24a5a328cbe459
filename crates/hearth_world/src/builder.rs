//! Spawn an entity with its components in one call.
//!
//! ```rust
//! use hearth_math::{Transform2D, Velocity2D};
//! use hearth_world::World;
//!
//! let mut world = World::new();
//! let ball = world
//!     .spawn()
//!     .with(Transform2D::from_xy(0.0, 10.0))
//!     .with(Velocity2D::ZERO)
//!     .with_name("ball")
//!     .build()
//!     .unwrap();
//! assert_eq!(world.find_by_name("ball"), Some(ball));
//! ```

use std::any::Any;

use hearth_component::{Component, ComponentTypeId, EcsError, EcsResult, Entity};
use hearth_math::Name;
use tracing::error;

use crate::hierarchy::{Children, Parent};
use crate::world::World;

type Insert = Box<dyn FnOnce(&mut World, Entity) -> EcsResult<()>>;

/// Collects components for a new entity. Nothing touches the world until
/// [`EntityBuilder::build`], which either creates the whole entity or
/// leaves the world as it was.
#[must_use = "an entity is only created by `build`"]
pub struct EntityBuilder<'w> {
    world: &'w mut World,
    kinds: Vec<(ComponentTypeId, &'static str)>,
    inserts: Vec<Insert>,
    name: Option<String>,
    parent: Option<Entity>,
    invalid: Option<EcsError>,
}

impl World {
    /// Start building an entity.
    pub fn spawn(&mut self) -> EntityBuilder<'_> {
        EntityBuilder {
            world: self,
            kinds: Vec::new(),
            inserts: Vec::new(),
            name: None,
            parent: None,
            invalid: None,
        }
    }
}

impl EntityBuilder<'_> {
    /// Add a component. A later value of the same kind wins. [`Name`] and
    /// [`Parent`] behave as [`EntityBuilder::with_name`] and
    /// [`EntityBuilder::child_of`].
    pub fn with<T: Component>(mut self, value: T) -> Self {
        let any = &value as &dyn Any;
        if let Some(name) = any.downcast_ref::<Name>() {
            self.name = Some(name.as_str().to_owned());
        } else if let Some(&Parent(parent)) = any.downcast_ref::<Parent>() {
            self.parent = Some(parent);
        } else if any.is::<Children>() {
            self.invalid.get_or_insert_with(|| {
                EcsError::invalid_argument("children are attached with `child_of` on the child")
            });
        } else {
            self.kinds.push((T::component_type_id(), T::type_name()));
            self.inserts.push(Box::new(move |world: &mut World, entity: Entity| {
                world.add(entity, value)
            }));
        }
        self
    }

    /// Name the entity, taking the name from any current holder.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach the entity under `parent`.
    pub fn child_of(mut self, parent: Entity) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Create the entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::Unregistered`] for an unknown kind,
    /// [`EcsError::InvalidArgument`] for an empty name or a [`Children`]
    /// value, [`EcsError::InvalidHandle`] for a dead parent,
    /// [`EcsError::OutOfMemory`] if the entity table cannot grow. The world
    /// is unchanged on every error.
    pub fn build(self) -> EcsResult<Entity> {
        let Self {
            world,
            kinds,
            inserts,
            name,
            parent,
            invalid,
        } = self;

        if let Some(err) = invalid {
            return Err(err);
        }
        for (type_id, type_name) in kinds {
            if !world.registry().contains(type_id) {
                return Err(EcsError::Unregistered(type_name.to_string()));
            }
        }
        if let Some(name) = &name {
            world.store::<Name>()?;
            if name.is_empty() {
                return Err(EcsError::invalid_argument("entity names must not be empty"));
            }
        }
        if let Some(parent) = parent {
            world.store::<Parent>()?;
            world.store::<Children>()?;
            world.ensure_alive(parent)?;
        }

        let entity = world.create_entity()?;
        if let Err(err) = populate(world, entity, inserts, parent, name) {
            if let Err(cleanup) = world.destroy_entity(entity) {
                error!(entity = %entity, error = %cleanup, "failed to roll back spawn");
            }
            return Err(err);
        }
        Ok(entity)
    }
}

/// The name goes last: taking it from another entity cannot be undone.
fn populate(
    world: &mut World,
    entity: Entity,
    inserts: Vec<Insert>,
    parent: Option<Entity>,
    name: Option<String>,
) -> EcsResult<()> {
    for insert in inserts {
        insert(world, entity)?;
    }
    if let Some(parent) = parent {
        world.set_parent(entity, parent)?;
    }
    if let Some(name) = name {
        world.set_name(entity, &name)?;
    }
    Ok(())
}

impl std::fmt::Debug for EntityBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityBuilder")
            .field("kinds", &self.kinds.iter().map(|k| k.1).collect::<Vec<_>>())
            .field("name", &self.name)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use hearth_component::ErrorCode;
    use hearth_math::{RigidBody2D, Transform2D, Velocity2D};

    use super::*;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Unknown;

    impl Component for Unknown {
        fn type_name() -> &'static str {
            "Unknown"
        }
    }

    #[test]
    fn test_spawn_with_components() {
        let mut world = World::new();
        let e = world
            .spawn()
            .with(Transform2D::from_xy(1.0, 2.0))
            .with(RigidBody2D::dynamic(2.0))
            .with(Velocity2D::ZERO)
            .with(Velocity2D::new(3.0, 0.0))
            .build()
            .unwrap();
        assert!(world.is_alive(e));
        assert_eq!(world.get::<Transform2D>(e), Some(&Transform2D::from_xy(1.0, 2.0)));
        assert_eq!(world.get::<Velocity2D>(e), Some(&Velocity2D::new(3.0, 0.0)));
        assert!(world.has::<RigidBody2D>(e));
    }

    #[test]
    fn test_spawn_with_name_and_parent() {
        let mut world = World::new();
        let root = world.spawn().with_name("root").build().unwrap();
        let child = world
            .spawn()
            .with(Transform2D::IDENTITY)
            .with(Name::new("child"))
            .child_of(root)
            .build()
            .unwrap();
        assert_eq!(world.find_by_name("child"), Some(child));
        assert_eq!(world.parent_of(child), Some(root));
        assert_eq!(world.children_of(root), &[child]);
    }

    #[test]
    fn test_failed_build_leaves_world_untouched() {
        let mut world = World::new();
        let holder = world.spawn().with_name("taken").build().unwrap();
        let before = world.entity_count();

        let err = world
            .spawn()
            .with(Transform2D::IDENTITY)
            .with(Unknown)
            .with_name("taken")
            .build()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(world.entity_count(), before);
        assert_eq!(world.find_by_name("taken"), Some(holder));

        let next = world.create_entity().unwrap();
        assert_eq!(next.generation(), 0);

        let dead = world.create_entity().unwrap();
        world.destroy_entity(dead).unwrap();
        let err = world.spawn().child_of(dead).build().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidHandle);
        assert!(world.spawn().with_name("").build().is_err());
        assert!(world.spawn().with(Children::default()).build().is_err());
        assert_eq!(world.entity_count(), before + 1);
    }
}
