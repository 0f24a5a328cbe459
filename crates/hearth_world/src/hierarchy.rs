//! Parent/child links between entities and world-transform propagation.
//!
//! A child's [`Transform2D`]/[`Transform3D`] is relative to its parent. At
//! the end of the physics phase every tree is walked from its root and each
//! member gets a [`GlobalTransform2D`]/[`GlobalTransform3D`] in world space.
//! Entities outside any hierarchy carry no global transform; their local
//! transform already is one.
//!
//! [`Parent`] and [`Children`] are only written through
//! [`World::set_parent`] and [`World::remove_parent`], so the two always
//! agree and never form a cycle.

use hearth_component::{Component, EcsError, EcsResult, Entity};
use hearth_math::{Transform2D, Transform3D};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::{FrameReport, Phase, run_guarded};
use crate::world::World;

/// The entity this one hangs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parent(pub Entity);

impl Default for Parent {
    fn default() -> Self {
        Self(Entity::NULL)
    }
}

impl Component for Parent {
    fn type_name() -> &'static str {
        "Parent"
    }
}

/// Direct children, in attach order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Children(Vec<Entity>);

impl Children {
    /// The children as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Entity] {
        &self.0
    }

    /// Returns `true` if `entity` is a direct child.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.0.contains(&entity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Component for Children {
    fn type_name() -> &'static str {
        "Children"
    }
}

/// World-space 2D transform of a hierarchy member, as of the last update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalTransform2D(pub Transform2D);

impl Component for GlobalTransform2D {
    fn type_name() -> &'static str {
        "GlobalTransform2D"
    }
}

/// World-space 3D transform of a hierarchy member, as of the last update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalTransform3D(pub Transform3D);

impl Component for GlobalTransform3D {
    fn type_name() -> &'static str {
        "GlobalTransform3D"
    }
}

impl World {
    /// Attach `child` under `parent`, detaching it from any previous parent.
    /// The child's transform is kept as is and read relative to `parent`
    /// from now on.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidHandle`] if either entity is dead,
    /// [`EcsError::InvalidArgument`] if `child` is `parent` or one of its
    /// ancestors, [`EcsError::Unregistered`] without the hierarchy kinds.
    pub fn set_parent(&mut self, child: Entity, parent: Entity) -> EcsResult<()> {
        self.ensure_alive(child)?;
        self.ensure_alive(parent)?;
        self.store::<Parent>()?;
        self.store::<Children>()?;
        if child == parent {
            return Err(EcsError::invalid_argument(format!(
                "{child} cannot be its own parent"
            )));
        }
        if self.ancestors(parent).any(|ancestor| ancestor == child) {
            return Err(EcsError::invalid_argument(format!(
                "{child} is an ancestor of {parent}"
            )));
        }
        if self.parent_of(child) == Some(parent) {
            return Ok(());
        }

        self.detach(child);
        self.store_mut::<Parent>()?.insert(child, Parent(parent))?;
        let children = self.store_mut::<Children>()?;
        let linked = match children.get_mut(parent) {
            Some(list) => {
                list.0.push(child);
                Ok(())
            }
            None => children.insert(parent, Children(vec![child])).map(|_| ()),
        };
        if let Err(err) = linked {
            self.store_mut::<Parent>()?.remove(child);
            return Err(err);
        }
        debug!(world = %self.id, child = %child, parent = %parent, "entity parented");
        Ok(())
    }

    /// Detach `child` from its parent, making it a root. Returns the old
    /// parent, or `None` if it had none.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidHandle`] for a dead entity,
    /// [`EcsError::Unregistered`] without the hierarchy kinds.
    pub fn remove_parent(&mut self, child: Entity) -> EcsResult<Option<Entity>> {
        self.ensure_alive(child)?;
        self.store::<Parent>()?;
        self.store::<Children>()?;
        Ok(self.detach(child))
    }

    /// The parent of `entity`.
    #[must_use]
    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        self.get::<Parent>(entity).map(|parent| parent.0)
    }

    /// Direct children of `entity`, in attach order.
    #[must_use]
    pub fn children_of(&self, entity: Entity) -> &[Entity] {
        self.get::<Children>(entity).map_or(&[], Children::as_slice)
    }

    /// Parent, grandparent and so on up to the root.
    pub fn ancestors(&self, entity: Entity) -> impl Iterator<Item = Entity> + '_ {
        std::iter::successors(self.parent_of(entity), move |&e| self.parent_of(e))
            .take(self.entity_count())
    }

    /// `entity` and everything below it, parents before children.
    #[must_use]
    pub fn descendants(&self, entity: Entity) -> Vec<Entity> {
        let mut found = Vec::new();
        let mut stack = vec![entity];
        while let Some(next) = stack.pop() {
            if found.len() > self.entity_count() {
                break;
            }
            found.push(next);
            stack.extend(self.children_of(next).iter().rev());
        }
        found
    }

    /// Destroy `entity` and every descendant. Returns how many entities
    /// were destroyed.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidHandle`] if `entity` is dead.
    pub fn destroy_recursive(&mut self, entity: Entity) -> EcsResult<usize> {
        self.ensure_alive(entity)?;
        let subtree = self.descendants(entity);
        for &member in subtree.iter().rev() {
            self.destroy_entity(member)?;
        }
        Ok(subtree.len())
    }

    /// The world-space 2D transform of `entity`, composed through its
    /// ancestors now rather than read from the last update.
    #[must_use]
    pub fn world_transform2d(&self, entity: Entity) -> Option<Transform2D> {
        let local = *self.get::<Transform2D>(entity)?;
        Some(self.ancestors(entity).fold(local, |acc, ancestor| {
            self.get::<Transform2D>(ancestor)
                .map_or(acc, |parent| parent.mul_transform(&acc))
        }))
    }

    /// As [`World::world_transform2d`], in 3D.
    #[must_use]
    pub fn world_transform3d(&self, entity: Entity) -> Option<Transform3D> {
        let local = *self.get::<Transform3D>(entity)?;
        Some(self.ancestors(entity).fold(local, |acc, ancestor| {
            self.get::<Transform3D>(ancestor)
                .map_or(acc, |parent| parent.mul_transform(&acc))
        }))
    }

    /// Cut `entity` out of the hierarchy before it is destroyed: it leaves
    /// its parent and its children become roots.
    pub(crate) fn unlink(&mut self, entity: Entity) {
        if self.store::<Parent>().is_err() || self.store::<Children>().is_err() {
            return;
        }
        self.detach(entity);
        let orphans = self
            .store_mut::<Children>()
            .ok()
            .and_then(|store| store.remove(entity))
            .unwrap_or_default();
        for &orphan in orphans.as_slice() {
            if let Ok(store) = self.store_mut::<Parent>() {
                store.remove(orphan);
            }
            if !self.has::<Children>(orphan) {
                self.clear_global(orphan);
            }
        }
    }

    /// Detach every child of `entity`, returning the list they had.
    pub(crate) fn release_children(&mut self, entity: Entity) -> Option<Children> {
        let children = self.get::<Children>(entity)?.clone();
        for &child in children.as_slice() {
            self.detach(child);
        }
        Some(children)
    }

    /// Remove the `Parent` link of `child` and its entry in the parent's
    /// `Children`. Callers have checked both kinds are registered.
    fn detach(&mut self, child: Entity) -> Option<Entity> {
        let Parent(parent) = self.store_mut::<Parent>().ok()?.remove(child)?;
        let children = self.store_mut::<Children>().ok()?;
        let emptied = children.get_mut(parent).is_some_and(|list| {
            list.0.retain(|&e| e != child);
            list.0.is_empty()
        });
        if emptied {
            children.remove(parent);
            if !self.has::<Parent>(parent) {
                self.clear_global(parent);
            }
        }
        if !self.has::<Children>(child) {
            self.clear_global(child);
        }
        debug!(world = %self.id, child = %child, parent = %parent, "entity unparented");
        Some(parent)
    }

    fn clear_global(&mut self, entity: Entity) {
        if let Ok(store) = self.store_mut::<GlobalTransform2D>() {
            store.remove(entity);
        }
        if let Ok(store) = self.store_mut::<GlobalTransform3D>() {
            store.remove(entity);
        }
    }

    /// Verify that `Parent` and `Children` agree, name live entities and
    /// contain no cycle.
    pub(crate) fn check_hierarchy(&self) -> EcsResult<()> {
        let (Ok(parents), Ok(children)) = (self.store::<Parent>(), self.store::<Children>())
        else {
            return Ok(());
        };
        for (child, &Parent(parent)) in parents.iter() {
            if !self.is_alive(parent) || !self.children_of(parent).contains(&child) {
                return Err(EcsError::failed(format!(
                    "{child} names {parent} as parent but is not among its children"
                )));
            }
            let mut depth = 0;
            for ancestor in std::iter::successors(Some(parent), |&e| self.parent_of(e)) {
                depth += 1;
                if ancestor == child || depth > self.entity_count() {
                    return Err(EcsError::failed(format!("{child} is its own ancestor")));
                }
            }
        }
        for (parent, list) in children.iter() {
            for (i, &child) in list.as_slice().iter().enumerate() {
                if self.parent_of(child) != Some(parent) || list.as_slice()[..i].contains(&child) {
                    return Err(EcsError::failed(format!(
                        "{parent} lists {child} as a child but is not its parent"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Refresh the global transforms of every tree, root first. Runs at the end
/// of the physics phase.
pub(crate) fn propagate(world: &mut World, report: &mut FrameReport) {
    let Ok(children) = world.store::<Children>() else {
        return;
    };
    let mut roots: Vec<Entity> = children
        .iter()
        .map(|(entity, _)| entity)
        .filter(|&entity| !world.has::<Parent>(entity))
        .collect();
    roots.sort_unstable();
    for root in roots {
        run_guarded(world, Phase::Physics, root, report, |w| propagate_tree(w, root));
    }
}

fn propagate_tree(world: &mut World, root: Entity) -> EcsResult<()> {
    let limit = world.entity_count();
    let mut visited = 0;
    let mut stack: Vec<(Entity, Option<Transform2D>, Option<Transform3D>)> =
        vec![(root, None, None)];
    while let Some((entity, parent_2d, parent_3d)) = stack.pop() {
        visited += 1;
        if visited > limit {
            return Err(EcsError::failed(format!("hierarchy under {root} has a cycle")));
        }
        world.ensure_alive(entity)?;
        let global_2d = compose(
            parent_2d,
            world.get::<Transform2D>(entity).copied(),
            Transform2D::mul_transform,
        );
        let global_3d = compose(
            parent_3d,
            world.get::<Transform3D>(entity).copied(),
            Transform3D::mul_transform,
        );
        write_global(world, entity, global_2d.map(GlobalTransform2D))?;
        write_global(world, entity, global_3d.map(GlobalTransform3D))?;
        for &child in world.children_of(entity).iter().rev() {
            stack.push((child, global_2d, global_3d));
        }
    }
    Ok(())
}

/// A member without a transform of its own passes its parent's through.
fn compose<T: Copy>(parent: Option<T>, local: Option<T>, mul: fn(&T, &T) -> T) -> Option<T> {
    match (parent, local) {
        (Some(parent), Some(local)) => Some(mul(&parent, &local)),
        (parent, None) => parent,
        (None, local) => local,
    }
}

fn write_global<T: Component>(world: &mut World, entity: Entity, value: Option<T>) -> EcsResult<()> {
    let Ok(store) = world.store_mut::<T>() else {
        return Ok(());
    };
    match value {
        Some(value) => {
            store.insert(entity, value)?;
        }
        None => {
            store.remove(entity);
        }
    }
    Ok(())
}
