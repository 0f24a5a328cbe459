//! Query descriptors for declaring a phase's data access.
//!
//! A [`QueryDescriptor`] declares which component kinds a phase reads and
//! writes, plus `With`/`Without` filters. Resolving it against a registry
//! yields an [`IterationPlan`]: the validated set of kinds an entity must
//! carry and the set it must not carry.

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentTypeId};
use crate::registry::ComponentRegistry;
use crate::error::EcsResult;

/// Describes the data access requirements of a phase or an ad-hoc query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    /// Kinds read immutably.
    pub reads: Vec<ComponentTypeId>,
    /// Kinds written.
    pub writes: Vec<ComponentTypeId>,
    /// Filters applied to the match.
    pub filters: Vec<QueryFilter>,
}

impl QueryDescriptor {
    /// Create an empty descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a read-only requirement.
    #[must_use]
    pub fn read(mut self, type_id: ComponentTypeId) -> Self {
        self.reads.push(type_id);
        self
    }

    /// Add a read-only requirement on kind `T`.
    #[must_use]
    pub fn read_kind<T: Component>(self) -> Self {
        self.read(T::component_type_id())
    }

    /// Add a mutable requirement.
    #[must_use]
    pub fn write(mut self, type_id: ComponentTypeId) -> Self {
        self.writes.push(type_id);
        self
    }

    /// Add a mutable requirement on kind `T`.
    #[must_use]
    pub fn write_kind<T: Component>(self) -> Self {
        self.write(T::component_type_id())
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(mut self, f: QueryFilter) -> Self {
        self.filters.push(f);
        self
    }

    /// Reads and writes together.
    #[must_use]
    pub fn required_types(&self) -> Vec<ComponentTypeId> {
        let mut types = Vec::with_capacity(self.reads.len() + self.writes.len());
        types.extend_from_slice(&self.reads);
        types.extend_from_slice(&self.writes);
        types
    }

    /// Two descriptors conflict when one writes a kind the other touches.
    #[must_use]
    pub fn conflicts_with(&self, other: &QueryDescriptor) -> bool {
        let touches = |q: &QueryDescriptor, id: &ComponentTypeId| {
            q.reads.contains(id) || q.writes.contains(id)
        };
        self.writes.iter().any(|w| touches(other, w))
            || other.writes.iter().any(|w| touches(self, w))
    }

    /// Validate every referenced kind and build the plan.
    ///
    /// # Errors
    ///
    /// [`EcsError::Unregistered`](crate::EcsError::Unregistered) if any kind
    /// is unknown to `registry`.
    pub fn resolve(&self, registry: &ComponentRegistry) -> EcsResult<IterationPlan> {
        let mut required = Vec::new();
        let mut excluded = Vec::new();
        for id in self.required_types() {
            registry.require(id)?;
            required.push(id);
        }
        for f in &self.filters {
            match *f {
                QueryFilter::With(id) => {
                    registry.require(id)?;
                    required.push(id);
                }
                QueryFilter::Without(id) => {
                    registry.require(id)?;
                    excluded.push(id);
                }
            }
        }
        required.sort();
        required.dedup();
        excluded.sort();
        excluded.dedup();
        Ok(IterationPlan { required, excluded })
    }
}

/// Narrows the entities matched by a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryFilter {
    /// Only entities that carry this kind.
    With(ComponentTypeId),
    /// Only entities that do NOT carry this kind.
    Without(ComponentTypeId),
}

/// A resolved query: kinds an entity must have and must not have.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationPlan {
    /// Sorted, deduplicated required kinds.
    pub required: Vec<ComponentTypeId>,
    /// Sorted, deduplicated excluded kinds.
    pub excluded: Vec<ComponentTypeId>,
}

impl IterationPlan {
    /// Returns `true` if an entity with `has(kind)` matches this plan.
    pub fn matches(&self, has: impl Fn(ComponentTypeId) -> bool) -> bool {
        self.required.iter().all(|&id| has(id)) && !self.excluded.iter().any(|&id| has(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Position(f32);

    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Frozen;

    impl Component for Frozen {
        fn type_name() -> &'static str {
            "Frozen"
        }
    }

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register_kind(Position(0.0), true).unwrap();
        registry.register_kind(Frozen, true).unwrap();
        registry
    }

    #[test]
    fn test_conflict_read_vs_write() {
        let transform = ComponentTypeId(1);
        let q1 = QueryDescriptor::new().read(transform);
        let q2 = QueryDescriptor::new().write(transform);
        assert!(q1.conflicts_with(&q2));
        assert!(!q1.conflicts_with(&QueryDescriptor::new().read(transform)));
    }

    #[test]
    fn test_resolve_dedups_and_splits_filters() {
        let pos = Position::component_type_id();
        let frozen = Frozen::component_type_id();
        let plan = QueryDescriptor::new()
            .read(pos)
            .write(pos)
            .filter(QueryFilter::Without(frozen))
            .resolve(&registry())
            .unwrap();
        assert_eq!(plan.required, vec![pos]);
        assert_eq!(plan.excluded, vec![frozen]);
    }

    #[test]
    fn test_resolve_rejects_unregistered() {
        let err = QueryDescriptor::new()
            .read(ComponentTypeId::from_name("Ghost"))
            .resolve(&registry())
            .unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_plan_matches() {
        let pos = Position::component_type_id();
        let frozen = Frozen::component_type_id();
        let plan = QueryDescriptor::new()
            .read_kind::<Position>()
            .filter(QueryFilter::Without(frozen))
            .resolve(&registry())
            .unwrap();
        assert!(plan.matches(|id| id == pos));
        assert!(!plan.matches(|id| id == pos || id == frozen));
        assert!(!plan.matches(|_| false));
    }
}
