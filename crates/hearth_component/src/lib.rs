//! # hearth_component
//!
//! The storage substrate of the world core: what an entity is, what a
//! component is, where component values live, and how a phase declares the
//! data it touches.
//!
//! This crate provides:
//!
//! - [`Entity`] and [`EntityTable`]: generational identifiers with FIFO slot reuse.
//! - [`Component`] trait and [`ComponentTypeId`]: the contract every kind satisfies.
//! - [`ComponentRegistry`]: registered kinds, their defaults and store factories.
//! - [`SparseSet`] and [`ErasedStore`]: per-kind sparse-set storage.
//! - [`QueryDescriptor`]: declarative access sets resolved into [`IterationPlan`]s.
//! - [`EcsError`] and [`ErrorCode`]: the error taxonomy and its boundary codes.

pub mod component;
pub mod entity;
pub mod error;
pub mod query;
pub mod registry;
pub mod storage;

pub use component::{
    Component, ComponentDescriptor, ComponentTypeId, decode_component, encode_component,
};
pub use entity::{Entity, EntityTable, EntityTableState};
pub use error::{EcsError, EcsResult, ErrorCode};
pub use query::{IterationPlan, QueryDescriptor, QueryFilter};
pub use registry::{ComponentRegistry, KindManifest};
pub use storage::{ErasedStore, SparseSet};
