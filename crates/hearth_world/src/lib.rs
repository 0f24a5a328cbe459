//! # hearth_world
//!
//! The world core: a [`World`] owns entities and their components, runs a
//! fixed per-frame pipeline over them, and persists to and from snapshots.
//!
//! ```text
//! update(wall_dt)
//!   time      dt = min(wall_dt * time_scale, max_step)
//!   input     pending -> latched
//!   physics   rigid bodies, then parent -> child global transforms
//!   ai        behaviour trees, state machines, steering
//!   animation clip cursors, blend weights
//!   network   replication deltas -> outbox
//! ```
//!
//! A world is single-threaded and `Send`; run independent worlds on
//! separate threads.

pub mod ai;
pub mod animation;
pub mod builder;
pub mod config;
pub mod hierarchy;
pub mod input;
mod physics;
pub mod pipeline;
pub mod raycast;
pub mod replication;
pub mod snapshot;
pub mod time;
pub mod world;

pub use ai::{
    Action, Agent, BehaviorTree, Blackboard, BtNode, BtStatus, Condition, Decorator,
    StateMachine, Steering, SteeringMode, TransitionCondition, steering_force,
};
pub use animation::{AnimationClip, Animator, BlendWeights, ClipPlayback, Crossfade};
pub use builder::EntityBuilder;
pub use config::{PhysicsConfig, ReplicationConfig, TimeConfig, WorldConfig};
pub use hierarchy::{Children, GlobalTransform2D, GlobalTransform3D, Parent};
pub use input::InputState;
pub use pipeline::{EntityFailure, FrameReport, Phase};
pub use raycast::{RaycastHit2D, RaycastHit3D};
pub use replication::{ReplicationSettings, RpcHandler};
pub use snapshot::{
    SNAPSHOT_VERSION, Snapshot, load, load_from_path, load_with_config, save, save_to_path,
};
pub use time::{TimeController, TimeState};
pub use world::{World, WorldId, builtin_registry, register_builtin_kinds};
