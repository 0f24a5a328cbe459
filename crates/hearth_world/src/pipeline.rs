//! The fixed per-frame phase order.
//!
//! Every [`World::update`] runs input latch, physics, AI, animation and
//! network sync, in that order, to completion. A per-entity failure inside
//! physics, AI or animation is logged and recorded in the [`FrameReport`];
//! it never stops the phase or the phases after it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use hearth_component::{
    ComponentRegistry, EcsError, EcsResult, Entity, IterationPlan, QueryDescriptor,
};
use hearth_math::{RigidBody2D, RigidBody3D, Transform2D, Transform3D};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ai::{self, BehaviorTree, StateMachine, Steering};
use crate::animation::{self, Animator};
use crate::{hierarchy, physics};
use crate::world::{World, WorldId};

/// One step of the frame, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Pending input becomes this frame's input.
    InputLatch,
    /// Rigid-body integration, then hierarchy transform propagation.
    Physics,
    /// Behaviour trees, state machines, steering.
    Ai,
    /// Clip playback and blend weights.
    Animation,
    /// Replication diffing.
    NetworkSync,
}

impl Phase {
    /// Every phase, in execution order.
    pub const ORDER: [Phase; 5] = [
        Phase::InputLatch,
        Phase::Physics,
        Phase::Ai,
        Phase::Animation,
        Phase::NetworkSync,
    ];
}

/// A failure confined to one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityFailure {
    /// Phase that was running.
    pub phase: Phase,
    /// The entity being processed.
    pub entity: Entity,
    /// What went wrong.
    pub message: String,
}

impl EntityFailure {
    /// The failure as an [`EcsError::OperationFailed`].
    #[must_use]
    pub fn to_error(&self) -> EcsError {
        EcsError::failed(format!(
            "{:?} phase failed for entity {}: {}",
            self.phase, self.entity, self.message
        ))
    }
}

/// What one update did.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameReport {
    /// Frame number after the update.
    pub frame: u64,
    /// Simulated seconds of the update.
    pub delta_seconds: f32,
    /// Per-entity failures, in the order they happened.
    pub failures: Vec<EntityFailure>,
    /// Deltas added to the replication outbox.
    pub deltas_queued: usize,
}

impl FrameReport {
    /// Number of per-entity failures.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Failures recorded during `phase`.
    pub fn failures_in(&self, phase: Phase) -> impl Iterator<Item = &EntityFailure> {
        self.failures.iter().filter(move |f| f.phase == phase)
    }

    pub(crate) fn record_failure(
        &mut self,
        world: WorldId,
        phase: Phase,
        entity: Entity,
        message: String,
    ) {
        warn!(
            world = %world,
            frame = self.frame,
            phase = ?phase,
            entity = %entity,
            error = %message,
            "entity step failed"
        );
        self.failures.push(EntityFailure {
            phase,
            entity,
            message,
        });
    }
}

/// Iteration plans for every phase, resolved once.
///
/// A plan is `None` when the world's registry lacks one of its kinds; the
/// matching step is then skipped.
#[derive(Debug, Clone, Default)]
pub(crate) struct PhasePlans {
    pub(crate) bodies_2d: Option<IterationPlan>,
    pub(crate) bodies_3d: Option<IterationPlan>,
    pub(crate) behavior_trees: Option<IterationPlan>,
    pub(crate) state_machines: Option<IterationPlan>,
    pub(crate) steering: Option<IterationPlan>,
    pub(crate) animators: Option<IterationPlan>,
}

impl PhasePlans {
    pub(crate) fn resolve(registry: &ComponentRegistry) -> Self {
        let plan = |query: QueryDescriptor| query.resolve(registry).ok();
        Self {
            bodies_2d: plan(
                QueryDescriptor::new()
                    .write_kind::<RigidBody2D>()
                    .write_kind::<Transform2D>(),
            ),
            bodies_3d: plan(
                QueryDescriptor::new()
                    .write_kind::<RigidBody3D>()
                    .write_kind::<Transform3D>(),
            ),
            behavior_trees: plan(QueryDescriptor::new().write_kind::<BehaviorTree>()),
            state_machines: plan(QueryDescriptor::new().write_kind::<StateMachine>()),
            steering: plan(QueryDescriptor::new().write_kind::<Steering>()),
            animators: plan(QueryDescriptor::new().write_kind::<Animator>()),
        }
    }
}

/// Run `step` for one entity, turning errors and panics into a recorded
/// failure.
pub(crate) fn run_guarded(
    world: &mut World,
    phase: Phase,
    entity: Entity,
    report: &mut FrameReport,
    step: impl FnOnce(&mut World) -> EcsResult<()>,
) {
    let message = match panic::catch_unwind(AssertUnwindSafe(|| step(world))) {
        Ok(Ok(())) => return,
        Ok(Err(err)) => err.to_string(),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };
    report.record_failure(world.id(), phase, entity, message);
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

impl World {
    /// Advance the world by one frame.
    ///
    /// The first call resolves every phase's iteration plan and locks the
    /// registry.
    ///
    /// # Errors
    ///
    /// Only world-level failures; per-entity failures are in the report.
    pub fn update(&mut self, wall_delta: f32) -> EcsResult<FrameReport> {
        let plans = match &self.plans {
            Some(plans) => plans.clone(),
            None => {
                let plans = PhasePlans::resolve(&self.registry);
                self.registry.lock();
                info!(world = %self.id, kinds = self.registry.len(), "registry locked");
                self.plans = Some(plans.clone());
                plans
            }
        };

        let dt = self.time.tick(wall_delta);
        let frame = self.time.frame_count();
        let mut report = FrameReport {
            frame,
            delta_seconds: dt,
            ..FrameReport::default()
        };

        self.input.latch(frame);
        physics::run(self, &plans, dt, &mut report);
        hierarchy::propagate(self, &mut report);
        ai::run(self, &plans, dt, &mut report);
        animation::run(self, &plans, dt, &mut report);
        self.sync_replication(self.time.wall_delta(), &mut report)?;

        debug!(
            world = %self.id,
            frame,
            dt,
            failures = report.failure_count(),
            deltas = report.deltas_queued,
            "frame complete"
        );
        Ok(report)
    }

    /// Returns `true` once the first update has run.
    #[must_use]
    pub fn has_started(&self) -> bool {
        self.plans.is_some()
    }
}
