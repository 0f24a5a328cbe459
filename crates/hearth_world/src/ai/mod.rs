//! AI kinds and the AI phase.
//!
//! The phase ticks every behaviour tree, then every state machine, then
//! every steering behaviour. Trees and steering see the entity through an
//! [`Agent`]: its position and velocity taken from the 3D kinds when
//! present, otherwise from the 2D kinds with `z = 0`.

pub mod behavior_tree;
pub mod blackboard;
pub mod state_machine;
pub mod steering;

use hearth_component::{EcsError, EcsResult, Entity};
use hearth_math::{Transform2D, Transform3D, Vec3, Velocity2D, Velocity3D};
use tracing::debug;

pub use behavior_tree::{Action, BehaviorTree, BtNode, BtStatus, Condition, Decorator, TickContext};
pub use blackboard::Blackboard;
pub use state_machine::{StateMachine, Transition, TransitionCondition};
pub use steering::{Steering, SteeringMode, predict_position, steering_force};

use crate::pipeline::{FrameReport, Phase, PhasePlans, run_guarded};
use crate::world::World;

/// Kinematic view of one entity, read before and written back after an AI
/// step.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    /// World position, if the entity has a transform.
    pub position: Option<Vec3>,
    /// Linear velocity.
    pub velocity: Vec3,
    /// `true` when the entity lives in the 2D kinds.
    pub planar: bool,
    has_steering: bool,
    velocity_changed: bool,
    steer_request: Option<SteeringMode>,
}

impl Agent {
    /// An agent with no transform and no velocity.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            position: None,
            velocity: Vec3::ZERO,
            planar: false,
            has_steering: false,
            velocity_changed: false,
            steer_request: None,
        }
    }

    /// An agent at `position` moving at `velocity`.
    #[must_use]
    pub fn at(position: Vec3, velocity: Vec3, planar: bool) -> Self {
        Self {
            position: Some(position),
            velocity,
            planar,
            ..Self::detached()
        }
    }

    /// Builder: mark the agent as carrying a [`Steering`] component.
    #[must_use]
    pub fn with_steering(mut self) -> Self {
        self.has_steering = true;
        self
    }

    /// Replace the velocity; it is written back after the step.
    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
        self.velocity_changed = true;
    }

    /// Returns `true` if [`Agent::set_velocity`] was called.
    #[must_use]
    pub fn velocity_changed(&self) -> bool {
        self.velocity_changed
    }

    /// Ask for a different steering mode. Returns `false` if the entity has
    /// no steering behaviour to switch.
    pub fn request_steering(&mut self, mode: SteeringMode) -> bool {
        if self.has_steering {
            self.steer_request = Some(mode);
        }
        self.has_steering
    }

    /// The mode requested during the step, if any.
    #[must_use]
    pub fn steering_request(&self) -> Option<SteeringMode> {
        self.steer_request
    }
}

/// Build the agent view of `entity`.
pub(crate) fn read_agent(world: &World, entity: Entity) -> Agent {
    let velocity_3d = world.get::<Velocity3D>(entity).map(|v| v.linear);
    let velocity_2d = world.get::<Velocity2D>(entity).map(|v| v.linear.extend(0.0));

    let mut agent = if let Some(transform) = world.get::<Transform3D>(entity) {
        Agent::at(
            transform.position,
            velocity_3d.or(velocity_2d).unwrap_or(Vec3::ZERO),
            false,
        )
    } else if let Some(transform) = world.get::<Transform2D>(entity) {
        Agent::at(
            transform.position.extend(0.0),
            velocity_2d.or(velocity_3d).unwrap_or(Vec3::ZERO),
            true,
        )
    } else {
        Agent {
            velocity: velocity_3d.or(velocity_2d).unwrap_or(Vec3::ZERO),
            planar: velocity_3d.is_none() && velocity_2d.is_some(),
            ..Agent::detached()
        }
    };
    agent.has_steering = world.has::<Steering>(entity);
    agent
}

/// Write an agent's changes back to `entity`, inserting a velocity kind if
/// the entity had none.
pub(crate) fn write_agent(world: &mut World, entity: Entity, agent: &Agent) -> EcsResult<()> {
    if agent.velocity_changed {
        if agent.planar {
            let linear = agent.velocity.truncate();
            if let Some(velocity) = world.get_mut::<Velocity2D>(entity) {
                velocity.linear = linear;
            } else {
                world.add(entity, Velocity2D { linear, angular: 0.0 })?;
            }
        } else if let Some(velocity) = world.get_mut::<Velocity3D>(entity) {
            velocity.linear = agent.velocity;
        } else {
            world.add(
                entity,
                Velocity3D {
                    linear: agent.velocity,
                    angular: Vec3::ZERO,
                },
            )?;
        }
    }
    if let Some(mode) = agent.steer_request {
        if let Some(steering) = world.get_mut::<Steering>(entity) {
            steering.mode = mode;
        }
    }
    Ok(())
}

/// The AI phase.
pub(crate) fn run(world: &mut World, plans: &PhasePlans, dt: f32, report: &mut FrameReport) {
    if let Some(plan) = &plans.behavior_trees {
        for entity in world.matching(plan) {
            run_guarded(world, Phase::Ai, entity, report, |w| tick_tree(w, entity, dt));
        }
    }
    if let Some(plan) = &plans.state_machines {
        for entity in world.matching(plan) {
            run_guarded(world, Phase::Ai, entity, report, |w| tick_machine(w, entity, dt));
        }
    }
    if let Some(plan) = &plans.steering {
        for entity in world.matching(plan) {
            run_guarded(world, Phase::Ai, entity, report, |w| steer(w, entity, dt));
        }
    }
}

fn tick_tree(world: &mut World, entity: Entity, dt: f32) -> EcsResult<()> {
    let Some(mut tree) = world.get::<BehaviorTree>(entity).cloned() else {
        return Ok(());
    };
    let mut agent = read_agent(world, entity);
    tree.tick(dt, &mut agent, world.input());
    write_agent(world, entity, &agent)?;
    world.set(entity, tree)
}

fn tick_machine(world: &mut World, entity: Entity, dt: f32) -> EcsResult<()> {
    let id = world.id();
    if let Some(machine) = world.get_mut::<StateMachine>(entity) {
        if let Some(state) = machine.tick(dt) {
            debug!(world = %id, entity = %entity, state, "state machine transition");
        }
    }
    Ok(())
}

fn steer(world: &mut World, entity: Entity, dt: f32) -> EcsResult<()> {
    let Some(mut steering) = world.get::<Steering>(entity).cloned() else {
        return Ok(());
    };
    if !steering.enabled {
        return Ok(());
    }
    steering.validate()?;

    let mut agent = read_agent(world, entity);
    let position = agent
        .position
        .ok_or_else(|| EcsError::failed(format!("steering entity {entity} has no transform")))?;

    let target = match steering.mode {
        SteeringMode::Pursue(other) | SteeringMode::Evade(other) => {
            world.ensure_alive(other)?;
            let quarry = read_agent(world, other);
            let quarry_position = quarry.position.ok_or_else(|| {
                EcsError::failed(format!("steering target {other} has no transform"))
            })?;
            predict_position(position, steering.max_speed, quarry_position, quarry.velocity)
        }
        SteeringMode::Wander { .. } => {
            steering.next_wander_point(position, agent.velocity, agent.planar, dt)
        }
        _ => steering.target,
    };

    let force = steering_force(&steering.mode, position, agent.velocity, target, steering.max_speed)
        .clamp_length_max(steering.max_force);
    let mut velocity = (agent.velocity + force * dt).clamp_length_max(steering.max_speed);
    if agent.planar {
        velocity.z = 0.0;
    }
    agent.set_velocity(velocity);
    write_agent(world, entity, &agent)?;
    world.set(entity, steering)
}
