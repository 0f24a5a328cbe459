//! The demo scene: a little of every phase.

use hearth_component::{EcsResult, Entity};
use hearth_math::{Collider2D, RigidBody2D, SpriteRef, Transform2D, Vec3, Velocity2D};
use hearth_world::{
    Action, AnimationClip, Animator, BehaviorTree, BtNode, Condition, Decorator, StateMachine,
    Steering, SteeringMode, TransitionCondition, World,
};
use tracing::info;

/// Handles to the entities the runner checks after the loop.
#[derive(Debug, Clone, Copy)]
pub struct Scene {
    pub ground: Entity,
    pub ball: Entity,
    pub wanderer: Entity,
    pub guard: Entity,
}

/// Populate `world`.
pub fn populate(world: &mut World) -> EcsResult<Scene> {
    let ground = world.create_entity()?;
    world.set_name(ground, "ground")?;
    world.add(ground, Transform2D::from_xy(0.0, -1.0))?;
    world.add(ground, RigidBody2D::fixed())?;
    world.add(ground, Collider2D::cuboid(40.0, 2.0))?;

    let ball = world
        .spawn()
        .with(Transform2D::from_xy(0.0, 10.0))
        .with(RigidBody2D::dynamic(1.0))
        .with(Collider2D::circle(0.5))
        .with_name("ball")
        .build()?;
    world
        .spawn()
        .with(Transform2D::from_xy(0.0, 0.75))
        .with(SpriteRef::new("sprites/ball.png"))
        .with_name("ball-sprite")
        .child_of(ball)
        .build()?;
    world.replicate_entity(ball)?;

    let wanderer = world.create_entity()?;
    world.set_name(wanderer, "wanderer")?;
    world.add(wanderer, Transform2D::from_xy(-5.0, 2.0))?;
    world.add(wanderer, RigidBody2D::kinematic())?;
    world.add(wanderer, Velocity2D::ZERO)?;
    world.add(
        wanderer,
        Steering::new(
            SteeringMode::Wander {
                radius: 1.0,
                distance: 2.0,
                jitter: 1.5,
            },
            2.0,
            4.0,
        )
        .with_seed(7),
    )?;
    world.replicate_entity(wanderer)?;

    let guard = world.create_entity()?;
    world.set_name(guard, "guard")?;
    world.add(guard, Transform2D::from_xy(5.0, 2.0))?;
    world.add(guard, RigidBody2D::kinematic())?;
    world.add(guard, Velocity2D::ZERO)?;
    world.add(guard, patrol_tree())?;
    world.add(guard, guard_states()?)?;

    let mut animator = Animator::new();
    animator.play(AnimationClip::new("idle", 1.5)?, true);
    animator.crossfade_to(AnimationClip::new("walk", 0.8)?, 0.5)?;
    world.add(guard, animator)?;

    info!(entities = world.entity_count(), "demo scene ready");
    Ok(Scene {
        ground,
        ball,
        wanderer,
        guard,
    })
}

/// Walk between two posts forever, pausing at each.
fn patrol_tree() -> BehaviorTree {
    let leg = |x: f32| {
        BtNode::sequence(vec![
            BtNode::Action(Action::MoveTo {
                target: Vec3::new(x, 2.0, 0.0),
                speed: 1.5,
                tolerance: 0.1,
            }),
            BtNode::Action(Action::Stop),
            BtNode::Action(Action::Wait {
                seconds: 0.5,
                elapsed: 0.0,
            }),
        ])
    };
    BehaviorTree::new(BtNode::decorate(
        Decorator::UntilFail,
        BtNode::selector(vec![
            BtNode::sequence(vec![
                BtNode::Condition(Condition::Flag {
                    key: "at_east".into(),
                    expected: true,
                }),
                leg(3.0),
                BtNode::Action(Action::SetFlag {
                    key: "at_east".into(),
                    value: false,
                }),
            ]),
            BtNode::sequence(vec![
                leg(7.0),
                BtNode::Action(Action::SetFlag {
                    key: "at_east".into(),
                    value: true,
                }),
            ]),
        ]),
    ))
}

fn guard_states() -> EcsResult<StateMachine> {
    let mut machine = StateMachine::new("watch");
    machine.add_state("rest");
    machine.add_transition(Some("watch"), "rest", TransitionCondition::After(2.0), 0)?;
    machine.add_transition(Some("rest"), "watch", TransitionCondition::After(1.0), 0)?;
    Ok(machine)
}
