//! Behaviour trees.
//!
//! A tree is a plain value: nodes keep their own cursors and timers, so a
//! running composite resumes where it left off on the next tick and the
//! whole tree survives a snapshot round trip mid-behaviour.

use hearth_component::Component;
use hearth_math::Vec3;
use serde::{Deserialize, Serialize};

use super::Agent;
use super::blackboard::Blackboard;
use super::steering::SteeringMode;
use crate::input::InputState;

/// Result of ticking a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BtStatus {
    /// The node finished and succeeded.
    Success,
    /// The node finished and failed.
    Failure,
    /// The node needs more ticks.
    Running,
}

/// Single-child modifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decorator {
    /// Swap success and failure.
    Inverter,
    /// Report success whenever the child finishes.
    Succeeder,
    /// Run the child to completion `count` times.
    Repeat {
        /// Completions required.
        count: u32,
        /// Completions so far.
        done: u32,
    },
    /// Keep running the child until it fails, then succeed.
    UntilFail,
    /// Fail without ticking the child until `seconds` after its last completion.
    Cooldown {
        /// Cooldown length.
        seconds: f32,
        /// Tree time at which the child may run again.
        ready_at: f64,
    },
}

/// Leaf behaviours that act on the agent or its blackboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Drive toward `target` at `speed`; succeeds within `tolerance`.
    MoveTo {
        /// Destination.
        target: Vec3,
        /// Travel speed.
        speed: f32,
        /// Arrival distance.
        tolerance: f32,
    },
    /// Succeed after `seconds` of ticks.
    Wait {
        /// Wait length.
        seconds: f32,
        /// Time waited so far.
        elapsed: f32,
    },
    /// Write a flag.
    SetFlag {
        /// Blackboard key.
        key: String,
        /// Value written.
        value: bool,
    },
    /// Write a float.
    SetFloat {
        /// Blackboard key.
        key: String,
        /// Value written.
        value: f32,
    },
    /// Zero the agent's velocity.
    Stop,
    /// Switch the agent's steering behaviour; fails without a `Steering` component.
    Steer(SteeringMode),
}

/// Leaf predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// A blackboard flag equals `expected`; missing flags are `false`.
    Flag {
        /// Blackboard key.
        key: String,
        /// Required value.
        expected: bool,
    },
    /// A blackboard number is strictly above `threshold`.
    FloatAbove {
        /// Blackboard key.
        key: String,
        /// Exclusive bound.
        threshold: f32,
    },
    /// A blackboard number is strictly below `threshold`.
    FloatBelow {
        /// Blackboard key.
        key: String,
        /// Exclusive bound.
        threshold: f32,
    },
    /// The agent is within `distance` of `target`.
    WithinDistance {
        /// Reference point.
        target: Vec3,
        /// Inclusive bound.
        distance: f32,
    },
    /// A latched input button is held.
    ButtonDown(String),
}

/// A behaviour tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BtNode {
    /// Run children in order until one fails.
    Sequence {
        /// Children, ticked in order.
        children: Vec<BtNode>,
        /// Index of the child to resume.
        cursor: usize,
    },
    /// Run children in order until one succeeds.
    Selector {
        /// Children, ticked in order.
        children: Vec<BtNode>,
        /// Index of the child to resume.
        cursor: usize,
    },
    /// Tick every child each tick; succeed once `success_threshold` succeed.
    Parallel {
        /// Children, all ticked every time.
        children: Vec<BtNode>,
        /// Successes needed.
        success_threshold: usize,
    },
    /// Modify a single child.
    Decorator {
        /// The modifier.
        decorator: Decorator,
        /// The wrapped node.
        child: Box<BtNode>,
    },
    /// Do something.
    Action(Action),
    /// Check something.
    Condition(Condition),
}

/// Everything a node may read or write during one tick.
pub struct TickContext<'a> {
    /// Simulated seconds of this frame.
    pub dt: f32,
    /// Tree time after this frame, in seconds.
    pub now: f64,
    /// Kinematic view of the owning entity.
    pub agent: &'a mut Agent,
    /// The tree's memory.
    pub blackboard: &'a mut Blackboard,
    /// This frame's latched input.
    pub input: &'a InputState,
}

impl BtNode {
    /// A sequence starting at its first child.
    #[must_use]
    pub fn sequence(children: Vec<BtNode>) -> Self {
        Self::Sequence { children, cursor: 0 }
    }

    /// A selector starting at its first child.
    #[must_use]
    pub fn selector(children: Vec<BtNode>) -> Self {
        Self::Selector { children, cursor: 0 }
    }

    /// Wrap `child` in `decorator`.
    #[must_use]
    pub fn decorate(decorator: Decorator, child: BtNode) -> Self {
        Self::Decorator {
            decorator,
            child: Box::new(child),
        }
    }

    /// Tick this node once.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) -> BtStatus {
        match self {
            Self::Sequence { children, cursor } => {
                tick_composite(children, cursor, ctx, BtStatus::Success)
            }
            Self::Selector { children, cursor } => {
                tick_composite(children, cursor, ctx, BtStatus::Failure)
            }
            Self::Parallel {
                children,
                success_threshold,
            } => {
                let mut successes = 0;
                let mut failures = 0;
                for child in children.iter_mut() {
                    match child.tick(ctx) {
                        BtStatus::Success => successes += 1,
                        BtStatus::Failure => failures += 1,
                        BtStatus::Running => {}
                    }
                }
                let threshold = (*success_threshold).min(children.len());
                if successes >= threshold {
                    BtStatus::Success
                } else if failures > children.len() - threshold {
                    BtStatus::Failure
                } else {
                    BtStatus::Running
                }
            }
            Self::Decorator { decorator, child } => tick_decorator(decorator, child, ctx),
            Self::Action(action) => tick_action(action, ctx),
            Self::Condition(condition) => {
                if check(condition, ctx) {
                    BtStatus::Success
                } else {
                    BtStatus::Failure
                }
            }
        }
    }
}

/// Shared body of sequence and selector. `pass` is the status that moves on
/// to the next child; anything else ends the composite.
fn tick_composite(
    children: &mut [BtNode],
    cursor: &mut usize,
    ctx: &mut TickContext<'_>,
    pass: BtStatus,
) -> BtStatus {
    while *cursor < children.len() {
        match children[*cursor].tick(ctx) {
            BtStatus::Running => return BtStatus::Running,
            status if status == pass => *cursor += 1,
            status => {
                *cursor = 0;
                return status;
            }
        }
    }
    *cursor = 0;
    pass
}

fn tick_decorator(decorator: &mut Decorator, child: &mut BtNode, ctx: &mut TickContext<'_>) -> BtStatus {
    match decorator {
        Decorator::Inverter => match child.tick(ctx) {
            BtStatus::Success => BtStatus::Failure,
            BtStatus::Failure => BtStatus::Success,
            BtStatus::Running => BtStatus::Running,
        },
        Decorator::Succeeder => match child.tick(ctx) {
            BtStatus::Running => BtStatus::Running,
            _ => BtStatus::Success,
        },
        Decorator::Repeat { count, done } => {
            if *done >= *count {
                *done = 0;
                return BtStatus::Success;
            }
            if child.tick(ctx) == BtStatus::Running {
                return BtStatus::Running;
            }
            *done += 1;
            if *done >= *count {
                *done = 0;
                BtStatus::Success
            } else {
                BtStatus::Running
            }
        }
        Decorator::UntilFail => match child.tick(ctx) {
            BtStatus::Failure => BtStatus::Success,
            _ => BtStatus::Running,
        },
        Decorator::Cooldown { seconds, ready_at } => {
            if ctx.now < *ready_at {
                return BtStatus::Failure;
            }
            let status = child.tick(ctx);
            if status != BtStatus::Running {
                *ready_at = ctx.now + f64::from(*seconds);
            }
            status
        }
    }
}

fn tick_action(action: &mut Action, ctx: &mut TickContext<'_>) -> BtStatus {
    match action {
        Action::MoveTo {
            target,
            speed,
            tolerance,
        } => {
            let Some(position) = ctx.agent.position else {
                return BtStatus::Failure;
            };
            let offset = *target - position;
            if offset.length() <= *tolerance {
                ctx.agent.set_velocity(Vec3::ZERO);
                BtStatus::Success
            } else {
                ctx.agent.set_velocity(offset.normalize_or_zero() * *speed);
                BtStatus::Running
            }
        }
        Action::Wait { seconds, elapsed } => {
            *elapsed += ctx.dt;
            if *elapsed >= *seconds {
                *elapsed = 0.0;
                BtStatus::Success
            } else {
                BtStatus::Running
            }
        }
        Action::SetFlag { key, value } => {
            ctx.blackboard.set_bool(key.clone(), *value);
            BtStatus::Success
        }
        Action::SetFloat { key, value } => {
            ctx.blackboard.set_float(key.clone(), *value);
            BtStatus::Success
        }
        Action::Stop => {
            ctx.agent.set_velocity(Vec3::ZERO);
            BtStatus::Success
        }
        Action::Steer(mode) => {
            if ctx.agent.request_steering(*mode) {
                BtStatus::Success
            } else {
                BtStatus::Failure
            }
        }
    }
}

fn check(condition: &Condition, ctx: &TickContext<'_>) -> bool {
    match condition {
        Condition::Flag { key, expected } => ctx.blackboard.bool(key).unwrap_or(false) == *expected,
        Condition::FloatAbove { key, threshold } => {
            ctx.blackboard.number(key).is_some_and(|v| v > *threshold)
        }
        Condition::FloatBelow { key, threshold } => {
            ctx.blackboard.number(key).is_some_and(|v| v < *threshold)
        }
        Condition::WithinDistance { target, distance } => ctx
            .agent
            .position
            .is_some_and(|p| p.distance(*target) <= *distance),
        Condition::ButtonDown(name) => ctx.input.button(name),
    }
}

/// A behaviour tree attached to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorTree {
    /// The root node.
    pub root: BtNode,
    /// The tree's memory.
    pub blackboard: Blackboard,
    /// Status of the most recent tick.
    pub last_status: Option<BtStatus>,
    /// Seconds the tree has been ticked for.
    pub elapsed: f64,
}

impl BehaviorTree {
    /// A tree with an empty blackboard.
    #[must_use]
    pub fn new(root: BtNode) -> Self {
        Self {
            root,
            blackboard: Blackboard::new(),
            last_status: None,
            elapsed: 0.0,
        }
    }

    /// Tick the whole tree once.
    pub fn tick(&mut self, dt: f32, agent: &mut Agent, input: &InputState) -> BtStatus {
        self.elapsed += f64::from(dt);
        let mut ctx = TickContext {
            dt,
            now: self.elapsed,
            agent,
            blackboard: &mut self.blackboard,
            input,
        };
        let status = self.root.tick(&mut ctx);
        self.last_status = Some(status);
        status
    }
}

impl Default for BehaviorTree {
    fn default() -> Self {
        Self::new(BtNode::sequence(Vec::new()))
    }
}

impl Component for BehaviorTree {
    fn type_name() -> &'static str {
        "BehaviorTree"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(key: &str, value: bool) -> BtNode {
        BtNode::Action(Action::SetFlag {
            key: key.into(),
            value,
        })
    }

    fn wait(seconds: f32) -> BtNode {
        BtNode::Action(Action::Wait {
            seconds,
            elapsed: 0.0,
        })
    }

    fn tick(tree: &mut BehaviorTree, agent: &mut Agent) -> BtStatus {
        tree.tick(0.1, agent, &InputState::default())
    }

    #[test]
    fn test_sequence_resumes_running_child() {
        let mut tree = BehaviorTree::new(BtNode::sequence(vec![
            flag("started", true),
            wait(0.25),
            flag("finished", true),
        ]));
        let mut agent = Agent::detached();
        assert_eq!(tick(&mut tree, &mut agent), BtStatus::Running);
        assert_eq!(tree.blackboard.bool("finished"), None);
        assert_eq!(tick(&mut tree, &mut agent), BtStatus::Running);
        assert_eq!(tick(&mut tree, &mut agent), BtStatus::Success);
        assert_eq!(tree.blackboard.bool("finished"), Some(true));
    }

    #[test]
    fn test_selector_takes_first_success() {
        let mut tree = BehaviorTree::new(BtNode::selector(vec![
            BtNode::Condition(Condition::Flag {
                key: "armed".into(),
                expected: true,
            }),
            flag("fallback", true),
        ]));
        let mut agent = Agent::detached();
        assert_eq!(tick(&mut tree, &mut agent), BtStatus::Success);
        assert_eq!(tree.blackboard.bool("fallback"), Some(true));
    }

    #[test]
    fn test_inverter_and_parallel() {
        let fail = BtNode::Condition(Condition::ButtonDown("fire".into()));
        let mut tree = BehaviorTree::new(BtNode::Parallel {
            children: vec![BtNode::decorate(Decorator::Inverter, fail), wait(1.0)],
            success_threshold: 1,
        });
        let mut agent = Agent::detached();
        assert_eq!(tick(&mut tree, &mut agent), BtStatus::Success);
    }

    #[test]
    fn test_repeat_counts_completions() {
        let mut tree = BehaviorTree::new(BtNode::decorate(
            Decorator::Repeat { count: 3, done: 0 },
            flag("x", true),
        ));
        let mut agent = Agent::detached();
        assert_eq!(tick(&mut tree, &mut agent), BtStatus::Running);
        assert_eq!(tick(&mut tree, &mut agent), BtStatus::Running);
        assert_eq!(tick(&mut tree, &mut agent), BtStatus::Success);
    }

    #[test]
    fn test_cooldown_blocks_until_ready() {
        let mut tree = BehaviorTree::new(BtNode::decorate(
            Decorator::Cooldown {
                seconds: 0.25,
                ready_at: 0.0,
            },
            flag("shot", true),
        ));
        let mut agent = Agent::detached();
        assert_eq!(tick(&mut tree, &mut agent), BtStatus::Success);
        assert_eq!(tick(&mut tree, &mut agent), BtStatus::Failure);
        assert_eq!(tick(&mut tree, &mut agent), BtStatus::Failure);
        assert_eq!(tick(&mut tree, &mut agent), BtStatus::Success);
    }

    #[test]
    fn test_move_to_drives_velocity() {
        let mut tree = BehaviorTree::new(BtNode::Action(Action::MoveTo {
            target: Vec3::new(10.0, 0.0, 0.0),
            speed: 2.0,
            tolerance: 0.5,
        }));
        let mut agent = Agent::at(Vec3::ZERO, Vec3::ZERO, false);
        assert_eq!(tick(&mut tree, &mut agent), BtStatus::Running);
        assert_eq!(agent.velocity, Vec3::new(2.0, 0.0, 0.0));

        let mut arrived = Agent::at(Vec3::new(9.8, 0.0, 0.0), Vec3::X, false);
        assert_eq!(tick(&mut tree, &mut arrived), BtStatus::Success);
        assert_eq!(arrived.velocity, Vec3::ZERO);

        let mut nowhere = Agent::detached();
        assert_eq!(tick(&mut tree, &mut nowhere), BtStatus::Failure);
    }

    #[test]
    fn test_button_condition_reads_input() {
        let mut tree = BehaviorTree::new(BtNode::Condition(Condition::ButtonDown("jump".into())));
        let mut input = InputState::default();
        input.set_button("jump", true);
        let mut agent = Agent::detached();
        assert_eq!(tree.tick(0.1, &mut agent, &input), BtStatus::Success);
    }
}
