//! Finite state machines with prioritised transitions.

use hearth_component::{Component, EcsError, EcsResult};
use serde::{Deserialize, Serialize};

use super::blackboard::Blackboard;

/// Tolerance for [`TransitionCondition::ParamEquals`].
const PARAM_EPSILON: f32 = 1e-6;

/// When a transition may fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransitionCondition {
    /// Every tick.
    Always,
    /// Once the machine has spent this many seconds in the current state.
    After(f32),
    /// A flag is set.
    FlagSet(String),
    /// A flag is clear or missing.
    FlagClear(String),
    /// A parameter is strictly above a value.
    ParamAbove(String, f32),
    /// A parameter is strictly below a value.
    ParamBelow(String, f32),
    /// A parameter equals a value.
    ParamEquals(String, f32),
}

impl TransitionCondition {
    fn holds(&self, time_in_state: f32, params: &Blackboard) -> bool {
        match self {
            Self::Always => true,
            Self::After(seconds) => time_in_state >= *seconds,
            Self::FlagSet(key) => params.bool(key).unwrap_or(false),
            Self::FlagClear(key) => !params.bool(key).unwrap_or(false),
            Self::ParamAbove(key, value) => params.number(key).is_some_and(|v| v > *value),
            Self::ParamBelow(key, value) => params.number(key).is_some_and(|v| v < *value),
            Self::ParamEquals(key, value) => params
                .number(key)
                .is_some_and(|v| (v - *value).abs() <= PARAM_EPSILON),
        }
    }
}

/// A directed edge between two states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Source state; `None` matches every state.
    pub from: Option<String>,
    /// Destination state.
    pub to: String,
    /// Firing condition.
    pub condition: TransitionCondition,
    /// Higher fires first; ties keep insertion order.
    pub priority: i32,
}

/// A state machine attached to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMachine {
    states: Vec<String>,
    transitions: Vec<Transition>,
    current: usize,
    /// Seconds spent in the current state.
    pub time_in_state: f32,
    /// Flags and parameters read by conditions.
    pub params: Blackboard,
}

impl StateMachine {
    /// A machine with a single, current state.
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            states: vec![initial.into()],
            transitions: Vec::new(),
            current: 0,
            time_in_state: 0.0,
            params: Blackboard::new(),
        }
    }

    /// Add a state. Adding an existing name is a no-op.
    pub fn add_state(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.states.contains(&name) {
            self.states.push(name);
        }
    }

    /// Add a transition.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`] if `from` or `to` names an unknown state.
    pub fn add_transition(
        &mut self,
        from: Option<&str>,
        to: &str,
        condition: TransitionCondition,
        priority: i32,
    ) -> EcsResult<()> {
        for name in from.into_iter().chain([to]) {
            if self.index_of(name).is_none() {
                return Err(EcsError::invalid_argument(format!("unknown state `{name}`")));
            }
        }
        self.transitions.push(Transition {
            from: from.map(str::to_string),
            to: to.to_string(),
            condition,
            priority,
        });
        Ok(())
    }

    /// Name of the current state.
    #[must_use]
    pub fn current_state(&self) -> &str {
        self.states.get(self.current).map_or("", String::as_str)
    }

    /// Jump to a state directly, resetting the state timer.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`] for an unknown state.
    pub fn set_state(&mut self, name: &str) -> EcsResult<()> {
        let index = self
            .index_of(name)
            .ok_or_else(|| EcsError::invalid_argument(format!("unknown state `{name}`")))?;
        self.current = index;
        self.time_in_state = 0.0;
        Ok(())
    }

    /// Advance the state timer and fire at most one transition. Returns the
    /// new state's name if one fired.
    pub fn tick(&mut self, dt: f32) -> Option<&str> {
        self.time_in_state += dt;
        let current = self.current_state();

        let mut best: Option<&Transition> = None;
        for transition in &self.transitions {
            if transition.from.as_deref().is_some_and(|from| from != current) {
                continue;
            }
            if best.is_some_and(|b| b.priority >= transition.priority) {
                continue;
            }
            if transition.condition.holds(self.time_in_state, &self.params) {
                best = Some(transition);
            }
        }

        let target = best.and_then(|t| self.index_of(&t.to))?;
        self.current = target;
        self.time_in_state = 0.0;
        Some(self.current_state())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s == name)
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new("idle")
    }
}

impl Component for StateMachine {
    fn type_name() -> &'static str {
        "StateMachine"
    }
}
