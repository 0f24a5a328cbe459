//! Frame input.
//!
//! The host writes buttons and axes into the pending state at any time
//! between updates; the first phase of every update copies it into the
//! latched state that the rest of the frame reads.

use std::collections::BTreeMap;

use hearth_component::{EcsError, EcsResult};
use serde::{Deserialize, Serialize};

/// Buttons and axes as seen by one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputState {
    buttons: BTreeMap<String, bool>,
    axes: BTreeMap<String, f32>,
    /// The frame this state was latched for; `0` before the first update.
    pub frame: u64,
}

impl InputState {
    /// Returns `true` if `name` is held. Unknown buttons are up.
    #[must_use]
    pub fn button(&self, name: &str) -> bool {
        self.buttons.get(name).copied().unwrap_or(false)
    }

    /// The value of axis `name`, `0.0` if never set.
    #[must_use]
    pub fn axis(&self, name: &str) -> f32 {
        self.axes.get(name).copied().unwrap_or(0.0)
    }

    /// Press or release a button.
    pub fn set_button(&mut self, name: impl Into<String>, down: bool) {
        self.buttons.insert(name.into(), down);
    }

    /// Set an axis value.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`] for a non-finite value.
    pub fn set_axis(&mut self, name: impl Into<String>, value: f32) -> EcsResult<()> {
        if !value.is_finite() {
            return Err(EcsError::invalid_argument("axis value must be finite"));
        }
        self.axes.insert(name.into(), value);
        Ok(())
    }
}

/// Pending and latched input.
#[derive(Debug, Clone, Default)]
pub struct InputLatch {
    pending: InputState,
    latched: InputState,
}

impl InputLatch {
    /// The state the host is writing.
    pub fn pending_mut(&mut self) -> &mut InputState {
        &mut self.pending
    }

    /// The state the current frame reads.
    #[must_use]
    pub fn latched(&self) -> &InputState {
        &self.latched
    }

    /// Copy pending into latched and stamp `frame`.
    pub fn latch(&mut self, frame: u64) {
        self.latched.clone_from(&self.pending);
        self.latched.frame = frame;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_is_invisible_until_latched() {
        let mut latch = InputLatch::default();
        latch.pending_mut().set_button("jump", true);
        assert!(!latch.latched().button("jump"));
        latch.latch(1);
        assert!(latch.latched().button("jump"));
        assert_eq!(latch.latched().frame, 1);
    }

    #[test]
    fn test_axis_validation() {
        let mut state = InputState::default();
        state.set_axis("move_x", 0.5).unwrap();
        assert!(state.set_axis("move_x", f32::NAN).is_err());
        assert_eq!(state.axis("move_x"), 0.5);
        assert_eq!(state.axis("unknown"), 0.0);
    }
}
