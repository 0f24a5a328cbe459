//! Typed key-value memory shared by an agent's decision logic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-agent memory: flags, floats, integers and strings.
///
/// Ordered maps keep the encoding stable, so an unchanged blackboard never
/// shows up as a replication change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blackboard {
    bools: BTreeMap<String, bool>,
    floats: BTreeMap<String, f32>,
    ints: BTreeMap<String, i64>,
    strings: BTreeMap<String, String>,
}

impl Blackboard {
    /// Create an empty blackboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag; missing flags read as `None`.
    #[must_use]
    pub fn bool(&self, key: &str) -> Option<bool> {
        self.bools.get(key).copied()
    }

    /// Set a flag.
    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.bools.insert(key.into(), value);
    }

    /// A float parameter.
    #[must_use]
    pub fn float(&self, key: &str) -> Option<f32> {
        self.floats.get(key).copied()
    }

    /// Set a float parameter.
    pub fn set_float(&mut self, key: impl Into<String>, value: f32) {
        self.floats.insert(key.into(), value);
    }

    /// An integer parameter.
    #[must_use]
    pub fn int(&self, key: &str) -> Option<i64> {
        self.ints.get(key).copied()
    }

    /// Set an integer parameter.
    pub fn set_int(&mut self, key: impl Into<String>, value: i64) {
        self.ints.insert(key.into(), value);
    }

    /// A string value.
    #[must_use]
    pub fn string(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    /// Set a string value.
    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(key.into(), value.into());
    }

    /// Numeric lookup used by conditions: floats first, then integers.
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f32> {
        self.float(key).or_else(|| self.int(key).map(|v| v as f32))
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.bools.clear();
        self.floats.clear();
        self.ints.clear();
        self.strings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_slots_are_independent() {
        let mut bb = Blackboard::new();
        bb.set_bool("alert", true);
        bb.set_float("alert", 2.5);
        assert_eq!(bb.bool("alert"), Some(true));
        assert_eq!(bb.float("alert"), Some(2.5));
        assert_eq!(bb.int("alert"), None);
    }

    #[test]
    fn test_number_falls_back_to_int() {
        let mut bb = Blackboard::new();
        bb.set_int("ammo", 3);
        assert_eq!(bb.number("ammo"), Some(3.0));
        bb.set_string("target", "player");
        assert_eq!(bb.string("target"), Some("player"));
        bb.clear();
        assert_eq!(bb.number("ammo"), None);
    }
}
