//! Tracks which keys are currently held down.

use std::collections::HashMap;

/// Canonical key name → pressed state.
///
/// Mutated only by the dispatch chain, immediately before listeners run,
/// from the event's transition alone. Lives as long as the listener
/// registry: an engine crash/restart within the same host session does not
/// reset it.
#[derive(Debug, Clone, Default)]
pub struct KeyStateMap {
    /// Latest observed transition per key; absent means never seen.
    state: HashMap<String, bool>,
}

impl KeyStateMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return true if the key is currently considered down.
    pub fn is_down(&self, name: &str) -> bool {
        self.state.get(name).copied().unwrap_or(false)
    }

    /// Latest recorded state for a key, or `None` if never observed.
    pub fn get(&self, name: &str) -> Option<bool> {
        self.state.get(name).copied()
    }

    /// Names of all keys currently down, in no particular order.
    pub fn pressed(&self) -> impl Iterator<Item = &str> {
        self.state
            .iter()
            .filter(|&(_, down)| *down)
            .map(|(name, _)| name.as_str())
    }

    /// Record a transition for a key.
    pub(crate) fn set(&mut self, name: String, down: bool) {
        self.state.insert(name, down);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_latest_transition() {
        let mut keys = KeyStateMap::new();
        assert!(!keys.is_down("A"));
        assert_eq!(keys.get("A"), None);

        keys.set("A".into(), true);
        assert!(keys.is_down("A"));

        keys.set("A".into(), false);
        assert!(!keys.is_down("A"));
        assert_eq!(keys.get("A"), Some(false));
    }

    #[test]
    fn pressed_lists_only_held_keys() {
        let mut keys = KeyStateMap::new();
        keys.set("A".into(), true);
        keys.set("LEFT SHIFT".into(), true);
        keys.set("B".into(), false);

        let mut held: Vec<&str> = keys.pressed().collect();
        held.sort_unstable();
        assert_eq!(held, ["A", "LEFT SHIFT"]);
    }
}
