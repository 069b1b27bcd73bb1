//! Ordered listener evaluation producing the host's decision.

use std::panic::{AssertUnwindSafe, catch_unwind};

use keygate_protocol::{Decision, DeviceClass, InputEvent};
use tracing::warn;

use crate::{KeyStateMap, Listener, ListenerId, ListenerOutcome};

/// Resolve an event's canonical key name, as used in the key-state map.
///
/// Codes the tables don't know still get a stable name so their state is
/// tracked rather than dropped.
pub fn canonical_name(event: &InputEvent) -> String {
    match event.device {
        DeviceClass::Keyboard => keycode::key_name(event.code)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("KEY {}", event.code)),
        DeviceClass::Mouse => keycode::mouse_name(event.code)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("MOUSE {}", event.code)),
    }
}

/// The dispatch chain: listeners in registration order plus the key-state
/// map they observe.
#[derive(Default)]
pub struct DispatchChain {
    /// Registered listeners, in registration order.
    listeners: Vec<(ListenerId, Listener)>,
    /// Source of listener ids.
    next_id: u64,
    /// Held-key state, updated before listeners run.
    keys: KeyStateMap,
}

impl DispatchChain {
    /// Create an empty chain with an empty key-state map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener; it runs after all currently registered ones.
    pub fn add(&mut self, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener by id. Returns false if the id is unknown.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Drop all listeners. Key state is intentionally kept; it belongs to
    /// the registry's lifetime, not the listener set's.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True when no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// The key-state map as listeners see it.
    pub fn key_state(&self) -> &KeyStateMap {
        &self.keys
    }

    /// Convert one event into a decision.
    ///
    /// Key state updates first, unconditionally, so every listener of this
    /// dispatch — including the first — observes the event already applied.
    /// A listener that panics is logged and treated as `Continue`; the rest
    /// of the chain still runs.
    pub fn dispatch(&mut self, event: &InputEvent) -> Decision {
        let name = canonical_name(event);
        self.keys.set(name, event.transition.is_down());

        let mut decision = Decision::Propagate;
        for (id, listener) in &mut self.listeners {
            let outcome = match catch_unwind(AssertUnwindSafe(|| listener(event, &self.keys))) {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(listener = id.0, event_id = event.event_id, "listener_panicked");
                    ListenerOutcome::Continue
                }
            };
            if outcome.stops_propagation() {
                decision = Decision::Block;
            }
            if outcome.stops_chain() {
                break;
            }
        }
        decision
    }
}
