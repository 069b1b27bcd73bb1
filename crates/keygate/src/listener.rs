//! Listener contract for the dispatch chain.

use keygate_protocol::InputEvent;

use crate::KeyStateMap;

/// What one listener wants done after seeing an event.
///
/// The original dynamically-shaped return value (boolean, nothing, or an
/// object with independent flags) is re-expressed as a closed set of
/// variants so there is no ambiguous truthiness anywhere. The two axes stay
/// independent: stopping propagation to the OS says nothing about whether
/// later listeners run, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenerOutcome {
    /// Let the event through and keep evaluating the chain.
    #[default]
    Continue,
    /// Block the event from the rest of the OS; later listeners still run.
    StopPropagation,
    /// Skip the remaining listeners for this event; the propagation verdict
    /// keeps whatever value earlier listeners produced.
    StopImmediate,
    /// Both at once.
    StopPropagationAndImmediate,
}

impl ListenerOutcome {
    /// True if this outcome marks the aggregate decision as blocked.
    pub fn stops_propagation(self) -> bool {
        matches!(self, Self::StopPropagation | Self::StopPropagationAndImmediate)
    }

    /// True if this outcome halts further listener invocation.
    pub fn stops_chain(self) -> bool {
        matches!(self, Self::StopImmediate | Self::StopPropagationAndImmediate)
    }
}

/// Boolean shorthand: `true` blocks propagation, `false` continues.
impl From<bool> for ListenerOutcome {
    fn from(block: bool) -> Self {
        if block {
            Self::StopPropagation
        } else {
            Self::Continue
        }
    }
}

/// A registered listener. Invoked synchronously during dispatch with the
/// event and the key-state map as updated for that event; must not block,
/// or the engine's deadline fails the event open before the host answers.
pub type Listener = Box<dyn FnMut(&InputEvent, &KeyStateMap) -> ListenerOutcome + Send>;

/// Handle identifying a registered listener for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);
