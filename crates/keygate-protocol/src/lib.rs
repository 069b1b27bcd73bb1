//! keygate-protocol: the arbitration wire protocol shared by the capture
//! engine and the host.
//!
//! The engine writes one request line per captured input event to its stdout
//! and expects exactly one response line per request on its stdin. The format
//! is deliberately line-oriented and human-readable so a session can be
//! inspected (or driven) with nothing but a shell:
//!
//! ```text
//! KEYBOARD,DOWN,4,38,1        request: key 4 pressed (scan 38), event id 1
//! 0,1                         response: propagate event id 1
//! MOUSE,DOWN,0,812.5,301.0,2  request: left button at (812.5, 301.0), id 2
//! 1,2                         response: block event id 2
//! ```
//!
//! Event ids are strictly increasing within one engine session, starting at
//! 1, and are never reused. Responses are matched to requests by id, not by
//! position in the stream.

use serde::{Deserialize, Serialize};

mod wire;
pub use wire::{Error, split_lines};

/// Which class of input device produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    /// A keyboard key (including synthesized modifier transitions).
    Keyboard,
    /// A mouse button.
    Mouse,
}

impl DeviceClass {
    /// Wire token for this device class.
    pub fn token(self) -> &'static str {
        match self {
            Self::Keyboard => "KEYBOARD",
            Self::Mouse => "MOUSE",
        }
    }
}

/// Whether the key or button went down or came back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    /// Press.
    Down,
    /// Release.
    Up,
}

impl Transition {
    /// Wire token for this transition.
    pub fn token(self) -> &'static str {
        match self {
            Self::Down => "DOWN",
            Self::Up => "UP",
        }
    }

    /// True for [`Transition::Down`].
    pub fn is_down(self) -> bool {
        matches!(self, Self::Down)
    }
}

/// Auxiliary payload carried by a request, depending on the device class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Aux {
    /// No auxiliary data.
    None,
    /// Hardware scan code reported alongside a keyboard event.
    Scan(u32),
    /// Pointer location reported alongside a mouse event.
    Pointer {
        /// Horizontal position in global display coordinates.
        x: f64,
        /// Vertical position in global display coordinates.
        y: f64,
    },
}

/// One captured input event, as carried by a request line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    /// Device class that produced the event.
    pub device: DeviceClass,
    /// Down or up.
    pub transition: Transition,
    /// OS-specific virtual key or button number.
    pub code: u32,
    /// Scan code or pointer location, depending on `device`.
    pub aux: Aux,
    /// Session-scoped, strictly increasing id starting at 1.
    pub event_id: u64,
}

impl InputEvent {
    /// Encode this event as a request line, including the trailing newline.
    pub fn encode(&self) -> String {
        wire::encode_request(self)
    }

    /// Decode a single request line (without the trailing newline).
    pub fn decode(line: &str) -> Result<Self, Error> {
        wire::parse_request(line)
    }
}

/// The verdict for one event: let it through, or swallow it.
///
/// `Propagate` is the fail-open default everywhere a timely decision is
/// missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Deliver the event to the rest of the operating system.
    Propagate,
    /// Swallow the event; no other application sees it.
    Block,
}

impl Decision {
    /// Wire token: `"1"` blocks, `"0"` propagates.
    pub fn token(self) -> &'static str {
        match self {
            Self::Propagate => "0",
            Self::Block => "1",
        }
    }

    /// True for [`Decision::Block`].
    pub fn is_block(self) -> bool {
        matches!(self, Self::Block)
    }

    /// Encode a response line for `event_id`, including the trailing newline.
    pub fn encode_response(self, event_id: u64) -> String {
        wire::encode_response(self, event_id)
    }

    /// Decode a response line (without the trailing newline) into a decision
    /// and the event id it answers.
    pub fn decode_response(line: &str) -> Result<(Self, u64), Error> {
        wire::parse_response(line)
    }
}
