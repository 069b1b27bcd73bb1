//! keygate-engine: the privileged capture side of keygate.
//!
//! The engine installs an OS-level input hook and, for every qualifying
//! keyboard or mouse event, asks the host process whether the event should
//! reach the rest of the system. The OS silently disables hooks that stall,
//! so the ask is bounded by a hard deadline: if the host has not answered
//! within [`DEADLINE`], the event fails open and propagates.
//!
//! Layout:
//! - [`Arbiter`]: the deadline arbitration core — one outstanding request,
//!   two resolver threads, exactly one signal per request. Pure logic, no OS
//!   dependency.
//! - [`Session`]: ties the arbiter to the stdio wire protocol (requests out
//!   on stdout, responses in on stdin).
//! - `sys` (macOS only): the CGEventTap integration driving a [`Session`]
//!   from the hook callback.

use std::time::Duration;

mod arbiter;
mod error;
mod stdio;

#[cfg(target_os = "macos")]
pub mod sys;

pub use arbiter::{Arbiter, Deadlines, timeout_loop};
pub use error::{Error, Result};
pub use stdio::{Session, response_reader_loop};

/// Hard per-request deadline.
///
/// The OS cutoff for an unresponsive hook is undocumented but comfortably
/// above this; answering within 30 ms keeps the hook alive even when the
/// host stalls.
pub const DEADLINE: Duration = Duration::from_millis(30);
