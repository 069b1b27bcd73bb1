//! macOS event tap (CoreGraphics) integration.
//!
//! Why we use `core-graphics` for event taps: CoreGraphics only suppresses
//! delivery of a tapped event if the tap callback returns NULL. The
//! `core-graphics` crate's `CGEventTap` uses a `CallbackResult` where `Drop`
//! maps to a NULL `CGEventRef` at the C boundary, matching that contract, so
//! a blocked event never reaches the foreground app.
//!
//! Every qualifying event is routed through [`Session::decide`], which
//! blocks the tap callback until the host answers or the deadline elapses.
//! Modifier keys don't produce key-down/key-up events on macOS; they arrive
//! as `FlagsChanged`, which this module translates into synthesized down/up
//! transitions by inspecting the modifier flag for the reported keycode.

use std::{io::Write, sync::Arc};

use core_foundation::runloop::{CFRunLoop, kCFRunLoopCommonModes};
use core_graphics::event::{self as cge, CGEventFlags, CallbackResult};
use keygate_protocol::{Aux, DeviceClass, Transition};
use tracing::{debug, warn};

use crate::{Error, Result, Session};

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn CGPreflightListenEventAccess() -> bool;
}

// Minimal subset of CGEventField constants used by this module.
const FIELD_MOUSE_EVENT_BUTTON_NUMBER: u32 = 3;
const FIELD_KEYBOARD_EVENT_KEYCODE: u32 = 9;

// Modifier virtual key codes, as reported with FlagsChanged events.
const VK_RCOMMAND: u32 = 0x36;
const VK_LCOMMAND: u32 = 0x37;
const VK_LSHIFT: u32 = 0x38;
const VK_CAPSLOCK: u32 = 0x39;
const VK_LALT: u32 = 0x3A;
const VK_LCTRL: u32 = 0x3B;
const VK_RSHIFT: u32 = 0x3C;
const VK_RALT: u32 = 0x3D;
const VK_RCTRL: u32 = 0x3E;
const VK_FN: u32 = 0x3F;
const VK_HELP: u32 = 0x72;

/// Check if the process holds the Input Monitoring permission.
///
/// Fast and side-effect free; there is no prompting logic here. The host is
/// responsible for guiding the user to System Settings when this is missing.
pub fn input_monitoring_ok() -> bool {
    unsafe { CGPreflightListenEventAccess() }
}

/// Derive the down state for a modifier's `FlagsChanged` event from the
/// event flags: the flag is set while the modifier is held, so flag present
/// means this transition was a press.
fn modifier_is_down(keycode: u32, flags: CGEventFlags) -> bool {
    match keycode {
        VK_LCOMMAND | VK_RCOMMAND => flags.contains(CGEventFlags::CGEventFlagCommand),
        VK_LSHIFT | VK_RSHIFT => flags.contains(CGEventFlags::CGEventFlagShift),
        VK_LCTRL | VK_RCTRL => flags.contains(CGEventFlags::CGEventFlagControl),
        VK_LALT | VK_RALT => flags.contains(CGEventFlags::CGEventFlagAlternate),
        VK_CAPSLOCK => flags.contains(CGEventFlags::CGEventFlagAlphaShift),
        VK_FN => flags.contains(CGEventFlags::CGEventFlagSecondaryFn),
        VK_HELP => flags.contains(CGEventFlags::CGEventFlagHelp),
        _ => false,
    }
}

/// Install the session event tap and run the hook loop on this thread.
///
/// Blocks for the lifetime of the engine; the host stops the engine by
/// killing the process. `modifier_events` controls whether `FlagsChanged`
/// transitions are arbitrated at all.
pub fn run_event_loop<W: Write + Send + 'static>(
    session: Arc<Session<W>>,
    modifier_events: bool,
) -> Result<()> {
    // Preflight Input Monitoring permission.
    if !input_monitoring_ok() {
        warn!("input_monitoring_permission_missing");
        return Err(Error::PermissionDenied("Input Monitoring"));
    }

    debug!("creating_event_tap");
    let tap = match cge::CGEventTap::new(
        cge::CGEventTapLocation::Session,
        cge::CGEventTapPlacement::HeadInsertEventTap,
        cge::CGEventTapOptions::Default,
        vec![
            cge::CGEventType::KeyDown,
            cge::CGEventType::KeyUp,
            cge::CGEventType::FlagsChanged,
            cge::CGEventType::LeftMouseDown,
            cge::CGEventType::LeftMouseUp,
            cge::CGEventType::RightMouseDown,
            cge::CGEventType::RightMouseUp,
            cge::CGEventType::OtherMouseDown,
            cge::CGEventType::OtherMouseUp,
        ],
        move |_proxy, etype, event| match etype {
            cge::CGEventType::KeyDown | cge::CGEventType::KeyUp => {
                let code = event.get_integer_value_field(FIELD_KEYBOARD_EVENT_KEYCODE) as u32;
                let transition = if matches!(etype, cge::CGEventType::KeyDown) {
                    Transition::Down
                } else {
                    Transition::Up
                };
                let decision = session.decide(DeviceClass::Keyboard, transition, code, Aux::None);
                if decision.is_block() {
                    CallbackResult::Drop
                } else {
                    CallbackResult::Keep
                }
            }
            cge::CGEventType::FlagsChanged => {
                if !modifier_events {
                    return CallbackResult::Keep;
                }
                let code = event.get_integer_value_field(FIELD_KEYBOARD_EVENT_KEYCODE) as u32;
                let transition = if modifier_is_down(code, event.get_flags()) {
                    Transition::Down
                } else {
                    Transition::Up
                };
                let decision = session.decide(DeviceClass::Keyboard, transition, code, Aux::None);
                if decision.is_block() {
                    CallbackResult::Drop
                } else {
                    CallbackResult::Keep
                }
            }
            cge::CGEventType::LeftMouseDown
            | cge::CGEventType::LeftMouseUp
            | cge::CGEventType::RightMouseDown
            | cge::CGEventType::RightMouseUp
            | cge::CGEventType::OtherMouseDown
            | cge::CGEventType::OtherMouseUp => {
                let button = event.get_integer_value_field(FIELD_MOUSE_EVENT_BUTTON_NUMBER) as u32;
                let transition = if matches!(
                    etype,
                    cge::CGEventType::LeftMouseDown
                        | cge::CGEventType::RightMouseDown
                        | cge::CGEventType::OtherMouseDown
                ) {
                    Transition::Down
                } else {
                    Transition::Up
                };
                let loc = event.location();
                let decision = session.decide(
                    DeviceClass::Mouse,
                    transition,
                    button,
                    Aux::Pointer { x: loc.x, y: loc.y },
                );
                if decision.is_block() {
                    CallbackResult::Drop
                } else {
                    CallbackResult::Keep
                }
            }
            cge::CGEventType::TapDisabledByTimeout | cge::CGEventType::TapDisabledByUserInput => {
                // Informational, not fatal: the arbiter's own deadline should
                // make this unreachable, and the OS may or may not re-enable
                // the tap on its own.
                warn!("hook_disabled_by_os");
                CallbackResult::Keep
            }
            _ => CallbackResult::Keep,
        },
    ) {
        Ok(t) => t,
        Err(_) => {
            warn!("event_tap_create_failed");
            return Err(Error::EventTapStart);
        }
    };

    // Create a runloop source and start the tap on this thread's runloop.
    let source = match tap.mach_port().create_runloop_source(0) {
        Ok(s) => s,
        Err(_) => {
            warn!("run_loop_source_create_failed");
            return Err(Error::EventTapStart);
        }
    };

    let rl = CFRunLoop::get_current();
    let mode = unsafe { kCFRunLoopCommonModes };
    rl.add_source(&source, mode);

    tap.enable();
    debug!("event_tap_started_run_loop");

    CFRunLoop::run_current();

    debug!("event_tap_exited");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_down_tracks_matching_flag() {
        assert!(modifier_is_down(
            VK_LSHIFT,
            CGEventFlags::CGEventFlagShift | CGEventFlags::CGEventFlagNonCoalesced
        ));
        assert!(!modifier_is_down(VK_LSHIFT, CGEventFlags::CGEventFlagNull));
        assert!(modifier_is_down(
            VK_RCOMMAND,
            CGEventFlags::CGEventFlagCommand
        ));
        // A non-modifier keycode never reads as down.
        assert!(!modifier_is_down(0x00, CGEventFlags::CGEventFlagShift));
    }
}
