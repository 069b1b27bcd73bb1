//! Wire plumbing between the hook callback and the host process.
//!
//! Requests go out on the engine's stdout, responses come back on stdin;
//! stderr stays free for logs. [`Session`] is what the hook callback talks
//! to: one call per captured event, returning the settled decision.

use std::{
    io::{BufRead, Write},
    sync::Arc,
};

use keygate_protocol::{Aux, Decision, DeviceClass, InputEvent, Transition};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::Arbiter;

/// One engine session: an arbiter plus the request writer.
///
/// Only the hook-callback thread calls [`Session::decide`], and it blocks
/// until the decision settles, so at most one request is ever in flight.
pub struct Session<W: Write> {
    /// Shared arbitration core.
    arbiter: Arc<Arbiter>,
    /// Request stream to the host (the engine's stdout).
    out: Mutex<W>,
}

impl<W: Write> Session<W> {
    /// Create a session writing requests to `out`.
    pub fn new(arbiter: Arc<Arbiter>, out: W) -> Self {
        Self {
            arbiter,
            out: Mutex::new(out),
        }
    }

    /// Ask the host whether to block one captured event.
    ///
    /// Emits the request line and blocks until the host answers or the
    /// deadline elapses. All failure modes resolve to
    /// [`Decision::Propagate`]: a write error means the host is gone, and
    /// the armed timeout still settles the request so the id sequence stays
    /// aligned with the timeout counter.
    pub fn decide(
        &self,
        device: DeviceClass,
        transition: Transition,
        code: u32,
        aux: Aux,
    ) -> Decision {
        let event_id = self.arbiter.next_id();
        let event = InputEvent {
            device,
            transition,
            code,
            aux,
            event_id,
        };

        {
            let mut out = self.out.lock();
            let res = out
                .write_all(event.encode().as_bytes())
                .and_then(|()| out.flush());
            if let Err(e) = res {
                debug!(error = %e, event_id, "request_write_failed");
            }
        }

        trace!(event_id, code, "awaiting_decision");
        self.arbiter.await_decision(event_id)
    }
}

/// Response resolver: decode each response line from the host and hand it
/// to the arbiter. Malformed lines are dropped without a response — the
/// starved request then resolves via its timeout. Returns on EOF, which
/// just means the host has gone away; the engine keeps running (and failing
/// open) until it is killed.
pub fn response_reader_loop<R: BufRead>(arbiter: &Arbiter, reader: R) {
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        match Decision::decode_response(line) {
            Ok((decision, id)) => {
                if arbiter.resolve_response(id, decision) {
                    trace!(id, ?decision, "response_settled");
                }
            }
            Err(e) => debug!(error = %e, "malformed_response_dropped"),
        }
    }
    debug!("response_stream_closed");
}
