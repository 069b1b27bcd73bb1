//! Deadline arbitration for hook-callback decisions.
//!
//! At most one request is outstanding at any time: the hook callback blocks
//! in [`Arbiter::await_decision`] until either the host's response arrives
//! or the deadline elapses, and the OS will not deliver the next event until
//! the callback returns. Two resolver threads race to settle each request:
//!
//! - the response resolver calls [`Arbiter::resolve_response`] for every
//!   decoded response line;
//! - the timeout resolver sleeps until each request's deadline and then
//!   calls [`Arbiter::resolve_timeout`].
//!
//! Both run their counter comparison under the same lock, so exactly one of
//! them settles any given request — never zero, never two. The counters also
//! reject a late host reply for an id the timeout already settled, which
//! otherwise could leak into the next request's wait.

use std::{
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, unbounded};
use keygate_protocol::Decision;
use parking_lot::{Condvar, Mutex};
use tracing::trace;

/// State shared between the waiting hook thread and the two resolvers.
#[derive(Debug)]
struct Shared {
    /// Outcome of the most recently settled request.
    decision: Decision,
    /// Highest event id settled by a host response.
    responded: u64,
    /// Number of requests whose deadline has elapsed. Ids are issued
    /// sequentially from 1, so this doubles as the highest timed-out id.
    timed_out: u64,
}

/// Single-outstanding-request deadline arbiter.
pub struct Arbiter {
    /// Resolution state, guarded by one lock for both resolvers.
    shared: Mutex<Shared>,
    /// Signalled exactly once per request by whichever resolver wins.
    ready: Condvar,
    /// Monotonic event id source; first issued id is 1.
    last_id: AtomicU64,
    /// Per-request deadline budget.
    deadline: Duration,
    /// Wakes the timeout resolver with each request's absolute deadline.
    deadline_tx: Sender<Instant>,
}

/// Receiving end of the deadline queue, consumed by [`timeout_loop`].
pub struct Deadlines(Receiver<Instant>);

impl Arbiter {
    /// Create an arbiter with the standard [`crate::DEADLINE`].
    pub fn new() -> (Arc<Self>, Deadlines) {
        Self::with_deadline(crate::DEADLINE)
    }

    /// Create an arbiter with a custom deadline (tests).
    pub fn with_deadline(deadline: Duration) -> (Arc<Self>, Deadlines) {
        let (deadline_tx, deadline_rx) = unbounded();
        let arbiter = Arc::new(Self {
            shared: Mutex::new(Shared {
                decision: Decision::Propagate,
                responded: 0,
                timed_out: 0,
            }),
            ready: Condvar::new(),
            last_id: AtomicU64::new(0),
            deadline,
            deadline_tx,
        });
        (arbiter, Deadlines(deadline_rx))
    }

    /// Allocate the next event id. Ids start at 1 and never repeat within a
    /// session.
    pub fn next_id(&self) -> u64 {
        self.last_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Block until request `id` is settled and return its decision.
    ///
    /// Arms the timeout resolver first, so the request resolves even if the
    /// host never writes a response. Must be called with the id most
    /// recently returned by [`Arbiter::next_id`], after the request line has
    /// been written.
    pub fn await_decision(&self, id: u64) -> Decision {
        let _ = self.deadline_tx.send(Instant::now() + self.deadline);

        let mut shared = self.shared.lock();
        while shared.responded < id && shared.timed_out < id {
            self.ready.wait(&mut shared);
        }
        shared.decision
    }

    /// Record a host response for `id`. Returns true if this response
    /// settled the request, false if it was stale and discarded.
    pub fn resolve_response(&self, id: u64, decision: Decision) -> bool {
        let mut shared = self.shared.lock();
        if shared.timed_out >= id {
            trace!(id, "stale_response_discarded");
            return false;
        }
        shared.decision = decision;
        shared.responded = id;
        self.ready.notify_one();
        true
    }

    /// Record that one request's deadline has elapsed. Returns true if the
    /// timeout settled the request (forcing fail-open), false if a host
    /// response had already won.
    pub fn resolve_timeout(&self) -> bool {
        let mut shared = self.shared.lock();
        shared.timed_out += 1;
        if shared.responded >= shared.timed_out {
            return false;
        }
        shared.decision = Decision::Propagate;
        self.ready.notify_one();
        true
    }
}

/// Timeout resolver: sleep until each armed deadline, then settle the
/// request if the host has not.
///
/// Holds only a weak reference so dropping the arbiter (which owns the
/// sending half of the deadline queue) lets the loop terminate.
pub fn timeout_loop(arbiter: &Weak<Arbiter>, deadlines: Deadlines) {
    for deadline in deadlines.0 {
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
        let Some(arbiter) = arbiter.upgrade() else {
            break;
        };
        if arbiter.resolve_timeout() {
            trace!("request_timed_out_failing_open");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(25);

    #[test]
    fn ids_start_at_one_and_increase() {
        let (arbiter, _deadlines) = Arbiter::with_deadline(SHORT);
        assert_eq!(arbiter.next_id(), 1);
        assert_eq!(arbiter.next_id(), 2);
        assert_eq!(arbiter.next_id(), 3);
    }

    #[test]
    fn response_before_timeout_wins() {
        let (arbiter, _deadlines) = Arbiter::with_deadline(SHORT);
        let id = arbiter.next_id();
        assert!(arbiter.resolve_response(id, Decision::Block));
        // The loser fires later and must not override.
        assert!(!arbiter.resolve_timeout());
        assert_eq!(arbiter.await_decision(id), Decision::Block);
    }

    #[test]
    fn timeout_before_response_fails_open() {
        let (arbiter, _deadlines) = Arbiter::with_deadline(SHORT);
        let id = arbiter.next_id();
        assert!(arbiter.resolve_timeout());
        // The host's late answer is stale, even if it wanted to block.
        assert!(!arbiter.resolve_response(id, Decision::Block));
        assert_eq!(arbiter.await_decision(id), Decision::Propagate);
    }

    #[test]
    fn exactly_one_resolver_settles_each_request() {
        let (arbiter, _deadlines) = Arbiter::with_deadline(SHORT);
        for round in 0..100u64 {
            let id = arbiter.next_id();
            let (first, second) = if round % 2 == 0 {
                (
                    arbiter.resolve_response(id, Decision::Block),
                    arbiter.resolve_timeout(),
                )
            } else {
                (
                    arbiter.resolve_timeout(),
                    arbiter.resolve_response(id, Decision::Block),
                )
            };
            assert!(first ^ second, "exactly one resolver must fire");
        }
    }

    #[test]
    fn stale_response_cannot_settle_a_later_request() {
        let (arbiter, _deadlines) = Arbiter::with_deadline(SHORT);
        let first = arbiter.next_id();
        assert!(arbiter.resolve_timeout());
        assert_eq!(arbiter.await_decision(first), Decision::Propagate);

        // Late reply for the timed-out id arrives after the next request
        // has started; it must not settle it.
        let second = arbiter.next_id();
        assert!(!arbiter.resolve_response(first, Decision::Block));

        assert!(arbiter.resolve_response(second, Decision::Block));
        assert_eq!(arbiter.await_decision(second), Decision::Block);
    }

    #[test]
    fn threaded_response_within_deadline() {
        let (arbiter, deadlines) = Arbiter::with_deadline(Duration::from_millis(200));
        let weak = Arc::downgrade(&arbiter);
        let timeouts = thread::spawn(move || timeout_loop(&weak, deadlines));

        let id = arbiter.next_id();
        let responder = {
            let arbiter = arbiter.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                arbiter.resolve_response(id, Decision::Block)
            })
        };

        assert_eq!(arbiter.await_decision(id), Decision::Block);
        assert!(responder.join().unwrap());

        drop(arbiter);
        timeouts.join().unwrap();
    }

    #[test]
    fn threaded_timeout_when_host_is_silent() {
        let (arbiter, deadlines) = Arbiter::with_deadline(SHORT);
        let weak = Arc::downgrade(&arbiter);
        let timeouts = thread::spawn(move || timeout_loop(&weak, deadlines));

        let start = Instant::now();
        let id = arbiter.next_id();
        assert_eq!(arbiter.await_decision(id), Decision::Propagate);
        assert!(start.elapsed() >= SHORT);

        drop(arbiter);
        timeouts.join().unwrap();
    }
}
