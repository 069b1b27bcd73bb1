//! Registry lifecycle over a mock backend: the engine starts with the
//! first listener, stops only after the grace delay, and re-registration
//! within the window cancels the pending stop without a restart.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use keygate::{EngineBackend, GlobalInputListener, Listener, ListenerOutcome, Result};

/// Records lifecycle calls without touching any process.
#[derive(Clone, Default)]
struct MockBackend {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

#[async_trait]
impl EngineBackend for MockBackend {
    async fn start(&mut self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

const GRACE: Duration = Duration::from_millis(100);

fn noop() -> Listener {
    Box::new(|_, _| ListenerOutcome::Continue)
}

#[tokio::test(start_paused = true)]
async fn first_listener_starts_the_engine_once() {
    let mock = MockBackend::default();
    let gate = GlobalInputListener::with_backend(Box::new(mock.clone()), GRACE);
    assert_eq!(mock.starts.load(Ordering::SeqCst), 0);

    gate.add_listener(noop()).await.unwrap();
    gate.add_listener(noop()).await.unwrap();

    assert_eq!(mock.starts.load(Ordering::SeqCst), 1);
    assert_eq!(gate.listener_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn readd_within_grace_avoids_stop_and_restart() {
    let mock = MockBackend::default();
    let gate = GlobalInputListener::with_backend(Box::new(mock.clone()), GRACE);

    let id = gate.add_listener(noop()).await.unwrap();
    assert!(gate.remove_listener(id));

    // Come back well inside the grace window.
    tokio::time::sleep(GRACE / 4).await;
    gate.add_listener(noop()).await.unwrap();

    // Let any (incorrectly surviving) delayed stop fire.
    tokio::time::sleep(GRACE * 3).await;

    assert_eq!(mock.stops.load(Ordering::SeqCst), 0, "no stop observed");
    assert_eq!(mock.starts.load(Ordering::SeqCst), 1, "no restart observed");
}

#[tokio::test(start_paused = true)]
async fn last_removal_stops_after_the_grace_delay() {
    let mock = MockBackend::default();
    let gate = GlobalInputListener::with_backend(Box::new(mock.clone()), GRACE);

    let id = gate.add_listener(noop()).await.unwrap();
    assert!(gate.remove_listener(id));

    // Not yet: the grace window is still open.
    tokio::time::sleep(GRACE / 4).await;
    assert_eq!(mock.stops.load(Ordering::SeqCst), 0);

    tokio::time::sleep(GRACE * 3).await;
    assert_eq!(mock.stops.load(Ordering::SeqCst), 1);

    // A fresh registration after the stop starts the engine again.
    gate.add_listener(noop()).await.unwrap();
    assert_eq!(mock.starts.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn removing_an_unknown_id_changes_nothing() {
    let mock = MockBackend::default();
    let gate = GlobalInputListener::with_backend(Box::new(mock.clone()), GRACE);

    let id = gate.add_listener(noop()).await.unwrap();
    assert!(gate.remove_listener(id));
    assert!(!gate.remove_listener(id));

    tokio::time::sleep(GRACE * 3).await;
    // Only the genuine removal scheduled a stop.
    assert_eq!(mock.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_clears_listeners_and_stops_immediately() {
    let mock = MockBackend::default();
    let gate = GlobalInputListener::with_backend(Box::new(mock.clone()), GRACE);

    gate.add_listener(noop()).await.unwrap();
    gate.shutdown().await;

    assert_eq!(gate.listener_count(), 0);
    assert_eq!(mock.stops.load(Ordering::SeqCst), 1);
}
