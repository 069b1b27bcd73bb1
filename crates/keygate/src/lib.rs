//! keygate: host-side global input listening.
//!
//! The host spawns the privileged capture engine, receives one request line
//! per global keyboard/mouse event, runs its listener chain to decide
//! whether the event may reach the rest of the OS, and answers within the
//! engine's deadline. A listener that stalls doesn't wedge the system — the
//! engine fails open for that event — but its decision is then moot, so
//! listeners must stay fast and synchronous.
//!
//! ```no_run
//! use keygate::{EngineConfig, GlobalInputListener, ListenerOutcome};
//!
//! # async fn demo() -> keygate::Result<()> {
//! let gate = GlobalInputListener::new(EngineConfig::default());
//! gate.add_listener(Box::new(|event, keys| {
//!     // Swallow A-down while shift is held; everything else passes.
//!     ListenerOutcome::from(event.code == 0x00 && keys.is_down("LEFT SHIFT"))
//! }))
//! .await?;
//! # Ok(())
//! # }
//! ```
//!
//! The engine process starts when the first listener is registered and
//! stops shortly after the last one is removed (the grace delay avoids
//! restart churn for rapid remove/add sequences). Key state lives as long
//! as this registry, deliberately surviving engine crashes and restarts
//! within one host session.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use tracing::debug;

mod config;
mod dispatch;
mod elevate;
mod error;
mod key_state;
mod listener;
mod process;
mod supervisor;

pub use config::{DEFAULT_STOP_GRACE, EngineConfig, ErrorCallback, InfoCallback};
pub use dispatch::{DispatchChain, canonical_name};
pub use elevate::{ChmodRepair, ExecRepair};
pub use error::{Error, Result};
pub use key_state::KeyStateMap;
// Re-export the shared protocol types listeners see.
pub use keygate_protocol::{Aux, Decision, DeviceClass, InputEvent, Transition};
pub use listener::{Listener, ListenerId, ListenerOutcome};
pub use supervisor::{EngineBackend, Supervisor};

/// Shared state behind a [`GlobalInputListener`] and its scheduled tasks.
struct Inner {
    /// Listener chain plus key state; consulted by the supervisor's request
    /// loop.
    chain: Arc<Mutex<DispatchChain>>,
    /// Engine lifecycle backend.
    backend: tokio::sync::Mutex<Box<dyn EngineBackend>>,
    /// Whether the engine is currently up, as far as the registry knows.
    active: AtomicBool,
    /// Bumped on every registration change; a pending delayed stop only
    /// fires if the epoch it captured is still current.
    epoch: AtomicU64,
    /// Delay between last-listener removal and engine stop.
    grace: Duration,
}

/// The listener registry: the public entry point of the host side.
///
/// Cheap to clone; clones share the same chain, key state and engine. All
/// methods must run inside a tokio runtime — the supervisor's I/O tasks and
/// the delayed stop are spawned on it.
#[derive(Clone)]
pub struct GlobalInputListener {
    /// Shared state.
    inner: Arc<Inner>,
}

impl GlobalInputListener {
    /// Create a registry driving a real engine process per `config`.
    pub fn new(config: EngineConfig) -> Self {
        let chain = Arc::new(Mutex::new(DispatchChain::new()));
        let grace = config.stop_grace;
        let backend = Supervisor::new(chain.clone(), config);
        Self::from_parts(chain, Box::new(backend), grace)
    }

    /// Create a registry over a custom backend (tests, embedding).
    pub fn with_backend(backend: Box<dyn EngineBackend>, grace: Duration) -> Self {
        let chain = Arc::new(Mutex::new(DispatchChain::new()));
        Self::from_parts(chain, backend, grace)
    }

    /// Assemble from parts.
    fn from_parts(
        chain: Arc<Mutex<DispatchChain>>,
        backend: Box<dyn EngineBackend>,
        grace: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                chain,
                backend: tokio::sync::Mutex::new(backend),
                active: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                grace,
            }),
        }
    }

    /// Register a listener. Starting the engine when needed happens here,
    /// so the first registration is where spawn failures surface; the
    /// listener stays registered either way and a later registration
    /// retries the start.
    pub async fn add_listener(&self, listener: Listener) -> Result<ListenerId> {
        let id = self.inner.chain.lock().add(listener);
        // Any pending delayed stop is now obsolete.
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);

        if !self.inner.active.load(Ordering::SeqCst) {
            let mut backend = self.inner.backend.lock().await;
            backend.start().await?;
            self.inner.active.store(true, Ordering::SeqCst);
        }
        Ok(id)
    }

    /// Remove a listener. When the last one goes, the engine stop is
    /// scheduled after the grace delay rather than executed immediately;
    /// re-registering within the window cancels it.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let (removed, now_empty) = {
            let mut chain = self.inner.chain.lock();
            let removed = chain.remove(id);
            (removed, chain.is_empty())
        };
        if removed && now_empty {
            self.schedule_stop();
        }
        removed
    }

    /// Schedule the delayed engine stop for the current epoch.
    fn schedule_stop(&self) {
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.grace).await;
            if inner.epoch.load(Ordering::SeqCst) != epoch || !inner.chain.lock().is_empty() {
                debug!("Delayed engine stop cancelled by re-registration");
                return;
            }
            let mut backend = inner.backend.lock().await;
            // Re-check now that we hold the backend: a registration may have
            // raced us to the lock.
            if inner.epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            backend.stop().await;
            inner.active.store(false, Ordering::SeqCst);
        });
    }

    /// Drop all listeners and stop the engine immediately.
    pub async fn shutdown(&self) {
        self.inner.chain.lock().clear();
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        let mut backend = self.inner.backend.lock().await;
        backend.stop().await;
        self.inner.active.store(false, Ordering::SeqCst);
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.chain.lock().len()
    }

    /// Whether a key is currently held, by canonical name.
    pub fn is_down(&self, name: &str) -> bool {
        self.inner.chain.lock().key_state().is_down(name)
    }

    /// Names of all currently held keys.
    pub fn pressed_keys(&self) -> Vec<String> {
        self.inner
            .chain
            .lock()
            .key_state()
            .pressed()
            .map(str::to_owned)
            .collect()
    }
}
