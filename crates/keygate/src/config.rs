//! Host-side engine configuration.

use std::{env, fmt, path::PathBuf, sync::Arc, time::Duration};

/// Callback receiving the engine's informational stderr lines, verbatim.
pub type InfoCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Callback receiving fatal engine failures: the process exit code for a
/// crash, or `None` when the engine could not be spawned at all (or exited
/// on a signal).
pub type ErrorCallback = Arc<dyn Fn(Option<i32>) + Send + Sync>;

/// Default delay between the last listener's removal and the engine stop.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_millis(100);

/// Environment variable overriding the engine binary location.
const ENGINE_PATH_ENV: &str = "KEYGATE_ENGINE";

/// Name of the engine binary searched for next to the current executable.
const ENGINE_BIN: &str = "keygate-engine";

/// Per-host configuration for running a capture engine.
#[derive(Clone)]
pub struct EngineConfig {
    /// Explicit path to the engine binary; overrides env and the default
    /// sibling lookup.
    pub engine_path: Option<PathBuf>,
    /// Whether modifier flag changes are synthesized as capturable events
    /// (macOS). Default on.
    pub modifier_events: bool,
    /// Delay before the engine stops after the last listener is removed.
    /// Re-registering within this window keeps the process alive.
    pub stop_grace: Duration,
    /// Receives informational lines from the engine's stderr.
    pub on_info: Option<InfoCallback>,
    /// Receives spawn failures and crash exit codes.
    pub on_error: Option<ErrorCallback>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_path: None,
            modifier_events: true,
            stop_grace: DEFAULT_STOP_GRACE,
            on_info: None,
            on_error: None,
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("engine_path", &self.engine_path)
            .field("modifier_events", &self.modifier_events)
            .field("stop_grace", &self.stop_grace)
            .field("on_info", &self.on_info.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl EngineConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit engine binary path.
    pub fn with_engine_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.engine_path = Some(path.into());
        self
    }

    /// Disable synthesized modifier transitions.
    pub fn without_modifier_events(mut self) -> Self {
        self.modifier_events = false;
        self
    }

    /// Override the stop grace delay.
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    /// Install the informational callback.
    pub fn with_on_info(mut self, cb: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.on_info = Some(Arc::new(cb));
        self
    }

    /// Install the error callback.
    pub fn with_on_error(mut self, cb: impl Fn(Option<i32>) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(cb));
        self
    }

    /// Resolve the engine binary to launch: explicit override, then the
    /// `KEYGATE_ENGINE` environment variable, then a `keygate-engine`
    /// binary next to the current executable.
    pub fn resolve_engine_path(&self) -> PathBuf {
        if let Some(path) = &self.engine_path {
            return path.clone();
        }
        if let Ok(path) = env::var(ENGINE_PATH_ENV) {
            return PathBuf::from(path);
        }
        env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(ENGINE_BIN)))
            .unwrap_or_else(|| PathBuf::from(ENGINE_BIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let config = EngineConfig::new().with_engine_path("/opt/engines/keygate-engine");
        assert_eq!(
            config.resolve_engine_path(),
            PathBuf::from("/opt/engines/keygate-engine")
        );
    }

    #[test]
    fn default_resolves_next_to_current_exe() {
        let config = EngineConfig::new();
        let resolved = config.resolve_engine_path();
        assert!(resolved.to_string_lossy().ends_with(ENGINE_BIN));
    }
}
