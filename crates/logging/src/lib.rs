#![warn(missing_docs)]

//! Shared logging helpers, CLI argument definitions, and tracing utilities
//! for the keygate workspace.
//!
//! The capture engine's stdout carries the wire protocol, so every binary in
//! this workspace logs to stderr. [`init_subscriber`] enforces that.

use std::env;

use clap::Args;
use tracing_subscriber::EnvFilter;

/// Logging controls for CLI apps.
#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Set global log level to trace (our crates only)
    #[arg(long, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Set global log level to debug (our crates only)
    #[arg(long, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Set a single global log level for our crates (error|warn|info|debug|trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Set an explicit tracing filter directive (overrides other flags)
    /// e.g. "keygate_engine=trace,keygate=debug"
    #[arg(long)]
    pub log_filter: Option<String>,
}

impl LogArgs {
    /// Compute the filter spec this set of flags selects.
    pub fn spec(&self) -> String {
        compute_spec(
            self.trace,
            self.debug,
            self.log_level.as_deref(),
            self.log_filter.as_deref(),
        )
    }
}

/// List of crate targets that constitute "our" logs.
pub fn our_crates() -> &'static [&'static str] {
    &[
        // Host and engine
        "keygate",
        "keygate_engine",
        "keygate_protocol",
        // Utilities
        "keycode",
        "dumpinput",
        "logging",
    ]
}

/// Build a filter directive string that sets the same `level` for all of our
/// crates.
pub fn level_spec_for(level: &str) -> String {
    let lvl = level.to_ascii_lowercase();
    let parts: Vec<String> = our_crates()
        .iter()
        .map(|t| format!("{}={}", t, lvl))
        .collect();
    parts.join(",")
}

/// Compute the final filter spec string with precedence:
/// - `log_filter`
/// - `trace`/`debug`/`log_level` (crate-scoped)
/// - `RUST_LOG` env
/// - default to crate-scoped `info`
pub fn compute_spec(
    trace: bool,
    debug: bool,
    log_level: Option<&str>,
    log_filter: Option<&str>,
) -> String {
    if let Some(spec) = log_filter {
        return spec.to_string();
    }
    if trace {
        return level_spec_for("trace");
    }
    if debug {
        return level_spec_for("debug");
    }
    if let Some(lvl) = log_level {
        return level_spec_for(lvl);
    }
    if let Ok(spec) = env::var("RUST_LOG") {
        spec
    } else {
        level_spec_for("info")
    }
}

/// Create an `EnvFilter` from a spec string.
pub fn env_filter_from_spec(spec: &str) -> EnvFilter {
    EnvFilter::new(spec)
}

/// Return the `RUST_LOG` value to use for child processes.
///
/// If the environment already specifies `RUST_LOG`, return that; otherwise
/// return a default crate-scoped `info` configuration.
pub fn log_config_for_child() -> String {
    env::var("RUST_LOG").unwrap_or_else(|_| level_spec_for("info"))
}

/// Install a global fmt subscriber writing to stderr.
///
/// Stdout is reserved for the wire protocol in engine processes, and keeping
/// host binaries consistent costs nothing. Safe to call once per process.
pub fn init_subscriber(spec: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter_from_spec(spec))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins() {
        let spec = compute_spec(true, false, Some("warn"), Some("keygate=trace"));
        assert_eq!(spec, "keygate=trace");
    }

    #[test]
    fn level_spec_covers_all_crates() {
        let spec = level_spec_for("debug");
        for name in our_crates() {
            assert!(spec.contains(&format!("{name}=debug")));
        }
    }
}
