//! Error types and result alias for the keygate host crate.
use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Error variants produced by the host side.
#[derive(Error, Debug)]
pub enum Error {
    /// The engine binary could not be spawned, after remediation where
    /// applicable.
    #[error("Engine spawn failed: {0}")]
    Spawn(#[source] io::Error),

    /// The spawned engine did not expose the expected stdio pipes.
    #[error("Engine stdio unavailable")]
    StdioUnavailable,

    /// I/O failure talking to the engine.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
