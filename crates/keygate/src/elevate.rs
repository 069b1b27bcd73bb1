//! Executable-bit remediation for failed engine spawns.
//!
//! When the engine binary exists but lost its execute permission (a common
//! casualty of archive extraction), the supervisor repairs it once and
//! retries the spawn. The repair itself is a seam: hosts that need an
//! elevation prompt can substitute their own implementation.

use std::{io, path::Path};

/// Privilege-elevation collaborator invoked on a permission-denied spawn.
pub trait ExecRepair: Send + Sync {
    /// Make `path` executable for the current user.
    fn make_executable(&self, path: &Path) -> io::Result<()>;
}

/// Default repair: set the executable bits directly, no elevation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChmodRepair;

impl ExecRepair for ChmodRepair {
    #[cfg(unix)]
    fn make_executable(&self, path: &Path) -> io::Result<()> {
        use std::{fs, os::unix::fs::PermissionsExt};

        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(perms.mode() | 0o755);
        fs::set_permissions(path, perms)
    }

    #[cfg(not(unix))]
    fn make_executable(&self, _path: &Path) -> io::Result<()> {
        // Execute permission is not a distinct bit elsewhere.
        Ok(())
    }
}
