//! Engine OS-process handling: spawn configuration and termination.

use std::{io, path::PathBuf, process::Stdio, time::Duration};

use tokio::{
    process::{Child, ChildStderr, ChildStdin, ChildStdout, Command},
    time::timeout,
};
use tracing::{debug, info, warn};

/// Time to wait for graceful shutdown after SIGTERM before escalating.
const TERM_WAIT_TIMEOUT_MS: u64 = 300;

#[cfg(unix)]
#[inline]
fn send_sigterm(pid: libc::pid_t) {
    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }
}

/// Configuration for launching a capture engine process.
#[derive(Debug, Clone)]
pub(crate) struct ProcessConfig {
    /// Path to the executable.
    pub executable: PathBuf,
    /// Arguments to pass to the engine.
    pub args: Vec<String>,
    /// Environment variables to set.
    pub env: Vec<(String, String)>,
}

impl ProcessConfig {
    /// Create a new process configuration with the given executable.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }
}

/// A spawned engine process with its wire streams attached.
pub(crate) struct EngineProcess {
    /// The child handle.
    child: Child,
    /// Pid captured at spawn, for signalling.
    pid: Option<u32>,
}

impl EngineProcess {
    /// Spawn the engine with piped stdio.
    ///
    /// Errors are returned raw so the caller can distinguish a
    /// permission-denied spawn (remediable) from anything else.
    pub fn spawn(config: &ProcessConfig) -> io::Result<Self> {
        info!("Starting engine process: {:?}", config.executable);
        debug!("Engine args: {:?}", config.args);

        let mut command = Command::new(&config.executable);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &config.env {
            command.env(key, value);
        }

        let child = command.spawn()?;
        let pid = child.id();
        info!("Engine process spawned with PID: {:?}", pid);

        Ok(Self { child, pid })
    }

    /// Take the three wire streams. Each can be taken once.
    pub fn take_stdio(&mut self) -> Option<(ChildStdin, ChildStdout, ChildStderr)> {
        let stdin = self.child.stdin.take()?;
        let stdout = self.child.stdout.take()?;
        let stderr = self.child.stderr.take()?;
        Some((stdin, stdout, stderr))
    }

    /// Wait for the process to exit on its own.
    pub async fn wait(&mut self) -> io::Result<std::process::ExitStatus> {
        self.child.wait().await
    }

    /// Terminate the process: SIGTERM, a short grace window, then SIGKILL.
    pub async fn terminate(&mut self) {
        #[cfg(unix)]
        if let Some(pid) = self.pid {
            send_sigterm(pid as libc::pid_t);
            let grace = Duration::from_millis(TERM_WAIT_TIMEOUT_MS);
            if let Ok(Ok(status)) = timeout(grace, self.child.wait()).await {
                info!("Engine process exited gracefully: {:?}", status);
                return;
            }
            warn!("Graceful stop timed out; escalating to SIGKILL");
        }

        if let Err(e) = self.child.start_kill() {
            warn!("Failed to kill engine process: {}", e);
        }
        match self.child.wait().await {
            Ok(status) => info!("Engine process killed: {:?}", status),
            Err(e) => warn!("Failed to wait for killed process: {}", e),
        }
    }
}
