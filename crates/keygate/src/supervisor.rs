//! Process supervisor: owns the capture engine's lifecycle from the host
//! side and pumps the arbitration protocol.
//!
//! One supervisor manages at most one engine process. Its request loop
//! answers every decoded request with exactly one id-tagged response line;
//! anything the engine had in flight when the host stops resolves on the
//! engine side via its own timeout, fail-open, so stop is a plain kill with
//! no drain.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    ChmodRepair, DispatchChain, EngineConfig, Error, ExecRepair, Result,
    config::{ErrorCallback, InfoCallback},
    process::{EngineProcess, ProcessConfig},
};

/// Engine lifecycle seam used by the listener registry.
///
/// The real implementation is [`Supervisor`]; tests substitute a recording
/// mock to exercise registry lifecycle logic without processes.
#[async_trait]
pub trait EngineBackend: Send {
    /// Ensure an engine is running. Idempotent: a running engine is left
    /// alone, so re-registration within the stop grace window never
    /// restarts the process.
    async fn start(&mut self) -> Result<()>;

    /// Stop the engine if running.
    async fn stop(&mut self);
}

/// Supervises one capture engine process.
pub struct Supervisor {
    /// Dispatch chain consulted for every request.
    chain: Arc<Mutex<DispatchChain>>,
    /// Host configuration (paths, flags, callbacks).
    config: EngineConfig,
    /// Spawn remediation collaborator.
    repair: Arc<dyn ExecRepair>,
    /// Set while a deliberate stop is in progress; suppresses crash
    /// reporting.
    stopping: Arc<AtomicBool>,
    /// Cancels the exit watcher, triggering termination.
    cancel: Option<CancellationToken>,
    /// Request/response pump task.
    io_task: Option<JoinHandle<()>>,
    /// Stderr forwarding task.
    info_task: Option<JoinHandle<()>>,
    /// Exit watcher task; completes once the process is gone.
    wait_task: Option<JoinHandle<()>>,
    /// Whether an engine is currently managed.
    running: bool,
}

impl Supervisor {
    /// Create a supervisor over `chain` with the default remediation.
    pub fn new(chain: Arc<Mutex<DispatchChain>>, config: EngineConfig) -> Self {
        Self::with_repair(chain, config, Arc::new(ChmodRepair))
    }

    /// Create a supervisor with a custom remediation collaborator.
    pub fn with_repair(
        chain: Arc<Mutex<DispatchChain>>,
        config: EngineConfig,
        repair: Arc<dyn ExecRepair>,
    ) -> Self {
        Self {
            chain,
            config,
            repair,
            stopping: Arc::new(AtomicBool::new(false)),
            cancel: None,
            io_task: None,
            info_task: None,
            wait_task: None,
            running: false,
        }
    }

    /// Report a fatal failure through the error callback, if installed.
    fn report_error(&self, code: Option<i32>) {
        if let Some(cb) = &self.config.on_error {
            cb(code);
        }
    }

    /// Spawn the engine, remediating a permission-denied failure once.
    fn spawn_engine(&self, pcfg: &ProcessConfig) -> Result<EngineProcess> {
        match EngineProcess::spawn(pcfg) {
            Ok(proc) => Ok(proc),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                warn!("Engine not executable; attempting repair and one retry");
                self.repair
                    .make_executable(&pcfg.executable)
                    .map_err(Error::Io)?;
                EngineProcess::spawn(pcfg).map_err(Error::Spawn)
            }
            Err(e) => Err(Error::Spawn(e)),
        }
    }
}

#[async_trait]
impl EngineBackend for Supervisor {
    async fn start(&mut self) -> Result<()> {
        if self.running {
            debug!("Engine already running; start is a no-op");
            return Ok(());
        }

        let executable = self.config.resolve_engine_path();
        let mut pcfg = ProcessConfig::new(&executable);
        if !self.config.modifier_events {
            pcfg.args.push("--no-modifier-events".to_string());
        }
        pcfg.env
            .push(("RUST_LOG".to_string(), logging::log_config_for_child()));

        let mut proc = match self.spawn_engine(&pcfg) {
            Ok(proc) => proc,
            Err(e) => {
                warn!("Engine spawn failed: {}", e);
                self.report_error(None);
                return Err(e);
            }
        };

        let (stdin, stdout, stderr) = proc.take_stdio().ok_or(Error::StdioUnavailable)?;
        self.stopping.store(false, Ordering::SeqCst);

        // Request pump: decode requests, run the dispatch chain, answer
        // each with one id-tagged response line.
        self.io_task = Some(tokio::spawn(request_loop(
            self.chain.clone(),
            stdin,
            stdout,
        )));

        // Informational side channel: stderr lines forwarded verbatim.
        let on_info = self.config.on_info.clone();
        self.info_task = Some(tokio::spawn(info_loop(stderr, on_info)));

        // Exit watcher: reports a crash unless the exit was deliberate.
        let token = CancellationToken::new();
        self.cancel = Some(token.clone());
        let stopping = self.stopping.clone();
        let on_error = self.config.on_error.clone();
        self.wait_task = Some(tokio::spawn(async move {
            exit_watch(proc, token, stopping, on_error).await;
        }));

        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) {
        if !self.running {
            return;
        }
        info!("Stopping engine process");
        self.stopping.store(true, Ordering::SeqCst);

        // Pause reads first so no further requests are answered.
        if let Some(io) = self.io_task.take() {
            io.abort();
        }
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        if let Some(wait) = self.wait_task.take() {
            let _ = wait.await;
        }
        // Drain remaining stderr briefly; an inherited pipe (e.g. an engine
        // grandchild) must not be able to wedge stop.
        if let Some(mut info) = self.info_task.take() {
            let drain = Duration::from_millis(500);
            if tokio::time::timeout(drain, &mut info).await.is_err() {
                info.abort();
            }
        }
        self.running = false;
    }
}

/// Decode request lines from `stdout`, dispatch each, and write the
/// response to `stdin`. Malformed lines are dropped without a response.
async fn request_loop(
    chain: Arc<Mutex<DispatchChain>>,
    mut stdin: tokio::process::ChildStdin,
    stdout: tokio::process::ChildStdout,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => break,
        };
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let event = match keygate_protocol::InputEvent::decode(line) {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, "malformed_request_dropped");
                continue;
            }
        };

        // Lock scope kept tight: the guard must not live across the write.
        let decision = {
            let mut chain = chain.lock();
            chain.dispatch(&event)
        };

        let response = decision.encode_response(event.event_id);
        if stdin.write_all(response.as_bytes()).await.is_err() {
            break;
        }
        let _ = stdin.flush().await;
    }
    debug!("request_stream_closed");
}

/// Forward engine stderr lines to the informational callback, or to the log
/// when none is installed.
async fn info_loop(stderr: tokio::process::ChildStderr, on_info: Option<InfoCallback>) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match &on_info {
            Some(cb) => cb(line),
            None => debug!(target: "keygate::engine", "{line}"),
        }
    }
}

/// Wait for the engine to exit or for a deliberate stop.
async fn exit_watch(
    mut proc: EngineProcess,
    token: CancellationToken,
    stopping: Arc<AtomicBool>,
    on_error: Option<ErrorCallback>,
) {
    tokio::select! {
        status = proc.wait() => {
            if stopping.load(Ordering::SeqCst) {
                return;
            }
            let code = status.ok().and_then(|s| s.code());
            warn!(?code, "Engine process exited unexpectedly");
            if let Some(cb) = &on_error {
                cb(code);
            }
        }
        () = token.cancelled() => {
            proc.terminate().await;
        }
    }
}
