//! keygate-engine binary: installs the OS input hook and arbitrates every
//! captured event with the host over stdio.
//!
//! Stdout carries request lines, stdin carries response lines, and all
//! logging goes to stderr (the host forwards it verbatim as its
//! informational channel).

use std::process::ExitCode;

use clap::Parser;
use logging::LogArgs;
use tracing::error;

/// Command line arguments for the engine process.
#[derive(Debug, Parser)]
#[command(name = "keygate-engine", about = "keygate capture engine")]
struct Args {
    /// Logging controls.
    #[command(flatten)]
    log: LogArgs,

    /// Do not synthesize capturable events from modifier flag changes.
    #[arg(long)]
    no_modifier_events: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init_subscriber(&args.log.spec());

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("engine failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Wire up the arbiter's resolver threads and hand the hook loop this
/// thread.
#[cfg(target_os = "macos")]
fn run(args: &Args) -> keygate_engine::Result<()> {
    use std::{sync::Arc, thread};

    use keygate_engine::{Arbiter, Session, response_reader_loop, timeout_loop};

    let (arbiter, deadlines) = Arbiter::new();

    let weak = Arc::downgrade(&arbiter);
    thread::spawn(move || timeout_loop(&weak, deadlines));

    {
        let arbiter = arbiter.clone();
        thread::spawn(move || response_reader_loop(&arbiter, std::io::stdin().lock()));
    }

    let session = Arc::new(Session::new(arbiter, std::io::stdout()));
    keygate_engine::sys::run_event_loop(session, !args.no_modifier_events)
}

/// The only shipped hook integration is the macOS event tap.
#[cfg(not(target_os = "macos"))]
fn run(_args: &Args) -> keygate_engine::Result<()> {
    Err(keygate_engine::Error::UnsupportedPlatform(
        "only the macOS event tap is implemented",
    ))
}
