//! Dump global input events as the host sees them.
//!
//! Registers one listener that prints every event with its canonical name
//! and the set of currently held keys. Names passed via `--block` are
//! swallowed before they reach the rest of the system — a quick way to
//! verify interception end to end.

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use keygate::{DeviceClass, EngineConfig, GlobalInputListener, ListenerOutcome, canonical_name};
use logging::LogArgs;
use tracing::error;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "dumpinput", about = "Print global input events")]
struct Args {
    /// Logging controls.
    #[command(flatten)]
    log: LogArgs,

    /// Canonical key names to block (repeatable), e.g. --block A --block "LEFT CTRL"
    #[arg(long = "block", value_name = "NAME")]
    block: Vec<String>,

    /// Path to the engine binary (defaults to a sibling of this executable)
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Do not synthesize capturable events from modifier flag changes
    #[arg(long)]
    no_modifier_events: bool,

    /// Hide mouse events
    #[arg(long)]
    no_mouse: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init_subscriber(&args.log.spec());

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("dumpinput failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Register the printing listener and run until Ctrl-C.
async fn run(args: Args) -> keygate::Result<()> {
    let mut config = EngineConfig::new()
        .with_on_info(|line| tracing::info!(target: "dumpinput::engine", "{line}"))
        .with_on_error(|code| tracing::error!(?code, "engine exited"));
    if let Some(path) = args.engine {
        config = config.with_engine_path(path);
    }
    if args.no_modifier_events {
        config = config.without_modifier_events();
    }

    let gate = GlobalInputListener::new(config);

    let blocked = args.block;
    let no_mouse = args.no_mouse;
    gate.add_listener(Box::new(move |event, keys| {
        let name = canonical_name(event);
        if !(no_mouse && event.device == DeviceClass::Mouse) {
            let mut held: Vec<&str> = keys.pressed().collect();
            held.sort_unstable();
            println!(
                "{:4} {:<5} {:<20} (code {})  held: {}",
                event.event_id,
                event.transition.token(),
                name,
                event.code,
                held.join(", ")
            );
        }
        ListenerOutcome::from(blocked.iter().any(|b| b == &name))
    }))
    .await?;

    println!("dumpinput: listening; press Ctrl-C to quit");
    let _ = tokio::signal::ctrl_c().await;

    gate.shutdown().await;
    Ok(())
}
