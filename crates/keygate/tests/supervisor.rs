//! Supervisor behavior against scripted fake engines.
//!
//! Each test stands a shell script in for the engine binary and drives the
//! real supervisor through the public registry API: spawn, the
//! request/response pump, crash reporting, deliberate stop, and
//! executable-bit remediation.

#![cfg(unix)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use keygate::{EngineConfig, GlobalInputListener, Listener, ListenerOutcome};

/// Write a fake engine script and return its path.
fn write_script(name: &str, body: &str, mode: u32) -> PathBuf {
    let path = std::env::temp_dir().join(format!("keygate-fake-{}-{}", std::process::id(), name));
    fs::write(&path, body).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(mode)).expect("chmod script");
    path
}

/// Poll until `cond` holds or a few seconds pass.
async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}

/// Shared line sink for the info callback.
fn info_sink() -> (Arc<Mutex<Vec<String>>>, EngineConfig) {
    let lines: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    let config = EngineConfig::new().with_on_info(move |line| {
        sink.lock().unwrap().push(line);
    });
    (lines, config)
}

fn noop() -> Listener {
    Box::new(|_, _| ListenerOutcome::Continue)
}

#[tokio::test]
async fn every_request_gets_one_tagged_response() {
    // The fake engine emits two requests and echoes the responses it reads
    // back out on stderr, where the info callback can see them.
    let script = write_script(
        "pump",
        "#!/bin/sh\n\
         printf 'KEYBOARD,DOWN,0,1\\n'\n\
         read r1\n\
         printf '%s\\n' \"$r1\" >&2\n\
         printf 'KEYBOARD,UP,0,2\\n'\n\
         read r2\n\
         printf '%s\\n' \"$r2\" >&2\n\
         exec sleep 30\n",
        0o755,
    );

    let (lines, config) = info_sink();
    let errors: Arc<Mutex<Vec<Option<i32>>>> = Arc::new(Mutex::new(Vec::new()));
    let error_sink = errors.clone();
    let config = config
        .with_engine_path(&script)
        .with_on_error(move |code| error_sink.lock().unwrap().push(code));

    let gate = GlobalInputListener::new(config);
    // Block key-downs only; ups propagate.
    gate.add_listener(Box::new(|event, _| {
        ListenerOutcome::from(event.transition.is_down())
    }))
    .await
    .expect("engine starts");

    assert!(wait_for(|| lines.lock().unwrap().len() >= 2).await);
    assert_eq!(*lines.lock().unwrap(), vec!["1,1", "0,2"]);

    // Down then up: the tracked state ends released, blocked or not.
    assert!(!gate.is_down("A"));

    gate.shutdown().await;
    assert!(errors.lock().unwrap().is_empty());
    let _ = fs::remove_file(&script);
}

#[tokio::test]
async fn crash_reports_the_exit_code() {
    let script = write_script("crash", "#!/bin/sh\nexit 7\n", 0o755);

    let errors: Arc<Mutex<Vec<Option<i32>>>> = Arc::new(Mutex::new(Vec::new()));
    let error_sink = errors.clone();
    let config = EngineConfig::new()
        .with_engine_path(&script)
        .with_on_error(move |code| error_sink.lock().unwrap().push(code));

    let gate = GlobalInputListener::new(config);
    gate.add_listener(noop()).await.expect("spawn succeeds");

    assert!(wait_for(|| !errors.lock().unwrap().is_empty()).await);
    assert_eq!(*errors.lock().unwrap(), vec![Some(7)]);
    let _ = fs::remove_file(&script);
}

#[tokio::test]
async fn deliberate_stop_does_not_report_a_crash() {
    let script = write_script("idle", "#!/bin/sh\nexec sleep 30\n", 0o755);

    let errors: Arc<Mutex<Vec<Option<i32>>>> = Arc::new(Mutex::new(Vec::new()));
    let error_sink = errors.clone();
    let config = EngineConfig::new()
        .with_engine_path(&script)
        .with_on_error(move |code| error_sink.lock().unwrap().push(code));

    let gate = GlobalInputListener::new(config);
    gate.add_listener(noop()).await.expect("spawn succeeds");

    gate.shutdown().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(errors.lock().unwrap().is_empty());
    let _ = fs::remove_file(&script);
}

#[tokio::test]
async fn permission_denied_spawn_is_repaired_and_retried() {
    // Not executable at first: the initial spawn fails with EACCES, the
    // default repair sets the bit, and the single retry succeeds.
    let script = write_script("noexec", "#!/bin/sh\necho alive >&2\nexec sleep 30\n", 0o644);

    let (lines, config) = info_sink();
    let gate = GlobalInputListener::new(config.with_engine_path(&script));
    gate.add_listener(noop()).await.expect("repaired spawn succeeds");

    assert!(wait_for(|| lines.lock().unwrap().iter().any(|l| l == "alive")).await);
    let mode = fs::metadata(&script).unwrap().permissions().mode();
    assert_eq!(mode & 0o111, 0o111, "repair made the script executable");

    gate.shutdown().await;
    let _ = fs::remove_file(&script);
}

#[tokio::test]
async fn unspawnable_engine_is_fatal_and_reported() {
    let errors: Arc<Mutex<Vec<Option<i32>>>> = Arc::new(Mutex::new(Vec::new()));
    let error_sink = errors.clone();
    let config = EngineConfig::new()
        .with_engine_path("/nonexistent/keygate-engine")
        .with_on_error(move |code| error_sink.lock().unwrap().push(code));

    let gate = GlobalInputListener::new(config);
    let result = gate.add_listener(noop()).await;
    assert!(result.is_err());
    assert_eq!(*errors.lock().unwrap(), vec![None]);
}
