//! End-to-end arbitration over real pipes against scripted hosts.
//!
//! These tests stand a shell script in for the host process: the engine
//! side (session, response reader, timeout resolver) runs exactly as it
//! does under the real event tap, minus the tap itself.

#![cfg(unix)]

use std::{
    io::BufReader,
    process::{Child, Command, Stdio},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use keygate_engine::{Arbiter, Session, response_reader_loop, timeout_loop};
use keygate_protocol::{Aux, Decision, DeviceClass, Transition};

/// Spawn `script` under `sh -c` with piped stdin/stdout.
fn scripted_host(script: &str) -> Child {
    Command::new("sh")
        .arg("-c")
        .arg(script)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn scripted host")
}

#[test]
fn responsive_host_decisions_are_honored() {
    // Answers "block" to every request, tagged with the request's own id.
    let mut child = scripted_host(r#"while read line; do echo "1,${line##*,}"; done"#);

    let (arbiter, deadlines) = Arbiter::with_deadline(Duration::from_millis(500));
    let weak = Arc::downgrade(&arbiter);
    let timeouts = thread::spawn(move || timeout_loop(&weak, deadlines));

    let host_out = BufReader::new(child.stdout.take().expect("host stdout"));
    let reader = {
        let arbiter = arbiter.clone();
        thread::spawn(move || response_reader_loop(&arbiter, host_out))
    };

    let session = Session::new(arbiter.clone(), child.stdin.take().expect("host stdin"));
    for code in [0u32, 11, 2] {
        let decision = session.decide(DeviceClass::Keyboard, Transition::Down, code, Aux::None);
        assert_eq!(decision, Decision::Block);
    }

    // Closing the host's stdin ends the script; the reader then sees EOF.
    drop(session);
    child.wait().expect("host exit");
    reader.join().expect("reader join");
    drop(arbiter);
    timeouts.join().expect("timeout join");
}

#[test]
fn silent_host_fails_open_after_deadline() {
    // Swallows requests and never answers.
    let mut child = scripted_host("cat > /dev/null");

    let deadline = Duration::from_millis(50);
    let (arbiter, deadlines) = Arbiter::with_deadline(deadline);
    let weak = Arc::downgrade(&arbiter);
    let timeouts = thread::spawn(move || timeout_loop(&weak, deadlines));

    let host_out = BufReader::new(child.stdout.take().expect("host stdout"));
    let reader = {
        let arbiter = arbiter.clone();
        thread::spawn(move || response_reader_loop(&arbiter, host_out))
    };

    let session = Session::new(arbiter.clone(), child.stdin.take().expect("host stdin"));
    let start = Instant::now();
    let decision = session.decide(DeviceClass::Keyboard, Transition::Down, 4, Aux::None);
    assert_eq!(decision, Decision::Propagate);
    assert!(start.elapsed() >= deadline);

    // And the next request still resolves normally after the first timed out.
    let start = Instant::now();
    let decision = session.decide(
        DeviceClass::Mouse,
        Transition::Down,
        0,
        Aux::Pointer { x: 1.0, y: 2.0 },
    );
    assert_eq!(decision, Decision::Propagate);
    assert!(start.elapsed() >= deadline);

    drop(session);
    child.wait().expect("host exit");
    reader.join().expect("reader join");
    drop(arbiter);
    timeouts.join().expect("timeout join");
}
