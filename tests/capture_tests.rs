// Capture supervisor lifecycle against a controllable test subprocess.

#![cfg(unix)]

use meet_scribe::capture::{CaptureState, CaptureSupervisor};
use std::time::{Duration, Instant};

/// Test double for the encoder: consumes stdin like ffmpeg waiting for its
/// quit command, then takes 500ms to "finalize" before exiting.
fn slow_exit_supervisor() -> CaptureSupervisor {
    CaptureSupervisor::with_command(
        "sh",
        vec!["-c".to_string(), "read _line; sleep 0.5".to_string()],
    )
}

#[tokio::test]
async fn stop_waits_for_subprocess_exit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("out.mp3");

    let mut supervisor = slow_exit_supervisor();
    supervisor.start(&output).expect("start capture");
    assert!(supervisor.is_recording());
    assert_eq!(supervisor.state(), CaptureState::Recording);

    let started = Instant::now();
    let finished = supervisor.stop().await.expect("stop capture");

    assert!(
        started.elapsed() >= Duration::from_millis(500),
        "stop() must await subprocess exit, returned after {:?}",
        started.elapsed()
    );
    assert_eq!(finished, Some(output));
    assert_eq!(supervisor.state(), CaptureState::Stopped);
}

#[tokio::test]
async fn stop_is_a_noop_when_idle() {
    let mut supervisor = slow_exit_supervisor();

    assert_eq!(supervisor.stop().await.expect("idle stop"), None);
    assert_eq!(supervisor.state(), CaptureState::Idle);

    // And again: stop stays idempotent.
    assert_eq!(supervisor.stop().await.expect("second idle stop"), None);
}

#[tokio::test]
async fn stop_after_stop_is_a_noop() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("out.mp3");

    let mut supervisor = CaptureSupervisor::with_command(
        "sh",
        vec!["-c".to_string(), "read _line".to_string()],
    );
    supervisor.start(&output).expect("start capture");

    assert!(supervisor.stop().await.expect("first stop").is_some());
    assert_eq!(supervisor.stop().await.expect("second stop"), None);
}

#[tokio::test]
async fn second_start_is_rejected_while_recording() {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut supervisor = CaptureSupervisor::with_command(
        "sh",
        vec!["-c".to_string(), "read _line".to_string()],
    );
    supervisor.start(&dir.path().join("a.mp3")).expect("start");

    let second = supervisor.start(&dir.path().join("b.mp3"));
    assert!(second.is_err(), "only one capture may be active");

    supervisor.stop().await.expect("stop");
}
