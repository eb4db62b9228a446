//! Process-level shutdown tests: real signals against the binary.
#![cfg(unix)]

use std::io::Write;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

mod common;
use common::ServerProcess;

fn send(server: &ServerProcess, signal: Signal) {
    kill(Pid::from_raw(server.pid()), signal).unwrap();
}

#[test]
fn test_close_on_signal() {
    for (signal, name) in [(Signal::SIGINT, "SIGINT"), (Signal::SIGTERM, "SIGTERM")] {
        let server = ServerProcess::start(&["--timeout-ms", "50", "--cleanup-ms", "5"]);
        send(&server, signal);
        let (stdout, code) = server.wait();

        assert_eq!(code, Some(0), "{name}: {stdout}");
        assert!(stdout.contains(&format!("Received Signal: {name}")), "{stdout}");
        assert!(stdout.contains("Closing"), "{stdout}");
        assert!(stdout.contains("Closed"), "{stdout}");
        assert!(!stdout.contains("Close error"), "{stdout}");
    }
}

#[test]
fn test_close_timeout() {
    let server = ServerProcess::start(&["--timeout-ms", "50", "--cleanup-ms", "2000"]);
    send(&server, Signal::SIGTERM);
    let (stdout, code) = server.wait();

    assert_eq!(code, Some(2), "{stdout}");
    assert!(stdout.contains("Timed out"), "{stdout}");
    assert!(!stdout.contains("Closed"), "{stdout}");
    assert!(!stdout.contains("Close error"), "{stdout}");
}

#[test]
fn test_close_error() {
    let server = ServerProcess::start(&["--timeout-ms", "500", "--fail-cleanup"]);
    send(&server, Signal::SIGINT);
    let (stdout, code) = server.wait();

    assert_eq!(code, Some(1), "{stdout}");
    assert!(
        stdout.contains("Close error: cleanup failed: simulated cleanup failure"),
        "{stdout}"
    );
    assert!(!stdout.contains("Timed out"), "{stdout}");
}

#[test]
fn test_second_signal_does_not_restart_shutdown() {
    let server = ServerProcess::start(&["--timeout-ms", "2000", "--cleanup-ms", "200"]);
    send(&server, Signal::SIGINT);
    std::thread::sleep(std::time::Duration::from_millis(50));
    send(&server, Signal::SIGTERM);
    let (stdout, code) = server.wait();

    assert_eq!(code, Some(0), "{stdout}");
    assert!(stdout.contains("Received Signal: SIGINT"), "{stdout}");
    assert!(stdout.contains("Received Signal: SIGTERM"), "{stdout}");
    assert_eq!(stdout.matches("Closing").count(), 1, "{stdout}");
    assert_eq!(stdout.matches("Closed").count(), 1, "{stdout}");
}

#[test]
fn test_config_file_options() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[shutdown]\ntimeout = 50\n\n[observability]\nlog_level = \"warn\"").unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let server = ServerProcess::start(&["--config", &path, "--cleanup-ms", "2000"]);
    send(&server, Signal::SIGINT);
    let (stdout, code) = server.wait();

    assert_eq!(code, Some(2), "{stdout}");
}

#[test]
fn test_invalid_config_fails_setup() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[shutdown]\ntimeout = 0").unwrap();

    let output = std::process::Command::new(env!("CARGO_BIN_EXE_close-guard"))
        .args(["--bind", "127.0.0.1:0", "--config"])
        .arg(file.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("greater than 0"), "{stderr}");
}
