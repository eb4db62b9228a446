//! Shared utilities for integration tests.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, ChildStdout, Command, Stdio};

/// A running `close-guard` binary with its stdout captured.
pub struct ServerProcess {
    pub child: Child,
    stdout: BufReader<ChildStdout>,
    pub output: String,
}

impl ServerProcess {
    /// Spawn the binary and wait until it reports it is listening.
    pub fn start(args: &[&str]) -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_close-guard"))
            .args(["--bind", "127.0.0.1:0"])
            .args(args)
            .env("RUST_LOG", "off")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to spawn close-guard");

        let mut stdout = BufReader::new(child.stdout.take().unwrap());
        let mut output = String::new();
        loop {
            let mut line = String::new();
            let n = stdout.read_line(&mut line).unwrap();
            assert!(n > 0, "server exited before listening; output: {output}");
            output.push_str(&line);
            if line.starts_with("listening on") {
                break;
            }
        }

        Self { child, stdout, output }
    }

    pub fn pid(&self) -> i32 {
        self.child.id() as i32
    }

    /// Wait for exit; returns all stdout and the exit code.
    pub fn wait(mut self) -> (String, Option<i32>) {
        self.stdout.read_to_string(&mut self.output).unwrap();
        let status = self.child.wait().unwrap();
        (self.output, status.code())
    }
}
