//! Process exit.

/// Exit status for a cleanup that completed without error.
pub const EXIT_CLEAN: i32 = 0;

/// Exit status for a cleanup that completed with an error.
pub const EXIT_ERROR: i32 = 1;

/// Exit status for a cleanup that missed its deadline.
pub const EXIT_TIMEOUT: i32 = 2;

/// The terminal step of a shutdown sequence.
pub trait Exit: Send + Sync {
    /// Terminate with `code`. Implementations other than [`ProcessExit`]
    /// may return.
    fn exit(&self, code: i32);
}

/// Exits the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExit;

impl Exit for ProcessExit {
    fn exit(&self, code: i32) {
        tracing::info!(code, "exiting process");
        std::process::exit(code);
    }
}

/// Records exit codes instead of exiting. For tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingExit {
    codes: std::sync::Mutex<Vec<i32>>,
}

impl RecordingExit {
    pub fn codes(&self) -> Vec<i32> {
        self.codes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Exit for RecordingExit {
    fn exit(&self, code: i32) {
        tracing::info!(code, "exit recorded");
        self.codes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(code);
    }
}
