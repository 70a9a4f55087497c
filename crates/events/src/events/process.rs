use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command and working directory of a spawned process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessCommandDescriptor {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl ProcessCommandDescriptor {
    /// Render as a single shell-like line
    #[must_use]
    pub fn display_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// External process execution events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProcessEvent {
    Started {
        command: ProcessCommandDescriptor,
        timeout_secs: u64,
    },

    Completed {
        command: ProcessCommandDescriptor,
        exit_code: Option<i32>,
        duration_ms: u64,
        stdout_bytes: u64,
        stderr_bytes: u64,
        /// Bytes discarded once the capture buffers were full
        truncated_bytes: u64,
    },

    /// Wall-clock limit hit; the process group was killed
    TimedOut {
        command: ProcessCommandDescriptor,
        seconds: u64,
    },

    Failed {
        command: ProcessCommandDescriptor,
        message: String,
    },
}
