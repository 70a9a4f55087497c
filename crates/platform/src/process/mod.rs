//! Process execution operations

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::time::Duration;
use webforge_errors::Error;
use webforge_events::ProcessCommandDescriptor;

use crate::core::PlatformContext;

/// Default per-stream capture limit
pub const DEFAULT_MAX_CAPTURE_BYTES: usize = 1024 * 1024;

/// Platform-specific command builder and execution
#[derive(Debug, Clone)]
pub struct PlatformCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    timeout: Option<Duration>,
    max_capture_bytes: usize,
}

impl PlatformCommand {
    /// Create a new platform command
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            current_dir: None,
            env: BTreeMap::new(),
            timeout: None,
            max_capture_bytes: DEFAULT_MAX_CAPTURE_BYTES,
        }
    }

    /// Add an argument to the command
    pub fn arg<S: AsRef<str>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments to the command
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Set the working directory for the command
    pub fn current_dir<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set an environment variable for the child
    pub fn env<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> &mut Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Hard wall-clock limit; the process group is killed when it elapses
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// Per-stream capture limit; only the tail is kept
    pub fn max_capture_bytes(&mut self, limit: usize) -> &mut Self {
        self.max_capture_bytes = limit.max(1);
        self
    }

    /// Get the program name
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the arguments
    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get the current directory
    #[must_use]
    pub fn get_current_dir(&self) -> Option<&PathBuf> {
        self.current_dir.as_ref()
    }

    #[must_use]
    pub fn get_env_vars(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    #[must_use]
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[must_use]
    pub fn get_max_capture_bytes(&self) -> usize {
        self.max_capture_bytes
    }

    /// Event payload describing this command
    #[must_use]
    pub fn descriptor(&self) -> ProcessCommandDescriptor {
        ProcessCommandDescriptor {
            program: self.program.clone(),
            args: self.args.clone(),
            cwd: self.current_dir.clone(),
        }
    }

    /// Render as a single line for diagnostics
    #[must_use]
    pub fn display_line(&self) -> String {
        self.descriptor().display_line()
    }
}

/// Output from command execution
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code; `None` when the child was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Bytes dropped from the head of either stream to respect the limit
    pub truncated_bytes: u64,
    pub duration: Duration,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    #[must_use]
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Captured output worth showing an operator: stderr first, then stdout
    #[must_use]
    pub fn diagnostics(&self) -> String {
        diagnostic_text(&self.stdout, &self.stderr)
    }
}

/// Join the non-empty captured streams, stderr first
#[must_use]
pub fn diagnostic_text(stdout: &[u8], stderr: &[u8]) -> String {
    [stderr, stdout]
        .into_iter()
        .map(String::from_utf8_lossy)
        .map(|text| text.trim_end().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Byte buffer that keeps only the most recent `limit` bytes
#[derive(Debug)]
pub struct TailBuffer {
    bytes: VecDeque<u8>,
    limit: usize,
    dropped: u64,
    total: u64,
}

impl TailBuffer {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            bytes: VecDeque::new(),
            limit: limit.max(1),
            dropped: 0,
            total: 0,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.total += chunk.len() as u64;
        // Only the tail of an oversized chunk can survive
        let chunk = if chunk.len() > self.limit {
            let skip = chunk.len() - self.limit;
            self.dropped += skip as u64;
            &chunk[skip..]
        } else {
            chunk
        };
        self.bytes.extend(chunk);
        if self.bytes.len() > self.limit {
            let excess = self.bytes.len() - self.limit;
            self.bytes.drain(..excess);
            self.dropped += excess as u64;
        }
    }

    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes.into()
    }
}

/// Trait for process execution operations
///
/// A non-zero exit is reported through [`CommandOutput::exit_code`], not as
/// an error; callers classify it. Errors are reserved for spawn failures
/// (`PlatformError::CommandNotFound`, `ProcessExecutionFailed`) and the
/// wall-clock limit (`PlatformError::ProcessTimeout`).
#[async_trait]
pub trait ProcessOperations: Send + Sync {
    /// Execute a command and return the output
    async fn execute_command(
        &self,
        ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<CommandOutput, Error>;

    /// Create a new command builder
    fn create_command(&self, program: &str) -> PlatformCommand {
        PlatformCommand::new(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_buffer_keeps_most_recent_bytes() {
        let mut buffer = TailBuffer::new(4);
        buffer.push(b"ab");
        buffer.push(b"cdef");
        assert_eq!(buffer.dropped(), 2);
        assert_eq!(buffer.total(), 6);
        assert_eq!(buffer.into_bytes(), b"cdef");
    }

    #[test]
    fn tail_buffer_oversized_chunk() {
        let mut buffer = TailBuffer::new(3);
        buffer.push(b"x");
        buffer.push(b"0123456789");
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.dropped(), 8);
        assert_eq!(buffer.into_bytes(), b"789");
    }

    #[test]
    fn command_builder_collects_settings() {
        let mut cmd = PlatformCommand::new("npm");
        cmd.args(["install", "--no-audit"])
            .current_dir("/tmp/project")
            .env("CI", "1")
            .timeout(Duration::from_secs(5))
            .max_capture_bytes(0);
        assert_eq!(cmd.display_line(), "npm install --no-audit");
        assert_eq!(cmd.get_env_vars().get("CI").map(String::as_str), Some("1"));
        assert_eq!(cmd.get_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(cmd.get_max_capture_bytes(), 1);
    }
}
