//! External toolchain commands
//!
//! The package manager and the packager are opaque subprocesses. This module
//! turns their configured command lines into bounded [`PlatformCommand`]s.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use webforge_config::{CommandConfig, Config};
use webforge_platform::{CommandOutput, PlatformCommand};

/// Lines of stderr kept in a one-line failure summary
const SUMMARY_LINES: usize = 5;

/// One configured external command with its limits
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    pub max_capture_bytes: usize,
    pub env: BTreeMap<String, String>,
}

impl ToolCommand {
    fn from_parts(command: &CommandConfig, timeout: Duration, config: &Config) -> Self {
        Self {
            program: command.program.clone(),
            args: command.args.clone(),
            timeout,
            max_capture_bytes: config.build.max_capture_bytes,
            env: config.build.env.clone(),
        }
    }

    /// The dependency install command
    #[must_use]
    pub fn install(config: &Config) -> Self {
        Self::from_parts(&config.build.install, config.install_timeout(), config)
    }

    /// The packaging command that produces the executable
    #[must_use]
    pub fn package(config: &Config) -> Self {
        Self::from_parts(&config.build.package, config.build_timeout(), config)
    }

    /// Build the platform command scoped to `dir`
    #[must_use]
    pub fn command_in(&self, dir: &Path) -> PlatformCommand {
        let mut cmd = PlatformCommand::new(&self.program);
        cmd.args(&self.args)
            .current_dir(dir)
            .timeout(self.timeout)
            .max_capture_bytes(self.max_capture_bytes);
        for (key, value) in &self.env {
            cmd.env(key.as_str(), value.as_str());
        }
        cmd
    }
}

/// Short description of a failed run: exit status plus the last stderr lines
#[must_use]
pub fn exit_summary(output: &CommandOutput) -> String {
    let status = output
        .exit_code
        .map_or_else(|| "terminated by signal".to_string(), |code| format!("exit code {code}"));
    let stderr = output.stderr_lossy();
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect();
    let tail = &lines[lines.len().saturating_sub(SUMMARY_LINES)..];
    if tail.is_empty() {
        status
    } else {
        format!("{status}: {}", tail.join(" | "))
    }
}
