//! SafeCommandExecutor: whitelisted external command execution
//!
//! # Security Features
//!
//! - **Whitelist-based validation**: Only pre-approved commands can execute
//! - **Injection prevention**: Uses `tokio::process::Command`, never a shell
//! - **Argument sanitization**: Arguments passed as a list, never interpolated into shell strings
//! - **Working directory validation**: Validates existence before execution
//! - **Timeout control**: Optional upper bound per command; the child is killed on expiry
//!
//! # Example
//!
//! ```rust,no_run
//! use npm_packager::core::ProcessRunner;
//! use npm_packager::SafeCommandExecutor;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut executor = SafeCommandExecutor::new();
//! executor.set_timeout(Duration::from_secs(30));
//!
//! let output = executor
//!     .run("npm", &["--version".to_string()], &std::env::temp_dir())
//!     .await?;
//! println!("{}", output.stdout);
//! # Ok(())
//! # }
//! ```

use crate::core::traits::{ProcessOutput, ProcessRunner};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Commands allowed without extra configuration
const DEFAULT_ALLOWED_COMMANDS: &[&str] = &["npm"];

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command is not in the allowed whitelist
    #[error("Command '{0}' is not in the allowed whitelist")]
    CommandNotAllowed(String),

    /// Working directory does not exist or is not accessible
    #[error("Working directory does not exist: {0}")]
    InvalidWorkingDirectory(PathBuf),

    /// Command execution failed (e.g., binary not found, permission denied)
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    /// Command exceeded the timeout duration
    #[error("Command timeout after {0:?}")]
    Timeout(Duration),
}

/// Command runner with a whitelist and an optional timeout
#[derive(Debug, Clone)]
pub struct SafeCommandExecutor {
    allowed_commands: Vec<String>,
    /// Optional timeout for command execution
    timeout: Option<Duration>,
}

impl Default for SafeCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SafeCommandExecutor {
    /// Create an executor that only allows `npm`
    pub fn new() -> Self {
        Self {
            allowed_commands: DEFAULT_ALLOWED_COMMANDS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            timeout: None,
        }
    }

    /// Add a command to the whitelist
    pub fn allow(&mut self, command: impl Into<String>) {
        let command = command.into();
        if !self.allowed_commands.contains(&command) {
            self.allowed_commands.push(command);
        }
    }

    /// Set command execution timeout.
    ///
    /// Commands exceeding this duration are killed.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    pub fn is_allowed(&self, command: &str) -> bool {
        self.allowed_commands.iter().any(|c| c == command)
    }

    fn command_name(command: &str) -> String {
        // npm and friends are .cmd shims on Windows
        #[cfg(target_os = "windows")]
        if matches!(command, "npm" | "yarn" | "pnpm") {
            return format!("{}.cmd", command);
        }

        command.to_string()
    }
}

#[async_trait]
impl ProcessRunner for SafeCommandExecutor {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<ProcessOutput, CommandError> {
        if !self.is_allowed(program) {
            return Err(CommandError::CommandNotAllowed(program.to_string()));
        }

        if !cwd.is_dir() {
            return Err(CommandError::InvalidWorkingDirectory(cwd.to_path_buf()));
        }

        let mut command = Command::new(Self::command_name(program));
        command
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| CommandError::Timeout(limit))?,
            None => command.output().await,
        }
        .map_err(|e| CommandError::ExecutionFailed(e.to_string()))?;

        Ok(ProcessOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
