//! External tool execution with a hard timeout.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Result, VerifyError};

/// A single external command.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Working directory; inherits ours when `None`.
    pub cwd: Option<PathBuf>,

    /// Extra environment on top of the inherited one.
    pub env: Vec<(String, String)>,

    pub timeout: Duration,
}

impl ToolInvocation {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self {
            command,
            cwd: None,
            env: Vec::new(),
            timeout,
        }
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or("")
    }
}

/// Captured result of a finished invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code, -1 when killed by a signal.
    pub exit_code: i32,

    pub stdout: String,

    pub stderr: String,

    pub duration_ms: u64,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs tool invocations. Stateless.
pub struct ToolRunner;

impl ToolRunner {
    /// Execute `invocation`, killing the child if it outlives the timeout.
    pub async fn execute(invocation: &ToolInvocation) -> Result<ToolOutput> {
        let start = Instant::now();
        let Some((exe, args)) = invocation.command.split_first() else {
            return Err(VerifyError::EmptyCommand);
        };

        let mut command = Command::new(exe);
        command
            .args(args)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }

        info!(command = %invocation.command.join(" "), "Running tool");
        let child = command.spawn().map_err(|e| spawn_error(exe, e))?;

        let output = tokio::time::timeout(invocation.timeout, child.wait_with_output())
            .await
            .map_err(|_| VerifyError::Timeout {
                program: exe.clone(),
                timeout: invocation.timeout,
            })?
            .map_err(|source| VerifyError::Io {
                program: exe.clone(),
                source,
            })?;

        let result = ToolOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        debug!(
            program = %exe,
            exit_code = result.exit_code,
            duration_ms = result.duration_ms,
            "Tool finished"
        );
        Ok(result)
    }
}

fn spawn_error(program: &str, source: std::io::Error) -> VerifyError {
    if source.kind() == std::io::ErrorKind::NotFound {
        VerifyError::NotFound {
            program: program.to_string(),
        }
    } else {
        VerifyError::Io {
            program: program.to_string(),
            source,
        }
    }
}
