//! External command execution.
//!
//! Backends talk to `nft`, `ipset` and `iptables` only through
//! [`CommandExecutor`], so their command lines can be checked with mocks.

use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, Output, Stdio};

#[cfg(test)]
use mockall::automock;

/// Captured result of one command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit status was zero
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    fn from_output(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }

    /// Trimmed stderr, falling back to the exit code when it is empty.
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            stderr.to_string()
        } else {
            match self.code {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            }
        }
    }
}

/// Runs a program with arguments.
///
/// `args` is `&[String]` rather than `&[&str]` because mockall cannot express
/// the nested lifetime.
#[cfg_attr(test, automock)]
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, cmd: &str, args: &[String]) -> Result<CommandOutput>;

    /// Same as [`execute`](Self::execute) with `stdin` written to the child.
    fn execute_with_stdin(&self, cmd: &str, args: &[String], stdin: &str) -> Result<CommandOutput>;
}

/// Executor backed by `std::process::Command`
#[derive(Debug, Clone, Default)]
pub struct RealCommandExecutor;

impl RealCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, cmd: &str, args: &[String]) -> Result<CommandOutput> {
        let output = Command::new(cmd)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to execute {}", cmd))?;

        Ok(CommandOutput::from_output(output))
    }

    fn execute_with_stdin(
        &self,
        cmd: &str,
        args: &[String],
        stdin_data: &str,
    ) -> Result<CommandOutput> {
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", cmd))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(stdin_data.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        Ok(CommandOutput::from_output(output))
    }
}

/// `&[&str]` to the owned form the trait takes
pub fn args_to_strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
