//! External tool invocation
//!
//! imposm, psql, osmupdate and osmconvert are all driven through
//! [`ToolRunner`]. One call is one blocking unit of work: it returns only
//! after the child has exited, with its exit code and captured output. The
//! loops never run two tools at the same time.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, SyncError};

/// Placeholder written instead of secrets when a command line is logged
pub const REDACTED: &str = "***";

/// A fully assembled command line plus per-invocation environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    /// Argument index and the text logged in its place
    masked: Vec<(usize, String)>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            masked: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    /// Set an environment variable for this child only
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Pass `value` to the child but log `shown` in its place
    pub fn masked_arg(mut self, value: impl Into<String>, shown: impl Into<String>) -> Self {
        self.masked.push((self.args.len(), shown.into()));
        self.args.push(value.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn environment(&self) -> &[(String, String)] {
        &self.env
    }

    /// Value following `flag` in the argument list, if present
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn last_arg(&self) -> Option<&str> {
        self.args.last().map(String::as_str)
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.args.iter().enumerate().map(|(i, arg)| {
            self.masked
                .iter()
                .find(|(index, _)| *index == i)
                .map_or(arg.as_str(), |(_, shown)| shown.as_str())
        });
        let line = std::iter::once(self.program.as_str())
            .chain(shown)
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&line)
    }
}

/// Exit status and captured streams of a finished tool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the child was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Convert a non-zero exit into [`SyncError::ToolFailed`]
    pub fn into_result(self, program: &str) -> Result<ToolOutput> {
        if self.success() {
            Ok(self)
        } else {
            Err(SyncError::ToolFailed {
                program: program.to_string(),
                code: self.code,
                stderr: tail(&self.stderr, 20),
            })
        }
    }
}

/// Last `lines` lines of `text`
pub fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim_end().lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

/// Runs external programs
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the invocation to completion.
    ///
    /// A non-zero exit is reported through [`ToolOutput::code`], not as an
    /// error; `Err` means the program could not be started at all.
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput>;
}

/// Production runner backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolRunner;

#[async_trait]
impl ToolRunner for SystemToolRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        let output = tokio::process::Command::new(invocation.program())
            .args(invocation.arguments())
            .envs(invocation.environment().iter().cloned())
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| SyncError::ToolSpawn {
                program: invocation.program().to_string(),
                source,
            })?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        for line in result.stdout.lines() {
            debug!(program = invocation.program(), "{}", line);
        }

        Ok(result)
    }
}
