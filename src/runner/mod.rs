//! Runner module - Execution abstraction layer
//!
//! This module provides a unified interface for running programs:
//! - `ProcessRunner`: direct process execution with a wall-clock timeout
//!
//! The runner module does NOT:
//! - Compare outputs or determine verdicts
//! - Know about languages or compilation

pub mod process;

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command specification for execution
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    /// Program path or name
    pub program: String,
    /// Arguments to the program
    pub args: Vec<String>,
    /// Working directory
    pub work_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            work_dir: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Create from a command vector (first element is program, rest are args)
    pub fn from_vec(cmd: &[String]) -> Self {
        let mut iter = cmd.iter();
        let program = iter.next().cloned().unwrap_or_default();
        let args: Vec<String> = iter.cloned().collect();
        Self {
            program,
            args,
            work_dir: None,
        }
    }

    /// Convert to a vector of strings (program + args)
    pub fn to_vec(&self) -> Vec<String> {
        let mut v = vec![self.program.clone()];
        v.extend(self.args.clone());
        v
    }
}

/// Outcome of running a program (raw, no verdict interpretation)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionOutcome {
    /// Stdout content (lossy UTF-8)
    pub stdout: String,
    /// Stderr content (lossy UTF-8)
    pub stderr: String,
    /// Exit code, `None` if the process was killed before it exited
    pub exit_code: Option<i32>,
    /// Terminating signal, when the program died on its own signal
    pub signal: Option<i32>,
    /// The wall-clock timeout elapsed and the process group was killed
    pub timed_out: bool,
    /// Wall-clock time from spawn to exit
    pub elapsed: Duration,
    /// Stdout or stderr exceeded the capture limit
    pub output_truncated: bool,
    /// A pipe was still held open by an escaped process; output is what was read before giving up
    pub output_incomplete: bool,
}

impl ExecutionOutcome {
    /// Exited on its own with code 0
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Runner trait for executing programs
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run a command, feeding `stdin` if given, killing it after `timeout`
    ///
    /// `Err` means the program could not be executed at all (spawn failure);
    /// crashes and timeouts are reported in the outcome.
    async fn run(
        &self,
        cmd: &CommandSpec,
        stdin: Option<&str>,
        timeout: Duration,
    ) -> Result<ExecutionOutcome>;
}

// Re-exports
pub use process::ProcessRunner;
