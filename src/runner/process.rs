//! Direct process runner
//!
//! Spawns the command from its argument list (no shell) in a fresh process
//! group, so a timeout or a dropped future can kill the whole tree.

use anyhow::{Context, Result};
use async_trait::async_trait;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{CommandSpec, ExecutionOutcome, Runner};

/// Environment variables passed through to every child
const ENV_PASSTHROUGH: &[&str] = &["PATH", "HOME", "LANG"];

/// Default cap on captured bytes per stream (16MB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// Default delay between SIGTERM and SIGKILL
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_millis(100);

/// How long to wait for pipes to close once the process group is gone
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Bytes read so far from one stream, shared with its reader task
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

type SharedCapture = Arc<Mutex<Captured>>;

/// Stream contents after the reader finished or was abandoned
struct StreamOutput {
    bytes: Vec<u8>,
    truncated: bool,
    incomplete: bool,
}

/// Runner that executes programs directly on the host
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    kill_grace: Duration,
    max_output_bytes: usize,
}

impl ProcessRunner {
    pub fn new(kill_grace: Duration, max_output_bytes: usize) -> Self {
        Self {
            kill_grace,
            max_output_bytes,
        }
    }

    fn build_command(&self, cmd: &CommandSpec, with_stdin: bool) -> Command {
        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .env_clear()
            .stdin(if with_stdin {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        for key in ENV_PASSTHROUGH {
            if let Ok(value) = std::env::var(key) {
                command.env(key, value);
            }
        }
        if let Some(dir) = &cmd.work_dir {
            command.current_dir(dir);
        }

        command
    }

    /// SIGTERM the group, then SIGKILL if it is still alive after the grace period
    async fn terminate(&self, child: &mut Child, group: &ProcessGroupGuard) {
        group.signal(Signal::SIGTERM);
        match tokio::time::timeout(self.kill_grace, child.wait()).await {
            Ok(_) => group.signal(Signal::SIGKILL),
            Err(_) => {
                debug!("Process ignored SIGTERM, sending SIGKILL");
                group.signal(Signal::SIGKILL);
                if let Err(e) = child.wait().await {
                    warn!("Failed to reap killed process: {}", e);
                }
            }
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_KILL_GRACE, DEFAULT_MAX_OUTPUT_BYTES)
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    async fn run(
        &self,
        cmd: &CommandSpec,
        stdin: Option<&str>,
        timeout: Duration,
    ) -> Result<ExecutionOutcome> {
        if cmd.program.is_empty() {
            anyhow::bail!("No command specified for execution");
        }

        debug!("Running {:?} with timeout {:?}", cmd.to_vec(), timeout);

        let started = Instant::now();
        let mut child = self
            .build_command(cmd, stdin.is_some())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", cmd.program))?;
        let mut group = ProcessGroupGuard::new(child.id());

        // Feed stdin from its own task so a program that never reads it cannot block us
        let stdin_task = match (child.stdin.take(), stdin) {
            (Some(mut pipe), Some(input)) => {
                let input = input.as_bytes().to_vec();
                Some(tokio::spawn(async move {
                    if let Err(e) = pipe.write_all(&input).await {
                        debug!("Stdin closed early: {}", e);
                    }
                    // dropping the pipe sends EOF
                }))
            }
            _ => None,
        };

        let stdout_capture = SharedCapture::default();
        let stderr_capture = SharedCapture::default();
        let stdout_task = tokio::spawn(read_capped(
            child.stdout.take(),
            self.max_output_bytes,
            stdout_capture.clone(),
        ));
        let stderr_task = tokio::spawn(read_capped(
            child.stderr.take(),
            self.max_output_bytes,
            stderr_capture.clone(),
        ));

        let waited = tokio::time::timeout(timeout, child.wait()).await;
        let elapsed = started.elapsed();

        let (status, timed_out) = match waited {
            Ok(status) => (Some(status.context("Failed to wait for process")?), false),
            Err(_) => {
                debug!("Process exceeded {:?}, terminating", timeout);
                self.terminate(&mut child, &group).await;
                (None, true)
            }
        };

        // Leftover background children would keep the output pipes open
        group.signal(Signal::SIGKILL);
        group.disarm();

        if let Some(task) = stdin_task {
            task.abort();
        }

        let stdout = join_output(stdout_task, &stdout_capture).await;
        let stderr = join_output(stderr_task, &stderr_capture).await;

        let exit_code = status.and_then(|s| s.code());
        let signal = status.and_then(|s| s.signal());

        Ok(ExecutionOutcome {
            stdout: String::from_utf8_lossy(&stdout.bytes).to_string(),
            stderr: String::from_utf8_lossy(&stderr.bytes).to_string(),
            exit_code: if timed_out { None } else { exit_code },
            signal: if timed_out { None } else { signal },
            timed_out,
            elapsed,
            output_truncated: stdout.truncated || stderr.truncated,
            output_incomplete: stdout.incomplete || stderr.incomplete,
        })
    }
}

/// Read a stream to EOF into `capture`, keeping at most `limit` bytes and draining the rest
async fn read_capped<R>(reader: Option<R>, limit: usize, capture: SharedCapture) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(());
    };

    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        let mut captured = lock(&capture);
        let room = limit.saturating_sub(captured.bytes.len());
        if n > room {
            captured.truncated = true;
        }
        captured.bytes.extend_from_slice(&chunk[..n.min(room)]);
    }
}

/// Wait for the reader to hit EOF, then take what it captured
///
/// If the pipe is still open after the drain timeout, the reader is aborted
/// and the bytes read so far are kept.
async fn join_output(mut task: JoinHandle<io::Result<()>>, capture: &SharedCapture) -> StreamOutput {
    let incomplete = match tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, &mut task).await {
        Ok(Ok(Ok(()))) => false,
        Ok(Ok(Err(e))) => {
            warn!("Failed to read process output: {}", e);
            false
        }
        Ok(Err(e)) => {
            warn!("Output reader task failed: {}", e);
            false
        }
        Err(_) => {
            warn!("Output pipe still open after process group was killed");
            task.abort();
            true
        }
    };

    let captured = std::mem::take(&mut *lock(capture));
    StreamOutput {
        bytes: captured.bytes,
        truncated: captured.truncated,
        incomplete,
    }
}

fn lock(capture: &SharedCapture) -> std::sync::MutexGuard<'_, Captured> {
    capture.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Kills the child's process group with SIGKILL when dropped while armed
///
/// Covers cancellation: if the future running the process is dropped, the
/// whole group goes down with it.
struct ProcessGroupGuard {
    pgid: Option<Pid>,
    armed: bool,
}

impl ProcessGroupGuard {
    fn new(pid: Option<u32>) -> Self {
        let pgid = pid.and_then(|pid| i32::try_from(pid).ok()).map(Pid::from_raw);
        Self { pgid, armed: true }
    }

    fn signal(&self, signal: Signal) {
        if let Some(pgid) = self.pgid {
            match killpg(pgid, signal) {
                Ok(()) => debug!("Sent {} to process group {}", signal, pgid),
                // group already gone
                Err(nix::errno::Errno::ESRCH) => {}
                Err(e) => warn!("Failed to send {} to process group {}: {}", signal, pgid, e),
            }
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if self.armed {
            self.signal(Signal::SIGKILL);
        }
    }
}
