//! # Training Invoker
//!
//! Runs the external model-training tool. The tool is a black box: it is
//! called as `executable input1 .. inputN output_path`, must write the model
//! to its last argument and exit 0.
//!
//! ## Failure modes (all reported, never fatal):
//! - **Launch failure**: executable missing, not executable, etc.
//! - **Timeout**: the run exceeded the configured limit and was killed
//! - **Non-zero exit**: returned as a [`TrainingResult`] with `success == false`
//!
//! ## Process groups:
//! The tool is usually a shell wrapper that starts the real trainer as a
//! child. Killing only the wrapper would leave the trainer running outside
//! the job limit, free to write into a temp path that has already been
//! cleaned up. So every run gets its own process group,
//! and when the run ends (exit, timeout or an abandoned request) the whole
//! group is killed. On the timeout and exit paths `invoke` also waits for
//! the group to disappear before it returns and releases its job slot.
//!
//! Concurrent runs are bounded by a semaphore so a burst of uploads cannot
//! spawn an unbounded number of training processes.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::TrainingConfig;

/// How long a killed process group may take to disappear.
const GROUP_EXIT_GRACE: Duration = Duration::from_secs(2);

/// Outcome of a training run that got as far as exiting.
#[derive(Debug, Clone)]
pub struct TrainingResult {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
    pub duration: Duration,
}

impl TrainingResult {
    /// Client-facing description of a failed run: exit code, then captured
    /// stderr and stdout.
    pub fn failure_message(&self) -> String {
        let code = match self.exit_code {
            Some(code) => code.to_string(),
            None => "none (terminated by signal)".to_string(),
        };
        format!(
            "Model generation exited with code {}.\n{}\n{}",
            code,
            String::from_utf8_lossy(&self.stderr).trim_end(),
            String::from_utf8_lossy(&self.stdout).trim_end(),
        )
    }
}

/// Reasons the training tool produced no exit status.
///
/// ## Rust Concepts:
/// - **Enum with data**: each variant carries what the caller needs to
///   build its error message (the OS error, or the limit that was hit)
/// - **std::error::Error**: lets the error travel through `?` and `anyhow`
#[derive(Debug)]
pub enum InvokeError {
    Launch(io::Error),
    TimedOut(Duration),
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeError::Launch(e) => write!(f, "unable to launch training tool: {}", e),
            InvokeError::TimedOut(limit) => {
                write!(f, "training tool timed out after {:?}", limit)
            }
        }
    }
}

impl std::error::Error for InvokeError {}

/// Launches the training executable with bounded concurrency and a timeout.
///
/// ## Rust Concepts:
/// - **Arc<Semaphore>**: every clone of the invoker shares the same pool of
///   job permits, so the limit holds across all actix workers
/// - **#[derive(Clone)]**: cloning is cheap (a path, a duration and an `Arc`)
///
/// ## Why a semaphore:
/// Training is CPU heavy. Waiting for a permit queues excess requests
/// instead of starting more processes than the machine can run.
#[derive(Debug, Clone)]
pub struct TrainingInvoker {
    executable: PathBuf,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl TrainingInvoker {
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration, max_concurrent_jobs: usize) -> Self {
        Self {
            executable: executable.into(),
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs)),
        }
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::new(
            config.executable.clone(),
            config.timeout(),
            config.max_concurrent_jobs,
        )
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Jobs that could start right now without waiting.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Argument list passed to the tool: inputs first, output last.
    pub fn arguments<'a>(inputs: &'a [PathBuf], output: &'a Path) -> Vec<&'a Path> {
        inputs
            .iter()
            .map(PathBuf::as_path)
            .chain(std::iter::once(output))
            .collect()
    }

    /// Run the tool and wait for it, capturing all output.
    ///
    /// Waiting for a free job slot does not count against the timeout. The
    /// slot is held until every process of the run is gone.
    pub async fn invoke(&self, inputs: &[PathBuf], output: &Path) -> Result<TrainingResult, InvokeError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| InvokeError::Launch(io::Error::new(io::ErrorKind::Other, e)))?;

        let args = Self::arguments(inputs, output);
        debug!(executable = %self.executable.display(), ?args, "Launching training tool");

        let mut child = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(InvokeError::Launch)?;
        let group = ProcessGroup::of(&child);

        let start = Instant::now();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        // Pipes are read to EOF, so a background process that inherited them
        // keeps the run alive until it exits or the timeout fires.
        let run = async { tokio::try_join!(child.wait(), read_pipe(stdout), read_pipe(stderr)) };
        let outcome = tokio::time::timeout(self.timeout, run).await;
        let duration = start.elapsed();

        if let Some(group) = group {
            group.terminate(&mut child).await;
        }

        let (status, stdout, stderr) = match outcome {
            Ok(result) => result.map_err(InvokeError::Launch)?,
            Err(_) => {
                warn!(timeout = ?self.timeout, "Training tool timed out, killed");
                return Err(InvokeError::TimedOut(self.timeout));
            }
        };

        let result = TrainingResult {
            exit_code: status.code(),
            stdout,
            stderr,
            success: status.success(),
            duration,
        };

        info!(
            exit_code = ?result.exit_code,
            success = result.success,
            duration_ms = %duration.as_millis(),
            "Training tool finished"
        );

        Ok(result)
    }
}

async fn read_pipe(pipe: Option<impl AsyncRead + Unpin>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// The process group of one training run.
///
/// The tool is spawned as the leader of a new group, so the group id is its
/// pid. Anything it starts stays in the group unless it deliberately moves.
///
/// ## Rust Concepts:
/// - **Drop**: if the request is abandoned mid-run the future owning this
///   value is dropped, and `drop` sends SIGKILL to the group. `Drop` cannot
///   await, so that path does not wait for the processes to exit.
/// - **unsafe FFI**: `killpg` comes from `libc`; the call itself has no
///   memory-safety preconditions.
struct ProcessGroup {
    pgid: libc::pid_t,
    armed: bool,
}

impl ProcessGroup {
    fn of(child: &Child) -> Option<Self> {
        let pid = child.id()?;
        Some(Self {
            pgid: libc::pid_t::try_from(pid).ok()?,
            armed: true,
        })
    }

    /// `signal == 0` only checks whether any member is left.
    fn signal(&self, signal: libc::c_int) -> io::Result<()> {
        // SAFETY: killpg takes plain integers and touches no memory of ours.
        if unsafe { libc::killpg(self.pgid, signal) } == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    /// Kill every process in the group, reap the leader and wait until the
    /// group is empty.
    async fn terminate(mut self, leader: &mut Child) {
        self.armed = false;

        let killed = match self.signal(libc::SIGKILL) {
            Ok(()) => true,
            Err(e) if e.raw_os_error() == Some(libc::ESRCH) => false,
            Err(e) => {
                warn!(pgid = self.pgid, error = %e, "Unable to kill training process group");
                false
            }
        };

        // An unreaped leader would keep the group alive as a zombie.
        if let Err(e) = leader.wait().await {
            warn!(pgid = self.pgid, error = %e, "Unable to reap training tool");
        }
        if !killed {
            return;
        }

        let deadline = Instant::now() + GROUP_EXIT_GRACE;
        while self.signal(0).is_ok() {
            if Instant::now() >= deadline {
                warn!(pgid = self.pgid, "Training processes still present after kill");
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        debug!(pgid = self.pgid, "Training process group gone");
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.signal(libc::SIGKILL);
        }
    }
}
