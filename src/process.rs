#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::OsString,
    path::PathBuf,
    process::{ExitStatus, Stdio},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use bon::Builder;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader},
    process::{Child, Command},
    sync::Notify,
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::constants::MAX_CAPTURED_BYTES;

/// Shared state behind a [`CancelToken`].
#[derive(Debug, Default)]
struct CancelState {
    /// Set once cancellation has been requested.
    cancelled: AtomicBool,
    /// Wakes tasks waiting in [`CancelToken::cancelled`].
    notify:    Notify,
}

/// Cooperative cancellation for a grading batch.
///
/// Clones share state; cancelling one cancels all of them. Running children
/// are killed when the token fires.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<CancelState>);

impl CancelToken {
    /// Creates a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    /// Returns true once [`CancelToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Completes when the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.0.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Drop guard that terminates a spawned child process if callers forget to
/// await it.
struct ChildDropGuard(Option<Child>);

impl ChildDropGuard {
    /// Wraps the provided child process with the drop guard.
    fn new(child: Child) -> Self {
        Self(Some(child))
    }

    /// Returns a mutable reference to the underlying child process.
    fn child_mut(&mut self) -> Result<&mut Child, ProcessError> {
        self.0.as_mut().ok_or(ProcessError::MissingPipe("child"))
    }

    /// Kills the child, unless it already exited, and reaps it.
    async fn kill(&mut self) {
        if let Some(child) = self.0.as_mut()
            && !matches!(child.try_wait(), Ok(Some(_)))
            && let Err(e) = child.kill().await
        {
            warn!("failed to kill child process: {e}");
        }
        self.0 = None;
    }

    /// Prevents the guard from killing the process on drop.
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for ChildDropGuard {
    fn drop(&mut self) {
        if let Some(child) = self.0.as_mut() {
            let _ = child.start_kill();
        }
    }
}

/// Why a child process could not be run to completion.
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    /// The program could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// program that was invoked
        program: String,
        /// underlying error
        #[source]
        source:  std::io::Error,
    },
    /// Waiting on or reading from the child failed.
    #[error("failed to {action}: {source}")]
    Io {
        /// what was being attempted
        action: &'static str,
        /// underlying error
        #[source]
        source: std::io::Error,
    },
    /// A pipe that was requested is missing.
    #[error("missing {0} pipe")]
    MissingPipe(&'static str),
    /// The deadline passed and the child was killed.
    #[error("timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),
    /// The batch was cancelled and the child was killed.
    #[error("cancelled")]
    Cancelled,
}

/// A command line with the directory and environment to run it in.
#[derive(Debug, Clone, Builder)]
#[builder(on(OsString, into))]
pub struct CommandSpec {
    /// Program to invoke.
    pub program: OsString,
    /// Arguments passed to the program.
    #[builder(default)]
    pub args:    Vec<OsString>,
    /// Working directory of the child.
    #[builder(into)]
    pub cwd:     Option<PathBuf>,
    /// Extra environment variables.
    #[builder(default)]
    pub env:     Vec<(OsString, OsString)>,
}

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct Collected {
    /// Exit status returned by the process.
    pub status: ExitStatus,
    /// Contents written to stdout.
    pub stdout: Vec<u8>,
    /// Contents written to stderr.
    pub stderr: Vec<u8>,
}

impl Collected {
    /// Stdout followed by stderr, as lines joined with `\n`.
    pub fn merged_output(&self) -> String {
        let stdout = String::from_utf8_lossy(&self.stdout);
        let stderr = String::from_utf8_lossy(&self.stderr);
        stdout
            .lines()
            .chain(stderr.lines())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Describes how stdin should be wired for the spawned process.
#[derive(Debug)]
pub enum StdinSource {
    /// Attach nothing to stdin.
    Null,
    /// Write the provided bytes, then close stdin.
    Bytes(Vec<u8>),
}

/// How waiting on the child ended.
enum Finish {
    /// The child exited and both pipes reached end of file.
    Collected(Result<Collected, ProcessError>),
    /// The deadline passed first.
    Expired(Duration),
    /// The token fired first.
    Cancelled,
}

/// Sleeps for `deadline`, or forever if there is none.
async fn expire(deadline: Option<Duration>) -> Duration {
    match deadline {
        Some(limit) => {
            tokio::time::sleep(limit).await;
            limit
        }
        None => std::future::pending().await,
    }
}

/// Reads a pipe to the end on its own task, keeping at most
/// [`MAX_CAPTURED_BYTES`] and discarding the rest so the child never blocks
/// on a full pipe.
fn drain<R>(pipe: R, action: &'static str) -> JoinHandle<Result<Vec<u8>, ProcessError>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        (&mut reader)
            .take(MAX_CAPTURED_BYTES)
            .read_to_end(&mut buf)
            .await
            .map_err(|source| ProcessError::Io { action, source })?;
        let dropped = tokio::io::copy(&mut reader, &mut tokio::io::sink())
            .await
            .map_err(|source| ProcessError::Io { action, source })?;
        if dropped > 0 {
            debug!("{action}: discarded {dropped} byte(s) past the capture limit");
        }
        Ok(buf)
    })
}

/// Awaits a pipe reader started with [`drain`].
async fn join_drain(
    task: JoinHandle<Result<Vec<u8>, ProcessError>>,
    action: &'static str,
) -> Result<Vec<u8>, ProcessError> {
    task.await.map_err(|e| ProcessError::Io {
        action,
        source: std::io::Error::other(e),
    })?
}

/// Spawns a command, optionally feeds stdin, and collects stdout/stderr.
///
/// The deadline covers both the child's exit and reading its pipes to the
/// end, so a background process that keeps stdout open cannot outlive it.
/// The child is killed if `deadline` passes or `cancel` fires first.
pub async fn run_collect(
    spec: &CommandSpec,
    stdin: StdinSource,
    deadline: Option<Duration>,
    cancel: &CancelToken,
) -> Result<Collected, ProcessError> {
    if cancel.is_cancelled() {
        return Err(ProcessError::Cancelled);
    }

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    match &stdin {
        StdinSource::Null => {
            cmd.stdin(Stdio::null());
        }
        StdinSource::Bytes(_) => {
            cmd.stdin(Stdio::piped());
        }
    }

    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }

    debug!("spawning {:?} {:?} in {:?}", spec.program, spec.args, spec.cwd);
    let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: spec.program.to_string_lossy().into_owned(),
        source,
    })?;
    let mut guard = ChildDropGuard::new(child);

    if let StdinSource::Bytes(bytes) = stdin
        && let Some(mut handle) = guard.child_mut()?.stdin.take()
    {
        tokio::spawn(async move {
            if !bytes.is_empty() {
                let _ = handle.write_all(&bytes).await;
            }
            let _ = handle.shutdown().await;
        });
    }

    let stdout = guard
        .child_mut()?
        .stdout
        .take()
        .ok_or(ProcessError::MissingPipe("stdout"))?;
    let stderr = guard
        .child_mut()?
        .stderr
        .take()
        .ok_or(ProcessError::MissingPipe("stderr"))?;

    let out_task = drain(stdout, "read stdout");
    let err_task = drain(stderr, "read stderr");
    let out_abort = out_task.abort_handle();
    let err_abort = err_task.abort_handle();

    let finish = {
        let child = guard.child_mut()?;
        let collect = async move {
            let status = child.wait().await.map_err(|source| ProcessError::Io {
                action: "wait on process",
                source,
            })?;
            let stdout = join_drain(out_task, "read stdout").await?;
            let stderr = join_drain(err_task, "read stderr").await?;
            Ok::<_, ProcessError>(Collected {
                status,
                stdout,
                stderr,
            })
        };
        tokio::select! {
            collected = collect => Finish::Collected(collected),
            limit = expire(deadline) => Finish::Expired(limit),
            _ = cancel.cancelled() => Finish::Cancelled,
        }
    };

    match finish {
        Finish::Collected(collected) => {
            let collected = collected?;
            guard.disarm();
            Ok(collected)
        }
        Finish::Expired(limit) => {
            guard.kill().await;
            out_abort.abort();
            err_abort.abort();
            Err(ProcessError::TimedOut(limit))
        }
        Finish::Cancelled => {
            guard.kill().await;
            out_abort.abort();
            err_abort.abort();
            Err(ProcessError::Cancelled)
        }
    }
}
