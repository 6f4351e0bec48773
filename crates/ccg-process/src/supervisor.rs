use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::warn;

use crate::reader::{spawn_reader, ReaderMsg, SentinelPredicate};

/// How the child receives its prompt.
#[derive(Debug, Clone)]
pub enum StdinDisposition {
    ClosedEmpty,
    Prompt(String),
}

/// Fully resolved child invocation, built by an adapter.
pub struct ChildSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: PathBuf,
    pub stdin: StdinDisposition,
    pub sentinel: SentinelPredicate,
}

/// Terminal values returned after the line stream is exhausted.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorOutcome {
    pub exit_code: Option<i32>,
    pub raw_line_count: u64,
}

/// Failure modes raised by the supervisor itself (distinct from the parser's
/// per-line error classification).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorFailure {
    CommandNotFound,
    IdleTimeout { idle_timeout_s: u64 },
    /// `wall_timeout_s` is `u64::MAX` when the timeout is conceptually
    /// "unbounded but a forced reap timed out" — callers should not occur
    /// in that path, this variant is only constructed with a real deadline.
    WallTimeout { wall_timeout_s: u64 },
}

const DEQUEUE_WAIT: Duration = Duration::from_millis(500);
const TERMINATE_GRACE: Duration = Duration::from_secs(5);
const KILL_GRACE: Duration = Duration::from_secs(2);
const READER_JOIN_GRACE: Duration = Duration::from_secs(5);
const REAP_GRACE: Duration = Duration::from_secs(5);

/// Resolve `program` to an absolute path on `PATH`. `program` is returned
/// unchanged if it is already absolute.
fn resolve_executable(program: &PathBuf) -> Option<PathBuf> {
    if program.is_absolute() {
        return Some(program.clone());
    }
    which::which(program).ok()
}

#[cfg(unix)]
fn signal_process_group(pid: u32, signal: i32) {
    // SAFETY: kill() is async-signal-safe; a negative pid targets the group.
    unsafe {
        libc::kill(-(pid as i32), signal);
    }
}

#[cfg(not(unix))]
fn signal_process_group(_pid: u32, _signal: i32) {}

/// Spawn `spec`, stream its output line-by-line to `on_line`, and enforce the
/// dual idle/wall-clock timeout. `on_line` is invoked once per non-empty line
/// in the exact order the child produced it (§8 I5); empty lines still reset
/// the idle timer (§8 I4) but are not forwarded.
///
/// Guarantees on every exit path: the child is reaped (or abandoned only
/// after exhausting the terminate→kill ladder) and the reader task has
/// joined, within the bounds of §8 I1/I2.
pub async fn run<F>(
    spec: ChildSpec,
    idle_timeout: Duration,
    wall_timeout: Option<Duration>,
    mut on_line: F,
) -> Result<SupervisorOutcome, SupervisorFailure>
where
    F: FnMut(&str),
{
    let Some(executable) = resolve_executable(&spec.program) else {
        return Err(SupervisorFailure::CommandNotFound);
    };

    let mut cmd = Command::new(executable);
    cmd.args(&spec.args);
    cmd.current_dir(&spec.cwd);
    // Command inherits the parent's environment by default; this overlays
    // only the adapter-specific keys on top of it.
    cmd.envs(&spec.env);
    cmd.stdout(std::process::Stdio::piped());
    // On Unix the pre_exec hook below dup2()s fd 2 onto fd 1 so stdout and
    // stderr land on the same pipe (§4.2 "stdout+stderr merged"); a second
    // piped fd here would just go unused. Platforms without pre_exec fall
    // back to reading stdout and stderr as two streams (see `reader.rs`).
    #[cfg(not(unix))]
    cmd.stderr(std::process::Stdio::piped());
    match &spec.stdin {
        StdinDisposition::Prompt(_) => cmd.stdin(std::process::Stdio::piped()),
        StdinDisposition::ClosedEmpty => cmd.stdin(std::process::Stdio::null()),
    };
    cmd.kill_on_drop(true);

    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            libc::setsid();
            // Merge stderr into the stdout pipe: the driver must see one
            // ordered line stream, not a race between two independent fds
            // (§8 I5).
            if libc::dup2(1, 2) == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let mut child = cmd.spawn().map_err(|_| SupervisorFailure::CommandNotFound)?;

    if let StdinDisposition::Prompt(prompt) = spec.stdin {
        if let Some(mut stdin) = child.stdin.take() {
            // Broken-pipe writes are swallowed: they surface later as a
            // missing-session or empty-result error, per §4.2.
            let _ = stdin.write_all(prompt.as_bytes()).await;
            let _ = stdin.shutdown().await;
        }
    }

    let stdout = child.stdout.take().expect("stdout piped at spawn");
    let stderr = child.stderr.take();

    let (tx, mut rx) = mpsc::channel(64);
    let reader_handle = spawn_reader(stdout, stderr, spec.sentinel, tx);

    let started_at = Instant::now();
    let mut last_activity = Instant::now();
    let mut raw_line_count: u64 = 0;

    let outcome = loop {
        if let Some(wall) = wall_timeout {
            if !wall.is_zero() && started_at.elapsed() >= wall {
                break Err(SupervisorFailure::WallTimeout {
                    wall_timeout_s: wall.as_secs(),
                });
            }
        }
        if last_activity.elapsed() >= idle_timeout {
            break Err(SupervisorFailure::IdleTimeout {
                idle_timeout_s: idle_timeout.as_secs(),
            });
        }

        match tokio::time::timeout(DEQUEUE_WAIT, rx.recv()).await {
            Ok(Some(ReaderMsg::Line(line))) => {
                last_activity = Instant::now();
                if !line.is_empty() {
                    raw_line_count += 1;
                    on_line(&line);
                }
            }
            Ok(Some(ReaderMsg::Eos)) | Ok(None) => break Ok(()),
            Err(_elapsed) => {
                if let Ok(Some(_)) = child.try_wait() {
                    if reader_handle.is_finished() {
                        break Ok(());
                    }
                }
            }
        }
    };

    match outcome {
        Ok(()) => {
            let exit_code = match tokio::time::timeout(REAP_GRACE, child.wait()).await {
                Ok(Ok(status)) => status.code(),
                Ok(Err(_)) | Err(_) => {
                    cleanup_ladder(&mut child, reader_handle).await;
                    return Err(SupervisorFailure::WallTimeout {
                        wall_timeout_s: wall_timeout.map(|d| d.as_secs()).unwrap_or(0),
                    });
                }
            };
            let _ = tokio::time::timeout(READER_JOIN_GRACE, reader_handle).await;
            Ok(SupervisorOutcome {
                exit_code,
                raw_line_count,
            })
        }
        Err(failure) => {
            cleanup_ladder(&mut child, reader_handle).await;
            Err(failure)
        }
    }
}

/// Guaranteed cleanup: drop the reader's stdout/stderr handles (by aborting
/// the task) to unblock it, then escalate terminate → kill → give-up on the
/// child, then join the reader. Idempotent and best-effort; never panics.
async fn cleanup_ladder(child: &mut tokio::process::Child, reader_handle: tokio::task::JoinHandle<()>) {
    reader_handle.abort();

    if let Ok(None) = child.try_wait() {
        if let Some(pid) = child.id() {
            signal_process_group(pid, libc::SIGTERM);
        } else {
            let _ = child.start_kill();
        }
        if tokio::time::timeout(TERMINATE_GRACE, child.wait())
            .await
            .is_err()
        {
            if let Ok(None) = child.try_wait() {
                if let Some(pid) = child.id() {
                    signal_process_group(pid, libc::SIGKILL);
                } else {
                    let _ = child.start_kill();
                }
                if tokio::time::timeout(KILL_GRACE, child.wait())
                    .await
                    .is_err()
                {
                    warn!("child process survived SIGKILL grace period; giving up");
                }
            }
        }
    }

    let _ = tokio::time::timeout(READER_JOIN_GRACE, reader_handle).await;
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
