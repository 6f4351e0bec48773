use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Drain window after the completion sentinel is observed, letting the child
/// emit trailing events before the reader closes its read side.
const DRAIN_WINDOW: Duration = Duration::from_millis(300);

/// Adapter-supplied predicate over a decoded event, true when the event means
/// "the child is done".
pub type SentinelPredicate = Arc<dyn Fn(&serde_json::Value) -> bool + Send + Sync>;

/// Message posted onto the reader's handoff channel.
pub(crate) enum ReaderMsg {
    /// A line of output (never includes the trailing newline). May be empty.
    Line(String),
    /// End of stream; posted exactly once, last.
    Eos,
}

fn is_sentinel(predicate: &SentinelPredicate, line: &str) -> bool {
    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) => predicate(&value),
        Err(_) => false,
    }
}

/// Spawn the line-reading task. On Unix the child's stderr is already dup2'd
/// onto the stdout pipe before exec (see `supervisor::run`), so `stderr` is
/// `None` and every event arrives as one ordered stream; platforms without
/// that hook pass `Some` and get a best-effort merge of two independently
/// read streams here instead. Forwards every line onto `tx`, and after the
/// sentinel predicate first matches, drains for [`DRAIN_WINDOW`] before
/// posting EOS. Never blocks the caller; never panics past the task
/// boundary.
pub(crate) fn spawn_reader(
    stdout: ChildStdout,
    stderr: Option<ChildStderr>,
    sentinel: SentinelPredicate,
    tx: mpsc::Sender<ReaderMsg>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = stderr.map(|s| BufReader::new(s).lines());

        let mut out_done = false;
        let mut err_done = err_lines.is_none();
        let mut drain_deadline: Option<Instant> = None;

        loop {
            if out_done && err_done {
                break;
            }

            tokio::select! {
                line = out_lines.next_line(), if !out_done => {
                    match line {
                        Ok(Some(l)) => {
                            if drain_deadline.is_none() && is_sentinel(&sentinel, &l) {
                                drain_deadline = Some(Instant::now() + DRAIN_WINDOW);
                            }
                            if tx.send(ReaderMsg::Line(l)).await.is_err() {
                                return;
                            }
                        }
                        Ok(None) | Err(_) => out_done = true,
                    }
                }
                line = async { err_lines.as_mut().unwrap().next_line().await }, if !err_done => {
                    match line {
                        Ok(Some(l)) => {
                            if drain_deadline.is_none() && is_sentinel(&sentinel, &l) {
                                drain_deadline = Some(Instant::now() + DRAIN_WINDOW);
                            }
                            if tx.send(ReaderMsg::Line(l)).await.is_err() {
                                return;
                            }
                        }
                        Ok(None) | Err(_) => err_done = true,
                    }
                }
                _ = drain_sleep(drain_deadline) => {
                    break;
                }
            }
        }

        let _ = tx.send(ReaderMsg::Eos).await;
    })
}

async fn drain_sleep(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::process::Command;

    fn always_false() -> SentinelPredicate {
        Arc::new(|_| false)
    }

    fn type_is(expected: &'static str) -> SentinelPredicate {
        Arc::new(move |v| v.get("type").and_then(|t| t.as_str()) == Some(expected))
    }

    #[tokio::test]
    async fn forwards_lines_and_then_eos() {
        let mut cmd = Command::new("printf");
        cmd.arg("a\\nb\\n");
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        let mut child = cmd.spawn().unwrap();
        let stdout = child.stdout.take().unwrap();
        let stderr = child.stderr.take();

        let (tx, mut rx) = mpsc::channel(16);
        let handle = spawn_reader(stdout, stderr, always_false(), tx);

        let mut lines = Vec::new();
        while let Some(msg) = rx.recv().await {
            match msg {
                ReaderMsg::Line(l) => lines.push(l),
                ReaderMsg::Eos => break,
            }
        }
        handle.await.unwrap();
        child.wait().await.unwrap();
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn sentinel_triggers_drain_then_close() {
        let mut cmd = Command::new("printf");
        cmd.arg(r#"{"type":"turn.completed"}\n"#);
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        let mut child = cmd.spawn().unwrap();
        let stdout = child.stdout.take().unwrap();
        let stderr = child.stderr.take();

        let (tx, mut rx) = mpsc::channel(16);
        let started = Instant::now();
        let handle = spawn_reader(stdout, stderr, type_is("turn.completed"), tx);

        let mut saw_eos = false;
        while let Some(msg) = rx.recv().await {
            if matches!(msg, ReaderMsg::Eos) {
                saw_eos = true;
                break;
            }
        }
        handle.await.unwrap();
        child.wait().await.unwrap();
        assert!(saw_eos);
        assert!(started.elapsed() >= DRAIN_WINDOW);
    }
}
