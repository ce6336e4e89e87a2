//! Child process spawning.
//!
//! A spawned tool is seen as an ordered stream of [`ProcessEvent`]s ending in
//! exactly one `Exit` or `Error`, plus a [`KillSwitch`] that can be cloned into
//! the process registry.

use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::{self, error::TrySendError, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::error::{MediaFetchError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Stdout(String),
    Stderr(String),
    /// Terminal: the process exited, `None` when killed by a signal
    Exit(Option<i32>),
    /// Terminal: the process could not be waited on
    Error(String),
}

/// Requests termination of one running process
#[derive(Debug, Clone)]
pub struct KillSwitch {
    tx: mpsc::Sender<()>,
}

impl KillSwitch {
    /// Create a switch and the receiver the process owner listens on
    pub fn pair() -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }

    pub fn kill(&self) -> Result<()> {
        match self.tx.try_send(()) {
            // A pending request is as good as a new one
            Ok(()) | Err(TrySendError::Full(())) => Ok(()),
            Err(TrySendError::Closed(())) => Err(MediaFetchError::Termination(
                "process is no longer listening".to_string(),
            )),
        }
    }
}

pub struct ProcessHandle {
    pub events: UnboundedReceiver<ProcessEvent>,
    pub kill_switch: KillSwitch,
}

impl ProcessHandle {
    pub fn new(events: UnboundedReceiver<ProcessEvent>, kill_switch: KillSwitch) -> Self {
        Self {
            events,
            kill_switch,
        }
    }
}

/// Starts external programs
pub trait ProcessSpawner: Send + Sync {
    fn spawn(&self, program: &Path, args: &[String], work_dir: &Path) -> Result<ProcessHandle>;
}

/// Spawner backed by `tokio::process`. Must be called from within a tokio
/// runtime.
#[derive(Debug, Default, Clone)]
pub struct TokioSpawner;

impl ProcessSpawner for TokioSpawner {
    fn spawn(&self, program: &Path, args: &[String], work_dir: &Path) -> Result<ProcessHandle> {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let (tx, events) = mpsc::unbounded_channel();
        let (kill_switch, mut kill_rx) = KillSwitch::pair();

        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward_lines(out, tx.clone(), ProcessEvent::Stdout)));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward_lines(err, tx.clone(), ProcessEvent::Stderr)));

        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                Some(()) = kill_rx.recv() => {
                    if let Err(e) = child.start_kill() {
                        debug!("Kill request for exited process: {}", e);
                    }
                    child.wait().await
                }
            };

            // Output must reach the receiver before the exit event
            for reader in [stdout, stderr].into_iter().flatten() {
                let _ = reader.await;
            }

            let terminal = match status {
                Ok(status) => ProcessEvent::Exit(status.code()),
                Err(e) => ProcessEvent::Error(e.to_string()),
            };
            let _ = tx.send(terminal);
        });

        Ok(ProcessHandle::new(events, kill_switch))
    }
}

/// Forward complete lines; invalid UTF-8 is replaced rather than dropped.
async fn forward_lines<R>(reader: R, tx: UnboundedSender<ProcessEvent>, wrap: fn(String) -> ProcessEvent)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                if tx.send(wrap(line)).is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!("Stopped reading process output: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_switch_reports_closed_receiver() {
        let (switch, rx) = KillSwitch::pair();
        assert!(switch.kill().is_ok());
        // Second request while the first is pending
        assert!(switch.kill().is_ok());
        drop(rx);
        assert!(matches!(switch.kill(), Err(MediaFetchError::Termination(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tokio_spawner_streams_lines_then_exit() {
        let args = ["-c", "printf 'one\\ntwo\\n'; echo oops >&2; exit 3"].map(String::from);
        let mut handle = TokioSpawner
            .spawn(Path::new("sh"), &args, Path::new("."))
            .unwrap();

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut terminal = None;
        while let Some(event) = handle.events.recv().await {
            match event {
                ProcessEvent::Stdout(line) => stdout.push(line),
                ProcessEvent::Stderr(line) => stderr.push(line),
                other => terminal = Some(other),
            }
        }
        assert_eq!(stdout, ["one", "two"]);
        assert_eq!(stderr, ["oops"]);
        assert_eq!(terminal, Some(ProcessEvent::Exit(Some(3))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tokio_spawner_kill() {
        let args = ["30"].map(String::from);
        let mut handle = TokioSpawner
            .spawn(Path::new("sleep"), &args, Path::new("."))
            .unwrap();
        handle.kill_switch.kill().unwrap();

        let mut terminal = None;
        while let Some(event) = handle.events.recv().await {
            terminal = Some(event);
        }
        assert_eq!(terminal, Some(ProcessEvent::Exit(None)));
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let result = TokioSpawner.spawn(Path::new("definitely-not-a-real-tool-7f3a"), &[], Path::new("."));
        assert!(matches!(result, Err(MediaFetchError::Io(_))));
    }
}
