use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{IpcError, Result};
use crate::manager::NetworkConfig;

/// The network client child process. Lines written with [`send`] go to its
/// stdin; every stdout line is forwarded to the channel given at spawn.
///
/// [`send`]: ClientProcess::send
pub struct ClientProcess {
    child: Child,
    stdin_tx: mpsc::Sender<String>,
}

impl ClientProcess {
    pub fn spawn(config: &NetworkConfig, line_tx: mpsc::Sender<String>) -> Result<Self> {
        let mut child = Command::new(&config.program)
            .args(&config.args)
            .current_dir(&config.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| IpcError::SpawnFailed(format!("{}: {}", config.program, e)))?;

        debug!(pid = child.id(), program = %config.program, "Spawned network client");

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(IpcError::ProcessNotRunning);
        };

        let (stdin_tx, stdin_rx) = mpsc::channel(100);
        tokio::spawn(write_lines(stdin, stdin_rx));
        tokio::spawn(read_lines(stdout, move |line| {
            let line_tx = line_tx.clone();
            async move { line_tx.send(line).await.is_ok() }
        }));
        tokio::spawn(read_lines(stderr, |line| async move {
            warn!("network client stderr: {}", line);
            true
        }));

        Ok(Self { child, stdin_tx })
    }

    pub async fn send(&self, line: &str) -> Result<()> {
        let mut line = line.to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.stdin_tx
            .send(line)
            .await
            .map_err(|_| IpcError::ChannelClosed)
    }

    pub async fn kill(&mut self) -> Result<()> {
        Ok(self.child.kill().await?)
    }
}

async fn write_lines(mut stdin: ChildStdin, mut rx: mpsc::Receiver<String>) {
    while let Some(line) = rx.recv().await {
        if let Err(e) = stdin.write_all(line.as_bytes()).await {
            debug!("network client stdin closed: {}", e);
            break;
        }
        if stdin.flush().await.is_err() {
            break;
        }
    }
}

/// Feeds each line to `on_line` until the stream ends or `on_line` returns
/// false.
async fn read_lines<R, F, Fut>(stream: R, mut on_line: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = bool>,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !on_line(line).await {
            break;
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    fn config(program: &str) -> NetworkConfig {
        NetworkConfig {
            program: program.into(),
            args: Vec::new(),
            working_dir: PathBuf::from("."),
            command_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_lines_round_trip_through_child() {
        let (line_tx, mut line_rx) = mpsc::channel(8);
        let mut process = ClientProcess::spawn(&config("cat"), line_tx).unwrap();

        process.send(r#"{"id":"1","type":"Ready"}"#).await.unwrap();
        let echoed = tokio::time::timeout(Duration::from_secs(5), line_rx.recv())
            .await
            .unwrap();
        assert_eq!(echoed.as_deref(), Some(r#"{"id":"1","type":"Ready"}"#));

        process.kill().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_spawn() {
        let (line_tx, _line_rx) = mpsc::channel(8);
        let result = ClientProcess::spawn(&config("definitely-not-a-real-binary-xyz"), line_tx);
        assert!(matches!(result, Err(IpcError::SpawnFailed(_))));
    }
}
