use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use wabridge_core::{CommandFrame, EventFrame, IpcCommand, IpcEvent};

use crate::client::NetworkClient;
use crate::error::{IpcError, Result};
use crate::process::ClientProcess;

type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<CommandOutcome>>>>;

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// How long a command may wait for its `CommandResult`.
    pub command_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Runs the network client process and correlates commands with their
/// results. Everything that is not a command result goes to the event
/// receiver for ingestion.
pub struct NetworkManager {
    config: NetworkConfig,
    process: tokio::sync::Mutex<Option<ClientProcess>>,
    pending: Pending,
    connected: Arc<AtomicBool>,
    event_tx: mpsc::Sender<IpcEvent>,
    event_rx: Option<mpsc::Receiver<IpcEvent>>,
}

impl NetworkManager {
    pub fn new(config: NetworkConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(1000);
        Self {
            config,
            process: tokio::sync::Mutex::new(None),
            pending: Arc::new(Mutex::new(HashMap::new())),
            connected: Arc::new(AtomicBool::new(false)),
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<IpcEvent>> {
        self.event_rx.take()
    }

    pub async fn start(&self) -> Result<()> {
        let mut process = self.process.lock().await;
        if process.is_some() {
            return Ok(());
        }

        if !self.config.working_dir.is_dir() {
            return Err(IpcError::SpawnFailed(format!(
                "working directory {} not found",
                self.config.working_dir.display()
            )));
        }

        info!(program = %self.config.program, "Starting network client");

        let (line_tx, line_rx) = mpsc::channel(1000);
        let handle = ClientProcess::spawn(&self.config, line_tx)?;

        tokio::spawn(dispatch_lines(
            line_rx,
            self.event_tx.clone(),
            self.pending.clone(),
            self.connected.clone(),
        ));

        *process = Some(handle);

        info!("Network client started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        if self.process.lock().await.is_none() {
            return Ok(());
        }

        info!("Stopping network client");
        let _ = self.notify(IpcCommand::Shutdown).await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        if let Some(mut process) = self.process.lock().await.take() {
            let _ = process.kill().await;
        }
        self.connected.store(false, Ordering::Relaxed);
        info!("Network client stopped");
        Ok(())
    }

    /// Sends a command without waiting for a result.
    pub async fn notify(&self, command: IpcCommand) -> Result<()> {
        self.write_line(&CommandFrame::new(command).encode()?).await
    }

    /// Sends a command and waits for the matching `CommandResult`.
    pub async fn send_command(&self, command: IpcCommand) -> Result<CommandOutcome> {
        let name = command.name();
        let frame = CommandFrame::new(command);
        let line = frame.encode()?;
        let id = frame.id;

        debug!(command = name, id = %id, "Sending IPC command");

        let (tx, rx) = oneshot::channel();
        lock_pending(&self.pending).insert(id.clone(), tx);

        if let Err(e) = self.write_line(&line).await {
            lock_pending(&self.pending).remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.config.command_timeout, rx).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Err(IpcError::ChannelClosed),
            Err(_) => {
                lock_pending(&self.pending).remove(&id);
                warn!(command = name, id = %id, "IPC command timed out");
                Err(IpcError::Timeout(name))
            }
        }
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        let process = self.process.lock().await;
        let process = process.as_ref().ok_or(IpcError::ProcessNotRunning)?;
        process.send(line).await
    }

    async fn run(&self, command: IpcCommand) -> Result<Option<serde_json::Value>> {
        let outcome = self.send_command(command).await?;
        if outcome.success {
            Ok(outcome.data)
        } else {
            Err(IpcError::CommandFailed(
                outcome.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

impl NetworkClient for NetworkManager {
    async fn send_message(&self, recipient: &str, message: &str) -> Result<()> {
        self.run(IpcCommand::SendMessage {
            recipient: recipient.to_string(),
            message: message.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn send_file(&self, recipient: &str, file_path: &Path) -> Result<()> {
        self.run(IpcCommand::SendFile {
            recipient: recipient.to_string(),
            file_path: file_path.display().to_string(),
        })
        .await?;
        Ok(())
    }

    async fn download_media(&self, message_id: &str, chat_jid: &str) -> Result<PathBuf> {
        let data = self
            .run(IpcCommand::DownloadMedia {
                message_id: message_id.to_string(),
                chat_jid: chat_jid.to_string(),
            })
            .await?;

        data.as_ref()
            .and_then(|d| d.get("file_path"))
            .and_then(|p| p.as_str())
            .map(PathBuf::from)
            .ok_or_else(|| IpcError::InvalidResponse("download result has no file_path".into()))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

fn lock_pending(
    pending: &Pending,
) -> std::sync::MutexGuard<'_, HashMap<String, oneshot::Sender<CommandOutcome>>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn dispatch_lines(
    mut line_rx: mpsc::Receiver<String>,
    event_tx: mpsc::Sender<IpcEvent>,
    pending: Pending,
    connected: Arc<AtomicBool>,
) {
    while let Some(line) = line_rx.recv().await {
        match EventFrame::decode(&line) {
            Ok(frame) => route_event(frame.body, &event_tx, &pending, &connected).await,
            Err(e) => debug!(error = %e, "Ignoring unparseable line from network client"),
        }
    }

    // The process is gone: fail every waiter instead of letting it time out.
    connected.store(false, Ordering::Relaxed);
    lock_pending(&pending).clear();
    debug!("Network client output closed");
}

async fn route_event(
    event: IpcEvent,
    event_tx: &mpsc::Sender<IpcEvent>,
    pending: &Pending,
    connected: &AtomicBool,
) {
    match event {
        IpcEvent::CommandResult {
            command_id,
            success,
            data,
            error,
        } => {
            let waiter = lock_pending(pending).remove(&command_id);
            match waiter {
                Some(tx) => {
                    let _ = tx.send(CommandOutcome {
                        success,
                        data,
                        error,
                    });
                }
                None => debug!(id = %command_id, "Result for unknown or expired command"),
            }
        }
        other => {
            match &other {
                IpcEvent::Connected { .. } => connected.store(true, Ordering::Relaxed),
                IpcEvent::Disconnected { .. } => connected.store(false, Ordering::Relaxed),
                _ => {}
            }
            let _ = event_tx.send(other).await;
        }
    }
}
