use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use wabridge_core::{ChatData, IpcEvent, MessageData, format_jid_for_display};
use wabridge_db::{BridgeDb, Chat, Message, UpsertOutcome};
use wabridge_ipc::NetworkManager;

use crate::error::{Result, WorkerError};
use crate::events::WorkerEvent;

pub struct BridgeWorker {
    db: Arc<BridgeDb>,
    network: Arc<NetworkManager>,
    ipc_rx: Option<mpsc::Receiver<IpcEvent>>,
    ingestion: Option<JoinHandle<()>>,
    event_tx: mpsc::Sender<WorkerEvent>,
    event_rx: Option<mpsc::Receiver<WorkerEvent>>,
}

impl BridgeWorker {
    pub fn new(db: Arc<BridgeDb>, mut network: NetworkManager) -> Self {
        let ipc_rx = network.take_event_receiver();
        let (event_tx, event_rx) = mpsc::channel(1000);

        Self {
            db,
            network: Arc::new(network),
            ipc_rx,
            ingestion: None,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<WorkerEvent>> {
        self.event_rx.take()
    }

    pub fn db(&self) -> Arc<BridgeDb> {
        self.db.clone()
    }

    pub fn network(&self) -> Arc<NetworkManager> {
        self.network.clone()
    }

    /// Starts the network client and the ingestion loop.
    pub async fn start(&mut self) -> Result<()> {
        if self.ipc_rx.is_none() {
            return Err(WorkerError::AlreadyStarted);
        }
        self.network.start().await?;

        if let Some(rx) = self.ipc_rx.take() {
            self.ingestion = Some(spawn_ingestion(self.db.clone(), rx, self.event_tx.clone()));
        }
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.network.stop().await?;
        if let Some(handle) = self.ingestion.take() {
            handle.abort();
        }
        Ok(())
    }
}

/// Drains network events into the store until the sender side closes.
/// A failed event is reported and skipped; it never stops the loop.
pub fn spawn_ingestion(
    db: Arc<BridgeDb>,
    mut rx: mpsc::Receiver<IpcEvent>,
    event_tx: mpsc::Sender<WorkerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(e) = handle_ipc_event(&db, &event_tx, event).await {
                tracing::error!("Error handling network event: {}", e);
                let _ = event_tx
                    .send(WorkerEvent::Error {
                        error: e.to_string(),
                    })
                    .await;
            }
        }
        tracing::debug!("Ingestion loop finished");
    })
}

async fn handle_ipc_event(
    db: &BridgeDb,
    event_tx: &mpsc::Sender<WorkerEvent>,
    event: IpcEvent,
) -> Result<()> {
    match event {
        IpcEvent::Ready => {
            let _ = event_tx.send(WorkerEvent::ClientReady).await;
        }

        IpcEvent::Connected { phone_number } => {
            let _ = event_tx.send(WorkerEvent::Connected { phone_number }).await;
        }

        IpcEvent::Disconnected { reason } => {
            let _ = event_tx.send(WorkerEvent::Disconnected { reason }).await;
        }

        IpcEvent::MessageReceived { chat, message } => {
            let chat_jid = message.chat_jid.clone();
            let message_id = message.id.clone();
            let timestamp = message.timestamp;
            let direction = if message.is_from_me { "→" } else { "←" };
            tracing::debug!("  {} {}: {}", direction, chat_jid, preview(&message));

            let event = match ingest(db, chat, message).await? {
                UpsertOutcome::Stored => WorkerEvent::MessageStored {
                    chat_jid,
                    message_id,
                    timestamp,
                },
                UpsertOutcome::Skipped => WorkerEvent::MessageSkipped {
                    chat_jid,
                    message_id,
                },
            };
            let _ = event_tx.send(event).await;
        }

        IpcEvent::Error { error } => {
            let _ = event_tx.send(WorkerEvent::Error { error }).await;
        }

        // Routed to the waiting caller by the network manager.
        IpcEvent::CommandResult { .. } => {}
    }

    Ok(())
}

/// Stores one inbound event. A chat that arrives without a name keeps the
/// one already stored, or is labelled from its JID if it has none yet.
pub async fn ingest(db: &BridgeDb, chat: ChatData, message: MessageData) -> Result<UpsertOutcome> {
    let mut chat = Chat::from(chat);
    if chat.name.as_deref().is_none_or(str::is_empty) {
        chat.name = match db.get_chat(&chat.jid).await {
            Ok(stored) if stored.name.as_deref().is_some_and(|n| !n.is_empty()) => None,
            Ok(_) => Some(format_jid_for_display(&chat.jid)),
            Err(e) if e.is_not_found() => Some(format_jid_for_display(&chat.jid)),
            Err(e) => return Err(e.into()),
        };
    }
    let message = Message::from(message);

    Ok(db.record_inbound(&chat, &message).await?)
}

fn preview(message: &MessageData) -> String {
    if message.content.is_empty() {
        let kind = message
            .media
            .as_ref()
            .map(|m| m.media_type.as_str())
            .unwrap_or("empty");
        return format!("[{}]", kind);
    }
    let mut chars = message.content.chars();
    let head: String = chars.by_ref().take(30).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wabridge_core::MediaData;

    async fn test_db(dir: &tempfile::TempDir) -> Arc<BridgeDb> {
        Arc::new(BridgeDb::new_with_path(&dir.path().join("messages.db")).await.unwrap())
    }

    fn chat(jid: &str, name: Option<&str>) -> ChatData {
        ChatData {
            jid: jid.to_string(),
            name: name.map(str::to_string),
            last_message_time: 1_700_000_000,
        }
    }

    fn message(id: &str, chat_jid: &str, content: &str) -> MessageData {
        MessageData {
            id: id.to_string(),
            chat_jid: chat_jid.to_string(),
            sender: "5511999999999".to_string(),
            content: content.to_string(),
            timestamp: 1_700_000_000,
            is_from_me: false,
            media: None,
        }
    }

    #[tokio::test]
    async fn test_ingest_names_unnamed_chat_from_jid() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir).await;
        let jid = "5511999999999@s.whatsapp.net";

        let outcome = ingest(&db, chat(jid, None), message("m1", jid, "oi")).await.unwrap();

        assert_eq!(outcome, UpsertOutcome::Stored);
        let stored = db.get_chat(jid).await.unwrap();
        assert_eq!(stored.name, Some(format_jid_for_display(jid)));
    }

    #[tokio::test]
    async fn test_ingest_keeps_given_name() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir).await;
        let jid = "123456789-987654321@g.us";

        ingest(&db, chat(jid, Some("Family")), message("m1", jid, "hello"))
            .await
            .unwrap();

        assert_eq!(db.get_chat(jid).await.unwrap().name.as_deref(), Some("Family"));
    }

    #[tokio::test]
    async fn test_unnamed_event_keeps_known_name() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir).await;
        let jid = "123456789-987654321@g.us";

        ingest(&db, chat(jid, Some("Family")), message("m1", jid, "hello"))
            .await
            .unwrap();
        ingest(&db, chat(jid, None), message("m2", jid, "again"))
            .await
            .unwrap();

        assert_eq!(db.get_chat(jid).await.unwrap().name.as_deref(), Some("Family"));
        assert_eq!(db.count_messages(Some(jid)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ingestion_loop_reports_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir).await;
        let (ipc_tx, ipc_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let handle = spawn_ingestion(db.clone(), ipc_rx, event_tx);
        let jid = "5511999999999@s.whatsapp.net";

        ipc_tx.send(IpcEvent::Ready).await.unwrap();
        ipc_tx
            .send(IpcEvent::MessageReceived {
                chat: chat(jid, Some("Ana")),
                message: message("m1", jid, "hello"),
            })
            .await
            .unwrap();
        ipc_tx
            .send(IpcEvent::MessageReceived {
                chat: chat(jid, Some("Ana")),
                message: message("m2", jid, ""),
            })
            .await
            .unwrap();
        drop(ipc_tx);
        handle.await.unwrap();

        assert!(matches!(event_rx.recv().await, Some(WorkerEvent::ClientReady)));
        assert!(matches!(
            event_rx.recv().await,
            Some(WorkerEvent::MessageStored { message_id, .. }) if message_id == "m1"
        ));
        assert!(matches!(
            event_rx.recv().await,
            Some(WorkerEvent::MessageSkipped { message_id, .. }) if message_id == "m2"
        ));
        assert_eq!(db.count_messages(Some(jid)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ingestion_loop_survives_failed_event() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir).await;
        let (ipc_tx, ipc_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let handle = spawn_ingestion(db.clone(), ipc_rx, event_tx);
        let jid = "5511999999999@s.whatsapp.net";

        // Message claims a different chat than the one delivered with it.
        ipc_tx
            .send(IpcEvent::MessageReceived {
                chat: chat(jid, None),
                message: message("m1", "5511888888888@s.whatsapp.net", "hi"),
            })
            .await
            .unwrap();
        ipc_tx
            .send(IpcEvent::MessageReceived {
                chat: chat(jid, None),
                message: MessageData {
                    media: Some(MediaData {
                        media_type: "image".into(),
                        filename: Some("photo.jpg".into()),
                        ..Default::default()
                    }),
                    ..message("m2", jid, "")
                },
            })
            .await
            .unwrap();
        drop(ipc_tx);
        handle.await.unwrap();

        assert!(matches!(event_rx.recv().await, Some(WorkerEvent::Error { .. })));
        assert!(matches!(
            event_rx.recv().await,
            Some(WorkerEvent::MessageStored { message_id, .. }) if message_id == "m2"
        ));
        let stored = db.get_message("m2", jid).await.unwrap();
        assert!(stored.has_media());
    }
}
