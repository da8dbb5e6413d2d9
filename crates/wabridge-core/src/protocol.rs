//! Line framing for the network client: one JSON object per line, shaped
//! `{"id": ..., "type": ..., "payload": ...}`. Commands only flow out and
//! events only flow in, so each direction decodes into its own type.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::events::{IpcCommand, IpcEvent};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame<T> {
    pub id: String,
    #[serde(flatten)]
    pub body: T,
}

pub type CommandFrame = Frame<IpcCommand>;
pub type EventFrame = Frame<IpcEvent>;

impl CommandFrame {
    /// A command under a fresh id; the client echoes the id back as
    /// `command_id` in its `CommandResult`.
    pub fn new(command: IpcCommand) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            body: command,
        }
    }
}

impl<T: Serialize> Frame<T> {
    pub fn encode(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

impl<T: DeserializeOwned> Frame<T> {
    pub fn decode(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChatData, MessageData};

    #[test]
    fn test_command_encodes_as_one_tagged_line() {
        let frame = CommandFrame::new(IpcCommand::DownloadMedia {
            message_id: "m1".into(),
            chat_jid: "1@s.whatsapp.net".into(),
        });
        let line = frame.encode().unwrap();

        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["id"], frame.id.as_str());
        assert_eq!(value["type"], "DownloadMedia");
        assert_eq!(value["payload"]["chat_jid"], "1@s.whatsapp.net");
    }

    #[test]
    fn test_shutdown_has_no_payload() {
        let line = CommandFrame::new(IpcCommand::Shutdown).encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "Shutdown");
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn test_decode_message_received() {
        let line = r#"{"id":"abc","type":"MessageReceived","payload":{
            "chat":{"jid":"1@s.whatsapp.net","name":"A","last_message_time":10},
            "message":{"id":"m1","chat_jid":"1@s.whatsapp.net","sender":"1","content":"hi","timestamp":10}
        }}"#;
        match EventFrame::decode(line).map(|f| f.body) {
            Ok(IpcEvent::MessageReceived {
                chat: ChatData { jid, .. },
                message: MessageData { content, media, is_from_me, .. },
            }) => {
                assert_eq!(jid, "1@s.whatsapp.net");
                assert_eq!(content, "hi");
                assert!(media.is_none());
                assert!(!is_from_me);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_command_result() {
        let line = r#"{"id":"x","type":"CommandResult","payload":{"command_id":"c1","success":false,"data":null,"error":"boom"}}"#;
        match EventFrame::decode(line).map(|f| f.body) {
            Ok(IpcEvent::CommandResult { command_id, success, error, .. }) => {
                assert_eq!(command_id, "c1");
                assert!(!success);
                assert_eq!(error.as_deref(), Some("boom"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_ready_without_payload() {
        let frame = EventFrame::decode(r#"{"id":"r","type":"Ready"}"#).unwrap();
        assert!(matches!(frame.body, IpcEvent::Ready));
    }

    #[test]
    fn test_commands_and_garbage_are_not_events() {
        let echoed = CommandFrame::new(IpcCommand::Shutdown).encode().unwrap();
        assert!(EventFrame::decode(&echoed).is_err());
        assert!(EventFrame::decode("not json").is_err());
    }
}
