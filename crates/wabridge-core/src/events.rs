use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum IpcCommand {
    SendMessage { recipient: String, message: String },
    SendFile { recipient: String, file_path: String },
    DownloadMedia { message_id: String, chat_jid: String },
    Shutdown,
}

impl IpcCommand {
    pub fn name(&self) -> &'static str {
        match self {
            IpcCommand::SendMessage { .. } => "SendMessage",
            IpcCommand::SendFile { .. } => "SendFile",
            IpcCommand::DownloadMedia { .. } => "DownloadMedia",
            IpcCommand::Shutdown => "Shutdown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum IpcEvent {
    Ready,
    Connected { phone_number: Option<String> },
    Disconnected { reason: String },

    MessageReceived { chat: ChatData, message: MessageData },

    Error { error: String },

    CommandResult {
        command_id: String,
        success: bool,
        data: Option<serde_json::Value>,
        error: Option<String>,
    },
}

/// Chat metadata as reported by the network client alongside a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatData {
    pub jid: String,
    pub name: Option<String>,
    pub last_message_time: i64,
}

/// An inbound message as reported by the network client. Timestamps are unix
/// seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageData {
    pub id: String,
    pub chat_jid: String,
    pub sender: String,
    #[serde(default)]
    pub content: String,
    pub timestamp: i64,
    #[serde(default)]
    pub is_from_me: bool,
    #[serde(default)]
    pub media: Option<MediaData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaData {
    pub media_type: String,
    pub filename: Option<String>,
    pub url: Option<String>,
    pub media_key: Option<Vec<u8>>,
    pub file_sha256: Option<Vec<u8>>,
    pub file_enc_sha256: Option<Vec<u8>>,
    pub file_length: Option<i64>,
}
