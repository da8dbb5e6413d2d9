use std::str::FromStr;

use serde::{Deserialize, Serialize};
use wabridge_core::{ChatData, JidKind, MessageData};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Chat {
    pub jid: String,
    pub name: Option<String>,
    pub last_message_time: i64,
}

impl Chat {
    pub fn new(jid: impl Into<String>, name: Option<&str>, last_message_time: i64) -> Self {
        Self {
            jid: jid.into(),
            name: name.map(str::to_string),
            last_message_time,
        }
    }

    pub fn kind(&self) -> JidKind {
        JidKind::classify(&self.jid)
    }

    pub fn is_group(&self) -> bool {
        self.kind() == JidKind::Group
    }
}

impl From<ChatData> for Chat {
    fn from(chat: ChatData) -> Self {
        Self {
            jid: chat.jid,
            name: chat.name,
            last_message_time: chat.last_message_time,
        }
    }
}

/// A stored message. The media key and hashes are needed to fetch and
/// decrypt attachments, so they never leave the process in JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: String,
    pub chat_jid: String,
    pub sender: String,
    pub content: String,
    pub timestamp: i64,
    pub is_from_me: bool,
    pub media_type: Option<String>,
    pub filename: Option<String>,
    pub url: Option<String>,
    #[serde(skip_serializing, default)]
    pub media_key: Option<Vec<u8>>,
    #[serde(skip_serializing, default)]
    pub file_sha256: Option<Vec<u8>>,
    #[serde(skip_serializing, default)]
    pub file_enc_sha256: Option<Vec<u8>>,
    pub file_length: Option<i64>,
}

impl Message {
    pub fn text(
        id: impl Into<String>,
        chat_jid: impl Into<String>,
        sender: impl Into<String>,
        content: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            chat_jid: chat_jid.into(),
            sender: sender.into(),
            content: content.into(),
            timestamp,
            ..Default::default()
        }
    }

    pub fn has_media(&self) -> bool {
        self.media_type.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Neither text nor media: nothing worth keeping.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && !self.has_media()
    }
}

impl From<MessageData> for Message {
    fn from(msg: MessageData) -> Self {
        let media = msg.media.unwrap_or_default();
        Self {
            id: msg.id,
            chat_jid: msg.chat_jid,
            sender: msg.sender,
            content: msg.content,
            timestamp: msg.timestamp,
            is_from_me: msg.is_from_me,
            media_type: Some(media.media_type).filter(|t| !t.is_empty()),
            filename: media.filename,
            url: media.url,
            media_key: media.media_key,
            file_sha256: media.file_sha256,
            file_enc_sha256: media.file_enc_sha256,
            file_length: media.file_length,
        }
    }
}

/// A search hit together with the owning chat's display name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MessageRecord {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub message: Message,
    pub chat_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageContext {
    pub message: Message,
    pub before: Vec<Message>,
    pub after: Vec<Message>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Stored,
    /// The message had no content and no media and was dropped.
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChatSort {
    #[default]
    LastActive,
    Name,
}

impl FromStr for ChatSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last_active" => Ok(ChatSort::LastActive),
            "name" => Ok(ChatSort::Name),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub query: Option<String>,
    pub chat_jid: Option<String>,
    pub sender: Option<String>,
    /// Inclusive lower bound, unix seconds.
    pub after: Option<i64>,
    /// Inclusive upper bound, unix seconds.
    pub before: Option<i64>,
}

impl MessageFilter {
    pub fn for_chat(chat_jid: impl Into<String>) -> Self {
        Self {
            chat_jid: Some(chat_jid.into()),
            ..Default::default()
        }
    }
}
