//! Message entity definitions

use serde::{Deserialize, Serialize};

/// A durably stored chat message. Immutable once created; the chat subsystem
/// has no update or delete path for message rows.
///
/// The serialized form matches the history API: `public_id` travels as `id`,
/// the kind as `type`, and payload fields are omitted when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredMessage {
    #[serde(skip_serializing)]
    pub row_id: i64,
    #[serde(rename = "id")]
    pub public_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub created_at: String,
}

/// The payload a session submits for persistence. The store assigns the
/// public id and the creation timestamp; clients never supply either.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub sender_id: String,
    pub receiver_id: String,
    pub kind: MessageKind,
    pub text: Option<String>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    File,
    Image,
    Audio,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::File => "file",
            MessageKind::Image => "image",
            MessageKind::Audio => "audio",
        }
    }
}

impl From<&str> for MessageKind {
    fn from(s: &str) -> Self {
        match s {
            "file" => MessageKind::File,
            "image" => MessageKind::Image,
            "audio" => MessageKind::Audio,
            _ => MessageKind::Text,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
