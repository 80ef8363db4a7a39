//! Wire protocol for the chat WebSocket.
//!
//! One JSON object per message unit, tagged by `type`. Client events carry
//! camelCase file fields (`fileUrl`, `fileName`); server events mirror them
//! and add server-assigned metadata (`id`, `created_at`).

use courier_database::{MessageKind, NewMessage, StoredMessage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unrecognized event kind: {0:?}")]
    UnknownKind(String),

    #[error("missing or empty field: {0}")]
    MissingField(&'static str),
}

/// An event decoded from a client stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Text {
        receiver_id: String,
        text: String,
    },
    Typing {
        receiver_id: String,
        typing: bool,
    },
    Attachment {
        kind: AttachmentKind,
        receiver_id: String,
        file_url: String,
        file_name: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    File,
    Image,
    Audio,
}

impl AttachmentKind {
    pub fn message_kind(self) -> MessageKind {
        match self {
            AttachmentKind::File => MessageKind::File,
            AttachmentKind::Image => MessageKind::Image,
            AttachmentKind::Audio => MessageKind::Audio,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawClientEvent {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    receiver_id: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(rename = "fileUrl", default)]
    file_url: Option<String>,
    #[serde(rename = "fileName", default)]
    file_name: Option<String>,
    #[serde(default)]
    typing: Option<bool>,
}

impl ClientEvent {
    /// Decode one inbound message unit.
    ///
    /// A missing or empty `type` decodes as `text`, which is what existing
    /// clients send for plain messages. Every other unrecognized kind is
    /// rejected rather than falling through to the text branch.
    pub fn decode(input: &str) -> Result<Self, ProtocolError> {
        let raw: RawClientEvent = serde_json::from_str(input)?;

        let receiver_id = raw
            .receiver_id
            .filter(|id| !id.is_empty())
            .ok_or(ProtocolError::MissingField("receiver_id"))?;

        match raw.kind.as_deref().unwrap_or("") {
            "" | "text" => Ok(ClientEvent::Text {
                receiver_id,
                text: raw.text.unwrap_or_default(),
            }),
            "typing" => Ok(ClientEvent::Typing {
                receiver_id,
                typing: raw.typing.unwrap_or(false),
            }),
            kind @ ("file" | "image" | "audio") => {
                let file_url = raw
                    .file_url
                    .filter(|url| !url.is_empty())
                    .ok_or(ProtocolError::MissingField("fileUrl"))?;

                let kind = match kind {
                    "file" => AttachmentKind::File,
                    "image" => AttachmentKind::Image,
                    _ => AttachmentKind::Audio,
                };

                Ok(ClientEvent::Attachment {
                    kind,
                    receiver_id,
                    file_url,
                    file_name: raw.file_name,
                })
            }
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}

/// An event sent to a client stream.
///
/// Message events carry the store-assigned `id` when persistence succeeded;
/// an event delivered live after a store failure has no `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Text {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        id: Option<String>,
        sender_id: String,
        receiver_id: String,
        text: String,
        created_at: String,
    },
    File {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        id: Option<String>,
        sender_id: String,
        receiver_id: String,
        #[serde(rename = "fileUrl")]
        file_url: String,
        #[serde(rename = "fileName", skip_serializing_if = "Option::is_none", default)]
        file_name: Option<String>,
        created_at: String,
    },
    Image {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        id: Option<String>,
        sender_id: String,
        receiver_id: String,
        #[serde(rename = "fileUrl")]
        file_url: String,
        #[serde(rename = "fileName", skip_serializing_if = "Option::is_none", default)]
        file_name: Option<String>,
        created_at: String,
    },
    Audio {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        id: Option<String>,
        sender_id: String,
        receiver_id: String,
        #[serde(rename = "fileUrl")]
        file_url: String,
        #[serde(rename = "fileName", skip_serializing_if = "Option::is_none", default)]
        file_name: Option<String>,
        created_at: String,
    },
    Typing {
        sender_id: String,
        typing: bool,
    },
    Status {
        #[serde(rename = "userId")]
        user_id: String,
        status: Presence,
    },
}

impl ServerEvent {
    /// Build the live event for a message that was durably stored.
    pub fn from_stored(message: &StoredMessage) -> Self {
        Self::message_event(
            message.kind,
            Some(message.public_id.clone()),
            message.sender_id.clone(),
            message.receiver_id.clone(),
            message.text.clone(),
            message.file_url.clone(),
            message.file_name.clone(),
            message.created_at.clone(),
        )
    }

    /// Build the live event for a message the store failed to accept. The
    /// timestamp is stamped locally; there is no id to carry.
    pub fn unpersisted(message: &NewMessage, created_at: String) -> Self {
        Self::message_event(
            message.kind,
            None,
            message.sender_id.clone(),
            message.receiver_id.clone(),
            message.text.clone(),
            message.file_url.clone(),
            message.file_name.clone(),
            created_at,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn message_event(
        kind: MessageKind,
        id: Option<String>,
        sender_id: String,
        receiver_id: String,
        text: Option<String>,
        file_url: Option<String>,
        file_name: Option<String>,
        created_at: String,
    ) -> Self {
        match kind {
            MessageKind::Text => ServerEvent::Text {
                id,
                sender_id,
                receiver_id,
                text: text.unwrap_or_default(),
                created_at,
            },
            MessageKind::File => ServerEvent::File {
                id,
                sender_id,
                receiver_id,
                file_url: file_url.unwrap_or_default(),
                file_name,
                created_at,
            },
            MessageKind::Image => ServerEvent::Image {
                id,
                sender_id,
                receiver_id,
                file_url: file_url.unwrap_or_default(),
                file_name,
                created_at,
            },
            MessageKind::Audio => ServerEvent::Audio {
                id,
                sender_id,
                receiver_id,
                file_url: file_url.unwrap_or_default(),
                file_name,
                created_at,
            },
        }
    }

    /// Event kind as it appears on the wire, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Text { .. } => "text",
            ServerEvent::File { .. } => "file",
            ServerEvent::Image { .. } => "image",
            ServerEvent::Audio { .. } => "audio",
            ServerEvent::Typing { .. } => "typing",
            ServerEvent::Status { .. } => "status",
        }
    }
}

/// Derived online/offline state of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    Offline,
}

impl std::fmt::Display for Presence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Presence::Online => f.write_str("online"),
            Presence::Offline => f.write_str("offline"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_explicit_text_event() {
        let event =
            ClientEvent::decode(r#"{"type": "text", "receiver_id": "bob", "text": "hi"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::Text {
                receiver_id: "bob".to_string(),
                text: "hi".to_string(),
            }
        );
    }

    #[test]
    fn decode_defaults_missing_kind_to_text() {
        let event = ClientEvent::decode(r#"{"receiver_id": "bob", "text": "hi"}"#).unwrap();
        assert!(matches!(event, ClientEvent::Text { .. }));

        let event = ClientEvent::decode(r#"{"type": "", "receiver_id": "bob"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::Text {
                receiver_id: "bob".to_string(),
                text: String::new(),
            }
        );
    }

    #[test]
    fn decode_typing_event() {
        let event =
            ClientEvent::decode(r#"{"type": "typing", "receiver_id": "bob", "typing": true}"#)
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::Typing {
                receiver_id: "bob".to_string(),
                typing: true,
            }
        );
    }

    #[test]
    fn decode_attachment_events() {
        for (kind_str, kind) in [
            ("file", AttachmentKind::File),
            ("image", AttachmentKind::Image),
            ("audio", AttachmentKind::Audio),
        ] {
            let input = format!(
                r#"{{"type": "{kind_str}", "receiver_id": "bob", "fileUrl": "/uploads/1_a.bin", "fileName": "a.bin"}}"#
            );
            let event = ClientEvent::decode(&input).unwrap();
            assert_eq!(
                event,
                ClientEvent::Attachment {
                    kind,
                    receiver_id: "bob".to_string(),
                    file_url: "/uploads/1_a.bin".to_string(),
                    file_name: Some("a.bin".to_string()),
                }
            );
        }
    }

    #[test]
    fn decode_rejects_attachment_without_url() {
        let result = ClientEvent::decode(r#"{"type": "file", "receiver_id": "bob"}"#);
        assert!(matches!(result, Err(ProtocolError::MissingField("fileUrl"))));

        let result =
            ClientEvent::decode(r#"{"type": "image", "receiver_id": "bob", "fileUrl": ""}"#);
        assert!(matches!(result, Err(ProtocolError::MissingField("fileUrl"))));
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        let result = ClientEvent::decode(r#"{"type": "status", "receiver_id": "bob"}"#);
        assert!(matches!(result, Err(ProtocolError::UnknownKind(_))));

        let result = ClientEvent::decode(r#"{"type": "poke", "receiver_id": "bob"}"#);
        assert!(matches!(result, Err(ProtocolError::UnknownKind(_))));
    }

    #[test]
    fn decode_rejects_missing_receiver() {
        let result = ClientEvent::decode(r#"{"type": "text", "text": "hi"}"#);
        assert!(matches!(
            result,
            Err(ProtocolError::MissingField("receiver_id"))
        ));

        let result = ClientEvent::decode(r#"{"type": "text", "receiver_id": "", "text": "hi"}"#);
        assert!(matches!(
            result,
            Err(ProtocolError::MissingField("receiver_id"))
        ));
    }

    #[test]
    fn decode_rejects_malformed_json() {
        let result = ClientEvent::decode("not json at all");
        assert!(matches!(result, Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn server_text_event_wire_shape() {
        let event = ServerEvent::Text {
            id: Some("m1".to_string()),
            sender_id: "alice".to_string(),
            receiver_id: "bob".to_string(),
            text: "hi".to_string(),
            created_at: "2024-05-01T12:00:00Z".to_string(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["id"], "m1");
        assert_eq!(value["sender_id"], "alice");
        assert_eq!(value["created_at"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn server_file_event_uses_camel_case_file_fields() {
        let event = ServerEvent::File {
            id: None,
            sender_id: "alice".to_string(),
            receiver_id: "bob".to_string(),
            file_url: "/uploads/1_a.bin".to_string(),
            file_name: Some("a.bin".to_string()),
            created_at: "2024-05-01T12:00:00Z".to_string(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "file");
        assert_eq!(value["fileUrl"], "/uploads/1_a.bin");
        assert_eq!(value["fileName"], "a.bin");
        // Unpersisted events omit the id entirely.
        assert!(value.get("id").is_none());
    }

    #[test]
    fn status_event_uses_user_id_key() {
        let event = ServerEvent::Status {
            user_id: "alice".to_string(),
            status: Presence::Offline,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "status");
        assert_eq!(value["userId"], "alice");
        assert_eq!(value["status"], "offline");
    }

    #[test]
    fn from_stored_carries_id_and_timestamp() {
        let stored = StoredMessage {
            row_id: 1,
            public_id: "m42".to_string(),
            sender_id: "alice".to_string(),
            receiver_id: "bob".to_string(),
            kind: MessageKind::Audio,
            text: None,
            file_url: Some("/uploads/2_note.ogg".to_string()),
            file_name: Some("note.ogg".to_string()),
            created_at: "2024-05-01T12:00:00Z".to_string(),
        };

        let event = ServerEvent::from_stored(&stored);
        assert_eq!(
            event,
            ServerEvent::Audio {
                id: Some("m42".to_string()),
                sender_id: "alice".to_string(),
                receiver_id: "bob".to_string(),
                file_url: "/uploads/2_note.ogg".to_string(),
                file_name: Some("note.ogg".to_string()),
                created_at: "2024-05-01T12:00:00Z".to_string(),
            }
        );
    }
}
