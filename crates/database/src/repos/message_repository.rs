//! Repository for chat message persistence.

use crate::entities::message::{MessageKind, NewMessage, StoredMessage};
use crate::types::{DatabaseError, DatabaseResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for the append-only message history table.
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message, assigning the server-side public id and creation
    /// timestamp. Returns the stored row as it will appear in history.
    pub async fn append(&self, message: &NewMessage) -> DatabaseResult<StoredMessage> {
        let public_id = cuid2::cuid();
        let created_at = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO messages (public_id, sender_id, receiver_id, kind, text, file_url, file_name, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&message.sender_id)
        .bind(&message.receiver_id)
        .bind(message.kind.as_str())
        .bind(&message.text)
        .bind(&message.file_url)
        .bind(&message.file_name)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let row_id = result.last_insert_rowid();

        info!(
            message_id = %public_id,
            sender = %message.sender_id,
            receiver = %message.receiver_id,
            kind = %message.kind,
            "stored chat message"
        );

        Ok(StoredMessage {
            row_id,
            public_id,
            sender_id: message.sender_id.clone(),
            receiver_id: message.receiver_id.clone(),
            kind: message.kind,
            text: message.text.clone(),
            file_url: message.file_url.clone(),
            file_name: message.file_name.clone(),
            created_at,
        })
    }

    /// Fetch every message exchanged between the two participants, in either
    /// direction, oldest first.
    pub async fn history_between(
        &self,
        participant_a: &str,
        participant_b: &str,
    ) -> DatabaseResult<Vec<StoredMessage>> {
        let rows = sqlx::query(
            "SELECT id, public_id, sender_id, receiver_id, kind, text, file_url, file_name, created_at
             FROM messages
             WHERE (sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1)
             ORDER BY created_at ASC, id ASC",
        )
        .bind(participant_a)
        .bind(participant_b)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let messages = rows
            .into_iter()
            .map(|row| {
                let kind: String = row
                    .try_get("kind")
                    .map_err(|e| DatabaseError::Query(e.to_string()))?;

                Ok(StoredMessage {
                    row_id: row
                        .try_get("id")
                        .map_err(|e| DatabaseError::Query(e.to_string()))?,
                    public_id: row
                        .try_get("public_id")
                        .map_err(|e| DatabaseError::Query(e.to_string()))?,
                    sender_id: row
                        .try_get("sender_id")
                        .map_err(|e| DatabaseError::Query(e.to_string()))?,
                    receiver_id: row
                        .try_get("receiver_id")
                        .map_err(|e| DatabaseError::Query(e.to_string()))?,
                    kind: MessageKind::from(kind.as_str()),
                    text: row
                        .try_get("text")
                        .map_err(|e| DatabaseError::Query(e.to_string()))?,
                    file_url: row
                        .try_get("file_url")
                        .map_err(|e| DatabaseError::Query(e.to_string()))?,
                    file_name: row
                        .try_get("file_name")
                        .map_err(|e| DatabaseError::Query(e.to_string()))?,
                    created_at: row
                        .try_get("created_at")
                        .map_err(|e| DatabaseError::Query(e.to_string()))?,
                })
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        Ok(messages)
    }
}
