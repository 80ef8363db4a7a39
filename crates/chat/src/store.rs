//! Persistence seam for chat messages.
//!
//! Sessions talk to the store through the [`MessageStore`] trait so the hub
//! can be exercised without a database; the production implementation wraps
//! the sqlite message repository.

use async_trait::async_trait;
use thiserror::Error;

use courier_database::{DatabaseError, MessageRepository, NewMessage, StoredMessage};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message store unavailable: {0}")]
    Unavailable(String),
}

impl From<DatabaseError> for StoreError {
    fn from(error: DatabaseError) -> Self {
        StoreError::Unavailable(error.to_string())
    }
}

/// Durable, append-only persistence of chat messages, queryable by
/// participant pair in chronological order.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append a message; the store assigns the id and creation timestamp.
    async fn append(&self, message: &NewMessage) -> Result<StoredMessage, StoreError>;

    /// All messages between the pair, in either direction, oldest first.
    async fn history(
        &self,
        participant_a: &str,
        participant_b: &str,
    ) -> Result<Vec<StoredMessage>, StoreError>;
}

/// The production store, backed by the sqlite message repository.
pub struct SqliteMessageStore {
    repository: MessageRepository,
}

impl SqliteMessageStore {
    pub fn new(repository: MessageRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn append(&self, message: &NewMessage) -> Result<StoredMessage, StoreError> {
        Ok(self.repository.append(message).await?)
    }

    async fn history(
        &self,
        participant_a: &str,
        participant_b: &str,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        Ok(self
            .repository
            .history_between(participant_a, participant_b)
            .await?)
    }
}
