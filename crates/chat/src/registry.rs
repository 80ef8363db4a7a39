//! Connection registry: the shared map from participant identity to the
//! active outbound channel.
//!
//! Invariant: at most one live entry per identity. A participant opening a
//! second stream supersedes the previous entry; the superseded channel is
//! returned to the caller, and dropping it is what tears the old session
//! down. The lock is held only for map access, never across a channel send.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::protocol::ServerEvent;

/// One registered connection: the outbound channel plus the id that lets a
/// session prove the entry is still its own at deregistration time.
#[derive(Debug, Clone)]
pub struct RegisteredConnection {
    pub conn_id: Uuid,
    pub sender: mpsc::Sender<ServerEvent>,
}

/// Process-wide map of online participants. Constructed once and shared by
/// reference with every session.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, RegisteredConnection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `identity`. Returns the superseded
    /// connection, if any, so the caller can evict it.
    pub async fn register(
        &self,
        identity: &str,
        connection: RegisteredConnection,
    ) -> Option<RegisteredConnection> {
        let mut connections = self.connections.write().await;
        connections.insert(identity.to_string(), connection)
    }

    /// Remove the entry for `identity`, but only if it still belongs to the
    /// caller's connection. Idempotent: an absent entry or one owned by a
    /// newer connection is left alone and `false` is returned.
    pub async fn deregister(&self, identity: &str, conn_id: Uuid) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get(identity) {
            Some(existing) if existing.conn_id == conn_id => {
                connections.remove(identity);
                true
            }
            _ => false,
        }
    }

    /// Channel for direct-message routing. Clones the sender out of the lock.
    pub async fn lookup(&self, identity: &str) -> Option<mpsc::Sender<ServerEvent>> {
        let connections = self.connections.read().await;
        connections.get(identity).map(|conn| conn.sender.clone())
    }

    /// All registered channels, for full fan-out.
    pub async fn snapshot(&self) -> Vec<(String, mpsc::Sender<ServerEvent>)> {
        let connections = self.connections.read().await;
        connections
            .iter()
            .map(|(identity, conn)| (identity.clone(), conn.sender.clone()))
            .collect()
    }

    /// A participant is online iff it has a registry entry.
    pub async fn is_online(&self, identity: &str) -> bool {
        let connections = self.connections.read().await;
        connections.contains_key(identity)
    }

    pub async fn online_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }
}
