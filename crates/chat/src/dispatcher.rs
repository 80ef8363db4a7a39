//! Outbound event routing: one recipient for direct events, every registered
//! channel for presence fan-out.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::protocol::{Presence, ServerEvent};
use crate::registry::ConnectionRegistry;

/// Routes events to registered channels. Sends never block: a full outbound
/// buffer drops the event, so one stalled client cannot stall anyone else.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver an event to one recipient. An offline recipient is expected,
    /// not an error; the event is silently dropped and `false` returned.
    pub async fn send_to(&self, receiver_id: &str, event: ServerEvent) -> bool {
        let Some(sender) = self.registry.lookup(receiver_id).await else {
            debug!(receiver = %receiver_id, kind = event.kind(), "recipient offline, dropping event");
            return false;
        };

        deliver(receiver_id, &sender, event)
    }

    /// Fan a presence change out to every registered channel, including the
    /// subject's own (clients key UI state by participant identity, so the
    /// self-notification is harmless).
    pub async fn broadcast_status(&self, participant_id: &str, presence: Presence) {
        let event = ServerEvent::Status {
            user_id: participant_id.to_string(),
            status: presence,
        };

        for (identity, sender) in self.registry.snapshot().await {
            deliver(&identity, &sender, event.clone());
        }
    }
}

fn deliver(receiver_id: &str, sender: &mpsc::Sender<ServerEvent>, event: ServerEvent) -> bool {
    match sender.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            warn!(
                receiver = %receiver_id,
                kind = event.kind(),
                "outbound buffer full, dropping event"
            );
            false
        }
        Err(TrySendError::Closed(_)) => {
            // The session is tearing down; its registry entry will follow.
            debug!(receiver = %receiver_id, "outbound channel closed, dropping event");
            false
        }
    }
}
