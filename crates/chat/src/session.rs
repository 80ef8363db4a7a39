//! Connection sessions and the hub that owns the shared state they touch.
//!
//! A session exists per accepted client stream. The transport itself is
//! driven by the gateway; this module owns everything between the decoded
//! inbound event and the outbound channels: registration, presence
//! broadcasts, persistence, and routing.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use courier_database::{MessageKind, NewMessage};

use crate::dispatcher::Dispatcher;
use crate::protocol::{ClientEvent, Presence, ServerEvent};
use crate::registry::{ConnectionRegistry, RegisteredConnection};
use crate::store::MessageStore;

/// The per-process chat hub: registry, dispatcher, and store, constructed
/// once and injected into every session.
#[derive(Clone)]
pub struct ChatHub {
    registry: Arc<ConnectionRegistry>,
    dispatcher: Dispatcher,
    store: Arc<dyn MessageStore>,
    outbound_buffer: usize,
}

impl ChatHub {
    pub fn new(store: Arc<dyn MessageStore>, outbound_buffer: usize) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Dispatcher::new(registry.clone());
        Self {
            registry,
            dispatcher,
            store,
            outbound_buffer,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    pub async fn is_online(&self, identity: &str) -> bool {
        self.registry.is_online(identity).await
    }

    /// Open a session for an authenticated participant: create its outbound
    /// channel, register it (superseding any previous connection for the same
    /// identity), and announce it online.
    ///
    /// The returned receiver feeds the transport writer. The registry entry
    /// holds the only long-lived sender for the connection, so dropping it
    /// (deregistration or supersession) closes the channel and with it the
    /// writer loop of the session that owned it.
    pub async fn connect(&self, identity: &str) -> (Session, mpsc::Receiver<ServerEvent>) {
        let (sender, receiver) = mpsc::channel(self.outbound_buffer);
        let conn_id = Uuid::new_v4();

        let superseded = self
            .registry
            .register(identity, RegisteredConnection { conn_id, sender })
            .await;

        if let Some(previous) = superseded {
            info!(
                user = %identity,
                old_conn = %previous.conn_id,
                "superseding existing connection"
            );
        }

        self.dispatcher
            .broadcast_status(identity, Presence::Online)
            .await;

        let session = Session {
            identity: identity.to_string(),
            conn_id,
            registry: self.registry.clone(),
            dispatcher: self.dispatcher.clone(),
            store: self.store.clone(),
        };

        (session, receiver)
    }
}

/// Server-side state for one live client connection.
pub struct Session {
    identity: String,
    conn_id: Uuid,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Dispatcher,
    store: Arc<dyn MessageStore>,
}

impl Session {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn conn_id(&self) -> Uuid {
        self.conn_id
    }

    /// Handle one decoded inbound event.
    pub async fn handle_event(&self, event: ClientEvent) {
        match event {
            ClientEvent::Typing {
                receiver_id,
                typing,
            } => {
                // Ephemeral: forwarded if the receiver is online, never
                // persisted, nothing back to the sender.
                self.dispatcher
                    .send_to(
                        &receiver_id,
                        ServerEvent::Typing {
                            sender_id: self.identity.clone(),
                            typing,
                        },
                    )
                    .await;
            }
            ClientEvent::Text { receiver_id, text } => {
                self.persist_and_deliver(NewMessage {
                    sender_id: self.identity.clone(),
                    receiver_id,
                    kind: MessageKind::Text,
                    text: Some(text),
                    file_url: None,
                    file_name: None,
                })
                .await;
            }
            ClientEvent::Attachment {
                kind,
                receiver_id,
                file_url,
                file_name,
            } => {
                self.persist_and_deliver(NewMessage {
                    sender_id: self.identity.clone(),
                    receiver_id,
                    kind: kind.message_kind(),
                    text: None,
                    file_url: Some(file_url),
                    file_name,
                })
                .await;
            }
        }
    }

    /// Persist a message-bearing event, then deliver it live to the receiver
    /// and echo it to the sender. Persistence is best-effort: a store failure
    /// is logged and the event still goes out, minus the stored id.
    async fn persist_and_deliver(&self, message: NewMessage) {
        let receiver_id = message.receiver_id.clone();

        let event = match self.store.append(&message).await {
            Ok(stored) => ServerEvent::from_stored(&stored),
            Err(error) => {
                warn!(
                    user = %self.identity,
                    receiver = %receiver_id,
                    %error,
                    "failed to persist chat message, delivering live only"
                );
                ServerEvent::unpersisted(&message, chrono::Utc::now().to_rfc3339())
            }
        };

        self.dispatcher.send_to(&receiver_id, event.clone()).await;
        // Echo so the sender's client receives the server-assigned metadata.
        self.dispatcher.send_to(&self.identity, event).await;
    }

    /// Tear the session down: remove the registry entry and announce the
    /// participant offline. Safe on every exit path; a session superseded by
    /// a newer connection leaves quietly because the participant is still
    /// online through its replacement.
    pub async fn disconnect(self) {
        if self.registry.deregister(&self.identity, self.conn_id).await {
            self.dispatcher
                .broadcast_status(&self.identity, Presence::Offline)
                .await;
            info!(user = %self.identity, "chat session closed");
        } else {
            debug!(
                user = %self.identity,
                "session already superseded, skipping offline broadcast"
            );
        }
    }
}
