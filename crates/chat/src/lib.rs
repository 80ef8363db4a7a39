//! # Courier Chat Crate
//!
//! The realtime chat subsystem: a per-process hub that multiplexes many
//! concurrent client streams, tracks presence, fans out events, and keeps a
//! durable copy of message history.
//!
//! ## Architecture
//!
//! - **Registry**: the shared map from participant identity to the active
//!   outbound channel; the only state mutated by multiple sessions.
//! - **Dispatcher**: routes one event to one recipient (direct message,
//!   typing) or to every registered channel (presence changes).
//! - **Session**: one per accepted client stream; handles decoded events and
//!   performs registration/cleanup. The transport read/write loops live in
//!   the gateway, which drives this API.
//! - **Store**: the persistence seam. Sessions persist message-bearing
//!   events through [`MessageStore`] before forwarding them live.

pub mod dispatcher;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod store;

pub use dispatcher::Dispatcher;
pub use protocol::{AttachmentKind, ClientEvent, Presence, ProtocolError, ServerEvent};
pub use registry::{ConnectionRegistry, RegisteredConnection};
pub use session::{ChatHub, Session};
pub use store::{MessageStore, SqliteMessageStore, StoreError};
