//! Shared application state for the gateway

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::SqlitePool;

use courier_auth::TokenVerifier;
use courier_chat::{ChatHub, MessageStore, SqliteMessageStore};
use courier_config::AppConfig;
use courier_database::MessageRepository;

/// Where uploaded chat files land and how large they may be.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

/// Shared application state containing all services
#[derive(Clone)]
pub struct GatewayState {
    /// Database connection pool
    pub pool: SqlitePool,
    /// Bearer credential verification
    pub verifier: TokenVerifier,
    /// The realtime chat hub (registry, dispatcher, store)
    pub hub: ChatHub,
    /// Upload collaborator settings
    pub uploads: UploadConfig,
}

impl GatewayState {
    /// Create a new gateway state with all services initialized
    pub fn new(pool: SqlitePool, config: &AppConfig) -> Self {
        let store: Arc<dyn MessageStore> =
            Arc::new(SqliteMessageStore::new(MessageRepository::new(pool.clone())));
        let hub = ChatHub::new(store, config.chat.outbound_buffer);
        let verifier = TokenVerifier::new(&config.auth);

        Self {
            pool,
            verifier,
            hub,
            uploads: UploadConfig {
                dir: PathBuf::from(&config.chat.uploads_dir),
                max_bytes: config.chat.max_upload_bytes,
            },
        }
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        self.hub.store()
    }
}

/// Build a state over a throwaway database, for tests across this crate.
#[cfg(test)]
pub(crate) async fn create_test_state() -> (GatewayState, tempfile::TempDir) {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let db_path = temp_dir.path().join("gateway_test.db");

    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}", db_path.display());
    config.database.max_connections = 1;
    config.chat.uploads_dir = temp_dir
        .path()
        .join("uploads")
        .to_string_lossy()
        .into_owned();

    let pool = courier_database::initialize_database(&config.database)
        .await
        .unwrap();
    (GatewayState::new(pool, &config), temp_dir)
}
