//! Chat file upload endpoint.
//!
//! Accepts a multipart payload and returns a retrievable URL plus the
//! original filename. The chat protocol only ever carries the URL; the bytes
//! are served statically from the uploads directory.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::error::{GatewayError, GatewayResult};
use crate::state::GatewayState;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub url: String,
    pub name: String,
}

/// Create upload routes. The body limit sits above the configured file cap
/// so oversized files get the explicit rejection below rather than a bare 413.
pub fn create_upload_routes(max_bytes: usize) -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/api/chat/upload", post(upload_file))
        .layer(DefaultBodyLimit::max(max_bytes + 64 * 1024))
}

#[utoipa::path(
    post,
    path = "/api/chat/upload",
    tag = "Chat",
    responses(
        (status = 200, description = "Stored file URL and original name", body = UploadResponse),
        (status = 400, description = "Missing or oversized file field"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn upload_file(
    State(state): State<Arc<GatewayState>>,
    mut multipart: Multipart,
) -> GatewayResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field
            .file_name()
            .map(|name| name.to_string())
            .unwrap_or_else(|| "upload".to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| GatewayError::InvalidRequest(format!("Failed to read file: {}", e)))?;

        if data.len() > state.uploads.max_bytes {
            return Err(GatewayError::InvalidRequest(format!(
                "File exceeds upload limit of {} bytes",
                state.uploads.max_bytes
            )));
        }

        let stored_name = unique_file_name(&original_name);
        let path = state.uploads.dir.join(&stored_name);

        tokio::fs::create_dir_all(&state.uploads.dir)
            .await
            .map_err(|e| GatewayError::InternalError(format!("Failed to prepare uploads dir: {}", e)))?;
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| GatewayError::InternalError(format!("Failed to save file: {}", e)))?;

        info!(
            name = %original_name,
            stored = %stored_name,
            size = data.len(),
            "stored chat upload"
        );

        return Ok(Json(UploadResponse {
            url: format!("/uploads/{stored_name}"),
            name: original_name,
        }));
    }

    Err(GatewayError::InvalidRequest(
        "Missing file field".to_string(),
    ))
}

/// Prefix with a nanosecond timestamp so concurrent uploads of the same file
/// never collide, and strip anything path-like from the client name.
fn unique_file_name(original: &str) -> String {
    let sanitized: String = original
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();

    format!("{nanos}_{sanitized}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_file_name_sanitizes_separators() {
        let name = unique_file_name("../../etc/passwd");
        assert!(!name.contains('/'));
        assert!(name.ends_with("_.._.._etc_passwd"));
    }

    #[test]
    fn test_unique_file_name_keeps_extension() {
        let name = unique_file_name("photo.png");
        assert!(name.ends_with("_photo.png"));
    }

    #[test]
    fn test_unique_file_names_differ() {
        let a = unique_file_name("a.bin");
        let b = unique_file_name("a.bin");
        assert_ne!(a, b);
    }
}
