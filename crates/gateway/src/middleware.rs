//! Middleware for authentication and other cross-cutting concerns

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::{GatewayError, GatewayResult};
use crate::state::GatewayState;

/// The participant identity established by the auth middleware, available to
/// handlers through request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

/// Authentication middleware that validates bearer tokens
pub async fn auth_middleware(
    State(state): State<Arc<GatewayState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    // Extract token from Authorization header
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|token| token.to_string());

    // Check for token in query parameters (for WebSocket connections)
    let query_token = request.uri().query().and_then(token_from_query);

    let token = auth_header.or(query_token).ok_or_else(|| {
        GatewayError::AuthenticationFailed("Missing authentication token".to_string())
    })?;

    let identity = state
        .verifier
        .verify(&token)
        .map_err(|e| GatewayError::AuthenticationFailed(format!("Invalid token: {}", e)))?;

    request.extensions_mut().insert(AuthenticatedUser(identity));

    Ok(next.run(request).await)
}

/// Pull the `token` pair out of a query string.
pub fn token_from_query(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some("token"), Some(value)) => {
                urlencoding::decode(value).ok().map(|token| token.into_owned())
            }
            _ => None,
        }
    })
}

/// Extract the authenticated identity from request extensions
pub fn extract_identity(request: &Request) -> GatewayResult<String> {
    request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.0.clone())
        .ok_or_else(|| GatewayError::AuthenticationFailed("User not authenticated".to_string()))
}

/// Logging middleware for request/response logging
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = duration.as_millis(),
        "request completed"
    );

    response
}
