//! REST API endpoints for the gateway

pub mod health;
pub mod history;
pub mod upload;

use axum::{middleware as axum_middleware, Router};
use std::sync::Arc;

use crate::middleware::auth_middleware;
use crate::state::GatewayState;

/// Create all REST API routes
pub fn create_rest_routes(state: Arc<GatewayState>) -> Router<Arc<GatewayState>> {
    let protected = Router::new()
        .merge(history::create_history_routes())
        .merge(upload::create_upload_routes(state.uploads.max_bytes))
        .route_layer(axum_middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .merge(health::create_health_routes())
        .merge(protected)
}
