//! # Courier Gateway Crate
//!
//! HTTP and WebSocket surface for the Courier chat backend. Routes the
//! `/ws/chat` realtime stream into the chat hub and exposes the history,
//! upload, and health REST endpoints.

pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod websocket;

// Re-export main types for convenience
pub use error::{GatewayError, GatewayResult};
pub use middleware::auth_middleware;
pub use state::GatewayState;

use axum::{http::Method, middleware as axum_middleware, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let uploads_dir = state.uploads.dir.clone();
    let arc_state = Arc::new(state);

    let mut router = Router::new()
        // REST API routes
        .merge(rest::create_rest_routes(arc_state.clone()))
        // WebSocket routes
        .merge(websocket::create_websocket_routes())
        // Uploaded chat files are served statically
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        // CORS middleware
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers(Any),
        )
        // Logging middleware
        .layer(axum_middleware::from_fn(middleware::logging_middleware));

    // Add Swagger UI if in debug mode
    #[cfg(debug_assertions)]
    {
        #[derive(OpenApi)]
        #[openapi(
            paths(
                rest::health::health_check,
                rest::history::chat_history,
                rest::upload::upload_file,
            ),
            components(
                schemas(
                    rest::health::HealthResponse,
                    rest::history::MessageResponse,
                    rest::upload::UploadResponse,
                )
            ),
            tags(
                (name = "Health", description = "Service health"),
                (name = "Chat", description = "Chat history and uploads"),
            )
        )]
        struct ApiDoc;

        router = router
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    router.with_state(arc_state)
}
