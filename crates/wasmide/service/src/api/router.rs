//! API Router configuration

use super::handlers;
use super::state::AppState;
use crate::config::ServerConfig;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Create the main API router
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        // Projects
        .route(
            "/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/projects/:id",
            get(handlers::get_project)
                .patch(handlers::rename_project)
                .delete(handlers::delete_project),
        )
        .route("/projects/:id/files", put(handlers::update_files))
        .route("/projects/:id/compile", post(handlers::compile_project))
        .route("/projects/:id/wat", get(handlers::get_wat))
        .route("/projects/:id/exports", get(handlers::list_exports))
        .route("/projects/:id/share", post(handlers::toggle_share))
        // Share links
        .route("/shared/:code", get(handlers::get_shared))
        .route("/shared/:code/fork", post(handlers::fork_shared));

    Router::new()
        .nest("/v1", api_routes)
        .layer(DefaultBodyLimit::max(server.max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&server.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
