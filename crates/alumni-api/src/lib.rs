//! # alumni-api
//!
//! REST API layer for Alumni Connect. Route handlers live in [`routes`]; the
//! mentorship rules they call into (request engine, conversation, notes) live
//! in [`mentorship`] so they can be exercised without HTTP.

pub mod mentorship;
pub mod middleware;
pub mod routes;

use alumni_common::{config::LimitsConfig, events::MentorshipEvent};
use alumni_db::{Database, storage::FileStore};
use axum::{Router, extract::DefaultBodyLimit};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Broadcast sender for mentorship events. Mutations publish here and
    /// the `/events` stream forwards to the addressed users.
    pub events: broadcast::Sender<MentorshipEvent>,
    /// Where attachments and resumes are uploaded.
    pub storage: FileStore,
    pub limits: LimitsConfig,
    /// Secret used to verify bearer tokens from the identity provider.
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(db: Database, storage: FileStore, limits: LimitsConfig, jwt_secret: String) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            db,
            events,
            storage,
            limits,
            jwt_secret,
        }
    }
}

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let state = Arc::new(state);
    let upload_limit = state.limits.max_file_size_bytes + 1024 * 1024;

    let api_routes = Router::new()
        .merge(routes::mentorships::router())
        .merge(routes::messages::router())
        .merge(routes::users::router())
        .merge(routes::events::router())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .merge(routes::health::router());

    let mut router = Router::new().nest("/api/v1", api_routes);
    if let Some(root) = state.storage.local_root() {
        router = router.nest_service("/files", tower_http::services::ServeDir::new(root));
    }

    router
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::compression::CompressionLayer::new())
        .with_state(state)
}
