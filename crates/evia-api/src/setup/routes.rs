//! Route configuration and setup

use crate::constants::{API_PREFIX, HTTP_CONCURRENCY_LIMIT, MULTIPART_OVERHEAD_BYTES};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use evia_core::{Config, StorageBackend};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let api = Router::new()
        .merge(auth_routes())
        .merge(complaint_routes())
        .route("/drugs/{id}", get(handlers::drugs::get_by_id))
        .route("/health", get(handlers::health::health_check));

    let mut app = Router::new().nest(API_PREFIX, api);

    if config.storage_backend() == StorageBackend::Local {
        if let Some(path) = config.local_storage_path() {
            tracing::info!(path = %path, "Serving local uploads at /uploads");
            app = app.nest_service("/uploads", ServeDir::new(path));
        }
    }

    let body_limit = config.max_image_size_bytes() + MULTIPART_OVERHEAD_BYTES;

    Ok(app
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        // Image size is enforced while spooling; this caps the whole body.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/forget-password", post(handlers::auth::forget_password))
        .route(
            "/auth/forget-password/verify",
            post(handlers::auth::verify_forget_password_otp),
        )
        .route("/auth/reset-password", post(handlers::auth::reset_password))
}

fn complaint_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/complaints", get(handlers::complaints::get_all))
        .route("/complaints/simplify", post(handlers::complaints::simplify))
        .route(
            "/complaints/external-wound",
            post(handlers::complaints::external_wound),
        )
        .route(
            "/complaints/{id}",
            get(handlers::complaints::get_by_id).patch(handlers::complaints::update),
        )
        .route(
            "/complaints/{id}/drugs",
            get(handlers::complaints::recommended_drugs),
        )
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins().iter().map(|o| o.parse()).collect();
        CorsLayer::new()
            .allow_origin(origins.map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?)
            .allow_methods(Any)
            .allow_headers(Any)
    };
    Ok(cors)
}
