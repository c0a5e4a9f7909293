// src/web/routes.rs
use crate::{
    config::Config,
    error::AppError,
    models::report::UPLOADS_ROUTE,
    state::AppState,
    web::{auth_handlers, mw_auth, report_handlers, share_handlers, vital_handlers},
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

// Room for the text fields that travel with the file
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(app_state: AppState) -> Router {
    let config = app_state.config.clone();

    // --- Public API routes ---
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login));

    // --- Authenticated API routes ---
    let authenticated_routes = Router::new()
        .route("/auth/me", get(auth_handlers::me))
        .route("/reports", get(report_handlers::list_reports))
        .route(
            "/reports/upload",
            post(report_handlers::upload_report)
                .layer(DefaultBodyLimit::max(config.storage.max_upload_bytes + MULTIPART_OVERHEAD)),
        )
        .route("/reports/shared", get(report_handlers::list_shared_reports))
        .route(
            "/reports/{id}",
            get(report_handlers::get_report).delete(report_handlers::delete_report),
        )
        .route(
            "/vitals",
            get(vital_handlers::list_vitals).post(vital_handlers::record_vital),
        )
        .route("/vitals/trends", get(vital_handlers::vital_trends))
        .route("/vitals/{id}", delete(vital_handlers::delete_vital))
        .route("/share", post(share_handlers::share_report))
        .route("/share/sent", get(share_handlers::list_sent_shares))
        .route("/share/{id}", delete(share_handlers::revoke_share))
        // Only matched routes pass through the token check; unknown paths still 404
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            mw_auth::require_auth,
        ));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .fallback(api_not_found);

    let mut router = Router::new()
        .nest("/api", api_routes)
        .nest_service(UPLOADS_ROUTE, ServeDir::new(&config.storage.upload_dir));

    // Built SPA: real files when they exist, index.html for client-side routes
    if let Some(frontend_dir) = &config.frontend_dir {
        tracing::info!("Serving frontend from {}", frontend_dir.display());
        let index = ServeFile::new(frontend_dir.join("index.html"));
        router = router.fallback_service(ServeDir::new(frontend_dir).fallback(index));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config)),
        )
        .with_state(app_state)
}

// GET /api/health
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "OK", "message": "Health Wallet API is running" }))
}

async fn api_not_found() -> AppError {
    AppError::NotFound("Route")
}

/// Explicit allow-list when configured, otherwise echo the caller's origin.
fn cors_layer(config: &Config) -> CorsLayer {
    let allow_origin = if config.cors_origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
