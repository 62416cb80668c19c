pub mod auth;
pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, StatusCode,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::error::ApiError;
use crate::services::{BookingService, PgBookingStore};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub bookings: BookingService<PgBookingStore>,
}

impl AppState {
    pub fn new(config: config::Config, db: database::Database, cache: cache::CacheService) -> Arc<Self> {
        let store = PgBookingStore::new(db.pool.clone(), config.booking.lock_timeout_ms);
        Arc::new(Self {
            bookings: BookingService::new(store),
            db,
            cache,
            config,
        })
    }
}

/// Full HTTP application: `/health`, everything else under `/api`.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.app.cors_origins);
    let timeout = Duration::from_secs(state.config.app.request_timeout_secs);

    Router::new()
        .route("/health", get(health))
        .nest("/api", controllers::routes())
        .fallback(not_found)
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    controllers::ok(serde_json::json!({ "status": "ok" }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("route not found".into())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(controllers::orders::IDEMPOTENCY_KEY_HEADER),
        ])
        .max_age(Duration::from_secs(3600))
}
