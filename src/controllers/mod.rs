pub mod auth;
pub mod history;
pub mod movies;
pub mod orders;
pub mod payments;
pub mod profile;
pub mod schedules;
pub mod seats;

use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// `{"success": true, "data": ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(auth::routes())
        .merge(movies::routes())
        .merge(schedules::routes())
        .merge(seats::routes())
        .merge(orders::routes())
        .merge(history::routes())
        .merge(profile::routes())
        .merge(payments::routes())
}
