use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::controllers::ok;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::Role;
use crate::services::BookingRequest;
use crate::AppState;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/orders", post(create_order))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub schedule_id: i64,
    #[validate(length(min = 1, max = 50))]
    pub seat_ids: Vec<i64>,
    pub payment_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub fullname: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: String,
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };
    let key = value
        .to_str()
        .map_err(|_| ApiError::Validation("Idempotency-Key must be visible ASCII".into()))?
        .trim();
    Ok((!key.is_empty()).then(|| key.to_string()))
}

// POST /api/orders
async fn create_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require_role(&[Role::User])?;
    req.validate()?;

    let booked = state
        .bookings
        .book(BookingRequest {
            schedule_id: req.schedule_id,
            seat_ids: req.seat_ids,
            user_id: user.user_id,
            payment_id: req.payment_id,
            fullname: req.fullname,
            email: req.email,
            phone: req.phone,
            idempotency_key: idempotency_key(&headers)?,
        })
        .await?;

    let status = if booked.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, ok(booked)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn idempotency_key_is_optional_and_trimmed() {
        let mut headers = HeaderMap::new();
        assert_eq!(idempotency_key(&headers).unwrap(), None);

        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static("  retry-1 "));
        assert_eq!(idempotency_key(&headers).unwrap().as_deref(), Some("retry-1"));

        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static("   "));
        assert_eq!(idempotency_key(&headers).unwrap(), None);
    }
}
