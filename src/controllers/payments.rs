use axum::{extract::State, response::IntoResponse, routing::get, Router};
use std::sync::Arc;

use crate::controllers::ok;
use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::models::PaymentMethod;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/payments", get(payment_methods))
}

// GET /api/payments
async fn payment_methods(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(PaymentMethod::all(&state.db).await?))
}
