use axum::{extract::State, response::IntoResponse, routing::get, Router};
use std::sync::Arc;

use crate::controllers::ok;
use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::models::{HistoryEntry, Role};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/history", get(order_history))
}

// GET /api/history
async fn order_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    user.require_role(&[Role::User])?;
    Ok(ok(HistoryEntry::for_user(user.user_id, &state.db).await?))
}
