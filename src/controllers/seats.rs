use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::controllers::ok;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::{Role, Seat};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/seats/{schedule_id}", get(schedule_seats))
}

// GET /api/seats/{schedule_id}
async fn schedule_seats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(schedule_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    user.require_role(&[Role::User, Role::Admin])?;

    let seats = Seat::for_schedule(schedule_id, &state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("schedule {schedule_id} not found")))?;
    Ok(ok(seats))
}
