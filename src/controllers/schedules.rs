use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::controllers::ok;
use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::models::{Role, ScheduleListing};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/schedules/{movie_id}", get(movie_schedules))
}

// GET /api/schedules/{movie_id}
async fn movie_schedules(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(movie_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    user.require_role(&[Role::User, Role::Admin])?;
    Ok(ok(ScheduleListing::for_movie(movie_id, &state.db).await?))
}
