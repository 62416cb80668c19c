use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::controllers::ok;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::{Profile, ProfileUpdate, Role};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/profile", get(get_profile).patch(update_profile))
}

// GET /api/profile
async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    user.require_role(&[Role::User, Role::Admin])?;

    let profile = Profile::find(user.user_id, &state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("profile not found".into()))?;
    Ok(ok(profile))
}

// PATCH /api/profile
async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    user.require_role(&[Role::User, Role::Admin])?;
    update.validate()?;
    if update.is_empty() {
        return Err(ApiError::Validation("nothing to update".into()));
    }

    let profile = Profile::update(user.user_id, &update, &state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("profile not found".into()))?;
    Ok(ok(profile))
}
