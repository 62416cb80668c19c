use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::auth::{issue_token, password};
use crate::controllers::ok;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::{Role, User};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/reset-password", post(reset_password))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 72))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub old_password: String,
    #[validate(length(min = 8, max = 72))]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: i64,
    pub user: User,
}

// POST /api/auth/register
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let email = req.email.trim().to_lowercase();

    if User::find_by_email(&email, &state.db).await?.is_some() {
        return Err(ApiError::Conflict("email is already registered".into()));
    }

    let hash = password::hash_password(req.password, state.config.auth.bcrypt_cost).await?;
    let user = User::register(&email, &hash, &state.db)
        .await
        .map_err(|e| match &e {
            // Параллельная регистрация с тем же email
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::Conflict("email is already registered".into())
            }
            _ => ApiError::Database(e),
        })?;

    info!(user_id = user.id, "User registered");
    Ok((StatusCode::CREATED, ok(user)))
}

// POST /api/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let email = req.email.trim().to_lowercase();
    let invalid = || ApiError::Unauthorized("invalid email or password".into());

    let user = User::find_by_email(&email, &state.db).await?.ok_or_else(invalid)?;
    if !password::verify_password(req.password, user.password.clone()).await? {
        return Err(invalid());
    }

    let role: Role = user.role().map_err(ApiError::Internal)?;
    let (token, claims) = issue_token(user.id, role, &state.config.jwt)
        .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))?;

    info!(user_id = user.id, "User logged in");
    Ok(ok(TokenResponse {
        token,
        token_type: "Bearer",
        expires_at: claims.exp,
        user,
    }))
}

// POST /api/auth/logout
async fn logout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    state
        .cache
        .blacklist_token(&user.token, user.claims.remaining_secs())
        .await?;

    info!(user_id = user.user_id, "User logged out");
    Ok(ok(serde_json::json!({ "message": "logged out" })))
}

// POST /api/auth/reset-password
async fn reset_password(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require_role(&[Role::User, Role::Admin])?;
    req.validate()?;

    let stored = User::find_by_id(user.user_id, &state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    if !password::verify_password(req.old_password, stored.password).await? {
        return Err(ApiError::Unauthorized("old password does not match".into()));
    }

    let hash = password::hash_password(req.new_password, state.config.auth.bcrypt_cost).await?;
    if !User::update_password(user.user_id, &hash, &state.db).await? {
        return Err(ApiError::NotFound("user not found".into()));
    }

    info!(user_id = user.user_id, "Password changed");
    Ok(ok(serde_json::json!({ "message": "password updated" })))
}
