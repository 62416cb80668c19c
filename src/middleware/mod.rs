use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

use crate::auth::{self, Claims};
use crate::error::ApiError;
use crate::models::Role;

/// Caller identity taken from a `Bearer` JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: Role,
    /// Raw token, kept so logout can revoke exactly this one.
    pub token: String,
    pub claims: Claims,
}

impl AuthUser {
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "role {} may not access this resource",
                self.role
            )))
        }
    }
}

// Bearer extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".into()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("expected a Bearer token".into()))?;

        // Подпись, срок и издатель проверяются до похода в Redis
        let claims = auth::validate_token(token, &state.config.jwt).map_err(|e| {
            tracing::debug!(error = %e, "Rejected token");
            ApiError::Unauthorized("invalid or expired token".into())
        })?;

        if state.cache.is_token_blacklisted(token).await? {
            return Err(ApiError::Unauthorized("token has been revoked".into()));
        }

        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| ApiError::Unauthorized("token carries an unknown role".into()))?;

        Ok(AuthUser {
            user_id: claims.id,
            role,
            token: token.to_string(),
            claims,
        })
    }
}
