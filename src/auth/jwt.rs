//! HS256 access tokens.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub id: i64,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    /// Unique per token, so two logins in the same second differ.
    pub jti: String,
}

impl Claims {
    /// Seconds until expiry, zero once expired.
    pub fn remaining_secs(&self) -> u64 {
        let now = chrono::Utc::now().timestamp();
        u64::try_from(self.exp - now).unwrap_or(0)
    }
}

pub fn issue_token(
    user_id: i64,
    role: Role,
    config: &JwtConfig,
) -> Result<(String, Claims), jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        id: user_id,
        role: role.as_str().to_string(),
        exp: now + config.expires_in_minutes * 60,
        iat: now,
        iss: config.issuer.clone(),
        jti: Uuid::new_v4().to_string(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;
    Ok((token, claims))
}

/// Checks signature, expiry and issuer.
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[config.issuer.as_str()]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}
