//! bcrypt hashing. Both calls are CPU bound and run on the blocking pool.

use crate::error::ApiError;

pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("hash task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("bcrypt: {e}")))
}

/// `Ok(false)` on mismatch. A malformed stored hash also counts as a mismatch.
pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("verify task failed: {e}")))?;

    match verified {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            Ok(false)
        }
    }
}
