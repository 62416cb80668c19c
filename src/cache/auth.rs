use crate::cache::CacheService;
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use tracing::debug;

impl CacheService {
    /// Помечает токен отозванным до момента его истечения
    pub async fn blacklist_token(&self, token: &str, ttl_secs: u64) -> redis::RedisResult<()> {
        if ttl_secs == 0 {
            // Уже истёк, валидация его и так отклонит
            return Ok(());
        }
        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(blacklist_key(token), 1, ttl_secs).await?;
        debug!(ttl_secs, "Token blacklisted");
        Ok(())
    }

    pub async fn is_token_blacklisted(&self, token: &str) -> redis::RedisResult<bool> {
        let mut conn = self.connection().await?;
        conn.exists(blacklist_key(token)).await
    }
}

// В Redis хранится только хеш токена
fn blacklist_key(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("blacklist:{digest:x}")
}
