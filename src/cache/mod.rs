use redis::{aio::MultiplexedConnection, Client, RedisResult};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

pub mod auth;

/// Redis access. The multiplexed connection is opened on first use and shared.
#[derive(Clone)]
pub struct CacheService {
    client: Client,
    conn: Arc<OnceCell<MultiplexedConnection>>,
}

impl CacheService {
    /// Parses the URL only; nothing is dialed until the first command.
    pub fn new(redis_url: &str) -> RedisResult<Self> {
        Ok(Self {
            client: Client::open(redis_url)?,
            conn: Arc::new(OnceCell::new()),
        })
    }

    /// Like [`CacheService::new`], but fails fast when Redis is unreachable.
    pub async fn connect(redis_url: &str) -> RedisResult<Self> {
        let cache = Self::new(redis_url)?;
        cache.connection().await?;
        info!("Redis connected");
        Ok(cache)
    }

    async fn connection(&self) -> RedisResult<MultiplexedConnection> {
        self.conn
            .get_or_try_init(|| self.client.get_multiplexed_tokio_connection())
            .await
            .cloned()
    }
}
