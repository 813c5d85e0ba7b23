//! Redis client behind the short-lived home-page cache.

use anyhow::Result;
use redis::aio::MultiplexedConnection;
use redis::Client;

#[derive(Clone)]
pub struct RedisCache {
    client: Client,
}

impl RedisCache {
    /// Open the client and verify Redis answers before the server starts
    /// taking requests.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let cache = Self {
            client: Client::open(redis_url)?,
        };
        cache.ping().await?;
        Ok(cache)
    }

    /// A connection off the multiplexer. Feed code treats a failure here as
    /// a cache miss, never as a request error.
    pub async fn conn(&self) -> Result<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Liveness probe for the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}
