use std::sync::Arc;
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use redis::Client;
use tokio::sync::Mutex;

use crate::db::cache::{CacheError, FeatureStore};

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Creates a Redis client for caching
///
/// Only parses the URL; the connection is opened on first use, so an
/// unreachable server shows up as cache misses rather than a startup error.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Redis-backed feature store
///
/// Entries are written with a plain `SET` and no server-side expiry; age is
/// checked by `FeatureCache` on read. One multiplexed connection is shared
/// by all requests and reopened after a failure. Connecting and every
/// command are bounded by timeouts so a dead server costs a cache miss,
/// not a stalled request.
#[derive(Clone)]
pub struct RedisStore {
    redis_client: Client,
    connection: Arc<Mutex<Option<MultiplexedConnection>>>,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl RedisStore {
    pub fn new(redis_client: Client) -> Self {
        Self::with_timeouts(redis_client, CONNECT_TIMEOUT, RESPONSE_TIMEOUT)
    }

    pub fn with_timeouts(
        redis_client: Client,
        connect_timeout: Duration,
        response_timeout: Duration,
    ) -> Self {
        Self {
            redis_client,
            connection: Arc::new(Mutex::new(None)),
            connect_timeout,
            response_timeout,
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .redis_client
            .get_multiplexed_async_connection_with_timeouts(
                self.response_timeout,
                self.connect_timeout,
            )
            .await?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Drops the shared connection so the next call reconnects
    async fn reset(&self) {
        self.connection.lock().await.take();
    }
}

#[async_trait::async_trait]
impl FeatureStore for RedisStore {
    async fn load(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let result: redis::RedisResult<Option<String>> = conn.get(key).await;
        match result {
            Ok(cached) => Ok(cached),
            Err(e) => {
                self.reset().await;
                Err(e.into())
            }
        }
    }

    async fn save(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let result: redis::RedisResult<()> = conn.set(key, value).await;
        if let Err(e) = result {
            self.reset().await;
            return Err(e.into());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
