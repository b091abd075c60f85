use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::models::TrackRecord;

/// Age after which a cached feature record is ignored
pub const FEATURE_CACHE_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    TrackFeatures(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::TrackFeatures(id) => write!(f, "features:{}", id),
        }
    }
}

/// Storage-layer failures. Never surfaced past `FeatureCache`.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Durable string key/value storage behind the feature cache
///
/// A `save` must replace the whole value for the key in one operation.
#[async_trait::async_trait]
pub trait FeatureStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn save(&self, key: &str, value: String) -> Result<(), CacheError>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}

/// In-process store, used in tests and when no Redis is configured
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl FeatureStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Source of the current time, injectable so expiry can be tested
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Persisted value: the record plus when it was resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    record: TrackRecord,
    resolved_at: DateTime<Utc>,
}

/// Track id → resolved feature record, with lazy 30-day expiry
///
/// Stale entries are not purged; they are ignored on read and overwritten
/// on the next write. Storage failures are logged and behave as a miss.
#[derive(Clone)]
pub struct FeatureCache {
    store: Arc<dyn FeatureStore>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl FeatureCache {
    pub fn new(store: Arc<dyn FeatureStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn FeatureStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            ttl: TimeDelta::days(FEATURE_CACHE_TTL_DAYS),
        }
    }

    /// Returns the cached record if present and younger than the TTL
    pub async fn get(&self, track_id: &str) -> Option<TrackRecord> {
        let key = CacheKey::TrackFeatures(track_id.to_string()).to_string();

        let raw = match self.store.load(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, store = self.store.name(), track_id, "Cache read error");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, track_id, "Discarding unreadable cache entry");
                return None;
            }
        };

        let age = self.clock.now() - entry.resolved_at;
        if age >= self.ttl {
            tracing::debug!(track_id, age_days = age.num_days(), "Cache entry expired");
            return None;
        }

        Some(entry.record)
    }

    /// Stores the record, replacing any previous entry for the id
    pub async fn set(&self, track_id: &str, record: &TrackRecord) {
        let key = CacheKey::TrackFeatures(track_id.to_string()).to_string();
        let entry = CacheEntry {
            record: record.clone(),
            resolved_at: self.clock.now(),
        };

        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, track_id, "Cache serialization error");
                return;
            }
        };

        if let Err(e) = self.store.save(&key, json).await {
            tracing::warn!(error = %e, store = self.store.name(), track_id, "Cache write error");
        }
    }
}
