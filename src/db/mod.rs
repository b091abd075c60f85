pub mod cache;
pub mod catalog;
pub mod redis;
pub mod scaler;

pub use self::cache::{CacheKey, Clock, FeatureCache, FeatureStore, MemoryStore, SystemClock};
pub use self::catalog::CatalogDataset;
pub use self::redis::{create_redis_client, RedisStore};
pub use self::scaler::FeatureScaler;
