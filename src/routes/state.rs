use std::sync::Arc;

use crate::{
    config::{CacheBackend, Config},
    db::{create_redis_client, CatalogDataset, FeatureCache, FeatureStore, MemoryStore, RedisStore},
    error::{AppError, AppResult},
    models::EngineStats,
    services::{
        BruteForceIndex, CollaborativeScorer, ContentScorer, HybridRecommender, LatentFactorModel,
        SpotifyProvider, TrackMetadataProvider, TrackResolver, UnconfiguredProvider,
    },
};

/// Shared, read-only application state
///
/// Everything here is built once at startup; handlers only read it.
pub struct AppState {
    pub recommender: HybridRecommender,
    pub default_top_n: usize,
    pub max_top_n: usize,
}

impl AppState {
    pub fn new(recommender: HybridRecommender, default_top_n: usize, max_top_n: usize) -> Self {
        Self {
            recommender,
            default_top_n,
            max_top_n,
        }
    }

    /// Builds the engine in dependency order
    ///
    /// The catalogue and content index are required. The collaborative
    /// model is optional and its absence only disables that signal.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let catalog = Arc::new(CatalogDataset::load(
            &config.catalog_path,
            &config.ratings_path,
        )?);

        let index = BruteForceIndex::from_catalog(&catalog)?;
        let content = Arc::new(ContentScorer::new(Arc::new(index)));

        let collaborative = LatentFactorModel::load_optional(&config.collaborative_model_path)
            .map(|model| Arc::new(CollaborativeScorer::new(Arc::new(model), catalog.clone())));

        let store: Arc<dyn FeatureStore> = match config.cache_backend {
            CacheBackend::Redis => {
                let client = create_redis_client(&config.redis_url)?;
                Arc::new(RedisStore::new(client))
            }
            CacheBackend::Memory => Arc::new(MemoryStore::new()),
        };
        tracing::info!(backend = store.name(), "Feature cache ready");

        let provider: Arc<dyn TrackMetadataProvider> = match config.spotify_credentials() {
            Some((client_id, client_secret)) => Arc::new(SpotifyProvider::new(
                client_id,
                client_secret,
                config.spotify_api_url.clone(),
                config.spotify_accounts_url.clone(),
                config.upstream_timeout(),
                config.upstream_max_retries,
            )?),
            None => {
                tracing::warn!("Spotify credentials not set, only catalogue tracks can be resolved");
                Arc::new(UnconfiguredProvider)
            }
        };

        let resolver = TrackResolver::new(catalog, FeatureCache::new(store), provider);
        let recommender = HybridRecommender::new(resolver, content, collaborative);

        Ok(Self::new(
            recommender,
            config.default_top_n,
            config.max_top_n,
        ))
    }

    pub fn catalog(&self) -> &CatalogDataset {
        self.recommender.resolver().catalog()
    }

    /// Resolves the requested list length against the configured bounds
    pub fn top_n(&self, requested: Option<usize>) -> AppResult<usize> {
        match requested {
            None => Ok(self.default_top_n),
            Some(n) if n == 0 || n > self.max_top_n => Err(AppError::InvalidInput(format!(
                "top_n must be between 1 and {}",
                self.max_top_n
            ))),
            Some(n) => Ok(n),
        }
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            ratings: self.catalog().rating_stats(),
            catalog_tracks: self.catalog().track_count(),
            collaborative_enabled: self.recommender.collaborative_enabled(),
        }
    }
}
