use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::{
    cached,
    db::{CatalogDataset, FeatureCache},
    error::{AppError, AppResult, ResolutionError},
    models::TrackRecord,
    services::providers::TrackMetadataProvider,
};

fn raw_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9]+$").expect("valid track id pattern"))
}

fn url_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"track/([A-Za-z0-9]+)").expect("valid track url pattern"))
}

/// Extracts a track id from a raw id or a URL containing `track/<id>`
pub fn parse_track_id(input: &str) -> AppResult<String> {
    let input = input.trim();

    if raw_id_pattern().is_match(input) {
        return Ok(input.to_string());
    }

    url_id_pattern()
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| AppError::InvalidInput("Invalid Spotify track URL.".to_string()))
}

/// A seed track placed in the standardized feature space
#[derive(Debug, Clone, PartialEq)]
pub struct SeedVector {
    pub track_id: String,
    pub vector: Vec<f64>,
    /// Whether the vector came straight from the catalogue
    pub from_catalog: bool,
}

/// Resolves tracks from the catalogue, the feature cache or upstream
///
/// The catalogue is authoritative. Anything else goes through the cache,
/// and upstream results are written back to it.
#[derive(Clone)]
pub struct TrackResolver {
    catalog: Arc<CatalogDataset>,
    cache: FeatureCache,
    provider: Arc<dyn TrackMetadataProvider>,
}

impl TrackResolver {
    pub fn new(
        catalog: Arc<CatalogDataset>,
        cache: FeatureCache,
        provider: Arc<dyn TrackMetadataProvider>,
    ) -> Self {
        Self {
            catalog,
            cache,
            provider,
        }
    }

    /// Full record for any track id
    pub async fn resolve(&self, track_id: &str) -> Result<TrackRecord, ResolutionError> {
        if let Some(track) = self.catalog.track_by_id(track_id) {
            return Ok(track.clone());
        }
        self.resolve_external(track_id).await
    }

    /// Record for a track outside the catalogue, via cache then upstream
    ///
    /// Ids that are not plain alphanumeric never reach the provider, since
    /// they would be spliced into its request path.
    pub async fn resolve_external(&self, track_id: &str) -> Result<TrackRecord, ResolutionError> {
        if !raw_id_pattern().is_match(track_id) {
            tracing::warn!(track_id, "Refusing upstream lookup for malformed track id");
            return Err(ResolutionError::NotFound(track_id.to_string()));
        }

        cached!(self.cache, track_id, async {
            tracing::info!(track_id, provider = self.provider.name(), "Cache miss, fetching track upstream");
            self.provider.fetch_track(track_id).await
        })
    }

    /// Standardized feature vector for the seed track
    ///
    /// Catalogue tracks use their pre-scaled vector; others are resolved
    /// and scaled with the catalogue's fitted scaler.
    pub async fn seed_vector(&self, track_id: &str) -> Result<SeedVector, ResolutionError> {
        if let Some(vector) = self.catalog.scaled_feature_vector(track_id) {
            return Ok(SeedVector {
                track_id: track_id.to_string(),
                vector: vector.to_vec(),
                from_catalog: true,
            });
        }

        let record = self.resolve_external(track_id).await?;
        Ok(SeedVector {
            track_id: track_id.to_string(),
            vector: self.catalog.scaler().transform_features(&record.features),
            from_catalog: false,
        })
    }

    pub fn catalog(&self) -> &CatalogDataset {
        &self.catalog
    }
}
