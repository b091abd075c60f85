/// Upstream track metadata providers
///
/// A provider resolves a track id that is not in the local catalogue into a
/// `TrackRecord` with raw (unscaled) audio features. Implementations own
/// their timeouts and retries; callers only see a `ResolutionError`.
use crate::{error::ResolutionError, models::TrackRecord};

pub mod spotify;

pub use spotify::SpotifyProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TrackMetadataProvider: Send + Sync {
    /// Fetch name, artists and audio features for a track
    async fn fetch_track(&self, track_id: &str) -> Result<TrackRecord, ResolutionError>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Stand-in used when no upstream credentials are configured
///
/// Every lookup fails, so only catalogue tracks can be resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredProvider;

#[async_trait::async_trait]
impl TrackMetadataProvider for UnconfiguredProvider {
    async fn fetch_track(&self, track_id: &str) -> Result<TrackRecord, ResolutionError> {
        Err(ResolutionError::NotConfigured(track_id.to_string()))
    }

    fn name(&self) -> &'static str {
        "unconfigured"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_provider_rejects_lookups() {
        let err = UnconfiguredProvider.fetch_track("abc").await.unwrap_err();
        assert_eq!(err, ResolutionError::NotConfigured("abc".to_string()));
    }
}
