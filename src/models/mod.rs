use serde::{Deserialize, Serialize};

pub mod spotify;
pub mod track;

pub use spotify::{
    SpotifyArtist, SpotifyAudioFeatures, SpotifyAudioFeaturesResponse, SpotifyToken, SpotifyTrack,
};
pub use track::{
    AudioFeatures, RatingRecord, TrackRecord, DEFAULT_GENRE, FEATURE_COLUMNS, FEATURE_COUNT, UNKNOWN,
};

/// A single entry of a hybrid recommendation list returned to the client
///
/// Scores are normalized within the call that produced them, so they rank
/// tracks against each other but are not comparable across calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub track_id: String,
    pub name: String,
    pub artists: String,
    pub genre: String,
    /// Content similarity divided by the best similarity in the call, 0 when
    /// the track was not a content candidate.
    ///
    /// When no candidate has a positive similarity (every neighbour is more
    /// than 1.0 away from the seed) the raw similarity is kept, so the value
    /// is negative rather than in `[0, 1]`.
    pub content_score: f64,
    /// Normalized predicted rating, 0 when absent or collaborative scoring is off
    pub collaborative_score: f64,
    pub final_score: f64,
}

/// A track similar to the seed by audio features alone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentRecommendation {
    pub track_id: String,
    pub name: String,
    pub artists: String,
    pub genre: String,
    /// `1 - distance`, not normalized
    pub similarity_score: f64,
}

/// A track the latent-factor model predicts the user would rate highly
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollaborativeCandidate {
    pub track_id: String,
    pub estimated_rating: f64,
}

/// Summary statistics over the rating matrix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingStats {
    pub total_users: usize,
    pub total_tracks: usize,
    pub total_ratings: usize,
    pub average_rating: f64,
    pub rating_std_dev: f64,
    /// Share of filled user × track cells, in percent
    pub density_percent: f64,
}

/// Rating statistics together with the engine's runtime status
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    #[serde(flatten)]
    pub ratings: RatingStats,
    pub catalog_tracks: usize,
    pub collaborative_enabled: bool,
}
