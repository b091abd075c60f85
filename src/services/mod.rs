pub mod collaborative;
pub mod content;
pub mod hybrid;
pub mod providers;
pub mod track_lookup;

pub use collaborative::{CollaborativeScorer, LatentFactorModel, RatingPredictor};
pub use content::{BruteForceIndex, ContentScorer, NearestNeighbors};
pub use hybrid::{FusionWeights, HybridRecommender};
pub use providers::{SpotifyProvider, TrackMetadataProvider, UnconfiguredProvider};
pub use track_lookup::{parse_track_id, TrackResolver};
