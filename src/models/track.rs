use serde::{Deserialize, Serialize};

/// Placeholder for display metadata the source does not provide
pub const UNKNOWN: &str = "Unknown";

/// Genre assigned to tracks that cannot be classified
pub const DEFAULT_GENRE: &str = UNKNOWN;

pub const FEATURE_COUNT: usize = 8;

/// Audio feature columns, in the order used for scaling and the content index
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "popularity",
    "danceability",
    "energy",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
];

/// The eight numeric features describing a track.
///
/// Catalogue rows always carry every field. Records resolved from the
/// upstream provider may lack some of them, so absence is kept explicit
/// rather than collapsed to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub popularity: Option<f64>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
}

impl AudioFeatures {
    /// Builds a fully populated feature set, ordered as `FEATURE_COLUMNS`
    pub fn complete(values: [f64; FEATURE_COUNT]) -> Self {
        let [popularity, danceability, energy, acousticness, instrumentalness, liveness, valence, tempo] =
            values;
        Self {
            popularity: Some(popularity),
            danceability: Some(danceability),
            energy: Some(energy),
            acousticness: Some(acousticness),
            instrumentalness: Some(instrumentalness),
            liveness: Some(liveness),
            valence: Some(valence),
            tempo: Some(tempo),
        }
    }

    pub fn as_array(&self) -> [Option<f64>; FEATURE_COUNT] {
        [
            self.popularity,
            self.danceability,
            self.energy,
            self.acousticness,
            self.instrumentalness,
            self.liveness,
            self.valence,
            self.tempo,
        ]
    }

    /// Returns every value if none is missing
    pub fn to_complete(&self) -> Option<[f64; FEATURE_COUNT]> {
        let values = self.as_array();
        let mut out = [0.0; FEATURE_COUNT];
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = value?;
        }
        Some(out)
    }

    /// Names of the features that are absent
    pub fn missing(&self) -> Vec<&'static str> {
        FEATURE_COLUMNS
            .iter()
            .zip(self.as_array())
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect()
    }
}

/// A resolved track: display metadata plus its audio features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: String,
    pub name: String,
    /// Comma-separated artist names
    pub artists: String,
    pub genre: String,
    pub features: AudioFeatures,
}

/// One row of the user–track rating matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user_id: String,
    pub track_id: String,
    pub rating: f64,
}
