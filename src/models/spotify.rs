use serde::Deserialize;

use super::{AudioFeatures, TrackRecord, DEFAULT_GENRE};

// ============================================================================
// Spotify Web API Types
// ============================================================================

/// Response of `POST /api/token` (client credentials flow)
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyToken {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Response of `GET /v1/tracks/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

/// Response of `GET /v1/audio-features?ids=...`
///
/// Spotify returns `null` entries for tracks without analysis.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAudioFeaturesResponse {
    #[serde(default)]
    pub audio_features: Vec<Option<SpotifyAudioFeatures>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifyAudioFeatures {
    #[serde(default)]
    pub danceability: Option<f64>,
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub acousticness: Option<f64>,
    #[serde(default)]
    pub instrumentalness: Option<f64>,
    #[serde(default)]
    pub liveness: Option<f64>,
    #[serde(default)]
    pub valence: Option<f64>,
    #[serde(default)]
    pub tempo: Option<f64>,
}

impl SpotifyTrack {
    /// Combines track metadata with its (possibly missing) audio analysis
    pub fn into_record(self, analysis: Option<SpotifyAudioFeatures>) -> TrackRecord {
        let analysis = analysis.unwrap_or_default();
        let artists = self
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        TrackRecord {
            id: self.id,
            name: self.name,
            artists,
            // Spotify exposes genres per artist only
            genre: DEFAULT_GENRE.to_string(),
            features: AudioFeatures {
                popularity: self.popularity,
                danceability: analysis.danceability,
                energy: analysis.energy,
                acousticness: analysis.acousticness,
                instrumentalness: analysis.instrumentalness,
                liveness: analysis.liveness,
                valence: analysis.valence,
                tempo: analysis.tempo,
            },
        }
    }
}
