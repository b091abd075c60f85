use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Where resolved upstream track records are cached
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Redis,
    Memory,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Track catalogue CSV (id, name, artists, genre and audio features)
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// User-track rating matrix CSV
    #[serde(default = "default_ratings_path")]
    pub ratings_path: PathBuf,

    /// Pre-trained latent-factor model; collaborative scoring is disabled
    /// when it is missing or unreadable
    #[serde(default = "default_collaborative_model_path")]
    pub collaborative_model_path: PathBuf,

    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Spotify client credentials. Without both, only catalogue tracks
    /// can be resolved.
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,

    #[serde(default = "default_spotify_api_url")]
    pub spotify_api_url: String,

    #[serde(default = "default_spotify_accounts_url")]
    pub spotify_accounts_url: String,

    /// Per-request upstream timeout in seconds
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    #[serde(default = "default_upstream_max_retries")]
    pub upstream_max_retries: u32,

    /// `top_n` used when a request does not pass one
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,

    #[serde(default = "default_max_top_n")]
    pub max_top_n: usize,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/data_cleaned.csv")
}

fn default_ratings_path() -> PathBuf {
    PathBuf::from("data/user_matrix.csv")
}

fn default_collaborative_model_path() -> PathBuf {
    PathBuf::from("models/svd_model.json")
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_spotify_api_url() -> String {
    "https://api.spotify.com".to_string()
}

fn default_spotify_accounts_url() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    10
}

fn default_upstream_max_retries() -> u32 {
    3
}

fn default_top_n() -> usize {
    10
}

fn default_max_top_n() -> usize {
    50
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.default_top_n == 0 || self.default_top_n > self.max_top_n {
            anyhow::bail!(
                "DEFAULT_TOP_N must be between 1 and MAX_TOP_N ({}), got {}",
                self.max_top_n,
                self.default_top_n
            );
        }
        Ok(())
    }

    /// Spotify credentials, when both halves are set and non-empty
    pub fn spotify_credentials(&self) -> Option<(String, String)> {
        match (&self.spotify_client_id, &self.spotify_client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.clone(), secret.clone()))
            }
            _ => None,
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
