/// Spotify Web API provider
///
/// Resolves tracks outside the local catalogue. Authenticates with the
/// client-credentials flow and caches the bearer token until shortly
/// before it expires.
///
/// API Flow:
/// 1. Token: POST {accounts}/api/token → bearer token
/// 2. Metadata: GET /v1/tracks/{id} → name, artists, popularity
/// 3. Analysis: GET /v1/audio-features?ids={id} → audio features
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::{
    error::ResolutionError,
    models::{SpotifyAudioFeaturesResponse, SpotifyToken, SpotifyTrack, TrackRecord},
    services::providers::TrackMetadataProvider,
};

/// Refresh the token this long before Spotify says it expires
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const RETRY_BACKOFF_MS: u64 = 250;

/// Outcome of a single HTTP attempt
#[derive(Debug)]
enum Attempt {
    /// Worth retrying (timeouts, 429, 5xx, connection errors)
    Retryable(ResolutionError),
    /// Retrying cannot help (403, 404, malformed responses)
    Fatal(ResolutionError),
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SpotifyProvider {
    http_client: HttpClient,
    client_id: String,
    client_secret: String,
    api_url: String,
    accounts_url: String,
    max_retries: u32,
    token: Arc<Mutex<Option<AccessToken>>>,
}

impl SpotifyProvider {
    /// Creates a provider whose every request is bounded by `timeout` and
    /// retried at most `max_retries` times
    pub fn new(
        client_id: String,
        client_secret: String,
        api_url: String,
        accounts_url: String,
        timeout: Duration,
        max_retries: u32,
    ) -> anyhow::Result<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            client_id,
            client_secret,
            api_url: api_url.trim_end_matches('/').to_string(),
            accounts_url: accounts_url.trim_end_matches('/').to_string(),
            max_retries,
            token: Arc::new(Mutex::new(None)),
        })
    }

    /// Returns a valid bearer token, requesting a new one when needed
    async fn access_token(&self, track_id: &str) -> Result<String, Attempt> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.value.clone());
            }
        }

        let url = format!("{}/api/token", self.accounts_url);
        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| classify_transport(track_id, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Spotify token request failed");
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Attempt::Fatal(
                    ResolutionError::Upstream("Spotify rejected the client credentials".to_string()),
                ),
                _ => classify_status(track_id, status, &body),
            });
        }

        let token: SpotifyToken = response.json().await.map_err(|e| {
            Attempt::Fatal(ResolutionError::Upstream(format!(
                "Invalid Spotify token response: {}",
                e
            )))
        })?;

        let lifetime = (token.expires_in - TOKEN_REFRESH_MARGIN_SECS).max(0);
        *guard = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: Utc::now() + TimeDelta::seconds(lifetime),
        });
        tracing::debug!(expires_in = token.expires_in, "Obtained Spotify access token");

        Ok(token.access_token)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// GET a JSON resource with bounded retries
    async fn get_json<T: DeserializeOwned>(
        &self,
        track_id: &str,
        build: impl Fn(&HttpClient) -> RequestBuilder,
    ) -> Result<T, ResolutionError> {
        let mut last_error = ResolutionError::Upstream("no attempt was made".to_string());

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64)).await;
            }

            match self.try_get_json(track_id, &build).await {
                Ok(value) => return Ok(value),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retryable(e)) => {
                    tracing::warn!(
                        track_id,
                        attempt = attempt + 1,
                        max_attempts = self.max_retries + 1,
                        error = %e,
                        "Spotify request failed"
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn try_get_json<T: DeserializeOwned>(
        &self,
        track_id: &str,
        build: &impl Fn(&HttpClient) -> RequestBuilder,
    ) -> Result<T, Attempt> {
        let token = self.access_token(track_id).await?;

        let response = build(&self.http_client)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| classify_transport(track_id, e))?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.invalidate_token().await;
            }
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(track_id, status, &body));
        }

        response.json::<T>().await.map_err(|e| {
            Attempt::Fatal(ResolutionError::Upstream(format!(
                "Invalid Spotify response: {}",
                e
            )))
        })
    }
}

fn classify_status(track_id: &str, status: StatusCode, body: &str) -> Attempt {
    match status {
        StatusCode::FORBIDDEN => Attempt::Fatal(ResolutionError::AccessForbidden(track_id.to_string())),
        StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
            Attempt::Fatal(ResolutionError::NotFound(track_id.to_string()))
        }
        StatusCode::UNAUTHORIZED | StatusCode::TOO_MANY_REQUESTS => Attempt::Retryable(
            ResolutionError::Upstream(format!("Spotify API returned status {}", status)),
        ),
        s if s.is_server_error() => Attempt::Retryable(ResolutionError::Upstream(format!(
            "Spotify API returned status {}: {}",
            status, body
        ))),
        _ => Attempt::Fatal(ResolutionError::Upstream(format!(
            "Spotify API returned status {}: {}",
            status, body
        ))),
    }
}

fn classify_transport(track_id: &str, error: reqwest::Error) -> Attempt {
    if error.is_timeout() {
        Attempt::Retryable(ResolutionError::Timeout(track_id.to_string()))
    } else if error.is_connect() || error.is_request() {
        Attempt::Retryable(ResolutionError::Upstream(error.to_string()))
    } else {
        Attempt::Fatal(ResolutionError::Upstream(error.to_string()))
    }
}

#[async_trait::async_trait]
impl TrackMetadataProvider for SpotifyProvider {
    async fn fetch_track(&self, track_id: &str) -> Result<TrackRecord, ResolutionError> {
        let track_url = format!("{}/v1/tracks/{}", self.api_url, track_id);
        let track: SpotifyTrack = self
            .get_json(track_id, |client| client.get(&track_url))
            .await?;

        let features_url = format!("{}/v1/audio-features", self.api_url);
        let features: SpotifyAudioFeaturesResponse = self
            .get_json(track_id, |client| {
                client.get(&features_url).query(&[("ids", track_id)])
            })
            .await?;

        let analysis = features.audio_features.into_iter().next().flatten();
        if analysis.is_none() {
            tracing::warn!(track_id, "Spotify returned no audio features for track");
        }

        let record = track.into_record(analysis);
        tracing::info!(
            track_id,
            name = %record.name,
            missing = ?record.features.missing(),
            "Resolved track from Spotify"
        );

        Ok(record)
    }

    fn name(&self) -> &'static str {
        "spotify"
    }
}
