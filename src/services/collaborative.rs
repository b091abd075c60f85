use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{db::CatalogDataset, models::CollaborativeCandidate};

/// Failure to score a single (user, track) pair
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("factor length mismatch for user {user_id} ({user_len}) and track {track_id} ({track_len})")]
    DimensionMismatch {
        user_id: String,
        track_id: String,
        user_len: usize,
        track_len: usize,
    },

    #[error("non-finite prediction for user {user_id} and track {track_id}")]
    NonFinite { user_id: String, track_id: String },
}

/// Failure to load a latent-factor artifact
#[derive(thiserror::Error, Debug)]
pub enum ModelLoadError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid model: {0}")]
    Invalid(String),
}

/// Predicts the rating a user would give a track
#[cfg_attr(test, mockall::automock)]
pub trait RatingPredictor: Send + Sync {
    fn predict(&self, user_id: &str, track_id: &str) -> Result<f64, PredictionError>;
}

/// Bias and latent vector of one user or item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatentFactor {
    #[serde(default)]
    pub bias: f64,
    #[serde(default)]
    pub factors: Vec<f64>,
}

/// Pre-trained biased matrix factorization
///
/// `r̂(u, i) = μ + b_u + b_i + q_i · p_u`. Terms for an unknown user or item
/// are dropped, and the estimate is clipped to `rating_scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatentFactorModel {
    pub global_mean: f64,
    pub rating_scale: (f64, f64),
    #[serde(default)]
    pub users: HashMap<String, LatentFactor>,
    #[serde(default)]
    pub items: HashMap<String, LatentFactor>,
}

impl LatentFactorModel {
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let raw = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&raw)?;

        let (low, high) = model.rating_scale;
        if !(low <= high) || !model.global_mean.is_finite() {
            return Err(ModelLoadError::Invalid(format!(
                "rating scale ({}, {}) or global mean {} is not usable",
                low, high, model.global_mean
            )));
        }

        Ok(model)
    }

    /// Loads the model if possible, otherwise logs why collaborative
    /// filtering is disabled and returns `None`
    pub fn load_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Collaborative model file not found");
            tracing::warn!("Collaborative filtering will be disabled");
            return None;
        }

        match Self::load(path) {
            Ok(model) => {
                tracing::info!(
                    path = %path.display(),
                    users = model.users.len(),
                    items = model.items.len(),
                    "Loaded collaborative model"
                );
                Some(model)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Error loading collaborative model");
                tracing::warn!("Collaborative filtering will be disabled");
                None
            }
        }
    }
}

impl RatingPredictor for LatentFactorModel {
    fn predict(&self, user_id: &str, track_id: &str) -> Result<f64, PredictionError> {
        let user = self.users.get(user_id);
        let item = self.items.get(track_id);

        let mut estimate = self.global_mean;
        if let Some(user) = user {
            estimate += user.bias;
        }
        if let Some(item) = item {
            estimate += item.bias;
        }
        if let (Some(user), Some(item)) = (user, item) {
            if user.factors.len() != item.factors.len() {
                return Err(PredictionError::DimensionMismatch {
                    user_id: user_id.to_string(),
                    track_id: track_id.to_string(),
                    user_len: user.factors.len(),
                    track_len: item.factors.len(),
                });
            }
            estimate += user
                .factors
                .iter()
                .zip(&item.factors)
                .map(|(p, q)| p * q)
                .sum::<f64>();
        }

        if !estimate.is_finite() {
            return Err(PredictionError::NonFinite {
                user_id: user_id.to_string(),
                track_id: track_id.to_string(),
            });
        }

        let (low, high) = self.rating_scale;
        Ok(estimate.clamp(low, high))
    }
}

/// Ranks unrated tracks for a user by predicted rating
#[derive(Clone)]
pub struct CollaborativeScorer {
    predictor: Arc<dyn RatingPredictor>,
    catalog: Arc<CatalogDataset>,
}

impl CollaborativeScorer {
    pub fn new(predictor: Arc<dyn RatingPredictor>, catalog: Arc<CatalogDataset>) -> Self {
        Self { predictor, catalog }
    }

    pub fn predict(&self, user_id: &str, track_id: &str) -> Result<f64, PredictionError> {
        self.predictor.predict(user_id, track_id)
    }

    /// Top `top_k` predictions over tracks the user has not rated
    ///
    /// Pairs that fail to score are logged and skipped. Equal ratings keep
    /// track-id order.
    pub fn candidate_ratings(&self, user_id: &str, top_k: usize) -> Vec<CollaborativeCandidate> {
        let rated = self.catalog.ratings_for_user(user_id);

        let mut failures = 0usize;
        let mut candidates: Vec<CollaborativeCandidate> = self
            .catalog
            .all_track_ids()
            .iter()
            .filter(|track_id| !rated.contains(*track_id))
            .filter_map(|track_id| match self.predictor.predict(user_id, track_id) {
                Ok(estimated_rating) => Some(CollaborativeCandidate {
                    track_id: track_id.clone(),
                    estimated_rating,
                }),
                Err(e) => {
                    tracing::error!(user_id, track_id = %track_id, error = %e, "Error predicting rating");
                    failures += 1;
                    None
                }
            })
            .collect();

        candidates.sort_by(|a, b| b.estimated_rating.total_cmp(&a.estimated_rating));
        candidates.truncate(top_k);

        tracing::debug!(
            user_id,
            rated = rated.len(),
            failures,
            returned = candidates.len(),
            "Scored collaborative candidates"
        );

        candidates
    }
}
