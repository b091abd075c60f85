use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{CollaborativeCandidate, ContentRecommendation, Recommendation},
    routes::AppState,
    services::parse_track_id,
};

#[derive(Debug, Deserialize)]
pub struct HybridQuery {
    pub user_id: String,
    /// Track id or a URL containing `track/<id>`
    pub track: String,
    pub top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    pub track: String,
    pub top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CollaborativeQuery {
    pub user_id: String,
    pub top_n: Option<usize>,
}

fn require_user_id(user_id: &str) -> AppResult<&str> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::InvalidInput("user_id must not be empty".to_string()));
    }
    Ok(user_id)
}

/// Hybrid recommendations for a user and seed track
pub async fn hybrid(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HybridQuery>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let user_id = require_user_id(&params.user_id)?;
    let track_id = parse_track_id(&params.track)?;
    let top_n = state.top_n(params.top_n)?;

    let recommendations = state
        .recommender
        .recommend(user_id, &track_id, top_n)
        .await?;
    Ok(Json(recommendations))
}

/// Tracks with similar audio features to the seed
pub async fn content(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ContentQuery>,
) -> AppResult<Json<Vec<ContentRecommendation>>> {
    let track_id = parse_track_id(&params.track)?;
    let top_n = state.top_n(params.top_n)?;

    let recommendations = state
        .recommender
        .recommend_by_content(&track_id, top_n)
        .await?;
    Ok(Json(recommendations))
}

/// Highest predicted ratings among the user's unrated tracks
pub async fn collaborative(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CollaborativeQuery>,
) -> AppResult<Json<Vec<CollaborativeCandidate>>> {
    let user_id = require_user_id(&params.user_id)?;
    let top_n = state.top_n(params.top_n)?;

    let candidates = state.recommender.recommend_by_rating(user_id, top_n).await?;
    Ok(Json(candidates))
}
