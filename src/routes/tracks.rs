use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{error::AppResult, models::TrackRecord, routes::AppState, services::parse_track_id};

/// Track metadata and raw audio features from the catalogue, cache or upstream
pub async fn get_track(
    State(state): State<Arc<AppState>>,
    Path(track): Path<String>,
) -> AppResult<Json<TrackRecord>> {
    let track_id = parse_track_id(&track)?;
    let record = state.recommender.resolver().resolve(&track_id).await?;
    Ok(Json(record))
}
