use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{error::AppResult, models::RatingRecord, routes::AppState};

/// Every rating the user has given, in matrix order
pub async fn get_ratings(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<RatingRecord>>> {
    let ratings = state
        .catalog()
        .user_ratings(&user_id)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(ratings))
}
