use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{models::EngineStats, routes::AppState};

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<EngineStats> {
    Json(state.stats())
}
