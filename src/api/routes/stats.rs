use axum::{extract::State, Json};
use chrono::Utc;

use crate::api::errors::ApiResult;
use crate::api::AppState;
use crate::models::IncidentStats;

pub async fn incident_stats(State(state): State<AppState>) -> ApiResult<Json<IncidentStats>> {
    Ok(Json(state.db.incident_stats(Utc::now())?))
}
