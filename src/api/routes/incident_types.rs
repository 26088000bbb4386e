use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::errors::ApiResult;
use crate::api::models::DeletedResponse;
use crate::api::AppState;
use crate::errors::BreachwatchError;
use crate::models::{IncidentType, NewIncidentType};

pub async fn list_types(State(state): State<AppState>) -> ApiResult<Json<Vec<IncidentType>>> {
    Ok(Json(state.db.list_incident_types()?))
}

pub async fn create_type(
    State(state): State<AppState>,
    Json(req): Json<NewIncidentType>,
) -> ApiResult<(StatusCode, Json<IncidentType>)> {
    Ok((StatusCode::CREATED, Json(state.db.create_incident_type(&req)?)))
}

pub async fn get_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<IncidentType>> {
    state.db.get_incident_type(id)?
        .map(Json)
        .ok_or_else(|| BreachwatchError::NotFound(format!("Incident type {} not found", id)))
}

pub async fn delete_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeletedResponse>> {
    if state.db.delete_incident_type(id)? {
        Ok(Json(DeletedResponse { deleted: true }))
    } else {
        Err(BreachwatchError::NotFound(format!("Incident type {} not found", id)))
    }
}
