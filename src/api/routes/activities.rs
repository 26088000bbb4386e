use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::api::errors::ApiResult;
use crate::api::models::{CommentRequest, WindowQuery};
use crate::api::AppState;
use crate::errors::BreachwatchError;
use crate::models::{ActivityAction, ActivityFilter, ActivityStats, IncidentActivity, NewActivity, Page};

pub async fn list_incident_activities(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<IncidentActivity>>> {
    if state.db.get_incident(id)?.is_none() {
        return Err(BreachwatchError::NotFound(format!("Incident {} not found", id)));
    }
    Ok(Json(state.db.list_activities(id)?))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<(StatusCode, Json<IncidentActivity>)> {
    if req.comment.trim().is_empty() {
        return Err(BreachwatchError::Validation("comment must not be empty".into()));
    }
    let activity = NewActivity::new(ActivityAction::Comment, req.comment.trim())
        .by(req.performed_by.as_deref());
    Ok((StatusCode::CREATED, Json(state.db.add_activity(id, &activity)?)))
}

pub async fn query_activities(
    State(state): State<AppState>,
    Query(filter): Query<ActivityFilter>,
) -> ApiResult<Json<Page<IncidentActivity>>> {
    Ok(Json(state.db.query_activities(&filter)?))
}

pub async fn activity_stats(
    State(state): State<AppState>,
    Query(window): Query<WindowQuery>,
) -> ApiResult<Json<ActivityStats>> {
    Ok(Json(state.db.activity_stats(window.since(Utc::now()))?))
}

pub async fn activity_timeline(
    State(state): State<AppState>,
    Query(window): Query<WindowQuery>,
) -> ApiResult<Json<Value>> {
    let interval = window.interval();
    let buckets = state.db.activity_timeline(window.since(Utc::now()), interval)?;
    Ok(Json(json!({ "interval": interval, "timeline": buckets })))
}

pub async fn action_types(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "action_types": state.db.distinct_action_types()? })))
}
