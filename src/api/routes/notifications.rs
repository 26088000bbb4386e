use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::api::errors::ApiResult;
use crate::api::models::{ActorQuery, NotificationListQuery, NotificationStatusRequest};
use crate::api::AppState;
use crate::errors::BreachwatchError;
use crate::models::{IncidentNotification, NewNotification};

pub async fn list_for_incident(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<IncidentNotification>>> {
    if state.db.get_incident(id)?.is_none() {
        return Err(BreachwatchError::NotFound(format!("Incident {} not found", id)));
    }
    Ok(Json(state.db.list_notifications(id)?))
}

pub async fn create_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(actor): Query<ActorQuery>,
    Json(req): Json<NewNotification>,
) -> ApiResult<(StatusCode, Json<IncidentNotification>)> {
    let notification = state.db.create_notification(id, &req, actor.actor.as_deref())?;
    Ok((StatusCode::CREATED, Json(notification)))
}

pub async fn list_by_status(
    State(state): State<AppState>,
    Query(query): Query<NotificationListQuery>,
) -> ApiResult<Json<Vec<IncidentNotification>>> {
    Ok(Json(state.db.list_notifications_by_status(query.status)?))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<NotificationStatusRequest>,
) -> ApiResult<Json<IncidentNotification>> {
    let notification = state.db.update_notification_status(
        id,
        req.status,
        req.error.as_deref(),
        req.actor.as_deref(),
    )?;
    Ok(Json(notification))
}

pub async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<IncidentNotification>> {
    state.db.get_notification(id)?
        .map(Json)
        .ok_or_else(|| BreachwatchError::NotFound(format!("Notification {} not found", id)))
}
