use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::api::errors::ApiResult;
use crate::api::models::{ActorQuery, DeletedResponse, NotificationSentRequest, StatusRequest};
use crate::api::AppState;
use crate::errors::BreachwatchError;
use crate::models::{BreachDetails, Incident, IncidentFilter, IncidentUpdate, NewIncident, Page};
use crate::tracking::{breach, consistency, lifecycle, BreachState};

fn not_found(id: i64) -> BreachwatchError {
    BreachwatchError::NotFound(format!("Incident {} not found", id))
}

fn load(state: &AppState, id: i64) -> ApiResult<Incident> {
    state.db.get_incident(id)?.ok_or_else(|| not_found(id))
}

pub async fn create_incident(
    State(state): State<AppState>,
    Json(req): Json<NewIncident>,
) -> ApiResult<(StatusCode, Json<Incident>)> {
    let incident = state.db.create_incident(&req, req.reported_by.as_deref())?;
    Ok((StatusCode::CREATED, Json(incident)))
}

pub async fn list_incidents(
    State(state): State<AppState>,
    Query(filter): Query<IncidentFilter>,
) -> ApiResult<Json<Page<Incident>>> {
    Ok(Json(state.db.list_incidents(&filter)?))
}

pub async fn get_incident(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Incident>> {
    Ok(Json(load(&state, id)?))
}

pub async fn update_incident(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(actor): Query<ActorQuery>,
    Json(update): Json<IncidentUpdate>,
) -> ApiResult<Json<Incident>> {
    Ok(Json(state.db.update_incident(id, &update, actor.actor.as_deref())?))
}

pub async fn delete_incident(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeletedResponse>> {
    if state.db.delete_incident(id)? {
        Ok(Json(DeletedResponse { deleted: true }))
    } else {
        Err(not_found(id))
    }
}

/// Guarded lifecycle move.
pub async fn advance_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<Incident>> {
    Ok(Json(lifecycle::advance_status(&state.db, id, req.status, req.actor.as_deref())?))
}

pub async fn next_states(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let incident = load(&state, id)?;
    Ok(Json(json!({
        "status": incident.status,
        "next": lifecycle::next_states(incident.status),
    })))
}

pub async fn mark_breach(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(actor): Query<ActorQuery>,
    Json(details): Json<BreachDetails>,
) -> ApiResult<Json<Incident>> {
    let incident = breach::mark_data_breach(
        &state.db,
        id,
        &details,
        state.config.breach.default_deadline_hours,
        actor.actor.as_deref(),
    )?;
    Ok(Json(incident))
}

pub async fn breach_state(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let incident = load(&state, id)?;
    let now = Utc::now();
    let breach_state = BreachState::evaluate(&incident, now);
    Ok(Json(json!({
        "incident_id": incident.id,
        "incident_number": incident.incident_number,
        "evaluated_at": now,
        "label": breach_state.label(),
        "breach": breach_state,
    })))
}

pub async fn record_notification_sent(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<NotificationSentRequest>,
) -> ApiResult<Json<Incident>> {
    let sent_at = req.sent_at.unwrap_or_else(Utc::now);
    Ok(Json(state.db.record_notification_sent(id, Some(sent_at), req.completed, req.actor.as_deref())?))
}

pub async fn consistency_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let incident = load(&state, id)?;
    let issues = consistency::check(&incident);
    let described: Vec<Value> = issues
        .iter()
        .map(|i| json!({ "issue": i, "description": i.describe() }))
        .collect();
    Ok(Json(json!({
        "incident_id": incident.id,
        "consistent": issues.is_empty(),
        "issues": described,
    })))
}

pub async fn overdue_breaches(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let overdue = breach::overdue_breaches(&state.db, Utc::now())?;
    Ok(Json(json!({ "total": overdue.len(), "incidents": overdue })))
}
