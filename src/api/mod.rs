pub mod routes;
pub mod models;
pub mod errors;
pub mod auth;

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::BreachwatchConfig;
use crate::db::Database;
use crate::errors::BreachwatchError;
use crate::reporting::ExportJob;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub export_jobs: Arc<DashMap<String, ExportJob>>,
    pub config: Arc<BreachwatchConfig>,
    /// Bearer token required on every route but health. `None` leaves the API open.
    pub api_token: Option<String>,
}

impl AppState {
    pub fn new(db: Database, config: BreachwatchConfig, api_token: Option<String>) -> Self {
        Self {
            db,
            export_jobs: Arc::new(DashMap::new()),
            config: Arc::new(config),
            api_token: api_token.filter(|t| !t.trim().is_empty()),
        }
    }
}

pub fn create_app_state(config: BreachwatchConfig) -> Result<AppState, BreachwatchError> {
    let db = Database::new(&config.database.path)?;
    let token = std::env::var(auth::API_TOKEN_ENV).ok();
    Ok(AppState::new(db, config, token))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(parsed)
}

pub fn build_router(state: AppState) -> Router {
    use routes::{activities, export, health, incident_types, incidents, notifications, stats};

    let protected = Router::new()
        .route("/api/incidents", get(incidents::list_incidents).post(incidents::create_incident))
        .route(
            "/api/incidents/:id",
            get(incidents::get_incident)
                .patch(incidents::update_incident)
                .delete(incidents::delete_incident),
        )
        .route("/api/incidents/:id/status", post(incidents::advance_status))
        .route("/api/incidents/:id/transitions", get(incidents::next_states))
        .route("/api/incidents/:id/breach", post(incidents::mark_breach))
        .route("/api/incidents/:id/breach-state", get(incidents::breach_state))
        .route("/api/incidents/:id/notification-sent", post(incidents::record_notification_sent))
        .route("/api/incidents/:id/consistency", get(incidents::consistency_report))
        .route(
            "/api/incidents/:id/activities",
            get(activities::list_incident_activities).post(activities::add_comment),
        )
        .route(
            "/api/incidents/:id/notifications",
            get(notifications::list_for_incident).post(notifications::create_notification),
        )
        .route("/api/breaches/overdue", get(incidents::overdue_breaches))
        .route("/api/incident-types", get(incident_types::list_types).post(incident_types::create_type))
        .route(
            "/api/incident-types/:id",
            get(incident_types::get_type).delete(incident_types::delete_type),
        )
        .route("/api/activities", get(activities::query_activities))
        .route("/api/activities/stats", get(activities::activity_stats))
        .route("/api/activities/timeline", get(activities::activity_timeline))
        .route("/api/activities/actions", get(activities::action_types))
        .route("/api/notifications", get(notifications::list_by_status))
        .route(
            "/api/notifications/:id",
            get(notifications::get_notification).patch(notifications::update_status),
        )
        .route("/api/stats", get(stats::incident_stats))
        .route("/api/export", post(export::create_export))
        .route("/api/export/formats", get(export::formats))
        .route("/api/export/jobs/:job_id", get(export::get_job))
        .route("/api/export/download/:job_id", get(export::download))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::api_auth_middleware));

    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/api/health", get(health::health_check))
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
