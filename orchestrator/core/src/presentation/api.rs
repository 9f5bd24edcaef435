// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP API
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/health` | liveness and registered worker count |
//! | POST | `/api/incidents` | create incident, runs the coordinator |
//! | GET | `/api/incidents` | list, `?status=&severity=&since=&until=` |
//! | GET | `/api/incidents/{id}` | incident, response record, actions |
//! | PUT | `/api/incidents/{id}` | partial update |
//! | POST | `/api/incidents/{id}/actions` | add action, runs the dispatcher |
//! | POST | `/api/tasks` | dispatch a raw task |
//! | GET | `/api/workers` | heartbeat sweep |
//! | GET | `/api/evidence` | evidence records by id, `?skip=&limit=` |
//! | GET | `/api/evidence/{id}` | one evidence record |
//!
//! Every error body is `{"error": "...", "component": "..."}`.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::application::dispatcher::{DispatchError, Dispatcher};
use crate::application::incident_service::{
    AddActionRequest, CreateIncidentRequest, IncidentService, IncidentServiceError,
};
use crate::application::registry::{RegistryError, WorkerRegistry};
use crate::domain::incident::{IncidentId, IncidentUpdate};
use crate::domain::repository::{IncidentFilter, RepositoryError};
use crate::domain::storage::{ArtifactStore, StorageError};
use crate::domain::task::Task;

const DEFAULT_EVIDENCE_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub incident_service: Arc<dyn IncidentService>,
    pub dispatcher: Arc<Dispatcher>,
    pub registry: Arc<WorkerRegistry>,
    pub evidence: Arc<dyn ArtifactStore>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        incident_service: Arc<dyn IncidentService>,
        dispatcher: Arc<Dispatcher>,
        registry: Arc<WorkerRegistry>,
        evidence: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            incident_service,
            dispatcher,
            registry,
            evidence,
            start_time: Instant::now(),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/incidents",
            post(create_incident_handler).get(list_incidents_handler),
        )
        .route(
            "/api/incidents/{id}",
            get(get_incident_handler).put(update_incident_handler),
        )
        .route("/api/incidents/{id}/actions", post(add_action_handler))
        .route("/api/tasks", post(dispatch_task_handler))
        .route("/api/workers", get(list_workers_handler))
        .route("/api/evidence", get(list_evidence_handler))
        .route("/api/evidence/{id}", get(get_evidence_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    component: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, component: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            component,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "api", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(component = self.component, status = %self.status, "Request failed: {}", self.message);
        }
        let body = json!({
            "error": self.message,
            "component": self.component,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::WorkerUnavailable { .. } => {
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "dispatcher", err.to_string())
            }
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let status = match err {
            RegistryError::AlreadyRegistered(_) => StatusCode::CONFLICT,
            RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
            RegistryError::TypeMismatch { .. } => StatusCode::BAD_REQUEST,
        };
        ApiError::new(status, "registry", err.to_string())
    }
}

impl From<IncidentServiceError> for ApiError {
    fn from(err: IncidentServiceError) -> Self {
        match err {
            IncidentServiceError::Dispatch(e) => e.into(),
            IncidentServiceError::NotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "incident_service", err.to_string())
            }
            IncidentServiceError::InvalidRequest(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "incident_service", err.to_string())
            }
            IncidentServiceError::Repository(RepositoryError::NotFound(_)) => {
                ApiError::new(StatusCode::NOT_FOUND, "repository", err.to_string())
            }
            IncidentServiceError::Repository(_) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "repository", err.to_string())
            }
            IncidentServiceError::Response(_) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "coordinator", err.to_string())
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let status = match err {
            StorageError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, "evidence", err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

fn parse_incident_id(id: &str) -> Result<IncidentId, ApiError> {
    IncidentId::from_string(id).map_err(|_| ApiError::bad_request(format!("Invalid incident ID: {}", id)))
}

fn parse_optional<T>(field: &str, value: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<T>())
        .transpose()
        .map_err(|e| ApiError::bad_request(format!("Invalid '{}': {}", field, e)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListIncidentsQuery {
    pub status: Option<String>,
    pub severity: Option<String>,
    #[serde(alias = "start_date")]
    pub since: Option<String>,
    #[serde(alias = "end_date")]
    pub until: Option<String>,
}

impl ListIncidentsQuery {
    fn into_filter(self) -> Result<IncidentFilter, ApiError> {
        Ok(IncidentFilter {
            status: parse_optional("status", self.status.as_deref())?,
            severity: parse_optional("severity", self.severity.as_deref())?,
            since: parse_optional::<DateTime<Utc>>("since", self.since.as_deref())?,
            until: parse_optional::<DateTime<Utc>>("until", self.until.as_deref())?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListEvidenceQuery {
    #[serde(default)]
    pub skip: usize,
    pub limit: Option<usize>,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "workers": state.registry.len(),
    }))
}

async fn create_incident_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateIncidentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let created = state.incident_service.create_incident(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_incidents_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListIncidentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.into_filter()?;
    let incidents = state.incident_service.list_incidents(filter).await?;
    Ok(Json(incidents))
}

async fn get_incident_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_incident_id(&id)?;
    let details = state.incident_service.get_incident(id).await?;
    Ok(Json(details))
}

async fn update_incident_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<IncidentUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_incident_id(&id)?;
    let Json(update) = payload?;
    let updated = state.incident_service.update_incident(id, update).await?;
    Ok(Json(updated))
}

async fn add_action_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<AddActionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_incident_id(&id)?;
    let Json(request) = payload?;
    let action = state.incident_service.add_action(id, request).await?;
    Ok((StatusCode::CREATED, Json(action)))
}

async fn dispatch_task_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Task>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(task) = payload?;
    let envelope = state.dispatcher.dispatch(&task).await?;
    Ok(Json(envelope.to_value()))
}

async fn list_workers_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let heartbeats = state.registry.heartbeat_all().await;
    Json(json!({ "workers": heartbeats }))
}

async fn list_evidence_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListEvidenceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let keys = state.evidence.list().await?;
    let limit = query.limit.unwrap_or(DEFAULT_EVIDENCE_LIMIT);

    let mut records = Vec::new();
    for key in keys.iter().skip(query.skip).take(limit) {
        // A key can vanish between list and get; skip it.
        if let Some(record) = state.evidence.get(key).await? {
            records.push(record);
        }
    }
    Ok(Json(records))
}

async fn get_evidence_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .evidence
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "evidence", format!("Evidence not found: {}", id)))?;
    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::worker::WorkerType;

    #[test]
    fn test_error_status_mapping() {
        let unavailable: ApiError = DispatchError::WorkerUnavailable {
            worker_type: "forensic".to_string(),
            reason: "not registered".to_string(),
        }
        .into();
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);

        let conflict: ApiError = RegistryError::AlreadyRegistered(WorkerType::Guardian).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let missing: ApiError = IncidentServiceError::NotFound(IncidentId::new()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let db: ApiError = IncidentServiceError::Repository(RepositoryError::Database("down".into())).into();
        assert_eq!(db.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bad_key: ApiError = StorageError::InvalidKey("../x".into()).into();
        assert_eq!(bad_key.status(), StatusCode::BAD_REQUEST);

        let io: ApiError = StorageError::IoError("disk full".into()).into();
        assert_eq!(io.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_list_query_parsing() {
        let filter = ListIncidentsQuery {
            status: Some("contained".to_string()),
            severity: Some("".to_string()),
            since: Some("2026-01-01T00:00:00Z".to_string()),
            until: None,
        }
        .into_filter()
        .unwrap();
        assert!(filter.status.is_some());
        assert!(filter.severity.is_none());
        assert!(filter.since.is_some());

        let bad = ListIncidentsQuery {
            severity: Some("apocalyptic".to_string()),
            ..Default::default()
        }
        .into_filter()
        .unwrap_err();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }
}
