// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Incident Service
//!
//! Application service behind the incident HTTP endpoints.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Incident lifecycle and operator actions
//! - **Collaborators:**
//!   - Domain: Incident, IncidentAction, IncidentResponseRecord
//!   - Application: Coordinator, Dispatcher
//!   - Infrastructure: repositories, EventBus
//!
//! `create_incident` moves an incident `detected -> responding` and then to
//! `contained` when the containment step succeeded, `failed` otherwise. An
//! incident whose response record cannot be built or saved is also left
//! `failed`, never `responding`.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::application::coordinator::Coordinator;
use crate::application::dispatcher::{DispatchError, Dispatcher};
use crate::domain::action::IncidentAction;
use crate::domain::envelope::{ErrorKind, ResultEnvelope};
use crate::domain::events::IncidentEvent;
use crate::domain::incident::{Incident, IncidentId, IncidentStatus, IncidentUpdate, Severity};
use crate::domain::repository::{
    ActionRepository, IncidentFilter, IncidentRepository, RepositoryError, ResponseRecordRepository,
};
use crate::domain::response::{IncidentResponseRecord, ResponseRecordError, ResponseStep};
use crate::domain::worker::{UnknownWorkerType, WorkerType};
use crate::infrastructure::event_bus::EventBus;

/// Incident report as submitted by a detector or operator.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIncidentRequest {
    #[serde(rename = "type", alias = "incident_type")]
    pub incident_type: String,

    #[serde(default)]
    pub severity: Severity,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub source_ip: Option<String>,

    #[serde(default)]
    pub target_systems: Vec<String>,

    /// Any other reporter-supplied fields.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl CreateIncidentRequest {
    pub fn new(incident_type: impl Into<String>, severity: Severity) -> Self {
        Self {
            incident_type: incident_type.into(),
            severity,
            description: None,
            source_ip: None,
            target_systems: Vec::new(),
            details: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddActionRequest {
    /// Operation name handed to the worker as `task.type`
    #[serde(rename = "type")]
    pub action_type: String,

    #[serde(alias = "agent_type")]
    pub worker_type: String,

    #[serde(default)]
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedIncident {
    pub incident: Incident,
    pub response: IncidentResponseRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncidentDetails {
    pub incident: Incident,
    pub response: Option<IncidentResponseRecord>,
    pub actions: Vec<IncidentAction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatedIncident {
    pub incident_id: IncidentId,
    pub updated_fields: Vec<String>,
}

#[derive(Debug, Error)]
pub enum IncidentServiceError {
    #[error("Incident not found: {0}")]
    NotFound(IncidentId),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Response(#[from] ResponseRecordError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[async_trait]
pub trait IncidentService: Send + Sync {
    /// Persist a new incident and run the five-step response for it.
    async fn create_incident(
        &self,
        request: CreateIncidentRequest,
    ) -> Result<CreatedIncident, IncidentServiceError>;

    async fn get_incident(&self, id: IncidentId) -> Result<IncidentDetails, IncidentServiceError>;

    /// Newest first.
    async fn list_incidents(&self, filter: IncidentFilter) -> Result<Vec<Incident>, IncidentServiceError>;

    async fn update_incident(
        &self,
        id: IncidentId,
        update: IncidentUpdate,
    ) -> Result<UpdatedIncident, IncidentServiceError>;

    /// Record an operator action and run it through the dispatcher.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no incident with this id
    /// - `InvalidRequest`: unrecognized worker type
    /// - `Dispatch`: no ready worker for the action; the action is still
    ///   persisted as `failed`
    async fn add_action(
        &self,
        incident_id: IncidentId,
        request: AddActionRequest,
    ) -> Result<IncidentAction, IncidentServiceError>;
}

pub struct StandardIncidentService {
    incident_repository: Arc<dyn IncidentRepository>,
    action_repository: Arc<dyn ActionRepository>,
    response_repository: Arc<dyn ResponseRecordRepository>,
    coordinator: Arc<Coordinator>,
    dispatcher: Arc<Dispatcher>,
    event_bus: Arc<EventBus>,
}

impl StandardIncidentService {
    pub fn new(
        incident_repository: Arc<dyn IncidentRepository>,
        action_repository: Arc<dyn ActionRepository>,
        response_repository: Arc<dyn ResponseRecordRepository>,
        coordinator: Arc<Coordinator>,
        dispatcher: Arc<Dispatcher>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            incident_repository,
            action_repository,
            response_repository,
            coordinator,
            dispatcher,
            event_bus,
        }
    }

    async fn load(&self, id: IncidentId) -> Result<Incident, IncidentServiceError> {
        self.incident_repository
            .find_by_id(id)
            .await?
            .ok_or(IncidentServiceError::NotFound(id))
    }

    async fn transition(&self, incident: &mut Incident, status: IncidentStatus) -> Result<(), IncidentServiceError> {
        incident.transition(status);
        self.incident_repository.save(incident).await?;
        self.event_bus
            .publish_incident_event(IncidentEvent::IncidentStatusChanged {
                incident_id: incident.id,
                status,
                changed_at: Utc::now(),
            });
        Ok(())
    }

    /// Mark an incident `failed` after its response could not be recorded.
    /// The original error is what the caller sees, so a failing save here is
    /// only logged.
    async fn abandon(&self, incident: &mut Incident, reason: &str) {
        error!(incident_id = %incident.id, "Incident response not recorded: {}", reason);
        incident.containment_status = "failed".to_string();
        if let Err(e) = self.transition(incident, IncidentStatus::Failed).await {
            error!(incident_id = %incident.id, "Failed to mark incident failed: {}", e);
        }
    }
}

/// Fold the containment and evidence steps back into the incident.
fn apply_response(incident: &mut Incident, record: &IncidentResponseRecord) -> IncidentStatus {
    let containment = record
        .envelope(ResponseStep::Contain)
        .and_then(ResultEnvelope::payload);

    let status = match containment {
        Some(payload) => {
            incident.containment_status = payload
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("contained")
                .to_string();
            IncidentStatus::Contained
        }
        None => {
            incident.containment_status = "failed".to_string();
            IncidentStatus::Failed
        }
    };

    let evidence_id = record
        .envelope(ResponseStep::CollectEvidence)
        .and_then(ResultEnvelope::payload)
        .and_then(|payload| payload.get("evidence_id"))
        .and_then(Value::as_str);
    if let Some(evidence_id) = evidence_id {
        if !incident.evidence_ids.iter().any(|id| id == evidence_id) {
            incident.evidence_ids.push(evidence_id.to_string());
        }
    }

    status
}

#[async_trait]
impl IncidentService for StandardIncidentService {
    async fn create_incident(
        &self,
        request: CreateIncidentRequest,
    ) -> Result<CreatedIncident, IncidentServiceError> {
        if request.incident_type.trim().is_empty() {
            return Err(IncidentServiceError::InvalidRequest(
                "'type' must not be empty".to_string(),
            ));
        }

        let mut incident = Incident::new(request.incident_type, request.severity);
        incident.description = request.description;
        incident.source_ip = request.source_ip;
        incident.target_systems = request.target_systems;
        incident.details = request.details;
        self.incident_repository.save(&incident).await?;

        info!(
            target: "incident",
            incident_id = %incident.id,
            incident_type = %incident.incident_type,
            severity = incident.severity.as_str(),
            source_ip = incident.source_ip.as_deref().unwrap_or("-"),
            targets = ?incident.target_systems,
            "Incident detected"
        );
        self.event_bus
            .publish_incident_event(IncidentEvent::IncidentDetected {
                incident_id: incident.id,
                incident_type: incident.incident_type.clone(),
                severity: incident.severity,
                detected_at: incident.created_at,
            });

        self.transition(&mut incident, IncidentStatus::Responding).await?;

        let record = match self.coordinator.respond(&incident).await {
            Ok(record) => record,
            Err(e) => {
                self.abandon(&mut incident, &e.to_string()).await;
                return Err(e.into());
            }
        };
        if let Err(e) = self.response_repository.save(&record).await {
            self.abandon(&mut incident, &e.to_string()).await;
            return Err(e.into());
        }

        let status = apply_response(&mut incident, &record);
        if status == IncidentStatus::Failed {
            warn!(incident_id = %incident.id, "Containment did not succeed");
        }
        self.transition(&mut incident, status).await?;

        Ok(CreatedIncident {
            incident,
            response: record,
        })
    }

    async fn get_incident(&self, id: IncidentId) -> Result<IncidentDetails, IncidentServiceError> {
        let incident = self.load(id).await?;
        let response = self.response_repository.find_by_incident(id).await?;
        let actions = self.action_repository.find_by_incident(id).await?;

        Ok(IncidentDetails {
            incident,
            response,
            actions,
        })
    }

    async fn list_incidents(&self, filter: IncidentFilter) -> Result<Vec<Incident>, IncidentServiceError> {
        Ok(self.incident_repository.find_by_filter(&filter).await?)
    }

    async fn update_incident(
        &self,
        id: IncidentId,
        update: IncidentUpdate,
    ) -> Result<UpdatedIncident, IncidentServiceError> {
        let mut incident = self.load(id).await?;
        let updated_fields = incident.apply_update(update);

        if !updated_fields.is_empty() {
            self.incident_repository.save(&incident).await?;
            info!(incident_id = %id, fields = ?updated_fields, "Incident updated");
        }

        Ok(UpdatedIncident {
            incident_id: id,
            updated_fields,
        })
    }

    async fn add_action(
        &self,
        incident_id: IncidentId,
        request: AddActionRequest,
    ) -> Result<IncidentAction, IncidentServiceError> {
        self.load(incident_id).await?;

        let worker_type: WorkerType = request
            .worker_type
            .parse()
            .map_err(|e: UnknownWorkerType| IncidentServiceError::InvalidRequest(e.to_string()))?;

        let mut action = IncidentAction::new(incident_id, worker_type, request.action_type, request.parameters);
        self.action_repository.save(&action).await?;

        let dispatched = self.dispatcher.dispatch(&action.to_task()).await;
        let envelope = match &dispatched {
            Ok(envelope) => envelope.clone(),
            Err(DispatchError::WorkerUnavailable { worker_type, reason }) => ResultEnvelope::failure(
                action.worker_type,
                action.action_type.clone(),
                ErrorKind::WorkerUnavailable,
                format!("WorkerUnavailable: {} ({})", worker_type, reason),
            ),
        };
        action.record_result(envelope);
        self.action_repository.save(&action).await?;

        self.event_bus
            .publish_incident_event(IncidentEvent::ActionRecorded {
                incident_id,
                action_id: action.id,
                action_type: action.action_type.clone(),
                status: action.status,
                recorded_at: Utc::now(),
            });

        if let Err(e) = dispatched {
            error!(incident_id = %incident_id, action_id = %action.id, "Action could not be dispatched: {}", e);
            return Err(e.into());
        }

        info!(
            incident_id = %incident_id,
            action_id = %action.id,
            action_type = %action.action_type,
            status = ?action.status,
            "Action recorded"
        );
        Ok(action)
    }
}
