// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Incident Response Coordinator
//!
//! Runs the fixed five-step workflow for one incident:
//!
//! ```text
//! assess (guardian) -> model (simulation) -> contain (containment)
//!     -> collect evidence (forensic) -> document (compliance)
//! ```
//!
//! Each step's envelope is threaded into the inputs of the steps after it.
//! A step whose worker is missing is recorded as a `worker_unavailable` error
//! envelope, so under [`CoordinationPolicy::BestEffort`] the record always
//! holds five envelopes. Under [`CoordinationPolicy::FailFast`] the first
//! error envelope aborts the run.

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::dispatcher::{DispatchError, Dispatcher};
use crate::domain::envelope::{ErrorKind, ResultEnvelope};
use crate::domain::events::IncidentEvent;
use crate::domain::incident::Incident;
use crate::domain::response::{
    CoordinationPolicy, IncidentResponseRecord, ResponseRecordError, ResponseStep,
};
use crate::domain::task::Task;
use crate::infrastructure::event_bus::EventBus;

pub const EVIDENCE_TYPE: &str = "incident_response";
pub const DOCUMENTATION_TYPE: &str = "incident_report";

pub struct Coordinator {
    dispatcher: Arc<Dispatcher>,
    event_bus: Arc<EventBus>,
    policy: CoordinationPolicy,
}

impl Coordinator {
    pub fn new(dispatcher: Arc<Dispatcher>, event_bus: Arc<EventBus>, policy: CoordinationPolicy) -> Self {
        Self {
            dispatcher,
            event_bus,
            policy,
        }
    }

    pub fn policy(&self) -> CoordinationPolicy {
        self.policy
    }

    pub async fn respond(&self, incident: &Incident) -> Result<IncidentResponseRecord, ResponseRecordError> {
        let mut record = IncidentResponseRecord::new(incident.id, self.policy);
        info!(incident_id = %incident.id, policy = %self.policy, "Coordinating incident response");

        for step in ResponseStep::ORDER {
            let task = step_task(step, incident, &record);
            let envelope = match self.dispatcher.dispatch(&task).await {
                Ok(envelope) => envelope,
                Err(DispatchError::WorkerUnavailable { worker_type, reason }) => {
                    warn!(incident_id = %incident.id, step = %step, "No worker for step: {}", reason);
                    ResultEnvelope::failure(
                        step.worker_type(),
                        step.operation(),
                        ErrorKind::WorkerUnavailable,
                        format!("WorkerUnavailable: {} ({})", worker_type, reason),
                    )
                }
            };

            let succeeded = envelope.is_success();
            self.event_bus
                .publish_incident_event(IncidentEvent::ResponseStepCompleted {
                    incident_id: incident.id,
                    step,
                    status: envelope.status(),
                    completed_at: Utc::now(),
                });
            record.append(step, envelope)?;

            if !succeeded && self.policy == CoordinationPolicy::FailFast {
                warn!(incident_id = %incident.id, step = %step, "Step failed, aborting response");
                record.abort();
                break;
            }
        }

        if !record.is_finalized() {
            record.complete();
        }

        let failed_steps = record.failed_steps();
        metrics::counter!(
            "kraken_incident_responses_total",
            "status" => record.status.as_str()
        )
        .increment(1);
        info!(
            incident_id = %incident.id,
            status = record.status.as_str(),
            steps = record.steps.len(),
            failed = failed_steps.len(),
            "Incident response finished"
        );
        self.event_bus
            .publish_incident_event(IncidentEvent::ResponseFinished {
                incident_id: incident.id,
                status: record.status,
                failed_steps,
                finished_at: Utc::now(),
            });

        Ok(record)
    }
}

fn envelope_value(record: &IncidentResponseRecord, step: ResponseStep) -> Value {
    record
        .envelope(step)
        .map(ResultEnvelope::to_value)
        .unwrap_or(Value::Null)
}

/// The assessed threat level when S1 produced one, else the incident severity.
fn threat_level(record: &IncidentResponseRecord, incident: &Incident) -> String {
    record
        .envelope(ResponseStep::Assess)
        .and_then(ResultEnvelope::payload)
        .and_then(|payload| payload.get("threat_level"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| incident.severity.as_str().to_string())
}

/// Build the task for `step` from the incident and the envelopes recorded so far.
pub fn step_task(step: ResponseStep, incident: &Incident, record: &IncidentResponseRecord) -> Task {
    let task = Task::new(step.worker_type(), step.operation());
    let incident_data = incident.to_task_context();

    match step {
        ResponseStep::Assess => task.with_field("incident_data", incident_data),
        ResponseStep::Model => task.with_fields(json!({
            "threat_data": envelope_value(record, ResponseStep::Assess),
            "target_system": incident.target_systems.first(),
            "attack_type": incident.incident_type,
        })),
        ResponseStep::Contain => task.with_fields(json!({
            "threat_data": envelope_value(record, ResponseStep::Assess),
            "attack_model": envelope_value(record, ResponseStep::Model),
            "threat_level": threat_level(record, incident),
            "target_systems": incident.target_systems,
        })),
        ResponseStep::CollectEvidence => task.with_fields(json!({
            "incident_data": incident_data,
            "containment_data": envelope_value(record, ResponseStep::Contain),
            "evidence_type": EVIDENCE_TYPE,
            "evidence_data": incident_data,
        })),
        ResponseStep::Document => task.with_fields(json!({
            "incident_data": incident_data,
            "evidence_data": envelope_value(record, ResponseStep::CollectEvidence),
            "incident_id": incident.id.to_string(),
            "documentation_type": DOCUMENTATION_TYPE,
        })),
    }
}
