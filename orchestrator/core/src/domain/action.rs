// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::domain::envelope::ResultEnvelope;
use crate::domain::incident::IncidentId;
use crate::domain::task::Task;
use crate::domain::worker::WorkerType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub Uuid);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Completed,
    Failed,
}

/// A single operator-requested task run against an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentAction {
    pub id: ActionId,
    pub incident_id: IncidentId,
    pub action_type: String,
    pub worker_type: WorkerType,
    pub status: ActionStatus,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultEnvelope>,
    pub created_at: DateTime<Utc>,
}

impl IncidentAction {
    pub fn new(
        incident_id: IncidentId,
        worker_type: WorkerType,
        action_type: impl Into<String>,
        parameters: Map<String, Value>,
    ) -> Self {
        Self {
            id: ActionId::new(),
            incident_id,
            action_type: action_type.into(),
            worker_type,
            status: ActionStatus::Pending,
            parameters,
            result: None,
            created_at: Utc::now(),
        }
    }

    /// Task sent to the dispatcher. The incident id is always part of the payload.
    pub fn to_task(&self) -> Task {
        let mut task = Task::new(self.worker_type, self.action_type.clone());
        task.payload = self.parameters.clone();
        task.payload
            .insert("incident_id".to_string(), Value::String(self.incident_id.to_string()));
        task
    }

    pub fn record_result(&mut self, envelope: ResultEnvelope) {
        self.status = if envelope.is_success() {
            ActionStatus::Completed
        } else {
            ActionStatus::Failed
        };
        self.result = Some(envelope);
    }
}
