// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::action::{ActionId, ActionStatus};
use crate::domain::envelope::{EnvelopeStatus, ErrorKind};
use crate::domain::incident::{IncidentId, IncidentStatus, Severity};
use crate::domain::response::{ResponseStatus, ResponseStep};
use crate::domain::worker::{WorkerId, WorkerType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkerLifecycleEvent {
    WorkerRegistered {
        worker_id: WorkerId,
        worker_type: WorkerType,
        registered_at: DateTime<Utc>,
    },
    WorkerInitializationFailed {
        worker_id: WorkerId,
        worker_type: WorkerType,
        failed_at: DateTime<Utc>,
    },
    WorkerUnregistered {
        worker_id: WorkerId,
        worker_type: WorkerType,
        unregistered_at: DateTime<Utc>,
    },
    WorkerEvicted {
        worker_id: WorkerId,
        worker_type: WorkerType,
        reason: String,
        evicted_at: DateTime<Utc>,
    },
    WorkerShutdown {
        worker_id: WorkerId,
        worker_type: WorkerType,
        shutdown_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DispatchEvent {
    TaskDispatched {
        worker_type: WorkerType,
        task_type: String,
        dispatched_at: DateTime<Utc>,
    },
    TaskCompleted {
        worker_type: WorkerType,
        task_type: String,
        status: EnvelopeStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_kind: Option<ErrorKind>,
        duration_ms: u64,
        completed_at: DateTime<Utc>,
    },
    TaskRejected {
        worker_type: String,
        task_type: String,
        reason: String,
        rejected_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IncidentEvent {
    IncidentDetected {
        incident_id: IncidentId,
        incident_type: String,
        severity: Severity,
        detected_at: DateTime<Utc>,
    },
    ResponseStepCompleted {
        incident_id: IncidentId,
        step: ResponseStep,
        status: EnvelopeStatus,
        completed_at: DateTime<Utc>,
    },
    ResponseFinished {
        incident_id: IncidentId,
        status: ResponseStatus,
        failed_steps: Vec<ResponseStep>,
        finished_at: DateTime<Utc>,
    },
    IncidentStatusChanged {
        incident_id: IncidentId,
        status: IncidentStatus,
        changed_at: DateTime<Utc>,
    },
    ActionRecorded {
        incident_id: IncidentId,
        action_id: ActionId,
        action_type: String,
        status: ActionStatus,
        recorded_at: DateTime<Utc>,
    },
}
