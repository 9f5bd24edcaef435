// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Result Envelope
//!
//! Uniform wrapper produced exactly once per dispatched [`crate::domain::task::Task`].
//! Worker faults are data, not exceptions: a failed task still yields an
//! envelope, with `status = "error"` and the fault message.
//!
//! ```json
//! {"status": "success", "worker_type": "containment", "task_type": "contain_threat",
//!  "timestamp": "2026-01-01T00:00:00Z", "payload": {"status": "contained"}}
//! {"status": "error", "worker_type": "forensic", "task_type": "verify_chain",
//!  "timestamp": "2026-01-01T00:00:00Z", "error_kind": "storage", "error_message": "..."}
//! ```
//!
//! Fields are private; an envelope cannot be altered once built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::domain::worker::WorkerType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    Success,
    Error,
}

impl fmt::Display for EnvelopeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeStatus::Success => f.write_str("success"),
            EnvelopeStatus::Error => f.write_str("error"),
        }
    }
}

/// Classification of an error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownOperation,
    InvalidPayload,
    Storage,
    Execution,
    Timeout,
    WorkerUnavailable,
    WorkerFault,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownOperation => "unknown_operation",
            ErrorKind::InvalidPayload => "invalid_payload",
            ErrorKind::Storage => "storage",
            ErrorKind::Execution => "execution",
            ErrorKind::Timeout => "timeout",
            ErrorKind::WorkerUnavailable => "worker_unavailable",
            ErrorKind::WorkerFault => "worker_fault",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success {
        payload: Value,
    },
    Error {
        error_kind: ErrorKind,
        error_message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    worker_type: WorkerType,
    task_type: String,
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    outcome: Outcome,
}

impl ResultEnvelope {
    pub fn success(worker_type: WorkerType, task_type: impl Into<String>, payload: Value) -> Self {
        Self {
            worker_type,
            task_type: task_type.into(),
            timestamp: Utc::now(),
            outcome: Outcome::Success { payload },
        }
    }

    pub fn failure(
        worker_type: WorkerType,
        task_type: impl Into<String>,
        error_kind: ErrorKind,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            worker_type,
            task_type: task_type.into(),
            timestamp: Utc::now(),
            outcome: Outcome::Error {
                error_kind,
                error_message: error_message.into(),
            },
        }
    }

    pub fn status(&self) -> EnvelopeStatus {
        match self.outcome {
            Outcome::Success { .. } => EnvelopeStatus::Success,
            Outcome::Error { .. } => EnvelopeStatus::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == EnvelopeStatus::Success
    }

    pub fn worker_type(&self) -> WorkerType {
        self.worker_type
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn payload(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Success { payload } => Some(payload),
            Outcome::Error { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            Outcome::Error { error_kind, .. } => Some(*error_kind),
            Outcome::Success { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Error { error_message, .. } => Some(error_message),
            Outcome::Success { .. } => None,
        }
    }

    /// JSON form used when threading this envelope into a downstream task.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
