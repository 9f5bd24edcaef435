// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Containment worker: isolates affected systems and coordinates recovery.
//!
//! `contain_threat` selects a [`ContainmentLevel`] from the task's
//! `threat_level`; values outside the four known levels are rejected before
//! any action is taken.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use super::{configured_state, delegate_worker_state, timestamp};
use crate::domain::node_config::WorkerSettings;
use crate::domain::task::Task;
use crate::domain::worker::{Worker, WorkerError, WorkerHeartbeat, WorkerState, WorkerType};

const CAPABILITIES: &[&str] = &[
    "network_segmentation",
    "traffic_rerouting",
    "system_isolation",
    "recovery_coordination",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainmentOperation {
    ContainThreat,
    IsolateSystem,
    CoordinateRecovery,
}

impl ContainmentOperation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "contain_threat" => Some(Self::ContainThreat),
            "isolate_system" => Some(Self::IsolateSystem),
            "coordinate_recovery" => Some(Self::CoordinateRecovery),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContainmentLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ContainmentLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainmentLevel::Low => "low",
            ContainmentLevel::Medium => "medium",
            ContainmentLevel::High => "high",
            ContainmentLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for ContainmentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainmentLevel {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(ContainmentLevel::Low),
            "medium" => Ok(ContainmentLevel::Medium),
            "high" => Ok(ContainmentLevel::High),
            "critical" => Ok(ContainmentLevel::Critical),
            other => Err(WorkerError::InvalidPayload(format!(
                "Unknown threat level: {}",
                other
            ))),
        }
    }
}

pub struct ContainmentWorker {
    state: WorkerState,
}

impl ContainmentWorker {
    pub fn new(settings: &WorkerSettings) -> Self {
        Self {
            state: configured_state(WorkerType::Containment, CAPABILITIES, settings),
        }
    }

    fn contain_threat(&self, task: &Task) -> Result<Value, WorkerError> {
        let level = match task.get("threat_level") {
            None | Some(Value::Null) => ContainmentLevel::Low,
            Some(Value::String(level)) => level.parse()?,
            Some(other) => {
                return Err(WorkerError::InvalidPayload(format!(
                    "Unknown threat level: {}",
                    other
                )))
            }
        };
        let target_systems = task.string_list("target_systems")?;

        info!(
            containment_level = %level,
            systems = target_systems.len(),
            "Containing threat"
        );

        Ok(json!({
            "status": "contained",
            "containment_level": level.as_str(),
            "timestamp": timestamp(),
            "affected_systems": target_systems,
            "actions_taken": [],
        }))
    }

    fn isolate_system(&self, task: &Task) -> Result<Value, WorkerError> {
        Ok(json!({
            "status": "isolated",
            "system_id": task.value_or_null("system_id"),
            "isolation_level": task.str_or("isolation_level", "full"),
            "timestamp": timestamp(),
        }))
    }

    fn coordinate_recovery(&self, task: &Task) -> Result<Value, WorkerError> {
        Ok(json!({
            "status": "recovery_initiated",
            "affected_systems": task.string_list("affected_systems")?,
            "recovery_priority": task.str_or("recovery_priority", "normal"),
            "timestamp": timestamp(),
            "recovery_steps": [],
        }))
    }
}

#[async_trait]
impl Worker for ContainmentWorker {
    delegate_worker_state!();

    async fn initialize(&self) -> bool {
        if self.state.is_ready() {
            return true;
        }
        self.state.finish_initialize::<WorkerError>(Ok(()))
    }

    async fn execute(&self, task: &Task) -> Result<Value, WorkerError> {
        let operation = ContainmentOperation::from_name(&task.task_type)
            .ok_or_else(|| self.state.unknown_operation(&task.task_type))?;

        match operation {
            ContainmentOperation::ContainThreat => self.contain_threat(task),
            ContainmentOperation::IsolateSystem => self.isolate_system(task),
            ContainmentOperation::CoordinateRecovery => self.coordinate_recovery(task),
        }
    }

    async fn cleanup(&self) -> bool {
        self.state.shutdown()
    }

    async fn heartbeat(&self) -> WorkerHeartbeat {
        self.state.heartbeat()
    }
}
