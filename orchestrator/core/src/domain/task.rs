// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Task
//!
//! The unit of work routed by the dispatcher. On the wire a task is a flat
//! JSON object:
//!
//! ```json
//! {"type": "contain_threat", "worker_type": "containment", "threat_level": "high"}
//! ```
//!
//! `type` names the operation, `worker_type` (or its legacy alias
//! `agent_type`) is the routing key, and every other field is payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::worker::{WorkerError, WorkerType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTask")]
pub struct Task {
    #[serde(rename = "type")]
    pub task_type: String,

    pub worker_type: String,

    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawTask {
    #[serde(rename = "type")]
    task_type: String,
    #[serde(default)]
    worker_type: Option<String>,
    #[serde(default)]
    agent_type: Option<String>,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl TryFrom<RawTask> for Task {
    type Error = String;

    fn try_from(raw: RawTask) -> Result<Self, Self::Error> {
        let worker_type = raw
            .worker_type
            .or(raw.agent_type)
            .ok_or_else(|| "missing field `worker_type`".to_string())?;

        Ok(Self {
            task_type: raw.task_type,
            worker_type,
            payload: raw.payload,
        })
    }
}

impl Task {
    pub fn new(worker_type: WorkerType, task_type: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            worker_type: worker_type.as_str().to_string(),
            payload: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Merge every key of a JSON object into the payload. Non-objects are ignored.
    pub fn with_fields(mut self, fields: Value) -> Self {
        if let Value::Object(map) = fields {
            for (key, value) in map {
                self.payload.insert(key, value);
            }
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Read a string field, falling back to `default` when absent or null.
    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_str(key).unwrap_or(default)
    }

    /// Read an optional list of strings; a present field of any other shape is rejected.
    pub fn string_list(&self, key: &str) -> Result<Vec<String>, WorkerError> {
        match self.payload.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        WorkerError::InvalidPayload(format!("'{}' must contain only strings", key))
                    })
                })
                .collect(),
            Some(_) => Err(WorkerError::InvalidPayload(format!(
                "'{}' must be a list of strings",
                key
            ))),
        }
    }

    pub fn value_or_null(&self, key: &str) -> Value {
        self.payload.get(key).cloned().unwrap_or(Value::Null)
    }
}
