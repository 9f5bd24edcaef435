// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentId(pub Uuid);

impl IncidentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for IncidentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("Unknown severity: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Detected,
    Responding,
    Contained,
    Resolved,
    Failed,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Detected => "detected",
            IncidentStatus::Responding => "responding",
            IncidentStatus::Contained => "contained",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Failed => "failed",
        }
    }
}

impl FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "detected" => Ok(IncidentStatus::Detected),
            "responding" => Ok(IncidentStatus::Responding),
            "contained" => Ok(IncidentStatus::Contained),
            "resolved" => Ok(IncidentStatus::Resolved),
            "failed" => Ok(IncidentStatus::Failed),
            other => Err(format!("Unknown incident status: {}", other)),
        }
    }
}

/// Security incident aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub incident_type: String,
    pub severity: Severity,
    pub status: IncidentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub target_systems: Vec<String>,
    #[serde(default)]
    pub evidence_ids: Vec<String>,
    pub containment_status: String,
    pub resolution_status: String,
    /// Reporter-supplied fields that have no dedicated column.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    pub fn new(incident_type: impl Into<String>, severity: Severity) -> Self {
        let now = Utc::now();
        Self {
            id: IncidentId::new(),
            incident_type: incident_type.into(),
            severity,
            status: IncidentStatus::Detected,
            description: None,
            source_ip: None,
            target_systems: Vec::new(),
            evidence_ids: Vec::new(),
            containment_status: "pending".to_string(),
            resolution_status: "pending".to_string(),
            details: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, status: IncidentStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Apply a partial update and return the names of the fields that were set.
    pub fn apply_update(&mut self, update: IncidentUpdate) -> Vec<String> {
        let mut updated = Vec::new();

        if let Some(status) = update.status {
            self.status = status;
            updated.push("status".to_string());
        }
        if let Some(severity) = update.severity {
            self.severity = severity;
            updated.push("severity".to_string());
        }
        if let Some(description) = update.description {
            self.description = Some(description);
            updated.push("description".to_string());
        }
        if let Some(target_systems) = update.target_systems {
            self.target_systems = target_systems;
            updated.push("target_systems".to_string());
        }
        if let Some(containment_status) = update.containment_status {
            self.containment_status = containment_status;
            updated.push("containment_status".to_string());
        }
        if let Some(resolution_status) = update.resolution_status {
            self.resolution_status = resolution_status;
            updated.push("resolution_status".to_string());
        }
        if let Some(details) = update.details {
            self.details.extend(details);
            updated.push("details".to_string());
        }

        if !updated.is_empty() {
            self.updated_at = Utc::now();
        }
        updated
    }

    /// The `incident_data` object handed to workers.
    pub fn to_task_context(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentUpdate {
    #[serde(default)]
    pub status: Option<IncidentStatus>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_systems: Option<Vec<String>>,
    #[serde(default)]
    pub containment_status: Option<String>,
    #[serde(default)]
    pub resolution_status: Option<String>,
    #[serde(default)]
    pub details: Option<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_incident_defaults() {
        let incident = Incident::new("ransomware", Severity::High);
        assert_eq!(incident.status, IncidentStatus::Detected);
        assert_eq!(incident.containment_status, "pending");
        assert_eq!(incident.resolution_status, "pending");
        assert!(incident.evidence_ids.is_empty());
    }

    #[test]
    fn test_apply_update_reports_fields() {
        let mut incident = Incident::new("phishing", Severity::Low);
        let before = incident.updated_at;

        let update: IncidentUpdate = serde_json::from_value(json!({
            "status": "resolved",
            "resolution_status": "closed",
            "details": {"ticket": "SEC-42"}
        }))
        .unwrap();

        let fields = incident.apply_update(update);
        assert_eq!(fields, vec!["status", "resolution_status", "details"]);
        assert_eq!(incident.status, IncidentStatus::Resolved);
        assert_eq!(incident.details["ticket"], "SEC-42");
        assert!(incident.updated_at >= before);
    }

    #[test]
    fn test_empty_update_changes_nothing() {
        let mut incident = Incident::new("phishing", Severity::Low);
        let snapshot = incident.clone();
        assert!(incident.apply_update(IncidentUpdate::default()).is_empty());
        assert_eq!(incident, snapshot);
    }

    #[test]
    fn test_severity_ordering_and_parsing() {
        assert!(Severity::Critical > Severity::High);
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert!("catastrophic".parse::<Severity>().is_err());
    }
}
