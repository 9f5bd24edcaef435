// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate root: one repository per
//! aggregate, interface defined in the domain layer, implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `IncidentRepository` | `Incident` | `InMemoryIncidentRepository`, `PostgresIncidentRepository` |
//! | `ActionRepository` | `IncidentAction` | `InMemoryActionRepository`, `PostgresActionRepository` |
//! | `ResponseRecordRepository` | `IncidentResponseRecord` | `InMemoryResponseRecordRepository`, `PostgresResponseRecordRepository` |
//!
//! Concrete implementations are selected at startup from `spec.storage.backend`
//! in `kraken-config.yaml`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::action::IncidentAction;
use crate::domain::incident::{Incident, IncidentId, IncidentStatus, Severity};
use crate::domain::response::IncidentResponseRecord;

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
}

/// Query parameters for listing incidents. Every set field must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentFilter {
    #[serde(default)]
    pub status: Option<IncidentStatus>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
}

impl IncidentFilter {
    pub fn matches(&self, incident: &Incident) -> bool {
        self.status.is_none_or(|s| incident.status == s)
            && self.severity.is_none_or(|s| incident.severity == s)
            && self.since.is_none_or(|t| incident.created_at >= t)
            && self.until.is_none_or(|t| incident.created_at <= t)
    }
}

#[async_trait]
pub trait IncidentRepository: Send + Sync {
    /// Save incident (create or update)
    async fn save(&self, incident: &Incident) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: IncidentId) -> Result<Option<Incident>, RepositoryError>;

    /// Newest first.
    async fn find_by_filter(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, RepositoryError>;

    async fn delete(&self, id: IncidentId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ActionRepository: Send + Sync {
    async fn save(&self, action: &IncidentAction) -> Result<(), RepositoryError>;

    /// Oldest first.
    async fn find_by_incident(&self, incident_id: IncidentId) -> Result<Vec<IncidentAction>, RepositoryError>;
}

#[async_trait]
pub trait ResponseRecordRepository: Send + Sync {
    async fn save(&self, record: &IncidentResponseRecord) -> Result<(), RepositoryError>;

    async fn find_by_incident(
        &self,
        incident_id: IncidentId,
    ) -> Result<Option<IncidentResponseRecord>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
