// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! PostgreSQL Repositories
//!
//! Each aggregate is stored as a JSONB document next to the columns used for
//! filtering and ordering. The document is the source of truth on load.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::action::IncidentAction;
use crate::domain::incident::{Incident, IncidentId};
use crate::domain::repository::{
    ActionRepository, IncidentFilter, IncidentRepository, RepositoryError, ResponseRecordRepository,
};
use crate::domain::response::IncidentResponseRecord;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS incidents (
        id UUID PRIMARY KEY,
        incident_type TEXT NOT NULL,
        severity TEXT NOT NULL,
        status TEXT NOT NULL,
        domain_json JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS incidents_created_at_idx ON incidents (created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS incident_actions (
        id UUID PRIMARY KEY,
        incident_id UUID NOT NULL,
        action_type TEXT NOT NULL,
        status TEXT NOT NULL,
        domain_json JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS incident_actions_incident_idx ON incident_actions (incident_id, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS incident_responses (
        incident_id UUID PRIMARY KEY,
        status TEXT NOT NULL,
        domain_json JSONB NOT NULL,
        started_at TIMESTAMPTZ NOT NULL,
        completed_at TIMESTAMPTZ
    )
    "#,
];

/// Create the tables used by the repositories in this module if missing.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), RepositoryError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

fn enum_text<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(RepositoryError::Serialization(format!(
            "expected a string-encoded enum, got {}",
            other
        ))),
    }
}

fn decode<T: serde::de::DeserializeOwned>(row: &sqlx::postgres::PgRow) -> Result<T, RepositoryError> {
    let domain_json: serde_json::Value = row.try_get("domain_json")?;
    Ok(serde_json::from_value(domain_json)?)
}

pub struct PostgresIncidentRepository {
    pool: PgPool,
}

impl PostgresIncidentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IncidentRepository for PostgresIncidentRepository {
    async fn save(&self, incident: &Incident) -> Result<(), RepositoryError> {
        let domain_json = serde_json::to_value(incident)?;

        sqlx::query(
            r#"
            INSERT INTO incidents (id, incident_type, severity, status, domain_json, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                severity = EXCLUDED.severity,
                status = EXCLUDED.status,
                domain_json = EXCLUDED.domain_json,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(incident.id.0)
        .bind(&incident.incident_type)
        .bind(incident.severity.as_str())
        .bind(incident.status.as_str())
        .bind(domain_json)
        .bind(incident.created_at)
        .bind(incident.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save incident: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: IncidentId) -> Result<Option<Incident>, RepositoryError> {
        let row = sqlx::query("SELECT domain_json FROM incidents WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode).transpose()
    }

    async fn find_by_filter(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT domain_json
            FROM incidents
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::TEXT IS NULL OR severity = $2)
              AND ($3::TIMESTAMPTZ IS NULL OR created_at >= $3)
              AND ($4::TIMESTAMPTZ IS NULL OR created_at <= $4)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.severity.map(|s| s.as_str()))
        .bind(filter.since)
        .bind(filter.until)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode).collect()
    }

    async fn delete(&self, id: IncidentId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM incidents WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub struct PostgresActionRepository {
    pool: PgPool,
}

impl PostgresActionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActionRepository for PostgresActionRepository {
    async fn save(&self, action: &IncidentAction) -> Result<(), RepositoryError> {
        let domain_json = serde_json::to_value(action)?;

        sqlx::query(
            r#"
            INSERT INTO incident_actions (id, incident_id, action_type, status, domain_json, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                domain_json = EXCLUDED.domain_json
            "#,
        )
        .bind(action.id.0)
        .bind(action.incident_id.0)
        .bind(&action.action_type)
        .bind(enum_text(&action.status)?)
        .bind(domain_json)
        .bind(action.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save action: {}", e)))?;

        Ok(())
    }

    async fn find_by_incident(&self, incident_id: IncidentId) -> Result<Vec<IncidentAction>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT domain_json FROM incident_actions WHERE incident_id = $1 ORDER BY created_at ASC",
        )
        .bind(incident_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode).collect()
    }
}

pub struct PostgresResponseRecordRepository {
    pool: PgPool,
}

impl PostgresResponseRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResponseRecordRepository for PostgresResponseRecordRepository {
    async fn save(&self, record: &IncidentResponseRecord) -> Result<(), RepositoryError> {
        let domain_json = serde_json::to_value(record)?;

        sqlx::query(
            r#"
            INSERT INTO incident_responses (incident_id, status, domain_json, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (incident_id) DO UPDATE SET
                status = EXCLUDED.status,
                domain_json = EXCLUDED.domain_json,
                completed_at = EXCLUDED.completed_at
            "#,
        )
        .bind(record.incident_id.0)
        .bind(record.status.as_str())
        .bind(domain_json)
        .bind(record.started_at)
        .bind(record.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save response record: {}", e)))?;

        Ok(())
    }

    async fn find_by_incident(
        &self,
        incident_id: IncidentId,
    ) -> Result<Option<IncidentResponseRecord>, RepositoryError> {
        let row = sqlx::query("SELECT domain_json FROM incident_responses WHERE incident_id = $1")
            .bind(incident_id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode).transpose()
    }
}
