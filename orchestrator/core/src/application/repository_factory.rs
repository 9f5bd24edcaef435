// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations based on the configured
//! storage backend. The domain layer only defines the traits.
//!
//! A PostgreSQL backend without an open pool falls back to in-memory storage
//! with a warning, so a node can still serve while the database is down.

use sqlx::PgPool;
use std::sync::Arc;
use tracing::warn;

use crate::domain::repository::{
    ActionRepository, IncidentRepository, ResponseRecordRepository, StorageBackend,
};
use crate::infrastructure::repositories::{
    InMemoryActionRepository, InMemoryIncidentRepository, InMemoryResponseRecordRepository,
    PostgresActionRepository, PostgresIncidentRepository, PostgresResponseRecordRepository,
};

/// The repositories an incident service is built from.
#[derive(Clone)]
pub struct Repositories {
    pub incidents: Arc<dyn IncidentRepository>,
    pub actions: Arc<dyn ActionRepository>,
    pub responses: Arc<dyn ResponseRecordRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            incidents: Arc::new(InMemoryIncidentRepository::new()),
            actions: Arc::new(InMemoryActionRepository::new()),
            responses: Arc::new(InMemoryResponseRecordRepository::new()),
        }
    }

    pub fn create(backend: &StorageBackend, pool: Option<PgPool>) -> Self {
        Self {
            incidents: create_incident_repository(backend, pool.clone()),
            actions: create_action_repository(backend, pool.clone()),
            responses: create_response_record_repository(backend, pool),
        }
    }
}

fn postgres_pool(backend: &StorageBackend, pool: Option<PgPool>) -> Option<PgPool> {
    match (backend, pool) {
        (StorageBackend::PostgreSQL(_), Some(pool)) => Some(pool),
        (StorageBackend::PostgreSQL(_), None) => {
            warn!("PostgreSQL backend configured but no pool available, using in-memory repository");
            None
        }
        (StorageBackend::InMemory, _) => None,
    }
}

/// Creates an IncidentRepository implementation based on the configured backend
pub fn create_incident_repository(backend: &StorageBackend, pool: Option<PgPool>) -> Arc<dyn IncidentRepository> {
    match postgres_pool(backend, pool) {
        Some(pool) => Arc::new(PostgresIncidentRepository::new(pool)),
        None => Arc::new(InMemoryIncidentRepository::new()),
    }
}

/// Creates an ActionRepository implementation based on the configured backend
pub fn create_action_repository(backend: &StorageBackend, pool: Option<PgPool>) -> Arc<dyn ActionRepository> {
    match postgres_pool(backend, pool) {
        Some(pool) => Arc::new(PostgresActionRepository::new(pool)),
        None => Arc::new(InMemoryActionRepository::new()),
    }
}

/// Creates a ResponseRecordRepository implementation based on the configured backend
pub fn create_response_record_repository(
    backend: &StorageBackend,
    pool: Option<PgPool>,
) -> Arc<dyn ResponseRecordRepository> {
    match postgres_pool(backend, pool) {
        Some(pool) => Arc::new(PostgresResponseRecordRepository::new(pool)),
        None => Arc::new(InMemoryResponseRecordRepository::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::incident::{Incident, Severity};
    use crate::domain::repository::PostgresConfig;

    #[tokio::test]
    async fn test_postgres_without_pool_falls_back() {
        let backend = StorageBackend::PostgreSQL(PostgresConfig {
            connection_string: "postgres://localhost/kraken".to_string(),
        });
        let repositories = Repositories::create(&backend, None);

        let incident = Incident::new("phishing", Severity::Medium);
        repositories.incidents.save(&incident).await.unwrap();
        assert!(repositories.incidents.find_by_id(incident.id).await.unwrap().is_some());
    }
}
