// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository traits defined in
//! `crate::domain::repository`.
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresIncidentRepository** - incidents, JSONB `details`
//! - **PostgresActionRepository** - incident actions and their result envelopes
//! - **PostgresResponseRecordRepository** - coordinator response records
//!
//! ## In-Memory Repositories
//!
//! Lock-protected map storage for tests and single-process development:
//! - **InMemoryIncidentRepository**
//! - **InMemoryActionRepository**
//! - **InMemoryResponseRecordRepository**

pub mod postgres;

pub use postgres::{
    ensure_schema, PostgresActionRepository, PostgresIncidentRepository,
    PostgresResponseRecordRepository,
};

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::action::{ActionId, IncidentAction};
use crate::domain::incident::{Incident, IncidentId};
use crate::domain::repository::{
    ActionRepository, IncidentFilter, IncidentRepository, RepositoryError, ResponseRecordRepository,
};
use crate::domain::response::IncidentResponseRecord;

#[derive(Clone, Default)]
pub struct InMemoryIncidentRepository {
    incidents: Arc<RwLock<HashMap<IncidentId, Incident>>>,
}

impl InMemoryIncidentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IncidentRepository for InMemoryIncidentRepository {
    async fn save(&self, incident: &Incident) -> Result<(), RepositoryError> {
        self.incidents.write().insert(incident.id, incident.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: IncidentId) -> Result<Option<Incident>, RepositoryError> {
        Ok(self.incidents.read().get(&id).cloned())
    }

    async fn find_by_filter(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, RepositoryError> {
        let mut incidents: Vec<Incident> = self
            .incidents
            .read()
            .values()
            .filter(|incident| filter.matches(incident))
            .cloned()
            .collect();
        incidents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(incidents)
    }

    async fn delete(&self, id: IncidentId) -> Result<(), RepositoryError> {
        self.incidents.write().remove(&id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryActionRepository {
    actions: Arc<RwLock<HashMap<ActionId, IncidentAction>>>,
}

impl InMemoryActionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActionRepository for InMemoryActionRepository {
    async fn save(&self, action: &IncidentAction) -> Result<(), RepositoryError> {
        self.actions.write().insert(action.id, action.clone());
        Ok(())
    }

    async fn find_by_incident(&self, incident_id: IncidentId) -> Result<Vec<IncidentAction>, RepositoryError> {
        let mut actions: Vec<IncidentAction> = self
            .actions
            .read()
            .values()
            .filter(|action| action.incident_id == incident_id)
            .cloned()
            .collect();
        actions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(actions)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryResponseRecordRepository {
    records: Arc<RwLock<HashMap<IncidentId, IncidentResponseRecord>>>,
}

impl InMemoryResponseRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseRecordRepository for InMemoryResponseRecordRepository {
    async fn save(&self, record: &IncidentResponseRecord) -> Result<(), RepositoryError> {
        self.records.write().insert(record.incident_id, record.clone());
        Ok(())
    }

    async fn find_by_incident(
        &self,
        incident_id: IncidentId,
    ) -> Result<Option<IncidentResponseRecord>, RepositoryError> {
        Ok(self.records.read().get(&incident_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::incident::{IncidentStatus, Severity};
    use crate::domain::worker::WorkerType;
    use chrono::Duration;
    use serde_json::Map;

    #[tokio::test]
    async fn test_incident_save_find_delete() {
        let repo = InMemoryIncidentRepository::new();
        let incident = Incident::new("malware", Severity::High);

        repo.save(&incident).await.unwrap();
        assert_eq!(repo.find_by_id(incident.id).await.unwrap(), Some(incident.clone()));

        repo.delete(incident.id).await.unwrap();
        assert_eq!(repo.find_by_id(incident.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_filter_returns_newest_first() {
        let repo = InMemoryIncidentRepository::new();

        let mut older = Incident::new("phishing", Severity::Low);
        older.created_at = older.created_at - Duration::hours(2);
        let mut newer = Incident::new("ransomware", Severity::Critical);
        newer.status = IncidentStatus::Contained;

        repo.save(&older).await.unwrap();
        repo.save(&newer).await.unwrap();

        let all = repo.find_by_filter(&IncidentFilter::default()).await.unwrap();
        assert_eq!(all.iter().map(|i| i.id).collect::<Vec<_>>(), vec![newer.id, older.id]);

        let contained = repo
            .find_by_filter(&IncidentFilter {
                status: Some(IncidentStatus::Contained),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(contained.len(), 1);
        assert_eq!(contained[0].id, newer.id);
    }

    #[tokio::test]
    async fn test_actions_are_scoped_to_incident() {
        let repo = InMemoryActionRepository::new();
        let incident_id = IncidentId::new();

        let first = IncidentAction::new(incident_id, WorkerType::Containment, "isolate_system", Map::new());
        let other = IncidentAction::new(IncidentId::new(), WorkerType::Forensic, "analyze_memory", Map::new());
        repo.save(&first).await.unwrap();
        repo.save(&other).await.unwrap();

        let actions = repo.find_by_incident(incident_id).await.unwrap();
        assert_eq!(actions, vec![first]);
    }
}
