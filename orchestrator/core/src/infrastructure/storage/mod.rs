// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Artifact Storage Infrastructure
//!
//! Concrete implementations of the [`ArtifactStore`] trait.

pub mod local;

pub use local::LocalArtifactStore;
pub use memory::InMemoryArtifactStore;

use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::storage::{ArtifactStore, Namespace};

/// Artifact backend configuration
#[derive(Debug, Clone)]
pub enum ArtifactBackend {
    /// Local filesystem under a root directory
    Local { root: PathBuf },

    /// Process memory; contents are lost on restart
    InMemory,
}

impl ArtifactBackend {
    pub fn from_root(root: Option<PathBuf>) -> Self {
        match root {
            Some(root) => ArtifactBackend::Local { root },
            None => ArtifactBackend::InMemory,
        }
    }
}

/// Factory function to create an artifact store for one namespace
pub fn create_artifact_store(backend: &ArtifactBackend, namespace: Namespace) -> Arc<dyn ArtifactStore> {
    match backend {
        ArtifactBackend::Local { root } => Arc::new(LocalArtifactStore::new(root, namespace)),
        ArtifactBackend::InMemory => Arc::new(InMemoryArtifactStore::new(namespace)),
    }
}

/// One store per namespace, shared by the workers that write artifacts and
/// the API that reads them back.
#[derive(Clone)]
pub struct ArtifactStores {
    pub evidence: Arc<dyn ArtifactStore>,
    pub documentation: Arc<dyn ArtifactStore>,
}

impl ArtifactStores {
    pub fn new(backend: &ArtifactBackend) -> Self {
        Self {
            evidence: create_artifact_store(backend, Namespace::Evidence),
            documentation: create_artifact_store(backend, Namespace::Documentation),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(&ArtifactBackend::InMemory)
    }
}

mod memory {
    use async_trait::async_trait;
    use parking_lot::RwLock;
    use serde_json::Value;
    use std::collections::BTreeMap;

    use crate::domain::storage::{validate_key, ArtifactStore, Namespace, StorageError};

    pub struct InMemoryArtifactStore {
        namespace: Namespace,
        documents: RwLock<BTreeMap<String, Value>>,
    }

    impl InMemoryArtifactStore {
        pub fn new(namespace: Namespace) -> Self {
            Self {
                namespace,
                documents: RwLock::new(BTreeMap::new()),
            }
        }
    }

    #[async_trait]
    impl ArtifactStore for InMemoryArtifactStore {
        async fn prepare(&self) -> Result<(), StorageError> {
            Ok(())
        }

        async fn put(&self, key: &str, document: &Value) -> Result<(), StorageError> {
            validate_key(key)?;
            self.documents.write().insert(key.to_string(), document.clone());
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
            validate_key(key)?;
            Ok(self.documents.read().get(key).cloned())
        }

        async fn list(&self) -> Result<Vec<String>, StorageError> {
            Ok(self.documents.read().keys().cloned().collect())
        }

        fn namespace(&self) -> Namespace {
            self.namespace
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_factory_in_memory() {
        let store = create_artifact_store(&ArtifactBackend::from_root(None), Namespace::Documentation);
        assert_eq!(store.namespace(), Namespace::Documentation);

        store.put("notification_1", &json!({"framework": "gdpr"})).await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec!["notification_1"]);
    }

    #[tokio::test]
    async fn test_stores_share_documents_across_clones() {
        let stores = ArtifactStores::in_memory();
        let shared = stores.clone();

        shared.evidence.put("ev-1", &json!({"hash": "a"})).await.unwrap();
        assert_eq!(stores.evidence.get("ev-1").await.unwrap(), Some(json!({"hash": "a"})));
        assert!(stores.documentation.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_factory_local() {
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let backend = ArtifactBackend::from_root(Some(temp_dir.path().to_path_buf()));
        let store = create_artifact_store(&backend, Namespace::Evidence);
        store.prepare().await.unwrap();

        assert!(temp_dir.path().join("evidence").is_dir());
    }
}
