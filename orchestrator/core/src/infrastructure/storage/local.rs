// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Local Filesystem Artifact Store
//!
//! Stores each document as `<root>/<namespace>/<key>.json`. Writes go to a
//! uniquely named temporary file first and are renamed into place, so a reader
//! never sees a half-written document and concurrent writers to one key end
//! with whichever rename lands last.
//!
//! **Limitations:**
//! - Single node only; nothing is replicated
//! - No retention enforcement (retention settings are informational)

use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::domain::storage::{validate_key, ArtifactStore, Namespace, StorageError};

pub struct LocalArtifactStore {
    namespace: Namespace,
    /// `<root>/<namespace>`
    dir: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl AsRef<Path>, namespace: Namespace) -> Self {
        Self {
            namespace,
            dir: root.as_ref().join(namespace.as_str()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> StorageError {
    match e.kind() {
        ErrorKind::PermissionDenied => {
            StorageError::PermissionDenied(format!("{} {}: {}", action, path.display(), e))
        }
        _ => StorageError::IoError(format!("Failed to {} {}: {}", action, path.display(), e)),
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn prepare(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error("create", &self.dir, e))?;

        // Verify directory is writable
        let marker = self.dir.join(".kraken-storage-test");
        tokio::fs::write(&marker, b"test")
            .await
            .map_err(|e| io_error("write", &marker, e))?;
        tokio::fs::remove_file(&marker)
            .await
            .map_err(|e| io_error("remove", &marker, e))?;

        Ok(())
    }

    async fn put(&self, key: &str, document: &Value) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let bytes = serde_json::to_vec_pretty(document)?;

        // One temp file per write; concurrent puts to the same key must not share it.
        let tmp = self.dir.join(format!(".{}.{}.tmp", key, Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| io_error("write", &tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error("rename", &path, e))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &path, e)),
        }
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("list", &self.dir, e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("list", &self.dir, e))?
        {
            let name = entry.file_name();
            if let Some(key) = name.to_str().and_then(|n| n.strip_suffix(".json")) {
                if !key.starts_with('.') {
                    keys.push(key.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn namespace(&self) -> Namespace {
        self.namespace
    }
}
