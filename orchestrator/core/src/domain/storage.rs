// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Artifact Store Trait
//!
//! Keyed JSON document storage used by workers that produce durable artifacts
//! (evidence records, notifications, incident documentation). Each worker writes
//! one [`Namespace`] and the HTTP API reads evidence back from the same store.
//! A store never lets a key escape its namespace.
//!
//! Implementations live in `crate::infrastructure::storage`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Storage namespaces, one per artifact-producing worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Evidence,
    Documentation,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Evidence => "evidence",
            Namespace::Documentation => "documentation",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Make sure the namespace exists and is writable.
    async fn prepare(&self) -> Result<(), StorageError>;

    /// Write (or overwrite) the document stored under `key`.
    async fn put(&self, key: &str, document: &Value) -> Result<(), StorageError>;

    /// Returns `Ok(None)` when no document is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Sorted list of keys in the namespace.
    async fn list(&self) -> Result<Vec<String>, StorageError>;

    fn namespace(&self) -> Namespace;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

const MAX_KEY_LEN: usize = 200;

/// Keys are flat file stems: ASCII alphanumerics, `-`, `_` and `.`, no
/// leading dot, at most 200 characters.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key is empty".to_string()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(StorageError::InvalidKey(format!(
            "key exceeds {} characters",
            MAX_KEY_LEN
        )));
    }
    if key.starts_with('.') {
        return Err(StorageError::InvalidKey(format!("{}: leading dot", key)));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(StorageError::InvalidKey(format!(
            "{}: only [A-Za-z0-9._-] allowed",
            key
        )));
    }
    Ok(())
}
