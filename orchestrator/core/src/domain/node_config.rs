// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Node Configuration Types
//
// Defines the configuration schema for a KRAKEN-FLUX node, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Dispatch timeout and coordination policy
// - Built-in worker selection and per-type settings
// - Persistence backend and artifact root
// - Network and observability settings

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::repository::{PostgresConfig, StorageBackend};
use crate::domain::response::CoordinationPolicy;
use crate::domain::worker::WorkerType;

pub const API_VERSION: &str = "kraken-flux/v1";
pub const KIND: &str = "NodeConfig";

/// Top-level Kubernetes-style node configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfigManifest {
    /// API version (must be "kraken-flux/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "NodeConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: NodeConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable node name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Node configuration specification (content under spec:)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfigSpec {
    pub node: NodeIdentity,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Per-type settings for the built-in workers. Types missing from the map
    /// are not started.
    #[serde(default = "default_workers")]
    pub workers: BTreeMap<WorkerType, WorkerSettings>,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeIdentity {
    /// Unique stable node identifier (UUID recommended)
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound on a single worker call, e.g. "30s" or "2m"
    #[serde(with = "humantime_serde", default = "default_worker_timeout")]
    pub worker_timeout: Duration,

    #[serde(default)]
    pub policy: CoordinationPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            worker_timeout: default_worker_timeout(),
            policy: CoordinationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Heartbeat interval for this worker type
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Type-specific options, surfaced in the worker's heartbeat metadata
    #[serde(default, flatten)]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl WorkerSettings {
    fn new(interval_secs: u64, options: serde_json::Value) -> Self {
        let options = match options {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        Self {
            enabled: true,
            interval: Duration::from_secs(interval_secs),
            options,
        }
    }

    /// Built-in defaults per worker type.
    pub fn defaults_for(worker_type: WorkerType) -> Self {
        use serde_json::json;
        match worker_type {
            WorkerType::Guardian => Self::new(
                30,
                json!({"batch_size": 100, "alert_threshold": 0.8}),
            ),
            WorkerType::Forensic => Self::new(
                60,
                json!({"evidence_retention_days": 30, "compression_enabled": true}),
            ),
            WorkerType::Containment => Self::new(
                15,
                json!({"max_concurrent_actions": 5, "retry_attempts": 3}),
            ),
            WorkerType::Compliance => Self::new(
                3600,
                json!({"report_frequency": "daily", "notification_enabled": true}),
            ),
            WorkerType::Simulation => Self::new(
                300,
                json!({"max_simulations": 10, "data_retention_days": 7}),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    #[default]
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackendKind,

    /// PostgreSQL connection string (required for the postgres backend)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Directory for worker artifacts; artifacts stay in memory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network bind address (e.g. "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP API port
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("compact" or "json")
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Prometheus exporter port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_worker_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_workers() -> BTreeMap<WorkerType, WorkerSettings> {
    WorkerType::ALL
        .into_iter()
        .map(|t| (t, WorkerSettings::defaults_for(t)))
        .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8000
}

impl Default for NodeConfigSpec {
    fn default() -> Self {
        Self {
            node: NodeIdentity {
                id: uuid::Uuid::new_v4().to_string(),
                region: None,
                tags: vec![],
            },
            dispatch: DispatchConfig::default(),
            workers: default_workers(),
            storage: StorageConfig::default(),
            network: NetworkConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Default for NodeConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "kraken-node".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: NodeConfigSpec::default(),
        }
    }
}

impl NodeConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. KRAKEN_CONFIG_PATH environment variable
    /// 2. ./kraken-config.yaml (working directory)
    /// 3. ~/.kraken/config.yaml (user home)
    /// 4. /etc/kraken/config.yaml (system, Unix) or C:\ProgramData\Kraken\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("KRAKEN_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./kraken-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".kraken").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/kraken/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Kraken\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path (fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Invalid values are logged and ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("KRAKEN_WORKER_TIMEOUT") {
            match humantime_serde::re::humantime::parse_duration(&val) {
                Ok(timeout) => {
                    tracing::info!("Environment override: KRAKEN_WORKER_TIMEOUT={}", val);
                    self.spec.dispatch.worker_timeout = timeout;
                }
                Err(e) => {
                    tracing::warn!(
                        "Invalid value for KRAKEN_WORKER_TIMEOUT: '{}' ({}). Ignoring.",
                        val,
                        e
                    );
                }
            }
        }

        if let Some(val) = lookup("KRAKEN_COORDINATION_POLICY") {
            match val.parse::<CoordinationPolicy>() {
                Ok(policy) => {
                    tracing::info!("Environment override: KRAKEN_COORDINATION_POLICY={}", policy);
                    self.spec.dispatch.policy = policy;
                }
                Err(e) => {
                    tracing::warn!("{}. Expected best_effort/fail_fast. Ignoring.", e);
                }
            }
        }

        if let Some(val) = lookup("KRAKEN_DATABASE_URL") {
            if !val.is_empty() {
                tracing::info!("Environment override: KRAKEN_DATABASE_URL set");
                self.spec.storage.database_url = Some(val);
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.node.id.is_empty() {
            anyhow::bail!("spec.node.id cannot be empty");
        }

        if self.spec.dispatch.worker_timeout.is_zero() {
            anyhow::bail!("spec.dispatch.worker_timeout must be greater than zero");
        }

        for (worker_type, settings) in &self.spec.workers {
            if settings.interval.is_zero() {
                anyhow::bail!("spec.workers.{}.interval must be greater than zero", worker_type);
            }
        }

        if self.spec.storage.backend == StorageBackendKind::Postgres
            && self
                .spec
                .storage
                .database_url
                .as_deref()
                .is_none_or(str::is_empty)
        {
            anyhow::bail!(
                "spec.storage.database_url is required for the postgres backend (or set KRAKEN_DATABASE_URL)"
            );
        }

        if self.spec.network.port == 0 {
            anyhow::bail!("spec.network.port cannot be 0");
        }

        match self.spec.observability.logging.format.as_str() {
            "compact" | "json" => {}
            other => anyhow::bail!(
                "Invalid logging format: '{}'. Must be 'compact' or 'json'",
                other
            ),
        }

        Ok(())
    }

    /// Worker types configured and enabled, in routing order.
    pub fn enabled_workers(&self) -> Vec<WorkerType> {
        self.spec
            .workers
            .iter()
            .filter(|(_, settings)| settings.enabled)
            .map(|(worker_type, _)| *worker_type)
            .collect()
    }

    pub fn storage_backend(&self) -> StorageBackend {
        match (&self.spec.storage.backend, &self.spec.storage.database_url) {
            (StorageBackendKind::Postgres, Some(url)) => StorageBackend::PostgreSQL(PostgresConfig {
                connection_string: url.clone(),
            }),
            _ => StorageBackend::InMemory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = NodeConfigManifest::default();
        assert_eq!(manifest.api_version, "kraken-flux/v1");
        assert_eq!(manifest.kind, "NodeConfig");
        assert!(!manifest.metadata.name.is_empty());
        assert_eq!(manifest.spec.dispatch.worker_timeout, Duration::from_secs(30));
        assert_eq!(manifest.spec.dispatch.policy, CoordinationPolicy::BestEffort);
        assert_eq!(manifest.enabled_workers(), WorkerType::ALL.to_vec());
        assert!(matches!(manifest.storage_backend(), StorageBackend::InMemory));
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let yaml = r#"
apiVersion: kraken-flux/v1
kind: NodeConfig
metadata:
  name: soc-node-1
spec:
  node:
    id: 550e8400-e29b-41d4-a716-446655440000
    region: eu-west-1
  dispatch:
    worker_timeout: 5s
    policy: fail_fast
  workers:
    containment:
      interval: 15s
      retry_attempts: 3
    forensic:
      enabled: false
      interval: 1m
  storage:
    backend: postgres
    database_url: postgres://kraken@localhost/kraken
    artifact_root: /var/lib/kraken/artifacts
  observability:
    logging:
      format: json
"#;

        let manifest = NodeConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.spec.dispatch.worker_timeout, Duration::from_secs(5));
        assert_eq!(manifest.spec.dispatch.policy, CoordinationPolicy::FailFast);
        assert_eq!(manifest.enabled_workers(), vec![WorkerType::Containment]);
        assert_eq!(
            manifest.spec.workers[&WorkerType::Containment].options["retry_attempts"],
            serde_json::json!(3)
        );
        assert_eq!(manifest.spec.network.port, 8000);
        assert!(manifest.validate().is_ok());

        let reparsed =
            NodeConfigManifest::from_yaml_str(&serde_yaml::to_string(&manifest).unwrap()).unwrap();
        assert_eq!(reparsed.spec.workers, manifest.spec.workers);
        assert_eq!(reparsed.spec.dispatch.worker_timeout, Duration::from_secs(5));
        assert!(matches!(reparsed.storage_backend(), StorageBackend::PostgreSQL(_)));
    }

    #[test]
    fn test_validation() {
        let mut manifest = NodeConfigManifest::default();
        assert!(manifest.validate().is_ok());

        manifest.api_version = "100monkeys.ai/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "WrongKind".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.metadata.name = "".to_string();
        assert!(manifest.validate().is_err());
        manifest.metadata.name = "test-node".to_string();

        manifest.spec.dispatch.worker_timeout = Duration::ZERO;
        assert!(manifest.validate().is_err());
        manifest.spec.dispatch.worker_timeout = Duration::from_secs(1);

        manifest.spec.storage.backend = StorageBackendKind::Postgres;
        assert!(manifest.validate().is_err());
        manifest.spec.storage.database_url = Some("postgres://localhost/kraken".to_string());
        assert!(manifest.validate().is_ok());

        manifest.spec.observability.logging.format = "text".to_string();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let mut manifest = NodeConfigManifest::default();
        let env: HashMap<&str, &str> = HashMap::from([
            ("KRAKEN_WORKER_TIMEOUT", "250ms"),
            ("KRAKEN_COORDINATION_POLICY", "fail-fast"),
            ("KRAKEN_DATABASE_URL", "postgres://db/kraken"),
        ]);

        manifest.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(manifest.spec.dispatch.worker_timeout, Duration::from_millis(250));
        assert_eq!(manifest.spec.dispatch.policy, CoordinationPolicy::FailFast);
        assert_eq!(
            manifest.spec.storage.database_url.as_deref(),
            Some("postgres://db/kraken")
        );
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut manifest = NodeConfigManifest::default();
        manifest.apply_overrides_from(|key| match key {
            "KRAKEN_WORKER_TIMEOUT" => Some("soon".to_string()),
            "KRAKEN_COORDINATION_POLICY" => Some("whenever".to_string()),
            _ => None,
        });

        assert_eq!(manifest.spec.dispatch.worker_timeout, Duration::from_secs(30));
        assert_eq!(manifest.spec.dispatch.policy, CoordinationPolicy::BestEffort);
    }
}
