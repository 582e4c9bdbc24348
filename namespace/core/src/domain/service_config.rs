// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0

// Namespace Service Configuration
//
// Defines the configuration schema for a namespace service instance:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Instance identity announced to discovery
// - Storage backend for user documents
// - Announcement cadence and collaborator call bounds
// - Logging level

use crate::domain::discovery::ServiceId;
use crate::domain::repository::StorageBackend;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_VERSION: &str = "icedrive.io/v1";
pub const KIND: &str = "NamespaceServiceConfig";

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceServiceConfig {
    /// API version (must be "icedrive.io/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "NamespaceServiceConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: NamespaceServiceSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable instance name
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceServiceSpec {
    pub instance: InstanceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub collaborators: CollaboratorConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Stable identity announced to discovery (UUID recommended)
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackendKind,

    /// Directory holding one `<key>.json` document per user
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Seconds between self-announcements
    #[serde(default = "default_announce_interval")]
    pub announce_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    /// Upper bound for a single authenticator or blob-service call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Loaded trees kept in memory before idle ones are evicted
    #[serde(default = "default_max_trees")]
    pub max_trees: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_backend() -> StorageBackendKind {
    StorageBackendKind::File
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./USRDIRS")
}

fn default_announce_interval() -> u64 {
    5
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_trees() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            announce_interval_secs: default_announce_interval(),
        }
    }
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_trees: default_max_trees(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for NamespaceServiceSpec {
    fn default() -> Self {
        Self {
            instance: InstanceConfig {
                id: uuid::Uuid::new_v4().to_string(),
            },
            storage: StorageConfig::default(),
            discovery: DiscoveryConfig::default(),
            collaborators: CollaboratorConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NamespaceServiceConfig {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "icedrive-namespace".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata { name: hostname },
            spec: NamespaceServiceSpec::default(),
        }
    }
}

impl NamespaceServiceConfig {
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

    /// Candidate configuration files, highest precedence first
    ///
    /// `ICEDRIVE_NAMESPACE_CONFIG`, then `./namespace-config.yaml`, then
    /// `~/.icedrive/namespace.yaml`, then the system-wide file.
    pub fn config_candidates() -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = std::env::var_os("ICEDRIVE_NAMESPACE_CONFIG")
            .map(PathBuf::from)
            .into_iter()
            .collect();
        candidates.push(PathBuf::from("namespace-config.yaml"));
        candidates.extend(dirs::home_dir().map(|home| home.join(".icedrive").join("namespace.yaml")));
        if cfg!(windows) {
            candidates.push(PathBuf::from(r"C:\ProgramData\IceDrive\namespace.yaml"));
        } else {
            candidates.push(PathBuf::from("/etc/icedrive/namespace.yaml"));
        }
        candidates
    }

    /// First existing file among [`Self::config_candidates`]
    pub fn discover_config() -> Option<PathBuf> {
        Self::config_candidates().into_iter().find(|path| path.is_file())
    }

    /// Load `explicit`, or the discovered file, or defaults; then apply
    /// environment overrides. An explicit path must exist and parse.
    pub fn load_or_default(explicit: Option<PathBuf>) -> anyhow::Result<Self> {
        let source = explicit.or_else(Self::discover_config);

        let mut config = match source {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading namespace configuration");
                Self::from_yaml_file(&path)
                    .with_context(|| format!("Failed to load config at {}", path.display()))?
            }
            None => {
                tracing::warn!("No namespace configuration found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ICEDRIVE_DATA_DIR") {
            tracing::info!("Environment override: ICEDRIVE_DATA_DIR={}", val);
            self.spec.storage.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("ICEDRIVE_STORAGE_BACKEND") {
            match val.to_lowercase().as_str() {
                "file" => self.spec.storage.backend = StorageBackendKind::File,
                "memory" => self.spec.storage.backend = StorageBackendKind::Memory,
                _ => {
                    tracing::warn!(
                        "Invalid value for ICEDRIVE_STORAGE_BACKEND: '{}'. Expected file/memory. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("ICEDRIVE_COLLABORATOR_TIMEOUT_MS") {
            match val.parse::<u64>() {
                Ok(ms) => {
                    tracing::info!("Environment override: ICEDRIVE_COLLABORATOR_TIMEOUT_MS={}", ms);
                    self.spec.collaborators.timeout_ms = ms;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for ICEDRIVE_COLLABORATOR_TIMEOUT_MS: '{}'. Ignoring.",
                        val
                    );
                }
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

        if self.spec.instance.id.is_empty() {
            anyhow::bail!("spec.instance.id cannot be empty");
        }

        if self.spec.storage.backend == StorageBackendKind::File
            && self.spec.storage.data_dir.as_os_str().is_empty()
        {
            anyhow::bail!("spec.storage.data_dir cannot be empty for the file backend");
        }

        if self.spec.discovery.announce_interval_secs == 0 {
            anyhow::bail!("spec.discovery.announce_interval_secs must be greater than zero");
        }

        if self.spec.collaborators.timeout_ms == 0 {
            anyhow::bail!("spec.collaborators.timeout_ms must be greater than zero");
        }

        if self.spec.cache.max_trees == 0 {
            anyhow::bail!("spec.cache.max_trees must be greater than zero");
        }

        Ok(())
    }

    pub fn instance_id(&self) -> ServiceId {
        ServiceId::new(self.spec.instance.id.clone())
    }

    pub fn storage_backend(&self) -> StorageBackend {
        match self.spec.storage.backend {
            StorageBackendKind::File => StorageBackend::File {
                data_dir: self.spec.storage.data_dir.clone(),
            },
            StorageBackendKind::Memory => StorageBackend::InMemory,
        }
    }

    pub fn announce_interval(&self) -> Duration {
        Duration::from_secs(self.spec.discovery.announce_interval_secs)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.spec.collaborators.timeout_ms)
    }

    pub fn cache_capacity(&self) -> usize {
        self.spec.cache.max_trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let config = NamespaceServiceConfig::default();
        assert_eq!(config.api_version, API_VERSION);
        assert_eq!(config.kind, KIND);
        assert!(!config.metadata.name.is_empty());
        assert_eq!(config.spec.storage.data_dir, PathBuf::from("./USRDIRS"));
        assert_eq!(config.announce_interval(), Duration::from_secs(5));
        assert_eq!(config.collaborator_timeout(), Duration::from_millis(5000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_with_defaults() {
        let yaml = r#"
apiVersion: icedrive.io/v1
kind: NamespaceServiceConfig
metadata:
  name: namespace-1
spec:
  instance:
    id: 550e8400-e29b-41d4-a716-446655440000
  storage:
    backend: memory
"#;
        let config = NamespaceServiceConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.metadata.name, "namespace-1");
        assert_eq!(config.instance_id(), ServiceId::from("550e8400-e29b-41d4-a716-446655440000"));
        assert_eq!(config.storage_backend(), StorageBackend::InMemory);
        assert_eq!(config.spec.discovery.announce_interval_secs, 5);
        assert_eq!(config.spec.collaborators.timeout_ms, 5000);
        assert_eq!(config.spec.logging.level, "info");
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = NamespaceServiceConfig::default();
        config.spec.storage.data_dir = PathBuf::from("/var/lib/icedrive/namespaces");
        config.spec.collaborators.timeout_ms = 250;

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = NamespaceServiceConfig::from_yaml_str(&yaml).unwrap();

        assert_eq!(parsed.spec.instance.id, config.spec.instance.id);
        assert_eq!(
            parsed.storage_backend(),
            StorageBackend::File {
                data_dir: PathBuf::from("/var/lib/icedrive/namespaces")
            }
        );
        assert_eq!(parsed.collaborator_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_validation() {
        let mut config = NamespaceServiceConfig::default();
        assert!(config.validate().is_ok());

        config.api_version = "wrong/v1".to_string();
        assert!(config.validate().is_err());
        config.api_version = API_VERSION.to_string();

        config.kind = "WrongKind".to_string();
        assert!(config.validate().is_err());
        config.kind = KIND.to_string();

        config.spec.instance.id = String::new();
        assert!(config.validate().is_err());
        config.spec.instance.id = "namespace-1".to_string();

        config.spec.discovery.announce_interval_secs = 0;
        assert!(config.validate().is_err());
        config.spec.discovery.announce_interval_secs = 5;

        config.spec.collaborators.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.spec.collaborators.timeout_ms = 5000;

        config.spec.cache.max_trees = 0;
        assert!(config.validate().is_err());
        config.spec.cache.max_trees = 16;

        config.spec.storage.data_dir = PathBuf::new();
        assert!(config.validate().is_err());
        config.spec.storage.backend = StorageBackendKind::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_candidates_end_with_system_file() {
        let candidates = NamespaceServiceConfig::config_candidates();

        assert!(candidates.contains(&PathBuf::from("namespace-config.yaml")));
        let system = candidates.last().unwrap();
        assert!(system.ends_with("namespace.yaml"));
        assert!(system.is_absolute() || cfg!(windows));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("namespace.yaml");
        let mut config = NamespaceServiceConfig::default();
        config.metadata.name = "namespace-explicit".to_string();
        config.spec.cache.max_trees = 8;
        config.to_yaml_file(&path).unwrap();

        let loaded = NamespaceServiceConfig::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.metadata.name, "namespace-explicit");
        assert_eq!(loaded.cache_capacity(), 8);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("absent.yaml");

        let err = NamespaceServiceConfig::load_or_default(Some(missing)).unwrap_err();
        assert!(err.to_string().contains("absent.yaml"));
    }
}
