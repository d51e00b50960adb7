use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::handler::DEFAULT_PRICE_METRIC;
use crate::metrics::MetricsConfig;
use crate::storage::{RetrySettings, StorageConfig};

const DEFAULT_TABLE: &str = "FoodOrders";

/// Top-level application configuration loaded from file + environment.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageSection,
    pub metrics: MetricsSection,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load configuration from disk and environment.
    pub fn load() -> Result<Self> {
        let config_path =
            env::var("FOODORDERS_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

        let mut builder = config::Config::builder();

        if Path::new(&config_path).exists() {
            builder = builder.add_source(config::File::from(PathBuf::from(&config_path)));
        }

        // FOODORDERS_STORAGE__RETRY__MAX_ATTEMPTS -> storage.retry.max_attempts
        builder = builder.add_source(
            config::Environment::with_prefix("FOODORDERS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build()?;
        let mut config: Self = settings.try_deserialize()?;

        if config.logging.level.trim().is_empty() {
            config.logging.level = "info".to_string();
        }

        Ok(config)
    }

    /// Resolve and validate the storage backend configuration.
    pub fn storage_runtime(&self) -> Result<StorageConfig> {
        self.storage.to_runtime()
    }

    /// Resolve the metrics sink configuration.
    pub fn metrics_runtime(&self) -> MetricsConfig {
        if !self.metrics.enabled {
            return MetricsConfig::Disabled;
        }

        match self.metrics.backend {
            MetricsBackendKind::None => MetricsConfig::Disabled,
            MetricsBackendKind::Prometheus => MetricsConfig::Prometheus {
                namespace: self.metrics.namespace.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub backend: StorageBackendKind,
    pub table: String,
    pub local: Option<LocalStorageSection>,
    pub s3: Option<S3StorageSection>,
    pub dynamodb: Option<DynamoDbSection>,
    pub retry: RetrySection,
}

impl StorageSection {
    pub fn to_runtime(&self) -> Result<StorageConfig> {
        let table = self.table.trim();
        if table.is_empty() {
            bail!("storage.table must be specified");
        }

        let retry = self.retry.to_settings()?;

        match self.backend {
            StorageBackendKind::Memory => Ok(StorageConfig::Memory),
            StorageBackendKind::Local => {
                let local = self.local.clone().unwrap_or_default();
                Ok(StorageConfig::Local {
                    root_path: local.root_path,
                    table: table.to_string(),
                })
            }
            StorageBackendKind::S3 => {
                let Some(s3) = self.s3.clone() else {
                    bail!("storage.s3 configuration required when backend is 's3'");
                };

                if s3.bucket.trim().is_empty() {
                    bail!("storage.s3.bucket must be specified");
                }
                if s3.region.trim().is_empty() {
                    bail!("storage.s3.region must be specified");
                }

                let prefix = s3
                    .prefix
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| table.to_string());

                Ok(StorageConfig::S3 {
                    bucket: s3.bucket,
                    region: s3.region,
                    endpoint: s3.endpoint,
                    prefix,
                    retry,
                })
            }
            StorageBackendKind::DynamoDb => {
                let dynamodb = self.dynamodb.clone().unwrap_or_default();
                Ok(StorageConfig::DynamoDb {
                    table: table.to_string(),
                    region: non_empty(dynamodb.region),
                    endpoint: non_empty(dynamodb.endpoint),
                    retry,
                })
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Local,
            table: DEFAULT_TABLE.to_string(),
            local: Some(LocalStorageSection::default()),
            s3: None,
            dynamodb: None,
            retry: RetrySection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Memory,
    #[default]
    Local,
    S3,
    DynamoDb,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalStorageSection {
    pub root_path: String,
}

impl Default for LocalStorageSection {
    fn default() -> Self {
        Self {
            root_path: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct S3StorageSection {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DynamoDbSection {
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

/// Retry policy passed through to the AWS SDK clients
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub mode: RetryModeKind,
}

impl RetrySection {
    pub fn to_settings(&self) -> Result<RetrySettings> {
        if self.max_attempts == 0 {
            bail!("storage.retry.max_attempts must be at least 1");
        }
        Ok(RetrySettings {
            max_attempts: self.max_attempts,
            adaptive: self.mode == RetryModeKind::Adaptive,
        })
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            mode: RetryModeKind::Standard,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RetryModeKind {
    #[default]
    Standard,
    Adaptive,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsSection {
    pub enabled: bool,
    pub backend: MetricsBackendKind,
    /// Name of the per-order price sample
    pub name: String,
    pub namespace: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: MetricsBackendKind::Prometheus,
            name: DEFAULT_PRICE_METRIC.to_string(),
            namespace: DEFAULT_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricsBackendKind {
    None,
    #[default]
    Prometheus,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}
