//! Storage abstraction layer
//!
//! Provides a unified key-value interface over the order table, backed by
//! memory, the local filesystem, S3 or DynamoDB

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};

use crate::types::Order;
use crate::Result;

pub mod dynamodb;
pub mod local;
pub mod memory;
pub mod s3;

/// Order table trait
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Write a record, replacing any record with the same order id
    async fn put(&self, order: &Order) -> Result<()>;

    /// Read a record by order id
    async fn get(&self, order_id: &str) -> Result<Option<Order>>;

    /// Short description used by health reporting
    fn describe(&self) -> String;
}

/// Retry policy handed to the AWS SDK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub adaptive: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            adaptive: false,
        }
    }
}

impl RetrySettings {
    pub fn to_sdk(&self) -> RetryConfig {
        let base = if self.adaptive {
            RetryConfig::adaptive()
        } else {
            RetryConfig::standard()
        };
        base.with_max_attempts(self.max_attempts)
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Memory,
    Local {
        root_path: String,
        table: String,
    },
    S3 {
        bucket: String,
        region: String,
        endpoint: Option<String>,
        prefix: String,
        retry: RetrySettings,
    },
    DynamoDb {
        table: String,
        region: Option<String>,
        endpoint: Option<String>,
        retry: RetrySettings,
    },
}

/// Create storage backend from config
pub async fn create_storage(config: StorageConfig) -> Result<Box<dyn OrderStore>> {
    match config {
        StorageConfig::Memory => Ok(Box::new(memory::MemoryStore::new())),
        StorageConfig::Local { root_path, table } => {
            let backend = local::LocalStore::new(root_path, &table)?;
            Ok(Box::new(backend))
        }
        StorageConfig::S3 {
            bucket,
            region,
            endpoint,
            prefix,
            retry,
        } => {
            let backend = s3::S3Store::new(bucket, region, endpoint, prefix, &retry).await?;
            Ok(Box::new(backend))
        }
        StorageConfig::DynamoDb {
            table,
            region,
            endpoint,
            retry,
        } => {
            let backend = dynamodb::DynamoDbStore::new(table, region, endpoint, &retry).await;
            Ok(Box::new(backend))
        }
    }
}

pub(crate) async fn load_sdk_config(region: Option<String>, retry: &RetrySettings) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest()).retry_config(retry.to_sdk());
    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    loader.load().await
}
