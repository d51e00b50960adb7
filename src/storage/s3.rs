//! S3 storage backend
//!
//! Records are stored as JSON objects under `<prefix><order id>.json`.

use async_trait::async_trait;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::types::Order;
use crate::{Error, Result};

use super::{load_sdk_config, OrderStore, RetrySettings};

/// S3 storage backend
pub struct S3Store {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Store {
    pub async fn new(
        bucket: String,
        region: String,
        endpoint: Option<String>,
        prefix: String,
        retry: &RetrySettings,
    ) -> Result<Self> {
        let config = load_sdk_config(Some(region), retry).await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&config);

        if let Some(endpoint_url) = endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint_url)
                .force_path_style(true);
        }

        let s3_config = s3_config_builder.build();
        let client = Client::from_conf(s3_config);

        Ok(Self {
            client,
            bucket,
            prefix: normalize_prefix(&prefix),
        })
    }

    fn object_key(&self, order_id: &str) -> String {
        format!("{}{}.json", self.prefix, order_id)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

#[async_trait]
impl OrderStore for S3Store {
    async fn put(&self, order: &Order) -> Result<()> {
        let data = Bytes::from(serde_json::to_vec(order)?);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.object_key(&order.order_id))
            .content_type("application/json")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| Error::storage(format!("S3 put failed: {}", e)))?;

        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<Order>> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.object_key(order_id))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if matches!(err.as_service_error(), Some(GetObjectError::NoSuchKey(_))) => {
                return Ok(None);
            }
            Err(err) => return Err(Error::storage(format!("S3 get failed: {}", err))),
        };

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::storage(format!("S3 body read failed: {}", e)))?;

        Ok(Some(serde_json::from_slice(&data.into_bytes())?))
    }

    fn describe(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.prefix)
    }
}
