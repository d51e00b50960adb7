//! DynamoDB storage backend

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;

use crate::types::Order;
use crate::{Error, Result};

use super::{load_sdk_config, OrderStore, RetrySettings};

/// Partition key of the order table
pub const KEY_ATTRIBUTE: &str = "orderId";

/// Largest magnitude a DynamoDB number can hold
const MAX_NUMBER: f64 = 9.999_999_999_999_999e125;
/// Smallest non-zero magnitude a DynamoDB number can hold
const MIN_NUMBER: f64 = 1e-130;

/// DynamoDB storage backend
pub struct DynamoDbStore {
    client: Client,
    table: String,
}

impl DynamoDbStore {
    pub async fn new(
        table: String,
        region: Option<String>,
        endpoint: Option<String>,
        retry: &RetrySettings,
    ) -> Self {
        let config = load_sdk_config(region, retry).await;

        let mut builder = aws_sdk_dynamodb::config::Builder::from(&config);
        if let Some(endpoint_url) = endpoint {
            builder = builder.endpoint_url(endpoint_url);
        }

        Self {
            client: Client::from_conf(builder.build()),
            table,
        }
    }
}

/// Render a price as a DynamoDB number, rejecting values the table cannot store.
pub fn encode_number(value: f64) -> Result<String> {
    let magnitude = value.abs();
    let in_range = magnitude == 0.0 || (MIN_NUMBER..=MAX_NUMBER).contains(&magnitude);
    if !value.is_finite() || !in_range {
        return Err(Error::invalid_request(format!(
            "price {} is outside the DynamoDB number range",
            value
        )));
    }
    Ok(value.to_string())
}

pub fn order_to_item(order: &Order) -> Result<HashMap<String, AttributeValue>> {
    let price = encode_number(order.price)?;

    Ok(HashMap::from([
        (
            KEY_ATTRIBUTE.to_string(),
            AttributeValue::S(order.order_id.clone()),
        ),
        ("item".to_string(), AttributeValue::S(order.item.clone())),
        ("price".to_string(), AttributeValue::N(price)),
        (
            "timestamp".to_string(),
            AttributeValue::S(order.timestamp.clone()),
        ),
    ]))
}

pub fn item_to_order(item: &HashMap<String, AttributeValue>) -> Result<Order> {
    let string_attr = |name: &str| -> Result<String> {
        item.get(name)
            .and_then(|value| value.as_s().ok())
            .cloned()
            .ok_or_else(|| Error::storage(format!("stored item missing string attribute '{}'", name)))
    };

    let price = match item.get("price") {
        None => 0.0,
        Some(value) => {
            let raw = value
                .as_n()
                .map_err(|_| Error::storage("stored item has non-numeric 'price'"))?;
            raw.parse::<f64>()
                .map_err(|e| Error::storage(format!("invalid stored price '{}': {}", raw, e)))?
        }
    };

    Ok(Order {
        order_id: string_attr(KEY_ATTRIBUTE)?,
        item: string_attr("item")?,
        price,
        timestamp: string_attr("timestamp")?,
    })
}

#[async_trait]
impl OrderStore for DynamoDbStore {
    async fn put(&self, order: &Order) -> Result<()> {
        let item = order_to_item(order)?;

        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| Error::storage(format!("DynamoDB put failed: {}", e)))?;

        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<Order>> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(KEY_ATTRIBUTE, AttributeValue::S(order_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| Error::storage(format!("DynamoDB get failed: {}", e)))?;

        response.item().map(item_to_order).transpose()
    }

    fn describe(&self) -> String {
        format!("dynamodb:{}", self.table)
    }
}
