//! In-process storage backend

use async_trait::async_trait;
use dashmap::DashMap;

use crate::types::Order;
use crate::Result;

use super::OrderStore;

/// Order table held in a concurrent map
#[derive(Default)]
pub struct MemoryStore {
    orders: DashMap<String, Order>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn put(&self, order: &Order) -> Result<()> {
        self.orders.insert(order.order_id.clone(), order.clone());
        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<Order>> {
        Ok(self.orders.get(order_id).map(|entry| entry.value().clone()))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
