//! Local filesystem storage backend
//!
//! Each record lives in `<root>/<table>/<order id>.json`.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

use crate::types::Order;
use crate::Result;

use super::OrderStore;

/// Local filesystem storage
pub struct LocalStore {
    table_path: PathBuf,
}

impl LocalStore {
    pub fn new(root_path: impl Into<PathBuf>, table: &str) -> Result<Self> {
        let table_path = root_path.into().join(encode_key(table));
        std::fs::create_dir_all(&table_path)?;
        Ok(Self { table_path })
    }

    fn resolve_path(&self, order_id: &str) -> PathBuf {
        self.table_path.join(format!("{}.json", encode_key(order_id)))
    }
}

/// Map an arbitrary key to a single safe path component.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte becomes `%XX`.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            let _ = write!(encoded, "%{:02X}", byte);
        }
    }
    encoded
}

#[async_trait]
impl OrderStore for LocalStore {
    async fn put(&self, order: &Order) -> Result<()> {
        let path = self.resolve_path(&order.order_id);
        let data = serde_json::to_vec(order)?;

        // Write-then-rename so readers never observe a partial record
        let tmp_path = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&tmp_path, &data).await?;
        if let Err(err) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<Order>> {
        let path = self.resolve_path(order_id);
        match fs::read(&path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn describe(&self) -> String {
        format!("local:{}", self.table_path.display())
    }
}
