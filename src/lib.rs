//! foodorders - a small order intake service
//!
//! Accepts create-order, fetch-order and CORS preflight requests, keeps one
//! record per order id in a key-value table and answers every request with a
//! JSON envelope carrying permissive CORS headers.
//! - Pluggable order table (memory, local files, S3, DynamoDB)
//! - Optional per-order price metric
//! - HTTP API plus a gateway-style event endpoint

pub mod api;
pub mod config;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
