//! Repository trait describing the durable order store.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::orders::Order;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// One raw row from the orders table: the scalar columns plus the three
/// nested documents still in their serialized form. Decoding the documents
/// is the restorer's job, so a corrupt row can be skipped instead of
/// poisoning the whole scan.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub delivery: Value,
    pub payment: Value,
    pub items: Value,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i32,
    pub date_created: OffsetDateTime,
    pub oof_shard: String,
}

#[async_trait]
pub trait OrdersRepo: Send + Sync {
    /// Persist the order, keeping any existing row with the same identifier
    /// untouched (insert-if-absent). A duplicate identifier is a successful
    /// no-op, not an error.
    async fn insert_order(&self, order: &Order) -> Result<(), RepoError>;

    /// Stream every stored row from the beginning, one row at a time.
    ///
    /// The scan is finite and not restartable mid-flight; call again for a
    /// fresh pass over the current table contents.
    fn stream_all_orders(&self) -> BoxStream<'_, Result<OrderRow, RepoError>>;
}
