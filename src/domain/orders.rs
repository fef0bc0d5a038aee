//! Order records as they travel the wire and live in the cache.
//!
//! `order_uid` is the sole key everywhere: primary key in the durable store,
//! map key in the cache. An order admitted to the store is never updated or
//! deleted; there is no mutation path on these types after decode.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed order payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("order payload carries an empty `order_uid`")]
    MissingIdentifier,
}

/// One customer order, the unit of ingestion, persistence and lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<OrderItem>,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub date_created: OffsetDateTime,
    pub oof_shard: String,
}

/// Recipient details. Plain strings, no cross-field invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub transaction: String,
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i64,
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i64,
    pub rid: String,
    pub name: String,
    pub sale: i64,
    pub size: String,
    pub total_price: i64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i32,
}

impl Order {
    /// Decode one stream payload into an order.
    ///
    /// An order only comes into existence through this decode; anything that
    /// fails here is dropped by the caller, never persisted.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let order: Order = serde_json::from_slice(payload)?;
        if order.order_uid.trim().is_empty() {
            return Err(DecodeError::MissingIdentifier);
        }
        Ok(order)
    }
}
