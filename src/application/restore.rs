//! One-shot startup restoration of the order cache from the durable store.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use metrics::histogram;
use tracing::{info, warn};

use crate::application::repos::{OrderRow, OrdersRepo, RepoError};
use crate::cache::OrderCache;
use crate::domain::orders::{Delivery, Order, OrderItem, Payment};

const METRIC_RESTORE_MS: &str = "orderline_cache_restore_ms";

/// Rebuilds the order cache from the durable store before anything serves.
///
/// Runs exactly once, synchronously with respect to startup: the consumer
/// and the lookup surface must not start until `restore` has returned.
pub struct CacheRestorer {
    repo: Arc<dyn OrdersRepo>,
    cache: Arc<OrderCache>,
}

impl CacheRestorer {
    pub fn new(repo: Arc<dyn OrdersRepo>, cache: Arc<OrderCache>) -> Self {
        Self { repo, cache }
    }

    /// Scan the store and populate the cache, one row at a time.
    ///
    /// A row whose nested documents no longer decode is logged and skipped;
    /// a failure of the scan itself aborts restoration and is returned for
    /// the startup sequence to apply its policy. Returns the number of
    /// orders restored.
    pub async fn restore(&self) -> Result<usize, RepoError> {
        let started_at = Instant::now();
        let mut rows = self.repo.stream_all_orders();
        let mut restored = 0usize;
        let mut skipped = 0usize;

        while let Some(row) = rows.next().await {
            let row = row?;
            let order_uid = row.order_uid.clone();
            match decode_row(row) {
                Ok(order) => {
                    self.cache.put(order);
                    restored += 1;
                }
                Err(err) => {
                    skipped += 1;
                    warn!(
                        target = "orderline::restore",
                        order_uid = %order_uid,
                        error = %err,
                        "skipping stored order with undecodable nested fields"
                    );
                }
            }
        }

        histogram!(METRIC_RESTORE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        info!(
            target = "orderline::restore",
            restored, skipped, "order cache restored"
        );
        Ok(restored)
    }
}

fn decode_row(row: OrderRow) -> Result<Order, serde_json::Error> {
    Ok(Order {
        order_uid: row.order_uid,
        track_number: row.track_number,
        entry: row.entry,
        delivery: serde_json::from_value::<Delivery>(row.delivery)?,
        payment: serde_json::from_value::<Payment>(row.payment)?,
        items: serde_json::from_value::<Vec<OrderItem>>(row.items)?,
        locale: row.locale,
        internal_signature: row.internal_signature,
        customer_id: row.customer_id,
        delivery_service: row.delivery_service,
        shardkey: row.shardkey,
        sm_id: row.sm_id,
        date_created: row.date_created,
        oof_shard: row.oof_shard,
    })
}
