//! In-memory order cache storage.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use metrics::gauge;
use tracing::warn;

use crate::domain::orders::Order;

const METRIC_CACHE_ORDERS: &str = "orderline_cache_orders";

/// Unbounded in-memory order cache keyed by `order_uid`.
///
/// Many concurrent readers and the writer-class callers (restorer, consumer)
/// share one reader/writer lock. A `put` releases its write guard before
/// returning, so any `get` of the same key that starts afterwards observes
/// the full entry. Same-key writes are last-write-wins; the durable store
/// deduplicates by identifier, so outside of stream redelivery a key is
/// written here at most once.
///
/// Entries are never evicted or expired.
#[derive(Default)]
pub struct OrderCache {
    orders: RwLock<HashMap<String, Order>>,
}

impl OrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for the order's identifier.
    pub fn put(&self, order: Order) {
        let mut orders = self.write_guard("put");
        orders.insert(order.order_uid.clone(), order);
        gauge!(METRIC_CACHE_ORDERS).set(orders.len() as f64);
    }

    /// Look up an order by identifier, cloning it out of the cache.
    pub fn get(&self, order_uid: &str) -> Option<Order> {
        self.read_guard("get").get(order_uid).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_guard("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panicked writer must not wedge every later caller; recover the
    // guard and keep serving whatever state the map is in.

    fn read_guard(&self, op: &'static str) -> RwLockReadGuard<'_, HashMap<String, Order>> {
        match self.orders.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(op, result = "poisoned_recovered", "Recovered from poisoned order cache lock");
                poisoned.into_inner()
            }
        }
    }

    fn write_guard(&self, op: &'static str) -> RwLockWriteGuard<'_, HashMap<String, Order>> {
        match self.orders.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(op, result = "poisoned_recovered", "Recovered from poisoned order cache lock");
                poisoned.into_inner()
            }
        }
    }
}
