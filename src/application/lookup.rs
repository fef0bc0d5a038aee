//! Read-only order lookups against the cache.

use std::sync::Arc;

use metrics::counter;

use crate::cache::OrderCache;
use crate::domain::orders::Order;

const METRIC_LOOKUP_HIT: &str = "orderline_lookup_hit_total";
const METRIC_LOOKUP_MISS: &str = "orderline_lookup_miss_total";

/// The query interface: a pure consumer of the cache's lookup contract.
///
/// A miss is a terminal not-found — there is no fallback read against the
/// durable store. The tradeoff is deliberate: ingestion caches immediately
/// after every successful persist, so the only window where a stored order
/// is missing here is a restart racing ingestion.
pub struct OrderLookup {
    cache: Arc<OrderCache>,
}

impl OrderLookup {
    pub fn new(cache: Arc<OrderCache>) -> Self {
        Self { cache }
    }

    pub fn lookup(&self, order_uid: &str) -> Option<Order> {
        match self.cache.get(order_uid) {
            Some(order) => {
                counter!(METRIC_LOOKUP_HIT).increment(1);
                Some(order)
            }
            None => {
                counter!(METRIC_LOOKUP_MISS).increment(1);
                None
            }
        }
    }
}
