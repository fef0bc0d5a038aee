//! Long-running ingestion consumer: stream → durable store → cache.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::repos::OrdersRepo;
use crate::cache::OrderCache;
use crate::domain::orders::Order;

const METRIC_INGEST_RECEIVED: &str = "orderline_ingest_received_total";
const METRIC_INGEST_DECODE_FAILURE: &str = "orderline_ingest_decode_failure_total";
const METRIC_INGEST_PERSIST_FAILURE: &str = "orderline_ingest_persist_failure_total";
const METRIC_INGEST_STORED: &str = "orderline_ingest_stored_total";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("stream connection error: {message}")]
    Connection { message: String },
}

impl SourceError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

/// One unit of delivery from the ingestion transport.
///
/// Wire and connection details stay behind this seam; the consumer only sees
/// opaque payload bytes. `Ok(None)` means the stream is closed and no further
/// messages will arrive.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn recv(&mut self) -> Result<Option<Bytes>, SourceError>;
}

/// Drives messages from the stream into the store and then the cache.
///
/// The order of the two writes is the consistency mechanism: the store is
/// written first, and only a successful persist reaches the cache, so the
/// cache never holds an order the store does not.
pub struct IngestionConsumer {
    source: Box<dyn MessageSource>,
    repo: Arc<dyn OrdersRepo>,
    cache: Arc<OrderCache>,
    shutdown: CancellationToken,
}

impl IngestionConsumer {
    pub fn new(
        source: Box<dyn MessageSource>,
        repo: Arc<dyn OrdersRepo>,
        cache: Arc<OrderCache>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            source,
            repo,
            cache,
            shutdown,
        }
    }

    /// Consume until the stream closes or shutdown is requested.
    ///
    /// A failed message is dropped, never retried or requeued: decode and
    /// persist failures are recorded and the loop moves to the next message.
    pub async fn run(mut self) {
        loop {
            let received = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!(target = "orderline::ingest", "shutdown requested, consumer stopping");
                    return;
                }
                received = self.source.recv() => received,
            };

            let payload = match received {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    info!(target = "orderline::ingest", "message stream closed, consumer stopping");
                    return;
                }
                Err(err) => {
                    warn!(
                        target = "orderline::ingest",
                        error = %err,
                        "failed to receive message"
                    );
                    continue;
                }
            };

            counter!(METRIC_INGEST_RECEIVED).increment(1);
            self.process(&payload).await;
        }
    }

    async fn process(&self, payload: &[u8]) {
        let order = match Order::decode(payload) {
            Ok(order) => order,
            Err(err) => {
                counter!(METRIC_INGEST_DECODE_FAILURE).increment(1);
                warn!(
                    target = "orderline::ingest",
                    error = %err,
                    "dropping undecodable message"
                );
                return;
            }
        };

        if let Err(err) = self.repo.insert_order(&order).await {
            counter!(METRIC_INGEST_PERSIST_FAILURE).increment(1);
            warn!(
                target = "orderline::ingest",
                order_uid = %order.order_uid,
                error = %err,
                "dropping order after persist failure"
            );
            return;
        }

        counter!(METRIC_INGEST_STORED).increment(1);
        let order_uid = order.order_uid.clone();
        self.cache.put(order);
        info!(
            target = "orderline::ingest",
            order_uid = %order_uid,
            "order persisted and cached"
        );
    }
}
