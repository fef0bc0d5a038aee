//! End-to-end ingestion flow over an in-memory store.
//!
//! Exercises the full pipeline — channel source → consumer → store → cache →
//! lookup/HTTP — without a database, using an insert-if-absent fake behind
//! the `OrdersRepo` seam.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{body::Body, http::Request};
use bytes::Bytes;
use futures::{StreamExt, stream, stream::BoxStream};
use http_body_util::BodyExt;
use orderline::{
    application::{
        ingest::IngestionConsumer,
        lookup::OrderLookup,
        repos::{OrderRow, OrdersRepo, RepoError},
        restore::CacheRestorer,
    },
    cache::OrderCache,
    domain::orders::Order,
    infra::{
        db::PostgresOrders,
        http::{HttpState, build_router},
        source::ChannelSource,
    },
};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use common::sample_order;

/// Insert-if-absent store fake. Rows are kept as decoded orders and
/// re-serialized on scan, mirroring the JSONB layout of the real table.
#[derive(Default)]
struct MemoryOrders {
    orders: Mutex<Vec<Order>>,
}

impl MemoryOrders {
    fn rows(&self) -> Vec<OrderRow> {
        self.orders
            .lock()
            .expect("store lock")
            .iter()
            .map(|order| OrderRow {
                order_uid: order.order_uid.clone(),
                track_number: order.track_number.clone(),
                entry: order.entry.clone(),
                delivery: serde_json::to_value(&order.delivery).expect("delivery json"),
                payment: serde_json::to_value(&order.payment).expect("payment json"),
                items: serde_json::to_value(&order.items).expect("items json"),
                locale: order.locale.clone(),
                internal_signature: order.internal_signature.clone(),
                customer_id: order.customer_id.clone(),
                delivery_service: order.delivery_service.clone(),
                shardkey: order.shardkey.clone(),
                sm_id: order.sm_id,
                date_created: order.date_created,
                oof_shard: order.oof_shard.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl OrdersRepo for MemoryOrders {
    async fn insert_order(&self, order: &Order) -> Result<(), RepoError> {
        let mut orders = self.orders.lock().expect("store lock");
        if !orders.iter().any(|o| o.order_uid == order.order_uid) {
            orders.push(order.clone());
        }
        Ok(())
    }

    fn stream_all_orders(&self) -> BoxStream<'_, Result<OrderRow, RepoError>> {
        Box::pin(stream::iter(self.rows().into_iter().map(Ok)))
    }
}

fn payload(order: &Order) -> Bytes {
    Bytes::from(serde_json::to_vec(order).expect("serialize order"))
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

fn router_over(cache: Arc<OrderCache>) -> axum::Router {
    // The pool is never touched by order lookups; lazy construction keeps
    // these tests fully offline.
    let pool = PostgresOrders::connect_lazy("postgres://localhost/orderline_unused")
        .expect("lazy pool");
    build_router(HttpState {
        lookup: Arc::new(OrderLookup::new(cache)),
        db: PostgresOrders::new(pool),
    })
}

#[tokio::test]
async fn ingest_then_lookup_end_to_end() {
    let repo = Arc::new(MemoryOrders::default());
    let cache = Arc::new(OrderCache::new());

    // Startup order: restore first (empty store, empty cache), then consume.
    let restored = CacheRestorer::new(repo.clone(), cache.clone())
        .restore()
        .await
        .expect("restore over empty store");
    assert_eq!(restored, 0);

    let (tx, source) = ChannelSource::new(8);
    let shutdown = CancellationToken::new();
    let consumer = IngestionConsumer::new(
        Box::new(source),
        repo.clone(),
        cache.clone(),
        shutdown.clone(),
    );
    let consumer_handle = tokio::spawn(consumer.run());

    let first = sample_order("a1");
    tx.send(payload(&first)).await.expect("send first message");
    wait_for(|| cache.get("a1").is_some()).await;

    // Query the ingested order through the HTTP surface.
    let router = router_over(cache.clone());
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/orders/a1")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");
    assert_eq!(response.status(), 200);
    let body = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let returned: Order = serde_json::from_slice(&body).expect("decode body");
    assert_eq!(returned, first);

    // A miss is a terminal 404, not a store fallback.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/orders/nonexistent")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");
    assert_eq!(response.status(), 404);

    // Same identifier, different track number: the store keeps the first
    // row, the cache reflects the later put.
    let mut second = sample_order("a1");
    second.track_number = "WBILMTESTTRACK2".to_string();
    tx.send(payload(&second)).await.expect("send second message");
    wait_for(|| cache.get("a1").map(|o| o.track_number.clone()) == Some(second.track_number.clone()))
        .await;

    let rows: Vec<_> = repo
        .stream_all_orders()
        .map(|row| row.expect("scan row"))
        .collect()
        .await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].track_number, first.track_number);
    assert_eq!(cache.get("a1"), Some(second));

    shutdown.cancel();
    consumer_handle.await.expect("consumer exits");
    drop(tx);
}

#[tokio::test]
async fn restart_restores_lookups_from_the_store() {
    let repo = Arc::new(MemoryOrders::default());

    // First life: ingest two orders.
    {
        let cache = Arc::new(OrderCache::new());
        let (tx, source) = ChannelSource::new(8);
        let consumer = IngestionConsumer::new(
            Box::new(source),
            repo.clone(),
            cache.clone(),
            CancellationToken::new(),
        );
        let handle = tokio::spawn(consumer.run());

        tx.send(payload(&sample_order("a1"))).await.expect("send a1");
        tx.send(payload(&sample_order("a2"))).await.expect("send a2");
        drop(tx);
        handle.await.expect("consumer exits on stream close");
        assert_eq!(cache.len(), 2);
    }

    // Second life: a fresh cache is rebuilt from the store before serving.
    let cache = Arc::new(OrderCache::new());
    let restored = CacheRestorer::new(repo.clone(), cache.clone())
        .restore()
        .await
        .expect("restore succeeds");

    assert_eq!(restored, 2);
    let lookup = OrderLookup::new(cache);
    assert_eq!(lookup.lookup("a1"), Some(sample_order("a1")));
    assert_eq!(lookup.lookup("a2"), Some(sample_order("a2")));
    assert!(lookup.lookup("a3").is_none());
}
