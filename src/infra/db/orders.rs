use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};
use serde_json::Value;
use sqlx::types::Json;
use time::OffsetDateTime;

use crate::application::repos::{OrderRow, OrdersRepo, RepoError};
use crate::domain::orders::Order;

use super::{PostgresOrders, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct StoredOrderRow {
    order_uid: String,
    track_number: String,
    entry: String,
    delivery: Json<Value>,
    payment: Json<Value>,
    items: Json<Value>,
    locale: String,
    internal_signature: String,
    customer_id: String,
    delivery_service: String,
    shardkey: String,
    sm_id: i32,
    date_created: OffsetDateTime,
    oof_shard: String,
}

impl From<StoredOrderRow> for OrderRow {
    fn from(row: StoredOrderRow) -> Self {
        Self {
            order_uid: row.order_uid,
            track_number: row.track_number,
            entry: row.entry,
            delivery: row.delivery.0,
            payment: row.payment.0,
            items: row.items.0,
            locale: row.locale,
            internal_signature: row.internal_signature,
            customer_id: row.customer_id,
            delivery_service: row.delivery_service,
            shardkey: row.shardkey,
            sm_id: row.sm_id,
            date_created: row.date_created,
            oof_shard: row.oof_shard,
        }
    }
}

#[async_trait]
impl OrdersRepo for PostgresOrders {
    async fn insert_order(&self, order: &Order) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                order_uid, track_number, entry, delivery, payment, items,
                locale, internal_signature, customer_id, delivery_service,
                shardkey, sm_id, date_created, oof_shard
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (order_uid) DO NOTHING
            "#,
        )
        .bind(&order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(Json(&order.delivery))
        .bind(Json(&order.payment))
        .bind(Json(&order.items))
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shardkey)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    fn stream_all_orders(&self) -> BoxStream<'_, Result<OrderRow, RepoError>> {
        let stream = sqlx::query_as::<_, StoredOrderRow>(
            "SELECT order_uid, track_number, entry, delivery, payment, items, \
             locale, internal_signature, customer_id, delivery_service, \
             shardkey, sm_id, date_created, oof_shard \
             FROM orders \
             ORDER BY order_uid",
        )
        .fetch(self.pool())
        .map(|row| match row {
            Ok(row) => Ok(OrderRow::from(row)),
            Err(err) => Err(map_sqlx_error(err)),
        });

        Box::pin(stream)
    }
}
