//! Read-only HTTP surface over the order cache.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tracing::error;

use crate::application::lookup::OrderLookup;
use crate::infra::db::PostgresOrders;

#[derive(Clone)]
pub struct HttpState {
    pub lookup: Arc<OrderLookup>,
    pub db: PostgresOrders,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/orders/{order_uid}", get(order_detail))
        .route("/_health/db", get(db_health))
        .with_state(state)
}

async fn order_detail(
    State(state): State<HttpState>,
    Path(order_uid): Path<String>,
) -> Response {
    match state.lookup.lookup(&order_uid) {
        Some(order) => (StatusCode::OK, Json(order)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "order not found", "order_uid": order_uid })),
        )
            .into_response(),
    }
}

async fn db_health(State(state): State<HttpState>) -> Response {
    match state.db.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!(target = "orderline::http", error = %err, "database health check failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
