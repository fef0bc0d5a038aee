use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "orderline_ingest_received_total",
            Unit::Count,
            "Total number of messages received from the stream."
        );
        describe_counter!(
            "orderline_ingest_decode_failure_total",
            Unit::Count,
            "Total number of messages dropped because the payload failed to decode."
        );
        describe_counter!(
            "orderline_ingest_persist_failure_total",
            Unit::Count,
            "Total number of messages dropped because the store write failed."
        );
        describe_counter!(
            "orderline_ingest_stored_total",
            Unit::Count,
            "Total number of orders persisted and cached."
        );
        describe_counter!(
            "orderline_lookup_hit_total",
            Unit::Count,
            "Total number of lookups served from the cache."
        );
        describe_counter!(
            "orderline_lookup_miss_total",
            Unit::Count,
            "Total number of lookups that found no cached order."
        );
        describe_gauge!(
            "orderline_cache_orders",
            Unit::Count,
            "Current number of orders resident in the cache."
        );
        describe_histogram!(
            "orderline_cache_restore_ms",
            Unit::Milliseconds,
            "Startup cache restoration latency in milliseconds."
        );
    });
}
