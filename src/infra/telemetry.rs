use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
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
            "revalidator_revalidate_requests_total",
            Unit::Count,
            "Revalidation requests handled, labelled by outcome."
        );
        describe_counter!(
            "revalidator_targets_revalidated_total",
            Unit::Count,
            "Cache partitions invalidated, labelled by target kind."
        );
        describe_counter!(
            "revalidator_targets_failed_total",
            Unit::Count,
            "Cache partitions that failed to invalidate, labelled by target kind."
        );
        describe_counter!(
            "revalidator_relay_requests_total",
            Unit::Count,
            "Requests forwarded to the revalidation endpoint, labelled by outcome."
        );
        describe_counter!(
            "revalidator_page_cache_hit_total",
            Unit::Count,
            "Total number of page cache hits."
        );
        describe_counter!(
            "revalidator_page_cache_miss_total",
            Unit::Count,
            "Total number of page cache misses."
        );
        describe_counter!(
            "revalidator_page_cache_evict_total",
            Unit::Count,
            "Total number of page cache evictions due to capacity."
        );
        describe_histogram!(
            "revalidator_relay_request_ms",
            Unit::Milliseconds,
            "Round-trip latency of forwarded revalidation requests."
        );
    });
}
