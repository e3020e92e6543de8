use std::sync::Once;

use metrics::{Unit, describe_counter};
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
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
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

/// Register descriptions for every metric the crate emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "tierlist_cache_hit_total",
            Unit::Count,
            "Reads served from the tagged cache."
        );
        describe_counter!(
            "tierlist_cache_miss_total",
            Unit::Count,
            "Reads computed from the system of record."
        );
        describe_counter!(
            "tierlist_cache_flush_total",
            Unit::Count,
            "Tag flushes applied to the cache."
        );
        describe_counter!(
            "tierlist_cache_error_total",
            Unit::Count,
            "Cache operations that failed and fell back, labelled by op."
        );
        describe_counter!(
            "tierlist_asset_delete_total",
            Unit::Count,
            "Orphaned image deletions, labelled by result (ok|failed|timeout)."
        );
        describe_counter!(
            "tierlist_asset_unresolved_total",
            Unit::Count,
            "Dropped images whose URL could not be mapped to a public id."
        );
    });
}
