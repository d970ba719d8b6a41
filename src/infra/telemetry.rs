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

/// Register descriptions for every store metric with the installed recorder.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "folio_store_mutation_applied_total",
            Unit::Count,
            "Total number of mutations applied and published, by kind."
        );
        describe_counter!(
            "folio_store_mutation_rejected_total",
            Unit::Count,
            "Total number of mutations rejected by the applier, by kind and reason."
        );
        describe_counter!(
            "folio_store_backpressure_total",
            Unit::Count,
            "Total number of submissions refused because the queue was full."
        );
        describe_gauge!(
            "folio_store_queue_depth",
            Unit::Count,
            "Current number of accepted mutations waiting for the applier."
        );
        describe_histogram!(
            "folio_store_apply_ms",
            Unit::Milliseconds,
            "Time to build and publish one version in milliseconds."
        );
        describe_gauge!(
            "folio_store_version_posts",
            Unit::Count,
            "Number of records in the currently published version."
        );
    });
}
