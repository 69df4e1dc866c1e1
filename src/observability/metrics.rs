//! Prometheus metrics for pipeline runs, extraction latency and reconciliation.
//!
//! Recording is always safe: before `init_metrics` installs the recorder, the `metrics`
//! macros are no-ops.

use crate::common::types::{EntityKind, SourceVariant};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// book_scraper_{name}[_total]
macro_rules! book_metric {
    (counter, $name:literal) => {
        concat!("book_scraper_", $name, "_total")
    };
    (histogram, $name:literal) => {
        concat!("book_scraper_", $name)
    };
}

pub const PIPELINE_RUNS: &str = book_metric!(counter, "pipeline_runs");
pub const EXTRACTION_DURATION: &str = book_metric!(histogram, "extraction_duration_seconds");
pub const RECONCILED_ENTITIES: &str = book_metric!(counter, "reconciled_entities");

/// Install the Prometheus recorder. Idempotent.
pub fn init_metrics() {
    INIT.call_once(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_err() {
                warn!("Prometheus handle already stored");
            }
            describe_metrics();
            info!("Prometheus recorder installed");
        }
        Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
    });
}

fn describe_metrics() {
    ::metrics::describe_counter!(PIPELINE_RUNS, "Pipeline runs by source and terminal outcome");
    ::metrics::describe_histogram!(
        EXTRACTION_DURATION,
        ::metrics::Unit::Seconds,
        "Time spent in the extraction step"
    );
    ::metrics::describe_counter!(
        RECONCILED_ENTITIES,
        "Catalog names resolved during import, by entity and whether they were created"
    );
}

/// Prometheus text exposition, or `None` before `init_metrics`
pub fn render() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

pub fn record_pipeline_run(source: SourceVariant, outcome: &'static str) {
    ::metrics::counter!(PIPELINE_RUNS, "source" => source.as_str(), "outcome" => outcome)
        .increment(1);
}

pub fn record_extraction_duration(source: SourceVariant, duration_secs: f64) {
    ::metrics::histogram!(EXTRACTION_DURATION, "source" => source.as_str()).record(duration_secs);
}

pub fn record_reconciled(kind: EntityKind, created: bool) {
    let action = if created { "created" } else { "reused" };
    ::metrics::counter!(RECONCILED_ENTITIES, "entity" => kind.as_str(), "action" => action)
        .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert_eq!(PIPELINE_RUNS, "book_scraper_pipeline_runs_total");
        assert_eq!(EXTRACTION_DURATION, "book_scraper_extraction_duration_seconds");
    }

    #[test]
    fn test_init_is_idempotent_and_renders() {
        init_metrics();
        init_metrics();
        record_pipeline_run(SourceVariant::Fandom, "done");
        let text = render().expect("recorder installed");
        assert!(text.contains(PIPELINE_RUNS));
    }
}
