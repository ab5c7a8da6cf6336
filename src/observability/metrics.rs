//! Metrics for the lead enricher
//!
//! Recording goes through the `metrics` facade; the binary installs a
//! Prometheus recorder and can dump the exposition text after a run.

use std::fmt;
use std::sync::OnceLock;

use tracing::info;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Loader metrics
    LoaderAttempts,
    LoaderSourcesLoaded,
    LoaderSourcesUnreadable,
    LoaderBytes,

    // Pipeline metrics
    PipelineRunsStarted,
    PipelineRunsFailed,
    PipelineRowsIn,
    PipelineRowsOut,
    PipelineLinkColumns,
    PipelineConfidence,

    // Merge metrics
    MergeMatchedRows,

    // Writer metrics
    WorkbookBytes,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::LoaderAttempts => "lead_enricher_loader_attempts_total",
            MetricName::LoaderSourcesLoaded => "lead_enricher_loader_sources_loaded_total",
            MetricName::LoaderSourcesUnreadable => "lead_enricher_loader_sources_unreadable_total",
            MetricName::LoaderBytes => "lead_enricher_loader_bytes",

            MetricName::PipelineRunsStarted => "lead_enricher_pipeline_runs_started_total",
            MetricName::PipelineRunsFailed => "lead_enricher_pipeline_runs_failed_total",
            MetricName::PipelineRowsIn => "lead_enricher_pipeline_rows_in_total",
            MetricName::PipelineRowsOut => "lead_enricher_pipeline_rows_out_total",
            MetricName::PipelineLinkColumns => "lead_enricher_pipeline_link_columns_total",
            MetricName::PipelineConfidence => "lead_enricher_pipeline_confidence",

            MetricName::MergeMatchedRows => "lead_enricher_merge_matched_rows_total",

            MetricName::WorkbookBytes => "lead_enricher_workbook_bytes",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call once per process.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Prometheus exposition text for everything recorded so far
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

pub mod loader {
    use super::MetricName;

    pub fn attempt(strategy: &str, outcome: &'static str) {
        ::metrics::counter!(MetricName::LoaderAttempts.as_str(),
            "strategy" => strategy.to_string(), "outcome" => outcome).increment(1);
    }

    pub fn loaded(bytes: usize) {
        ::metrics::counter!(MetricName::LoaderSourcesLoaded.as_str()).increment(1);
        ::metrics::histogram!(MetricName::LoaderBytes.as_str()).record(bytes as f64);
    }

    pub fn unreadable() {
        ::metrics::counter!(MetricName::LoaderSourcesUnreadable.as_str()).increment(1);
    }
}

pub mod pipeline {
    use super::MetricName;

    pub fn run_started() {
        ::metrics::counter!(MetricName::PipelineRunsStarted.as_str()).increment(1);
    }

    pub fn run_failed(reason: &'static str) {
        ::metrics::counter!(MetricName::PipelineRunsFailed.as_str(), "reason" => reason).increment(1);
    }

    pub fn rows(rows_in: u64, rows_out: u64) {
        ::metrics::counter!(MetricName::PipelineRowsIn.as_str()).increment(rows_in);
        ::metrics::counter!(MetricName::PipelineRowsOut.as_str()).increment(rows_out);
    }

    pub fn link_columns_added(set: &'static str, count: u64) {
        ::metrics::counter!(MetricName::PipelineLinkColumns.as_str(), "set" => set).increment(count);
    }

    pub fn confidence_recorded(score: f64) {
        ::metrics::histogram!(MetricName::PipelineConfidence.as_str()).record(score);
    }
}

pub mod merge {
    use super::MetricName;

    pub fn matched(suffix: &str, rows: u64) {
        ::metrics::counter!(MetricName::MergeMatchedRows.as_str(), "suffix" => suffix.to_string())
            .increment(rows);
    }
}

pub mod writer {
    use super::MetricName;

    pub fn workbook_written(bytes: usize) {
        ::metrics::histogram!(MetricName::WorkbookBytes.as_str()).record(bytes as f64);
    }
}
