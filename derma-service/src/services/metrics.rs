//! Metrics collection and Prometheus export.
//!
//! Recording is a no-op until [`init_metrics`] installs the recorder, so
//! library code and tests can emit metrics unconditionally.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global handle to the Prometheus recorder.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const ANALYSES_TOTAL: &str = "derma_analyses_total";
pub const CLASSIFICATION_DURATION: &str = "derma_classification_duration_seconds";
pub const EXPLANATION_DURATION: &str = "derma_explanation_duration_seconds";

/// How a completed analysis was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Uncertain,
    Explained,
    ExplainerFallback,
}

impl AnalysisOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisOutcome::Uncertain => "uncertain",
            AnalysisOutcome::Explained => "explained",
            AnalysisOutcome::ExplainerFallback => "explainer_fallback",
        }
    }
}

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init_metrics() -> Result<(), BuildError> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_outcome(outcome: AnalysisOutcome) {
    counter!(ANALYSES_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

pub fn record_classification(elapsed: Duration) {
    histogram!(CLASSIFICATION_DURATION).record(elapsed.as_secs_f64());
}

pub fn record_explanation(elapsed: Duration) {
    histogram!(EXPLANATION_DURATION).record(elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_labels_are_stable() {
        assert_eq!(AnalysisOutcome::Uncertain.as_str(), "uncertain");
        assert_eq!(AnalysisOutcome::Explained.as_str(), "explained");
        assert_eq!(AnalysisOutcome::ExplainerFallback.as_str(), "explainer_fallback");
    }

    #[test]
    fn recording_without_recorder_is_harmless() {
        record_outcome(AnalysisOutcome::Explained);
        record_classification(Duration::from_millis(5));
        record_explanation(Duration::from_millis(5));
    }
}
