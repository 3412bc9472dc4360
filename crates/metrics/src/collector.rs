use std::time::Duration;

use prometheus::{Encoder, Registry, TextEncoder};

use crate::metrics::*;

/// Metrics collector for the PnP job sequencer
pub struct MetricsCollector {
    registry: Registry,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Self {
        let registry = Registry::new();
        Self { registry }
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // JOB METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record a job being bound to an engine
    pub fn record_job_started(&self) {
        JOBS_STARTED.inc();
        ACTIVE_JOBS.inc();
    }

    pub fn record_job_completed(&self) {
        JOBS_COMPLETED.inc();
        ACTIVE_JOBS.dec();
    }

    pub fn record_job_aborted(&self) {
        JOBS_ABORTED.inc();
        ACTIVE_JOBS.dec();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PLACEMENT METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_placement_placed(&self) {
        PLACEMENTS_PLACED.inc();
    }

    pub fn record_placements_skipped(&self, count: u64) {
        PLACEMENTS_SKIPPED.inc_by(count);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CYCLE METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record a planned cycle and its batch size
    pub fn record_cycle_planned(&self, size: usize) {
        CYCLES_PLANNED.inc();
        CYCLE_SIZE.observe(size as f64);
    }

    pub fn record_phase_duration(&self, phase: &str, duration: Duration) {
        PHASE_DURATION
            .with_label_values(&[phase])
            .observe(duration.as_millis() as f64);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FAILURE METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_failure(&self, kind: &str) {
        JOB_FAILURES.with_label_values(&[kind]).inc();
    }

    pub fn record_recovery_action(&self, action: &str) {
        RECOVERY_ACTIONS.with_label_values(&[action]).inc();
    }

    pub fn record_log_event(&self, level: &str) {
        LOG_EVENTS.with_label_values(&[level]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPORT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Export metrics in Prometheus text format
    pub fn export_metrics(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut metric_families = prometheus::gather();
        metric_families.extend(self.registry.gather());
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::EncodingError(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::EncodingError(e.to_string()))
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics error types
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("encoding error: {0}")]
    EncodingError(String),
    #[error("registry error: {0}")]
    RegistryError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new();
        assert!(collector.export_metrics().is_ok());
    }

    #[test]
    fn test_record_job_metrics() {
        let collector = MetricsCollector::new();

        collector.record_job_started();
        collector.record_job_completed();
        collector.record_job_started();
        collector.record_job_aborted();

        let metrics = collector.export_metrics().unwrap();
        assert!(metrics.contains("pnp_sequencer_jobs_started_total"));
        assert!(metrics.contains("pnp_sequencer_jobs_completed_total"));
        assert!(metrics.contains("pnp_sequencer_jobs_aborted_total"));
    }

    #[test]
    fn test_record_placement_and_cycle_metrics() {
        let collector = MetricsCollector::new();

        collector.record_cycle_planned(4);
        collector.record_placement_placed();
        collector.record_placements_skipped(3);
        collector.record_phase_duration("Plan", Duration::from_millis(12));

        let metrics = collector.export_metrics().unwrap();
        assert!(metrics.contains("pnp_sequencer_cycles_planned_total"));
        assert!(metrics.contains("pnp_sequencer_cycle_size"));
        assert!(metrics.contains("pnp_sequencer_placements_placed_total"));
        assert!(metrics.contains("pnp_sequencer_phase_duration_ms"));
    }

    #[test]
    fn test_record_failure_metrics() {
        let collector = MetricsCollector::new();

        collector.record_failure("fiducial");
        collector.record_recovery_action("Disable Board");

        let metrics = collector.export_metrics().unwrap();
        assert!(metrics.contains("pnp_sequencer_failures_total"));
        assert!(metrics.contains("kind=\"fiducial\""));
        assert!(metrics.contains("action=\"Disable Board\""));
    }
}
