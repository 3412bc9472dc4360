use std::sync::Arc;
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    fmt,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::collector::MetricsCollector;

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Initialize tracing with metrics integration
///
/// `default_filter` is used when `RUST_LOG` is not set.
pub fn init_tracing(
    collector: Arc<MetricsCollector>,
    default_filter: &str,
    format: LogFormat,
) -> Result<(), TracingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let metrics_layer = MetricsLayer::new(collector);
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(metrics_layer);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().with_target(true).with_level(true).json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_level(true))
            .try_init(),
    }
    .map_err(|e| TracingError::InitError(e.to_string()))?;

    Ok(())
}

/// Tracing layer that counts log events by level
pub struct MetricsLayer {
    collector: Arc<MetricsCollector>,
}

impl MetricsLayer {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }
}

impl<S> Layer<S> for MetricsLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = event.metadata().level().to_string().to_ascii_lowercase();
        self.collector.record_log_event(&level);
    }
}

/// Correlation ID tying together every log line of one job run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(uuid::Uuid);

impl CorrelationId {
    /// Generate a new correlation ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get the correlation ID as a string
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span context for one job run
#[derive(Debug, Clone)]
pub struct JobSpan {
    pub correlation_id: CorrelationId,
    pub job_name: String,
}

impl JobSpan {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            job_name: job_name.into(),
        }
    }

    /// Tracing span for this job; instrument phase futures with it
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "job",
            correlation_id = %self.correlation_id,
            job = %self.job_name,
        )
    }
}

/// Tracing error types
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("tracing initialization error: {0}")]
    InitError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_id_generation() {
        let id1 = CorrelationId::new();
        let id2 = CorrelationId::new();

        assert_ne!(id1, id2);
        assert!(id1.as_str().len() == 36);
    }

    #[test]
    fn test_job_span_creation() {
        let span = JobSpan::new("panel-rev-b");
        assert_eq!(span.job_name, "panel-rev-b");
        let _span = span.span();
    }
}
