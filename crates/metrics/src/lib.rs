//! Metrics and monitoring for the PnP job sequencer
//!
//! This crate provides run-level observability:
//!
//! - Prometheus counters and histograms for placements, cycles, phases
//!   and recovery actions
//! - Text exposition for scraping by an external endpoint
//! - Tracing subscriber initialisation with a metrics-aware layer
//! - Per-job spans carrying a correlation ID
//!
//! # Example
//!
//! ```no_run
//! use pnp_sequencer_metrics::{init_tracing, LogFormat, MetricsCollector};
//! use std::sync::Arc;
//!
//! let collector = Arc::new(MetricsCollector::new());
//! init_tracing(collector.clone(), "info", LogFormat::Json).unwrap();
//!
//! collector.record_job_started();
//! println!("{}", collector.export_metrics().unwrap());
//! ```

pub mod collector;
pub mod metrics;
pub mod tracing;

pub use collector::{MetricsCollector, MetricsError};
pub use tracing::{init_tracing, CorrelationId, JobSpan, LogFormat, TracingError};
