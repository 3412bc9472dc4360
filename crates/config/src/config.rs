//! Core configuration structures for the PnP job sequencer

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Job engine behaviour
    pub engine: EngineConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Job engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Park the head once the last placement has been made
    #[serde(default)]
    pub park_when_complete: bool,

    /// Upper bound on placements per cycle; the nozzle count always applies
    #[serde(default)]
    pub max_cycle_size: Option<usize>,

    /// Move the head to safe Z at the end of every cycle
    #[serde(default = "default_true")]
    pub safe_z_between_cycles: bool,
}

impl EngineConfig {
    pub fn with_park_when_complete(mut self, park: bool) -> Self {
        self.park_when_complete = park;
        self
    }

    pub fn with_max_cycle_size(mut self, size: usize) -> Self {
        self.max_cycle_size = Some(size);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            park_when_complete: false,
            max_cycle_size: None,
            safe_z_between_cycles: default_true(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics collection
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(!config.engine.park_when_complete);
        assert!(config.engine.safe_z_between_cycles);
        assert_eq!(config.engine.max_cycle_size, None);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_engine_config_builders() {
        let engine = EngineConfig::default()
            .with_park_when_complete(true)
            .with_max_cycle_size(2);
        assert!(engine.park_when_complete);
        assert_eq!(engine.max_cycle_size, Some(2));
    }
}
