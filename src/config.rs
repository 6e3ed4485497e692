//! Config fields definitions for the provisioner

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::metrics::printer::{MetricsPrinterConfig, OutputFormat};
use crate::scheduling::options::SchedulerOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProvisionerConfig {
    /// Time limit of one scheduling simulation in seconds.
    #[serde(default = "solve_timeout_default")]
    pub solve_timeout: f64,
    /// Instance type options kept per node claim in the decision.
    #[serde(default = "max_instance_types_default")]
    pub max_instance_types: usize,
    /// Name of placement strategy. Used in `resolve_placement_strategy`.
    #[serde(default = "placement_strategy_default")]
    pub placement_strategy: String,
    /// Interval between progress logs of a long simulation in seconds.
    #[serde(default = "progress_log_interval_default")]
    pub progress_log_interval: f64,
    #[serde(default)]
    pub options: SchedulerOptions,
    #[serde(default)]
    pub decision_format: OutputFormat,
    pub metrics_printer: Option<MetricsPrinterConfig>,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            solve_timeout: solve_timeout_default(),
            max_instance_types: max_instance_types_default(),
            placement_strategy: placement_strategy_default(),
            progress_log_interval: progress_log_interval_default(),
            options: Default::default(),
            decision_format: Default::default(),
            metrics_printer: None,
        }
    }
}

fn solve_timeout_default() -> f64 {
    60.0
}
fn max_instance_types_default() -> usize {
    60
}
fn placement_strategy_default() -> String {
    "best_fit".to_string()
}
fn progress_log_interval_default() -> f64 {
    60.0
}

impl ProvisionerConfig {
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        let config: ProvisionerConfig =
            serde_yaml::from_str(source).map_err(|source| ConfigError::Yaml {
                path: "<inline>".to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config: ProvisionerConfig = read_yaml(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.solve_timeout_duration()?;
        let interval = self.progress_log_interval_duration()?;
        if interval.is_zero() {
            return Err(ConfigError::InvalidValue(format!(
                "progress_log_interval must be positive, got {}",
                self.progress_log_interval
            )));
        }
        if self.max_instance_types == 0 {
            return Err(ConfigError::InvalidValue(
                "max_instance_types must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn solve_timeout_duration(&self) -> Result<Duration, ConfigError> {
        seconds_to_duration("solve_timeout", self.solve_timeout)
    }

    pub fn progress_log_interval_duration(&self) -> Result<Duration, ConfigError> {
        seconds_to_duration("progress_log_interval", self.progress_log_interval)
    }
}

fn seconds_to_duration(field: &str, seconds: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(seconds).map_err(|err| {
        ConfigError::InvalidValue(format!(
            "{} must be a non-negative number of seconds, got {}: {}",
            field, seconds, err
        ))
    })
}

/// Reads any YAML document: configs, catalogs and scheduling inputs.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let path_str = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path_str.clone(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
        path: path_str,
        source,
    })
}
