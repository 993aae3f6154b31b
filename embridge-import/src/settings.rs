//! Validated runtime settings for the import pipeline
//!
//! The loaded configuration file is user input; this type is what the
//! pipeline actually runs with, checked once at startup so the monitor
//! and the progress arithmetic never see a nonsense value.

use std::path::PathBuf;
use std::time::Duration;

use embridge_common::config::BridgeConfig;
use embridge_common::{Error, Result};

#[derive(Debug, Clone)]
pub struct ImportSettings {
    /// Directory for run artifacts (config and log files).
    pub scratch_dir: PathBuf,
    /// Tool binary name or path.
    pub embulk_binary: String,
    /// Expected decompression ratio of the gzip input, scales the
    /// progress expectation.
    pub compression_factor: f64,
    /// How often the progress monitor samples the run log.
    pub poll_interval: Duration,
    /// Whether to complete the config through the tool's guess pass.
    pub guess_config: bool,
    /// User-supplied config template overriding the built-in ones.
    pub template_config_file: Option<PathBuf>,
}

impl ImportSettings {
    /// Build settings from a loaded configuration, rejecting values the
    /// pipeline cannot run with.
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let settings = Self {
            scratch_dir: config.scratch_dir.clone(),
            embulk_binary: config.embulk_binary.clone(),
            compression_factor: config.compression_factor,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            guess_config: config.guess_config,
            template_config_file: config.template_config_file.clone(),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if !self.compression_factor.is_finite() || self.compression_factor <= 0.0 {
            return Err(Error::Config(format!(
                "compression_factor must be a positive number, got {}",
                self.compression_factor
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.embulk_binary.trim().is_empty() {
            return Err(Error::Config("embulk_binary must not be empty".to_string()));
        }
        Ok(())
    }
}
