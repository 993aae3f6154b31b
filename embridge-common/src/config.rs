//! Configuration loading for the import bridge

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Bridge configuration loaded from a TOML file
///
/// Every field has a default so a missing file or an empty table yields a
/// working configuration. The binary applies overrides on top of these
/// values, following the priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. Compiled default (fallback)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Directory for per-run scratch artifacts (materialized configs, run logs)
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// SQLite database file backing the destination store
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Embulk executable to invoke (bare name resolves via PATH)
    #[serde(default = "default_embulk_binary")]
    pub embulk_binary: String,

    /// Decompressed-to-compressed size ratio used for progress estimation.
    /// Gzipped CSV input lands near 10x.
    #[serde(default = "default_compression_factor")]
    pub compression_factor: f64,

    /// Progress monitor poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Whether to run the schema guess pass before importing
    #[serde(default = "default_guess_config")]
    pub guess_config: bool,

    /// Explicit config template path. When unset, the built-in template
    /// for the import variant is used.
    #[serde(default)]
    pub template_config_file: Option<PathBuf>,

    /// Event bus channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_database() -> PathBuf {
    PathBuf::from("embridge.db")
}

fn default_embulk_binary() -> String {
    "embulk".to_string()
}

fn default_compression_factor() -> f64 {
    10.0
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_guess_config() -> bool {
    true
}

fn default_event_capacity() -> usize {
    100
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            database: default_database(),
            embulk_binary: default_embulk_binary(),
            compression_factor: default_compression_factor(),
            poll_interval_ms: default_poll_interval_ms(),
            guess_config: default_guess_config(),
            template_config_file: None,
            event_capacity: default_event_capacity(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Load configuration from an optional path, falling back to defaults
    /// when no file is given
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.scratch_dir, PathBuf::from("tmp"));
        assert_eq!(config.embulk_binary, "embulk");
        assert_eq!(config.compression_factor, 10.0);
        assert_eq!(config.poll_interval_ms, 200);
        assert!(config.guess_config);
        assert!(config.template_config_file.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_missing_keys() {
        let config: BridgeConfig = toml::from_str(
            r#"
            embulk_binary = "/opt/embulk/bin/embulk"
            compression_factor = 4.5
            "#,
        )
        .expect("parse should succeed");

        assert_eq!(config.embulk_binary, "/opt/embulk/bin/embulk");
        assert_eq!(config.compression_factor, 4.5);
        assert_eq!(config.poll_interval_ms, 200);
        assert!(config.guess_config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bridge.toml");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, "scratch_dir = \"/var/tmp/embridge\"").expect("write");
        writeln!(file, "guess_config = false").expect("write");

        let config = BridgeConfig::load(&path).expect("load should succeed");
        assert_eq!(config.scratch_dir, PathBuf::from("/var/tmp/embridge"));
        assert!(!config.guess_config);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = BridgeConfig::load(Path::new("/nonexistent/bridge.toml"))
            .expect_err("load should fail");
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_or_default_without_path() {
        let config = BridgeConfig::load_or_default(None).expect("defaults");
        assert_eq!(config.database, PathBuf::from("embridge.db"));
    }
}
