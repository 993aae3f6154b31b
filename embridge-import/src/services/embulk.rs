//! Thin wrapper around the embulk command line tool
//!
//! Captures subprocess output without interpreting it. Classification of
//! stdout, stderr and the run log happens in the callers, keeping this
//! layer easy to swap for a fixture binary in tests.

use std::path::Path;
use std::process::ExitStatus;
use tokio::process::Command;
use tracing::debug;

/// Output of a finished tool invocation.
#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl From<std::process::Output> for CapturedOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Invokes embulk subcommands.
#[derive(Debug, Clone)]
pub struct EmbulkCli {
    binary: String,
}

impl EmbulkCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run `embulk guess`, rewriting the config file in place with the
    /// completed input section. Debug logging is requested so transfer
    /// sizes appear in the captured output.
    pub async fn guess(&self, config_path: &Path) -> std::io::Result<CapturedOutput> {
        debug!(
            binary = %self.binary,
            config = %config_path.display(),
            "running embulk guess"
        );
        let output = Command::new(&self.binary)
            .arg("guess")
            .arg(config_path)
            .arg("-o")
            .arg(config_path)
            .arg("-l")
            .arg("debug")
            .output()
            .await?;
        Ok(output.into())
    }

    /// Run `embulk run`, directing the tool's log to the given file.
    pub async fn run(&self, config_path: &Path, log_path: &Path) -> std::io::Result<CapturedOutput> {
        debug!(
            binary = %self.binary,
            config = %config_path.display(),
            log = %log_path.display(),
            "running embulk run"
        );
        let output = Command::new(&self.binary)
            .arg("run")
            .arg(config_path)
            .arg("--log")
            .arg(log_path)
            .output()
            .await?;
        Ok(output.into())
    }

    /// Probe the installed tool version.
    pub async fn version(&self) -> std::io::Result<String> {
        let output = Command::new(&self.binary).arg("--version").output().await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
