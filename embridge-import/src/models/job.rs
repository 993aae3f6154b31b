//! Per-run job identity and scratch artifacts

use chrono::{DateTime, Utc};
use embridge_common::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

use super::{ImportState, StateTransition};

/// One import run.
///
/// Owns the run id and the two scratch artifacts: the rendered config file
/// handed to the external tool, and the log file the tool writes while it
/// runs. Both live until the runner and the progress monitor have stopped.
#[derive(Debug, Clone)]
pub struct ImportJob {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// Current state.
    pub state: ImportState,
    /// Rendered config artifact handed to the tool.
    pub config_path: PathBuf,
    /// Log file the tool writes and the monitor scrapes.
    pub log_path: PathBuf,
    /// Which template the config was rendered from (for logging).
    pub template: String,
    /// Compressed input size advertised by the guess pass, always >= 1.
    pub expected_bytes: u64,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal state.
    pub ended_at: Option<DateTime<Utc>>,
}

impl ImportJob {
    /// Create a new idle job with artifact paths under the scratch directory.
    pub fn new(scratch_dir: &Path) -> Self {
        let run_id = Uuid::new_v4();
        Self {
            run_id,
            state: ImportState::Idle,
            config_path: scratch_dir.join(format!("{}_import_config.yml", run_id)),
            log_path: scratch_dir.join(format!("{}_import.log", run_id)),
            template: String::new(),
            expected_bytes: 1,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Move to a new state, recording the transition. Terminal states also
    /// stamp the end time.
    pub fn transition_to(&mut self, new_state: ImportState) -> StateTransition {
        let transition = StateTransition {
            run_id: self.run_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }

        transition
    }

    /// Whole seconds between start and end (or now while still running).
    pub fn duration_seconds(&self) -> u64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_seconds().max(0) as u64
    }

    /// Remove the run's scratch artifacts. Callers must not invoke this
    /// while the tool or the monitor could still touch the files. Missing
    /// files are fine.
    pub fn delete_artifacts(&self) {
        for path in [&self.config_path, &self.log_path] {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        run_id = %self.run_id,
                        path = %path.display(),
                        "failed to delete run artifact: {}",
                        e
                    );
                }
            }
        }
    }
}

/// How a run ended, reported on failure events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Tool ran cleanly and the destination was promoted.
    Succeeded,
    /// Tool could not be launched at all.
    FailedToStart,
    /// Tool launched but reported an error while importing.
    FailedDuringRun,
    /// Config was rejected or the inferred schema is not trustworthy.
    FailedValidation,
}

impl RunOutcome {
    /// Coarse classification for errors raised outside the runner (prepare
    /// and finalize phases). The runner reports its own outcome, which is
    /// the only place FailedToStart can originate.
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::Config(_) | Error::InvalidConfig(_) | Error::InferenceQuality(_) => {
                RunOutcome::FailedValidation
            }
            _ => RunOutcome::FailedDuringRun,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Succeeded => "Succeeded",
            RunOutcome::FailedToStart => "FailedToStart",
            RunOutcome::FailedDuringRun => "FailedDuringRun",
            RunOutcome::FailedValidation => "FailedValidation",
        }
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_paths_share_run_id() {
        let job = ImportJob::new(Path::new("tmp"));
        let config = job.config_path.file_name().unwrap().to_string_lossy();
        let log = job.log_path.file_name().unwrap().to_string_lossy();
        assert!(config.starts_with(&job.run_id.to_string()));
        assert!(log.starts_with(&job.run_id.to_string()));
        assert!(config.ends_with("_import_config.yml"));
        assert!(log.ends_with("_import.log"));
    }

    #[test]
    fn test_transition_to_terminal_sets_ended_at() {
        let mut job = ImportJob::new(Path::new("tmp"));
        assert!(job.ended_at.is_none());

        let t = job.transition_to(ImportState::Preparing);
        assert_eq!(t.old_state, ImportState::Idle);
        assert_eq!(t.new_state, ImportState::Preparing);
        assert!(job.ended_at.is_none());

        job.transition_to(ImportState::Failed);
        assert_eq!(job.state, ImportState::Failed);
        assert!(job.ended_at.is_some());
    }

    #[test]
    fn test_delete_artifacts_removes_files_and_tolerates_missing() {
        let dir = TempDir::new().unwrap();
        let job = ImportJob::new(dir.path());
        std::fs::write(&job.config_path, "in: {}").unwrap();
        std::fs::write(&job.log_path, "log line").unwrap();

        job.delete_artifacts();
        assert!(!job.config_path.exists());
        assert!(!job.log_path.exists());

        // Second call finds nothing to delete and stays quiet.
        job.delete_artifacts();
    }

    #[test]
    fn test_outcome_from_error() {
        assert_eq!(
            RunOutcome::from_error(&Error::Config("bad template".to_string())),
            RunOutcome::FailedValidation
        );
        assert_eq!(
            RunOutcome::from_error(&Error::InvalidConfig("rejected".to_string())),
            RunOutcome::FailedValidation
        );
        assert_eq!(
            RunOutcome::from_error(&Error::InferenceQuality("warnings".to_string())),
            RunOutcome::FailedValidation
        );
        assert_eq!(
            RunOutcome::from_error(&Error::ExternalTool("boom".to_string())),
            RunOutcome::FailedDuringRun
        );
    }
}
