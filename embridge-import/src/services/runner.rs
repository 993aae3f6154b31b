//! External tool execution and failure classification
//!
//! Runs the tool to completion and decides whether the run can be
//! trusted. The tool does not use exit codes reliably, so classification
//! reads its output instead: an error marker on stdout, a usage banner on
//! stderr, then warnings in the run log, checked in that order. Exit
//! status is logged but never classified.

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::{ImportJob, RunOutcome};

use super::embulk::EmbulkCli;
use super::log_classifier;

/// Ways a run fails, in the order they are checked.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The tool binary could not be launched.
    #[error("failed to launch {binary}: {source}")]
    LaunchFailed {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool printed its error marker on stdout.
    #[error("embulk did not run '{config}' properly, investigate the dumped output")]
    ToolReportedError { config: String },

    /// The tool rejected its arguments with a usage banner on stderr.
    #[error("embulk rejected '{config}' as invalid, investigate the configuration")]
    UsageRejected { config: String },

    /// The run log carries warnings, so the imported data cannot be trusted.
    #[error("{warning_count} warning(s) in the run log, specify the schema explicitly")]
    WarningsDetected { warning_count: usize },
}

impl RunnerError {
    /// Outcome reported on the failure event.
    pub fn outcome(&self) -> RunOutcome {
        match self {
            RunnerError::LaunchFailed { .. } => RunOutcome::FailedToStart,
            RunnerError::ToolReportedError { .. } => RunOutcome::FailedDuringRun,
            RunnerError::UsageRejected { .. } | RunnerError::WarningsDetected { .. } => {
                RunOutcome::FailedValidation
            }
        }
    }
}

impl From<RunnerError> for embridge_common::Error {
    fn from(e: RunnerError) -> Self {
        match &e {
            RunnerError::LaunchFailed { .. } | RunnerError::ToolReportedError { .. } => {
                embridge_common::Error::ExternalTool(e.to_string())
            }
            RunnerError::UsageRejected { .. } => {
                embridge_common::Error::InvalidConfig(e.to_string())
            }
            RunnerError::WarningsDetected { .. } => {
                embridge_common::Error::InferenceQuality(e.to_string())
            }
        }
    }
}

/// Executes one import run.
pub struct ProcessRunner {
    cli: EmbulkCli,
}

impl ProcessRunner {
    pub fn new(cli: EmbulkCli) -> Self {
        Self { cli }
    }

    /// Run the tool and classify the result. The completion token is held
    /// as a drop guard for the whole execution, so the progress monitor
    /// gets released on every exit path out of here, panics included.
    pub async fn execute(
        &self,
        job: &ImportJob,
        completion: CancellationToken,
    ) -> Result<(), RunnerError> {
        let _completion_guard = completion.drop_guard();

        info!(
            run_id = %job.run_id,
            config = %job.config_path.display(),
            "importing through embulk"
        );

        let captured = self
            .cli
            .run(&job.config_path, &job.log_path)
            .await
            .map_err(|source| RunnerError::LaunchFailed {
                binary: self.cli.binary().to_string(),
                source,
            })?;

        if log_classifier::stdout_reports_error(&captured.stdout) {
            warn!(run_id = %job.run_id, "embulk reported an error, dumping its stderr");
            dump_tool_output(&captured.stderr);
            return Err(RunnerError::ToolReportedError {
                config: job.config_path.display().to_string(),
            });
        }

        if log_classifier::stderr_reports_usage_error(&captured.stderr) {
            warn!(run_id = %job.run_id, "embulk rejected its arguments, dumping its stderr");
            dump_tool_output(&captured.stderr);
            return Err(RunnerError::UsageRejected {
                config: job.config_path.display().to_string(),
            });
        }

        let run_log = match tokio::fs::read_to_string(&job.log_path).await {
            Ok(content) => content,
            // The tool may have died before opening its log.
            Err(_) => String::new(),
        };
        let warnings = log_classifier::warning_lines(&run_log);
        if !warnings.is_empty() {
            warn!(
                run_id = %job.run_id,
                count = warnings.len(),
                "embulk warned while importing"
            );
            for line in &warnings {
                warn!("{}", line);
            }
            return Err(RunnerError::WarningsDetected {
                warning_count: warnings.len(),
            });
        }

        if !captured.status.success() {
            debug!(
                run_id = %job.run_id,
                status = ?captured.status,
                "embulk exited nonzero without a recognized failure signature"
            );
        }

        info!(run_id = %job.run_id, "embulk finished importing");
        Ok(())
    }
}

/// Dump captured tool output line by line so it survives in the bridge log.
fn dump_tool_output(output: &str) {
    if output.is_empty() {
        warn!("no tool output captured");
        return;
    }
    for (idx, line) in output.lines().enumerate() {
        warn!("{}: {}", idx, line);
    }
}
