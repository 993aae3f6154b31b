//! Import run orchestration
//!
//! Drives one import run end to end: render the config, infer the schema,
//! recreate the write dataset, run the tool with the progress monitor
//! alongside, then promote the fresh dataset so readers switch over. The
//! destination's metadata is only touched on success, a failed run leaves
//! readers on the previous dataset.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use chrono::Utc;
use embridge_common::events::{BridgeEvent, EventBus};
use embridge_common::store::DataDestination;
use embridge_common::{Error, Result};

use crate::models::{ImportJob, ImportParameters, ImportState, RunOutcome};
use crate::settings::ImportSettings;

use super::embulk::EmbulkCli;
use super::progress::ProgressMonitor;
use super::runner::ProcessRunner;
use super::schema_inference::SchemaInferencer;
use super::template::ConfigMaterializer;

/// Runs imports against one destination node.
pub struct ImportOrchestrator<D: DataDestination> {
    destination: D,
    settings: ImportSettings,
    event_bus: EventBus,
}

impl<D: DataDestination> ImportOrchestrator<D> {
    pub fn new(destination: D, settings: ImportSettings, event_bus: EventBus) -> Self {
        Self {
            destination,
            settings,
            event_bus,
        }
    }

    pub fn destination(&self) -> &D {
        &self.destination
    }

    /// False when the node already carries this source, a repeat import
    /// would only rebuild the same dataset.
    pub fn needs_run(&self, params: &ImportParameters) -> bool {
        match self.destination.last_source_marker() {
            Some(marker) => marker != params.source_marker(),
            None => true,
        }
    }

    /// Drive one import run to completion.
    pub async fn run(&mut self, params: &ImportParameters) -> Result<()> {
        let mut job = ImportJob::new(&self.settings.scratch_dir);

        info!(
            run_id = %job.run_id,
            node = self.destination.name(),
            source = %params.source_marker(),
            "starting import run"
        );
        self.event_bus.emit_lossy(BridgeEvent::ImportStarted {
            run_id: job.run_id,
            source_marker: params.source_marker(),
            timestamp: job.started_at,
        });

        let result = self.pipeline(&mut job, params).await;

        // Scratch artifacts never outlive the run. Any spawned workers
        // were joined inside the pipeline before it returned.
        job.delete_artifacts();

        match result {
            Ok(()) => {
                self.transition(&mut job, ImportState::Done);
                info!(
                    run_id = %job.run_id,
                    node = self.destination.name(),
                    dataset = %self.destination.read_dataset(),
                    seconds = job.duration_seconds(),
                    "import run finished, readers see the fresh dataset"
                );
                self.event_bus.emit_lossy(BridgeEvent::ImportCompleted {
                    run_id: job.run_id,
                    source_marker: params.source_marker(),
                    duration_seconds: job.duration_seconds(),
                    timestamp: Utc::now(),
                });
                Ok(())
            }
            Err((outcome, e)) => {
                self.transition(&mut job, ImportState::Failed);
                error!(
                    run_id = %job.run_id,
                    node = self.destination.name(),
                    outcome = %outcome,
                    "import run failed: {}",
                    e
                );
                self.event_bus.emit_lossy(BridgeEvent::ImportFailed {
                    run_id: job.run_id,
                    outcome: outcome.as_str().to_string(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    async fn pipeline(
        &mut self,
        job: &mut ImportJob,
        params: &ImportParameters,
    ) -> std::result::Result<(), (RunOutcome, Error)> {
        self.prepare(job, params)
            .await
            .map_err(|e| (RunOutcome::from_error(&e), e))?;
        self.run_tool(job).await?;
        self.finalize(job, params)
            .await
            .map_err(|e| (RunOutcome::from_error(&e), e))?;
        Ok(())
    }

    /// Render the config, infer and persist the schema, then recreate the
    /// write dataset to receive rows.
    async fn prepare(&mut self, job: &mut ImportJob, params: &ImportParameters) -> Result<()> {
        self.transition(job, ImportState::Preparing);

        if !self.destination.use_double_buffering() {
            info!(
                node = self.destination.name(),
                "enabling double buffering so readers keep the previous dataset during the run"
            );
            self.destination.set_double_buffering(true);
            self.destination.persist().await?;
        }

        let materializer = ConfigMaterializer::new(
            self.settings.scratch_dir.clone(),
            self.settings.template_config_file.clone(),
        );
        let write_table = self.destination.write_dataset();
        job.template = materializer.materialize(
            job,
            params,
            self.destination.storage_location(),
            &write_table,
        )?;
        info!(
            run_id = %job.run_id,
            template = %job.template,
            config = %job.config_path.display(),
            "generated an embulk configuration"
        );

        let inferencer = SchemaInferencer::new(
            EmbulkCli::new(self.settings.embulk_binary.clone()),
            self.settings.guess_config,
        );
        let report = inferencer.infer(&job.config_path).await?;
        job.expected_bytes = report.expected_bytes;
        self.event_bus.emit_lossy(BridgeEvent::SchemaInferred {
            run_id: job.run_id,
            field_count: report.schema.len(),
            expected_bytes: report.expected_bytes,
            timestamp: Utc::now(),
        });

        self.destination.set_schema(report.schema);
        self.destination.persist().await?;
        self.destination.recreate_write_dataset().await?;

        Ok(())
    }

    /// Run the tool with the progress monitor alongside. Both workers are
    /// joined before this returns, whatever the result.
    async fn run_tool(&self, job: &mut ImportJob) -> std::result::Result<(), (RunOutcome, Error)> {
        self.transition(job, ImportState::Running);

        let completion = CancellationToken::new();
        let runner = ProcessRunner::new(EmbulkCli::new(self.settings.embulk_binary.clone()));
        let monitor = ProgressMonitor::new(
            self.event_bus.clone(),
            self.settings.poll_interval,
            self.settings.compression_factor,
        );

        let runner_task = {
            let job = job.clone();
            let token = completion.clone();
            tokio::spawn(async move { runner.execute(&job, token).await })
        };
        let monitor_task = {
            let job = job.clone();
            tokio::spawn(async move { monitor.watch(&job, completion).await })
        };

        let run_result = runner_task.await;
        let monitor_result = monitor_task.await;

        let run_result = match run_result {
            Ok(result) => result,
            Err(e) => {
                return Err((
                    RunOutcome::FailedDuringRun,
                    Error::Internal(format!("import worker panicked: {}", e)),
                ));
            }
        };
        if let Err(e) = monitor_result {
            return Err((
                RunOutcome::FailedDuringRun,
                Error::Internal(format!("progress monitor panicked: {}", e)),
            ));
        }
        run_result.map_err(|e| (e.outcome(), e.into()))
    }

    /// Promote the freshly written dataset and record the run on the node.
    async fn finalize(&mut self, job: &mut ImportJob, params: &ImportParameters) -> Result<()> {
        self.transition(job, ImportState::Finalizing);

        self.destination.promote_write_dataset();
        self.destination.set_updated_at(Utc::now());
        self.destination.set_last_source_marker(params.source_marker());
        self.destination.persist().await?;

        Ok(())
    }

    fn transition(&self, job: &mut ImportJob, state: ImportState) {
        let t = job.transition_to(state);
        debug!(
            run_id = %job.run_id,
            from = ?t.old_state,
            to = ?t.new_state,
            "state transition"
        );
    }
}
