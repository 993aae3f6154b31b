//! embridge-import - Main entry point
//!
//! Command line front end for the import bridge: loads the configuration,
//! opens the destination database, then drives one import run against the
//! named destination node.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use embridge_common::config::BridgeConfig;
use embridge_common::events::{BridgeEvent, EventBus};
use embridge_common::store::{init_database, DataDestination, SqliteDataNode};
use embridge_import::services::EmbulkCli;
use embridge_import::{ImportOrchestrator, ImportParameters, ImportSettings};

/// Command-line arguments for embridge-import
#[derive(Parser, Debug)]
#[command(name = "embridge-import")]
#[command(about = "Bulk data import bridge driving embulk into SQLite")]
#[command(version)]
struct Args {
    /// Path to the bridge configuration file
    #[arg(short, long, env = "EMBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Destination database path (overrides the configuration file)
    #[arg(long, env = "EMBRIDGE_DATABASE")]
    database: Option<PathBuf>,

    /// Embulk binary to invoke (overrides the configuration file)
    #[arg(long, env = "EMBRIDGE_EMBULK_BINARY")]
    embulk_binary: Option<String>,

    /// Scratch directory for config and log artifacts (overrides the configuration file)
    #[arg(long, env = "EMBRIDGE_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Destination node name
    #[arg(short, long, default_value = "imported", env = "EMBRIDGE_NODE")]
    node: String,

    /// Run even when the node already carries this source
    #[arg(long)]
    force: bool,

    #[command(subcommand)]
    source: SourceCommand,
}

#[derive(Subcommand, Debug)]
enum SourceCommand {
    /// Import gzip-compressed CSV files from the local filesystem
    Local {
        /// Path prefix matching the input files
        #[arg(long)]
        path_prefix: String,
    },
    /// Import gzip-compressed CSV files from an S3 bucket
    S3 {
        /// Bucket name
        #[arg(long)]
        bucket: String,

        /// Key prefix matching the input files
        #[arg(long)]
        path_prefix: String,

        /// Endpoint host
        #[arg(long, default_value = "s3.amazonaws.com")]
        endpoint: String,

        /// Access key id
        #[arg(long, env = "AWS_ACCESS_KEY_ID")]
        access_key_id: String,

        /// Secret access key
        #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
        secret_access_key: String,
    },
}

impl From<SourceCommand> for ImportParameters {
    fn from(source: SourceCommand) -> Self {
        match source {
            SourceCommand::Local { path_prefix } => ImportParameters::Local { path_prefix },
            SourceCommand::S3 {
                bucket,
                path_prefix,
                endpoint,
                access_key_id,
                secret_access_key,
            } => ImportParameters::S3 {
                bucket,
                path_prefix,
                endpoint,
                access_key_id,
                secret_access_key,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "embridge_import=debug,embridge_common=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = BridgeConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(binary) = args.embulk_binary {
        config.embulk_binary = binary;
    }
    if let Some(scratch) = args.scratch_dir {
        config.scratch_dir = scratch;
    }
    let settings = ImportSettings::from_config(&config)?;
    let db_path = args.database.unwrap_or_else(|| config.database.clone());

    info!("Starting embridge import bridge");
    info!("Destination database: {}", db_path.display());

    // The tool version is worth a line in every run's log
    match EmbulkCli::new(settings.embulk_binary.clone()).version().await {
        Ok(version) => info!("Found embulk: {}", version),
        Err(e) => warn!("Could not probe {}: {}", settings.embulk_binary, e),
    }

    let pool = init_database(&db_path)
        .await
        .context("Failed to open the destination database")?;
    let node = SqliteDataNode::open(pool, db_path, &args.node)
        .await
        .context("Failed to open the destination node")?;

    let event_bus = EventBus::new(config.event_capacity);
    spawn_progress_printer(event_bus.subscribe());

    let params = ImportParameters::from(args.source);
    let mut orchestrator = ImportOrchestrator::new(node, settings, event_bus);

    if !args.force && !orchestrator.needs_run(&params) {
        info!(
            source = %params.source_marker(),
            "node already carries this source, nothing to do (use --force to rerun)"
        );
        return Ok(());
    }

    orchestrator
        .run(&params)
        .await
        .context("Import run failed")?;

    let rows = orchestrator.destination().read_row_count().await?;
    info!(
        rows,
        dataset = %orchestrator.destination().read_dataset(),
        "destination ready"
    );

    Ok(())
}

/// Surface progress samples in the bridge's own log while a run is active.
fn spawn_progress_printer(mut rx: broadcast::Receiver<BridgeEvent>) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(BridgeEvent::ProgressUpdated {
                    percent,
                    processed_bytes,
                    ..
                }) => {
                    info!("import progress: {:.1}% ({} bytes read)", percent, processed_bytes);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "progress printer lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
