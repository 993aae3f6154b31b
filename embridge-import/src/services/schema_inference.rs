//! Schema inference through the tool's guess pass
//!
//! The rendered config starts with no parser section. A guess pass asks
//! the tool to sample the input and rewrite the config with the columns
//! it found; the completed config is then the source of truth for the
//! destination schema. Operators who distrust guessing disable it and
//! supply a template that already carries its columns.

use std::path::Path;
use tracing::{debug, info, warn};

use embridge_common::schema::{FieldDef, FieldType, Schema};
use embridge_common::{Error, Result};

use super::embulk::EmbulkCli;
use super::log_classifier;

/// What inference learned about the input.
#[derive(Debug)]
pub struct InferenceReport {
    pub schema: Schema,
    /// Compressed input size advertised during the guess pass, floored at 1
    /// so progress arithmetic never divides by zero.
    pub expected_bytes: u64,
}

/// Completes a rendered config and extracts the destination schema.
pub struct SchemaInferencer {
    cli: EmbulkCli,
    guess_enabled: bool,
}

impl SchemaInferencer {
    pub fn new(cli: EmbulkCli, guess_enabled: bool) -> Self {
        Self { cli, guess_enabled }
    }

    pub async fn infer(&self, config_path: &Path) -> Result<InferenceReport> {
        let expected_bytes = if self.guess_enabled {
            self.run_guess(config_path).await?
        } else {
            debug!("guess pass disabled, config must already carry its columns");
            1
        };

        let schema = read_schema(config_path).await?;
        info!(
            fields = schema.len(),
            expected_bytes, "inferred destination schema"
        );
        Ok(InferenceReport {
            schema,
            expected_bytes,
        })
    }

    async fn run_guess(&self, config_path: &Path) -> Result<u64> {
        let captured = self.cli.guess(config_path).await.map_err(|e| {
            Error::ExternalTool(format!(
                "failed to launch {} for guess: {}",
                self.cli.binary(),
                e
            ))
        })?;

        if !captured.status.success() {
            warn!(
                status = ?captured.status,
                "embulk guess exited nonzero, continuing with the config as written"
            );
        }

        let expected = log_classifier::content_length(&captured.stdout)
            .unwrap_or(1)
            .max(1);
        debug!(expected_bytes = expected, "guess pass finished");
        Ok(expected)
    }
}

async fn read_schema(config_path: &Path) -> Result<Schema> {
    let content = tokio::fs::read_to_string(config_path).await?;
    let config: serde_yaml::Value = serde_yaml::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "config {} is not valid yaml: {}",
            config_path.display(),
            e
        ))
    })?;

    let columns = config
        .get("in")
        .and_then(|v| v.get("parser"))
        .and_then(|v| v.get("columns"))
        .and_then(|v| v.as_sequence())
        .ok_or_else(|| {
            Error::Config(format!(
                "config {} carries no in.parser.columns section, inference failed",
                config_path.display()
            ))
        })?;

    let mut fields = Vec::with_capacity(columns.len());
    for column in columns {
        let name = column
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Config("a parser column is missing its name".to_string()))?;
        let type_name = column
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Config(format!("parser column '{}' is missing its type", name)))?;
        fields.push(FieldDef::new(name, FieldType::from_embulk(type_name)));
    }

    Schema::new(fields)
}
