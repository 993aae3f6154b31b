//! # embridge Import Pipeline
//!
//! Drives the embulk command line tool to bulk-load gzip-compressed CSV
//! files, from the local filesystem or S3, into a SQLite-backed
//! destination node. The tool does the data movement; this crate renders
//! its configuration, infers the destination schema, watches progress
//! through the tool's log, decides whether the run can be trusted, and
//! swaps the freshly written dataset in for readers once it can.
//!
//! Exposed as a library for the binary and the integration tests.

pub mod models;
pub mod services;
pub mod settings;

pub use models::{ImportJob, ImportParameters, ImportState, RunOutcome};
pub use services::ImportOrchestrator;
pub use settings::ImportSettings;
