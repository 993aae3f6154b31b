//! Pipeline services for the import bridge

pub mod embulk;
pub mod log_classifier;
pub mod orchestrator;
pub mod progress;
pub mod runner;
pub mod schema_inference;
pub mod template;

pub use embulk::EmbulkCli;
pub use orchestrator::ImportOrchestrator;
pub use progress::ProgressMonitor;
pub use runner::ProcessRunner;
pub use schema_inference::SchemaInferencer;
pub use template::ConfigMaterializer;
