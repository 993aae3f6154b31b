//! Data models for the import bridge

pub mod job;
pub mod params;
pub mod state;

pub use job::{ImportJob, RunOutcome};
pub use params::ImportParameters;
pub use state::{ImportState, StateTransition};
