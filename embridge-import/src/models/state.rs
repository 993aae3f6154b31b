//! Import run state machine
//!
//! A run moves through IDLE, PREPARING, RUNNING, FINALIZING and ends in
//! DONE or FAILED. Transitions are recorded so the log tells the full
//! story of a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State of an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImportState {
    /// No work started yet.
    Idle,
    /// Rendering the config, inferring the schema, recreating the write dataset.
    Preparing,
    /// External tool running with the progress monitor alongside.
    Running,
    /// Promoting the write dataset and persisting node metadata.
    Finalizing,
    /// Run finished and the destination was promoted.
    Done,
    /// Run ended with an error.
    Failed,
}

impl ImportState {
    /// Check if this state is terminal (run finished).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportState::Done | ImportState::Failed)
    }
}

/// A recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_state: ImportState,
    pub new_state: ImportState,
    pub transitioned_at: DateTime<Utc>,
}
