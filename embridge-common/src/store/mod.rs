//! Destination store for imported datasets
//!
//! The bridge fills a destination "data node": a named dataset plus the
//! metadata the host graph reads (schema, last update time, double-buffering
//! state, last imported source marker). The external tool inserts rows
//! directly into the node's write dataset; the bridge manages metadata and
//! buffer promotion around it.

mod sqlite;

pub use sqlite::{init_database, SqliteDataNode};

use crate::schema::Schema;
use crate::Result;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Destination store seam used by the import pipeline
///
/// Metadata setters mutate in memory only; `persist` writes the node's
/// metadata back in one shot. Dataset operations hit storage immediately.
#[allow(async_fn_in_trait)]
pub trait DataDestination {
    /// Node name as known to the host graph
    fn name(&self) -> &str;

    /// Storage location the external tool writes into (database file path)
    fn storage_location(&self) -> &Path;

    /// Dataset (table) the next import run writes into
    fn write_dataset(&self) -> String;

    /// Dataset (table) readers currently see
    fn read_dataset(&self) -> String;

    fn use_double_buffering(&self) -> bool;

    fn set_double_buffering(&mut self, enabled: bool);

    fn schema(&self) -> Option<&Schema>;

    fn set_schema(&mut self, schema: Schema);

    fn updated_at(&self) -> Option<DateTime<Utc>>;

    fn set_updated_at(&mut self, at: DateTime<Utc>);

    /// Source marker of the last fully successful import, if any
    fn last_source_marker(&self) -> Option<&str>;

    fn set_last_source_marker(&mut self, marker: String);

    /// Drop and recreate the write dataset from the current schema
    async fn recreate_write_dataset(&self) -> Result<()>;

    /// Swap read/write datasets so readers see the freshly imported rows.
    /// No-op when the node is not double buffered.
    fn promote_write_dataset(&mut self);

    /// Write the node's metadata back to storage
    async fn persist(&self) -> Result<()>;
}
