//! Event types for the import bridge
//!
//! Provides shared event definitions and the EventBus used to report
//! import lifecycle and progress to whatever is hosting the bridge.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Import bridge event types
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to a host framework. All events carry the run they belong to plus a
/// timestamp so consumers can order them without trusting arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeEvent {
    /// An import run has started
    ///
    /// Triggers:
    /// - Host: mark the destination node as busy
    /// - UI: show import progress indicator
    ImportStarted {
        /// Import run UUID
        run_id: Uuid,
        /// Source marker being imported (path prefix or bucket/prefix)
        source_marker: String,
        /// When the run started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Schema inference finished and the schema was persisted
    SchemaInferred {
        /// Import run UUID
        run_id: Uuid,
        /// Number of fields in the inferred schema
        field_count: usize,
        /// Expected compressed input length advertised by the tool (bytes)
        expected_bytes: u64,
        /// When inference completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Progress estimate update
    ///
    /// Emitted on every monitor tick once the run log exists, even when the
    /// processed count has not moved. Never reports 100.0; completion is
    /// signalled by ImportCompleted.
    ProgressUpdated {
        /// Import run UUID
        run_id: Uuid,
        /// Estimated completion percentage (0.0 to 99.9)
        percent: f64,
        /// Cumulative decompressed bytes the tool has reported so far
        processed_bytes: u64,
        /// When the sample was taken
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Liveness signal
    ///
    /// Emitted alongside every progress sample so the host can distinguish
    /// "no progress" from "bridge died".
    Heartbeat {
        /// Import run UUID
        run_id: Uuid,
        /// When the heartbeat was emitted
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Import run finished successfully
    ///
    /// Triggers:
    /// - Host: destination buffer has been promoted, readers see new data
    ImportCompleted {
        /// Import run UUID
        run_id: Uuid,
        /// Source marker that was imported
        source_marker: String,
        /// Run duration in seconds
        duration_seconds: u64,
        /// When the run completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Import run failed
    ///
    /// Triggers:
    /// - Host: destination metadata untouched, retry policy applies
    ImportFailed {
        /// Import run UUID
        run_id: Uuid,
        /// Failure classification (matches the error taxonomy)
        outcome: String,
        /// Error message details
        error_message: String,
        /// When the run failed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl BridgeEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            BridgeEvent::ImportStarted { .. } => "ImportStarted",
            BridgeEvent::SchemaInferred { .. } => "SchemaInferred",
            BridgeEvent::ProgressUpdated { .. } => "ProgressUpdated",
            BridgeEvent::Heartbeat { .. } => "Heartbeat",
            BridgeEvent::ImportCompleted { .. } => "ImportCompleted",
            BridgeEvent::ImportFailed { .. } => "ImportFailed",
        }
    }

    /// Run this event belongs to
    pub fn run_id(&self) -> Uuid {
        match self {
            BridgeEvent::ImportStarted { run_id, .. }
            | BridgeEvent::SchemaInferred { run_id, .. }
            | BridgeEvent::ProgressUpdated { run_id, .. }
            | BridgeEvent::Heartbeat { run_id, .. }
            | BridgeEvent::ImportCompleted { run_id, .. }
            | BridgeEvent::ImportFailed { run_id, .. } => *run_id,
        }
    }
}

/// Central event distribution bus for import bridge events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block the monitor)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use embridge_common::events::{BridgeEvent, EventBus};
/// use std::sync::Arc;
/// use uuid::Uuid;
///
/// let event_bus = Arc::new(EventBus::new(100));
///
/// // Subscribe to events
/// let mut rx = event_bus.subscribe();
///
/// // Emit an event
/// event_bus.emit_lossy(BridgeEvent::Heartbeat {
///     run_id: Uuid::new_v4(),
///     timestamp: chrono::Utc::now(),
/// });
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BridgeEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    ///
    /// Capacity is the number of events buffered before slow subscribers
    /// start observing lag errors.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: BridgeEvent,
    ) -> Result<usize, broadcast::error::SendError<BridgeEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Used for progress samples and heartbeats where it's acceptable if
    /// no component is currently listening.
    pub fn emit_lossy(&self, event: BridgeEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
