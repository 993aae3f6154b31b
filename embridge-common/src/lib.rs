//! # embridge Common Library
//!
//! Shared code for the import bridge including:
//! - Error types
//! - Event types (BridgeEvent enum) and EventBus
//! - Configuration loading
//! - Canonical schema vocabulary
//! - Destination store (data nodes)

pub mod config;
pub mod error;
pub mod events;
pub mod schema;
pub mod store;

pub use error::{Error, Result};
