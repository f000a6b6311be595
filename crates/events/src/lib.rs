//! # Vegas Events
//!
//! This crate defines the event structures the engine broadcasts to notifier
//! frontends (chat bots, dashboards, log shippers).
//!
//! As a Layer 0 crate, it depends only on `core-types` and provides the definitive
//! language for everything the engine reports while it runs.

// Declare the modules that make up this crate.
pub mod error;
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use messages::{BarRejected, EngineEvent, LogLevel, LogMessage, ProtectiveOrder, ProtectiveOrderKind};
