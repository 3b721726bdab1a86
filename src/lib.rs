//! Rolling per-entity transaction features for downstream fraud scoring.
//!
//! Modular structure:
//! - [`events`] — Post-validation transaction events
//! - [`time`] — Clock abstraction, timestamp parsing, calendar fields
//! - [`storage`] — Bounded, concurrent per-entity event store with reaping
//! - [`features`] — Pure feature calculators and the engine that drives them
//! - [`config`] — Store, window and logging configuration
//! - [`logging`] — Structured JSON logging

pub mod config;
pub mod error;
pub mod events;
pub mod features;
pub mod logging;
pub mod storage;
pub mod time;

pub use config::EngineConfig;
pub use error::{ConfigError, EngineError};
pub use events::TransactionEvent;
pub use features::{FeatureEngine, FeatureName, FeatureVector};
pub use logging::StructuredLogger;
pub use storage::{EventStore, StoreStats};
