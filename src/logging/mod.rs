//! Structured logging setup and NDJSON output records.

mod format;

pub use format::{FeatureRecord, StructuredLogger};
