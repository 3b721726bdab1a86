//! Error types for the feature engine.

use crate::features::FeatureName;
use thiserror::Error;

/// Faults raised while recomputing an entity's features.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("feature {feature} evaluated to a non-finite value ({value})")]
    NonFiniteFeature { feature: FeatureName, value: f64 },
}

/// Failures reading an [`EngineConfig`](crate::config::EngineConfig) file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
