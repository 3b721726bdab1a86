#![allow(dead_code)]

use std::sync::Arc;
use txn_features::config::{EngineConfig, StoreConfig};
use txn_features::time::ManualClock;
use txn_features::{EventStore, FeatureEngine, TransactionEvent};

/// 2024-01-15T10:00:00Z, a Monday.
pub const NOW: f64 = 1_705_312_800.0;
pub const MINUTE: f64 = 60.0;
pub const HOUR: f64 = 3600.0;

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(NOW))
}

pub fn engine() -> (FeatureEngine, Arc<ManualClock>) {
    engine_with(EngineConfig::default())
}

pub fn engine_with(config: EngineConfig) -> (FeatureEngine, Arc<ManualClock>) {
    let clock = clock();
    (FeatureEngine::with_clock(&config, clock.clone()), clock)
}

pub fn store_with(config: StoreConfig) -> (EventStore, Arc<ManualClock>) {
    let clock = clock();
    (EventStore::with_clock(config, clock.clone()), clock)
}

/// Event for `entity` that happened `secs_ago` before [`NOW`].
pub fn event(entity: &str, amount: f64, secs_ago: f64) -> TransactionEvent {
    TransactionEvent::new(entity, amount, NOW - secs_ago)
}

pub fn small_store_config(capacity: usize) -> StoreConfig {
    StoreConfig {
        history_capacity: capacity,
        ..StoreConfig::default()
    }
}
