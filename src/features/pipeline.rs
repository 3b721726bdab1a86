//! Feature engine: event → store append → windowed slices → features → store.

use super::{compute_features, FeatureMap, FeatureVector, WindowSlices};
use crate::config::{EngineConfig, FeaturesConfig};
use crate::error::EngineError;
use crate::events::TransactionEvent;
use crate::storage::{EventStore, StoreStats};
use crate::time::Clock;
use std::sync::Arc;
use tracing::{debug, error, info, trace};

/// What a successful [`FeatureEngine::try_process`] did.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub entity_id: String,
    /// Features written back for this entity
    pub features: FeatureMap,
    /// Entities removed, when this call triggered a reap sweep
    pub reaped: Option<usize>,
}

pub struct FeatureEngine {
    config: FeaturesConfig,
    store: Arc<EventStore>,
}

impl FeatureEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_store(
            config.features.clone(),
            Arc::new(EventStore::new(config.store.clone())),
        )
    }

    /// Engine over an existing (possibly shared) store.
    pub fn with_store(config: FeaturesConfig, store: Arc<EventStore>) -> Self {
        Self { config, store }
    }

    /// Engine and store driven by `clock`.
    pub fn with_clock(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_store(
            config.features.clone(),
            Arc::new(EventStore::with_clock(config.store.clone(), clock)),
        )
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    /// Record `event` and refresh its entity's features.
    ///
    /// The append, the window reads and the write-back all happen under the
    /// entity's lock. If the computation fails the event stays stored; the
    /// next successful call for the entity brings the features back in line.
    pub fn try_process(&self, event: TransactionEvent) -> Result<ProcessOutcome, EngineError> {
        let event = event.with_resolved_epoch(self.store.clock().as_ref());
        let entity_id = event.entity_id.clone();
        debug!(
            entity_id = %entity_id,
            transaction_id = %event.transaction_id,
            amount = event.amount,
            merchant = event.merchant().unwrap_or("unknown"),
            "processing event"
        );

        let features = self.store.with_entity(&entity_id, |entry| {
            if let Some(evicted) = entry.append(event) {
                trace!(
                    entity_id = %entity_id,
                    evicted = %evicted.transaction_id,
                    "history full; dropped oldest event"
                );
            }
            let slices = WindowSlices {
                last_hour: entry.windowed(self.config.velocity_window_minutes),
                last_day: entry.windowed(self.config.amount_window_minutes),
                last_week: entry.windowed(self.config.pattern_window_minutes),
            };
            let features = compute_features(&slices)?;
            entry.update_features(&features);
            Ok::<_, EngineError>(features)
        })?;

        let current = FeatureVector::from_map(&features);
        debug!(
            entity_id = %entity_id,
            velocity = current.transaction_velocity_1h,
            zscore = current.amount_zscore,
            location_anomaly = current.location_anomaly,
            "updated features"
        );

        let reaped = self.store.should_reap().then(|| {
            let cleared = self.store.reap();
            if cleared > 0 {
                info!(cleared, "cleared stale entities");
            }
            cleared
        });

        Ok(ProcessOutcome {
            entity_id,
            features,
            reaped,
        })
    }

    /// [`try_process`](Self::try_process), reporting only success.
    pub fn process(&self, event: TransactionEvent) -> bool {
        let entity_id = event.entity_id.clone();
        match self.try_process(event) {
            Ok(_) => true,
            Err(e) => {
                error!(entity_id = %entity_id, error = %e, "failed to process event");
                false
            }
        }
    }

    /// Latest features for `entity_id`, with defaults for anything missing.
    pub fn get_features(&self, entity_id: &str) -> FeatureVector {
        FeatureVector::from_map(&self.store.get_features(entity_id))
    }

    pub fn store_stats(&self) -> StoreStats {
        self.store.stats()
    }
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
