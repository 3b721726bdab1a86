//! Concurrent in-memory event store keyed by entity id.
//!
//! Entities live in a striped map: each shard is a `RwLock<HashMap>` of
//! per-entity `Mutex`es. Lookups take a shard read lock just long enough to
//! clone the entity handle; all mutation happens under the entity lock.
//! Reaping removes entities under a brief shard write lock and marks them
//! retired so writers holding a stale handle retry against the map.

use super::history::History;
use crate::config::StoreConfig;
use crate::events::TransactionEvent;
use crate::features::FeatureMap;
use crate::time::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};

type EntityHandle = Arc<Mutex<EntityState>>;
type Shard = RwLock<HashMap<String, EntityHandle>>;

/// Everything the store keeps for one entity.
#[derive(Debug, Clone)]
pub struct EntityState {
    history: History<TransactionEvent>,
    features: FeatureMap,
    created_at: f64,
    last_updated_at: f64,
    retired: bool,
}

impl EntityState {
    fn new(capacity: usize, now: f64) -> Self {
        Self {
            history: History::with_capacity(capacity),
            features: FeatureMap::new(),
            created_at: now,
            last_updated_at: now,
            retired: false,
        }
    }

    pub fn history(&self) -> &History<TransactionEvent> {
        &self.history
    }

    pub fn features(&self) -> &FeatureMap {
        &self.features
    }

    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    pub fn last_updated_at(&self) -> f64 {
        self.last_updated_at
    }

    fn windowed(&self, cutoff: f64) -> Vec<TransactionEvent> {
        self.history
            .iter()
            .filter(|e| e.epoch() > cutoff)
            .cloned()
            .collect()
    }

    fn trim_before(&mut self, cutoff: f64) -> usize {
        self.history.pop_front_while(|e| e.epoch() < cutoff)
    }

    fn is_reapable(&self, cutoff: f64) -> bool {
        self.last_updated_at < cutoff && self.created_at < cutoff && self.history.is_empty()
    }
}

/// Locked view of a single entity, handed out by [`EventStore::with_entity`].
pub struct EntityEntry<'a> {
    state: &'a mut EntityState,
    clock: &'a dyn Clock,
}

impl EntityEntry<'_> {
    /// Push `event`, evicting (and returning) the oldest entry when full.
    pub fn append(&mut self, event: TransactionEvent) -> Option<TransactionEvent> {
        let evicted = self.state.history.push(event);
        self.state.last_updated_at = self.clock.now();
        evicted
    }

    /// Events newer than `now - minutes * 60`, oldest first.
    pub fn windowed(&self, minutes: u64) -> Vec<TransactionEvent> {
        self.state.windowed(window_start(self.clock.now(), minutes))
    }

    /// Merge `features` into the stored vector key by key.
    pub fn update_features(&mut self, features: &FeatureMap) {
        self.state
            .features
            .extend(features.iter().map(|(k, v)| (*k, *v)));
        self.state.last_updated_at = self.clock.now();
    }

    pub fn state(&self) -> &EntityState {
        &*self.state
    }
}

/// Point-in-time store counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub entity_count: usize,
    pub total_buffered_events: usize,
    pub window_minutes: u64,
    pub last_reap_at: f64,
}

pub struct EventStore {
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    hasher: RandomState,
    shards: Vec<Shard>,
    last_reap_at: AtomicU64,
}

impl EventStore {
    pub fn new(config: StoreConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        let shards = (0..config.shards.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        let now = clock.now();
        Self {
            config,
            clock,
            hasher: RandomState::new(),
            shards,
            last_reap_at: AtomicU64::new(now.to_bits()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Run `f` while holding the lock of entity `id`, creating it if needed.
    pub fn with_entity<R>(&self, id: &str, f: impl FnOnce(&mut EntityEntry<'_>) -> R) -> R {
        loop {
            let handle = self.get_or_create(id);
            let mut state = lock(&handle);
            if state.retired {
                // Reaped between lookup and lock; the map no longer holds it.
                continue;
            }
            let mut entry = EntityEntry {
                state: &mut *state,
                clock: self.clock.as_ref(),
            };
            return f(&mut entry);
        }
    }

    /// Append `event` to `id`'s history. Returns the evicted event, if any.
    pub fn append(&self, id: &str, event: TransactionEvent) -> Option<TransactionEvent> {
        self.with_entity(id, |entry| entry.append(event))
    }

    /// Events of `id` newer than `now - minutes * 60`. Empty for unknown ids.
    pub fn windowed(&self, id: &str, minutes: u64) -> Vec<TransactionEvent> {
        match self.get(id) {
            Some(handle) => lock(&handle).windowed(window_start(self.clock.now(), minutes)),
            None => Vec::new(),
        }
    }

    pub fn update_features(&self, id: &str, features: &FeatureMap) {
        self.with_entity(id, |entry| entry.update_features(features));
    }

    /// Copy of the stored feature vector; empty for unknown ids.
    pub fn get_features(&self, id: &str) -> FeatureMap {
        self.get(id)
            .map(|handle| lock(&handle).features.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| read(s).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_reap_at(&self) -> f64 {
        f64::from_bits(self.last_reap_at.load(Ordering::SeqCst))
    }

    pub fn should_reap(&self) -> bool {
        self.clock.now() - self.last_reap_at() > self.config.reap_interval_secs as f64
    }

    /// Trim expired history and drop fully stale entities.
    ///
    /// Every entity loses history entries older than the retention cutoff,
    /// from the front. An entity is then removed only if it was both created
    /// and last updated before the cutoff and has no history left. Returns
    /// the number of entities removed.
    pub fn reap(&self) -> usize {
        let now = self.clock.now();
        let cutoff = window_start(now, self.config.window_minutes);
        let mut removed = 0;
        let mut trimmed = 0;

        for shard in &self.shards {
            let handles: Vec<(String, EntityHandle)> = read(shard)
                .iter()
                .map(|(id, h)| (id.clone(), Arc::clone(h)))
                .collect();

            let mut candidates = Vec::new();
            for (id, handle) in handles {
                let mut state = lock(&handle);
                trimmed += state.trim_before(cutoff);
                if state.is_reapable(cutoff) {
                    candidates.push(id);
                }
            }
            if candidates.is_empty() {
                continue;
            }

            let mut map = write(shard);
            for id in candidates {
                let Some(handle) = map.get(&id) else {
                    continue;
                };
                // A busy entity is being written to, so it is not stale.
                let reapable = match handle.try_lock() {
                    Ok(mut state) => retire_if_reapable(&mut state, cutoff),
                    Err(TryLockError::Poisoned(p)) => retire_if_reapable(&mut p.into_inner(), cutoff),
                    Err(TryLockError::WouldBlock) => false,
                };
                if reapable {
                    map.remove(&id);
                    removed += 1;
                }
            }
        }

        self.last_reap_at.store(now.to_bits(), Ordering::SeqCst);
        tracing::debug!(removed, trimmed, cutoff, "reap sweep finished");
        removed
    }

    pub fn stats(&self) -> StoreStats {
        let mut entity_count = 0;
        let mut total_buffered_events = 0;
        for shard in &self.shards {
            let handles: Vec<EntityHandle> = read(shard).values().cloned().collect();
            entity_count += handles.len();
            total_buffered_events += handles.iter().map(|h| lock(h).history.len()).sum::<usize>();
        }
        StoreStats {
            entity_count,
            total_buffered_events,
            window_minutes: self.config.window_minutes,
            last_reap_at: self.last_reap_at(),
        }
    }

    fn shard(&self, id: &str) -> &Shard {
        let idx = self.hasher.hash_one(id) as usize % self.shards.len();
        &self.shards[idx]
    }

    fn get(&self, id: &str) -> Option<EntityHandle> {
        read(self.shard(id)).get(id).cloned()
    }

    fn get_or_create(&self, id: &str) -> EntityHandle {
        if let Some(handle) = self.get(id) {
            return handle;
        }
        let mut map = write(self.shard(id));
        Arc::clone(map.entry(id.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(EntityState::new(
                self.config.history_capacity,
                self.clock.now(),
            )))
        }))
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

fn window_start(now: f64, minutes: u64) -> f64 {
    now - (minutes as f64) * 60.0
}

fn retire_if_reapable(state: &mut EntityState, cutoff: f64) -> bool {
    if state.is_reapable(cutoff) {
        state.retired = true;
        true
    } else {
        false
    }
}

// A panic inside one entity's computation must not wedge the whole store.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(l: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(l: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}
