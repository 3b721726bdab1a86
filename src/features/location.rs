//! Location rarity and consistency over the week window.

use crate::events::TransactionEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A location seen in at most this share of events is rare.
pub const RARE_LOCATION_SHARE: f64 = 0.10;
/// Rarity is only judged with more located events than this.
pub const MIN_LOCATED_EVENTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFeatures {
    /// 1.0 when the latest event's location is rare, else 0.0
    pub anomaly: f64,
    /// Share of located events at the most common location
    pub consistency: f64,
}

impl Default for LocationFeatures {
    fn default() -> Self {
        Self {
            anomaly: 0.0,
            consistency: 1.0,
        }
    }
}

impl LocationFeatures {
    pub fn from_events(events: &[TransactionEvent]) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for loc in events.iter().filter_map(TransactionEvent::location) {
            *counts.entry(loc).or_default() += 1;
        }
        let total: usize = counts.values().sum();
        if total == 0 {
            return Self::default();
        }

        // An unlocated latest event counts as never seen.
        let recent = events
            .last()
            .and_then(TransactionEvent::location)
            .and_then(|loc| counts.get(loc).copied())
            .unwrap_or(0);
        let share = recent as f64 / total as f64;
        let anomaly = share <= RARE_LOCATION_SHARE && total > MIN_LOCATED_EVENTS;

        let primary = counts.values().copied().max().unwrap_or(0);
        Self {
            anomaly: if anomaly { 1.0 } else { 0.0 },
            consistency: primary as f64 / total as f64,
        }
    }
}
