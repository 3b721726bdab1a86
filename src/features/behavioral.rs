//! Merchant diversity and payment-method consistency over the week window.

use crate::events::TransactionEvent;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BehavioralFeatures {
    /// Unique merchants / total events (events without a merchant still count)
    pub merchant_diversity: f64,
    /// Share of events with a payment method that used the most common one
    pub payment_method_consistency: f64,
}

impl Default for BehavioralFeatures {
    fn default() -> Self {
        Self {
            merchant_diversity: 0.0,
            payment_method_consistency: 1.0,
        }
    }
}

impl BehavioralFeatures {
    pub fn from_events(events: &[TransactionEvent]) -> Self {
        let mut s = BehavioralFeatures::default();
        if events.is_empty() {
            return s;
        }

        let merchants: HashSet<&str> = events.iter().filter_map(TransactionEvent::merchant).collect();
        s.merchant_diversity = merchants.len() as f64 / events.len() as f64;

        let mut methods: HashMap<&str, usize> = HashMap::new();
        for m in events.iter().filter_map(TransactionEvent::payment_method) {
            *methods.entry(m).or_default() += 1;
        }
        let with_method: usize = methods.values().sum();
        if let Some(primary) = methods.values().copied().max() {
            s.payment_method_consistency = primary as f64 / with_method as f64;
        }
        s
    }
}
