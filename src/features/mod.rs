//! Feature calculators over windowed event slices, and the engine that
//! drives them against the store.
//!
//! Calculators are pure functions of an ordered slice (oldest first). The
//! engine in [`pipeline`] is the only part that touches the store.

mod amount;
mod behavioral;
mod location;
mod pipeline;
mod temporal;

pub use amount::AmountFeatures;
pub use behavioral::BehavioralFeatures;
pub use location::LocationFeatures;
pub use pipeline::{FeatureEngine, ProcessOutcome};
pub use temporal::time_pattern_score;

use crate::error::EngineError;
use crate::events::TransactionEvent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stored feature values keyed by name. Partial maps are normal; see
/// [`FeatureVector::from_map`] for the default-filled view.
pub type FeatureMap = BTreeMap<FeatureName, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeatureName {
    #[serde(rename = "transaction_velocity_1h")]
    TransactionVelocity1h,
    #[serde(rename = "amount_zscore")]
    AmountZscore,
    #[serde(rename = "amount_volatility")]
    AmountVolatility,
    #[serde(rename = "location_anomaly")]
    LocationAnomaly,
    #[serde(rename = "location_consistency")]
    LocationConsistency,
    #[serde(rename = "time_pattern_score")]
    TimePatternScore,
    #[serde(rename = "merchant_diversity")]
    MerchantDiversity,
    #[serde(rename = "payment_method_consistency")]
    PaymentMethodConsistency,
}

impl FeatureName {
    pub const ALL: [FeatureName; 8] = [
        FeatureName::TransactionVelocity1h,
        FeatureName::AmountZscore,
        FeatureName::AmountVolatility,
        FeatureName::LocationAnomaly,
        FeatureName::LocationConsistency,
        FeatureName::TimePatternScore,
        FeatureName::MerchantDiversity,
        FeatureName::PaymentMethodConsistency,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureName::TransactionVelocity1h => "transaction_velocity_1h",
            FeatureName::AmountZscore => "amount_zscore",
            FeatureName::AmountVolatility => "amount_volatility",
            FeatureName::LocationAnomaly => "location_anomaly",
            FeatureName::LocationConsistency => "location_consistency",
            FeatureName::TimePatternScore => "time_pattern_score",
            FeatureName::MerchantDiversity => "merchant_diversity",
            FeatureName::PaymentMethodConsistency => "payment_method_consistency",
        }
    }

    /// Value reported when an entity has never produced this feature.
    pub fn default_value(self) -> f64 {
        match self {
            FeatureName::LocationConsistency | FeatureName::PaymentMethodConsistency => 1.0,
            _ => 0.0,
        }
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The complete, default-filled feature vector handed to scorers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub transaction_velocity_1h: f64,
    pub amount_zscore: f64,
    pub amount_volatility: f64,
    pub location_anomaly: f64,
    pub location_consistency: f64,
    pub time_pattern_score: f64,
    pub merchant_diversity: f64,
    pub payment_method_consistency: f64,
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::from_map(&FeatureMap::new())
    }
}

impl FeatureVector {
    pub fn from_map(map: &FeatureMap) -> Self {
        let get = |name: FeatureName| map.get(&name).copied().unwrap_or(name.default_value());
        Self {
            transaction_velocity_1h: get(FeatureName::TransactionVelocity1h),
            amount_zscore: get(FeatureName::AmountZscore),
            amount_volatility: get(FeatureName::AmountVolatility),
            location_anomaly: get(FeatureName::LocationAnomaly),
            location_consistency: get(FeatureName::LocationConsistency),
            time_pattern_score: get(FeatureName::TimePatternScore),
            merchant_diversity: get(FeatureName::MerchantDiversity),
            payment_method_consistency: get(FeatureName::PaymentMethodConsistency),
        }
    }

    pub fn get(&self, name: FeatureName) -> f64 {
        match name {
            FeatureName::TransactionVelocity1h => self.transaction_velocity_1h,
            FeatureName::AmountZscore => self.amount_zscore,
            FeatureName::AmountVolatility => self.amount_volatility,
            FeatureName::LocationAnomaly => self.location_anomaly,
            FeatureName::LocationConsistency => self.location_consistency,
            FeatureName::TimePatternScore => self.time_pattern_score,
            FeatureName::MerchantDiversity => self.merchant_diversity,
            FeatureName::PaymentMethodConsistency => self.payment_method_consistency,
        }
    }

    pub fn to_map(&self) -> FeatureMap {
        FeatureName::ALL.iter().map(|n| (*n, self.get(*n))).collect()
    }
}

/// Windowed slices of one entity's history, oldest first.
#[derive(Debug, Clone, Default)]
pub struct WindowSlices {
    pub last_hour: Vec<TransactionEvent>,
    pub last_day: Vec<TransactionEvent>,
    pub last_week: Vec<TransactionEvent>,
}

/// Recompute features from `slices`.
///
/// Velocity is always produced. The other groups are only produced when
/// their slice is non-empty, so a merge keeps earlier values for windows
/// that have gone quiet.
pub fn compute_features(slices: &WindowSlices) -> Result<FeatureMap, EngineError> {
    let mut out = FeatureMap::new();
    out.insert(FeatureName::TransactionVelocity1h, velocity(&slices.last_hour));

    if !slices.last_day.is_empty() {
        let amount = AmountFeatures::from_events(&slices.last_day);
        out.insert(FeatureName::AmountZscore, amount.zscore);
        out.insert(FeatureName::AmountVolatility, amount.volatility);
    }

    if !slices.last_week.is_empty() {
        let location = LocationFeatures::from_events(&slices.last_week);
        out.insert(FeatureName::LocationAnomaly, location.anomaly);
        out.insert(FeatureName::LocationConsistency, location.consistency);

        out.insert(FeatureName::TimePatternScore, time_pattern_score(&slices.last_week));

        let behavioral = BehavioralFeatures::from_events(&slices.last_week);
        out.insert(FeatureName::MerchantDiversity, behavioral.merchant_diversity);
        out.insert(
            FeatureName::PaymentMethodConsistency,
            behavioral.payment_method_consistency,
        );
    }

    if let Some((feature, value)) = out.iter().find(|(_, v)| !v.is_finite()) {
        return Err(EngineError::NonFiniteFeature {
            feature: *feature,
            value: *value,
        });
    }
    Ok(out)
}

/// Events in the slice.
pub fn velocity(events: &[TransactionEvent]) -> f64 {
    events.len() as f64
}
