//! Amount z-score and volatility over the day window.

use crate::events::TransactionEvent;
use serde::{Deserialize, Serialize};

/// Minimum standard deviation, as a share of the historical mean.
pub const STDEV_FLOOR_RATIO: f64 = 0.1;
/// Absolute minimum standard deviation.
pub const STDEV_FLOOR_MIN: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AmountFeatures {
    /// Deviation of the latest amount from the earlier ones
    pub zscore: f64,
    /// Coefficient of variation of the earlier amounts
    pub volatility: f64,
}

impl AmountFeatures {
    pub fn from_events(events: &[TransactionEvent]) -> Self {
        let amounts: Vec<f64> = events.iter().map(|e| e.amount).collect();
        Self::from_amounts(&amounts)
    }

    /// The last amount is scored against all the ones before it.
    pub fn from_amounts(amounts: &[f64]) -> Self {
        let Some((&recent, historical)) = amounts.split_last() else {
            return Self::default();
        };
        if historical.is_empty() {
            return Self::default();
        }

        let mean = running_mean(historical);
        let floor = (mean.abs() * STDEV_FLOOR_RATIO).max(STDEV_FLOOR_MIN);
        let stdev = match sample_stdev(historical, mean) {
            Some(s) if s > 0.0 => s,
            _ => floor,
        };

        Self {
            zscore: (recent - mean) / stdev,
            volatility: if mean > 0.0 { stdev / mean } else { 0.0 },
        }
    }
}

/// Incremental mean; stays finite for any finite, same-signed input.
fn running_mean(values: &[f64]) -> f64 {
    values
        .iter()
        .zip(1u32..)
        .fold(0.0, |m, (x, k)| m + (x - m) / f64::from(k))
}

/// `None` below two points. Deviations are scaled by the largest one before
/// squaring so huge amounts do not overflow.
fn sample_stdev(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let scale = values.iter().fold(0.0_f64, |acc, v| acc.max((v - mean).abs()));
    if scale == 0.0 || !scale.is_finite() {
        return Some(scale);
    }
    let ss: f64 = values.iter().map(|v| ((v - mean) / scale).powi(2)).sum();
    Some(scale * (ss / (values.len() - 1) as f64).sqrt())
}
