//! Transaction events as they arrive from the validation layer.

use crate::time::{epoch_or_now, Clock};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single post-validation transaction. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEvent {
    #[serde(alias = "user_id", alias = "entityId")]
    pub entity_id: String,
    #[serde(alias = "transactionId")]
    pub transaction_id: String,
    pub amount: f64,
    /// ISO-8601 timestamp as received
    #[serde(default)]
    pub timestamp: String,
    /// Epoch seconds; derived from `timestamp` when absent
    #[serde(default, alias = "timestamp_unix", alias = "timestampEpoch")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_epoch: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, alias = "paymentMethod", skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

impl TransactionEvent {
    /// New event with a generated transaction id and a known epoch.
    pub fn new(entity_id: impl Into<String>, amount: f64, timestamp_epoch: f64) -> Self {
        Self {
            entity_id: entity_id.into(),
            transaction_id: Uuid::new_v4().to_string(),
            amount,
            timestamp: crate::time::format_epoch(timestamp_epoch),
            timestamp_epoch: Some(timestamp_epoch),
            merchant: None,
            location: None,
            payment_method: None,
        }
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    /// Epoch seconds, or 0.0 when it has not been derived yet.
    pub fn epoch(&self) -> f64 {
        self.timestamp_epoch.unwrap_or(0.0)
    }

    /// Fill `timestamp_epoch` from `timestamp`, falling back to the clock.
    pub fn with_resolved_epoch(mut self, clock: &dyn Clock) -> Self {
        if self.timestamp_epoch.is_none() {
            self.timestamp_epoch = Some(epoch_or_now(&self.timestamp, clock));
        }
        self
    }

    pub fn merchant(&self) -> Option<&str> {
        non_empty(&self.merchant)
    }

    pub fn location(&self) -> Option<&str> {
        non_empty(&self.location)
    }

    pub fn payment_method(&self) -> Option<&str> {
        non_empty(&self.payment_method)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}
