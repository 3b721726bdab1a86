//! Clock abstraction and timestamp utilities.
//!
//! All epochs are `f64` seconds since the Unix epoch. Calendar fields are
//! derived in UTC.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of "now" for the store and engine.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

/// Clock that only moves when told to. Used by tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new(now: f64) -> Self {
        Self {
            bits: AtomicU64::new(now.to_bits()),
        }
    }

    /// Starts at the current wall-clock time.
    pub fn starting_now() -> Self {
        Self::new(SystemClock.now())
    }

    pub fn set(&self, now: f64) {
        self.bits.store(now.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: f64) {
        let _ = self
            .bits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| {
                Some((f64::from_bits(b) + secs).to_bits())
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

// `%z` takes "+hhmm", `%:z` takes "+hh:mm".
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M%z",
    "%Y-%m-%d %H:%M%:z",
    "%Y%m%dT%H%M%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
];

/// Parse an ISO-8601 timestamp into epoch seconds.
///
/// Accepts extended or basic format, `T` or space separated, with minute or
/// second precision. A `Z` or numeric offset (`+hh:mm` or `+hhmm`) is
/// honored; anything without one is read as UTC. A stray `Z` after an offset
/// is ignored, and a bare date means midnight.
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(to_epoch(&dt.with_timezone(&Utc)));
    }
    // "2024-01-01T10:00:00+00:00Z" and other offset-plus-Z forms
    let unzoned = s.strip_suffix(['Z', 'z']).unwrap_or(s);
    if let Ok(dt) = DateTime::parse_from_rfc3339(unzoned) {
        return Some(to_epoch(&dt.with_timezone(&Utc)));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(unzoned, fmt) {
            return Some(to_epoch(&dt.with_timezone(&Utc)));
        }
    }
    let naive = s.trim_end_matches(['Z', 'z']);
    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(to_epoch(&ndt.and_utc()));
        }
    }
    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| to_epoch(&ndt.and_utc()))
}

/// Parse `raw`, substituting the clock's current time when it does not parse.
pub fn epoch_or_now(raw: &str, clock: &dyn Clock) -> f64 {
    parse_timestamp(raw).unwrap_or_else(|| clock.now())
}

/// Render an epoch as RFC 3339 (UTC). Out-of-range epochs render as the Unix epoch.
pub fn format_epoch(epoch: f64) -> String {
    from_epoch(epoch).unwrap_or_default().to_rfc3339()
}

fn to_epoch(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp_micros() as f64 / 1_000_000.0
}

fn from_epoch(epoch: f64) -> Option<DateTime<Utc>> {
    if !epoch.is_finite() {
        return None;
    }
    let secs = epoch.floor();
    let nanos = ((epoch - secs) * 1e9) as u32;
    DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
}

/// Calendar fields of a single timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFeatures {
    pub hour_of_day: u32,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
    pub is_weekend: bool,
    /// 09:00 through 17:59
    pub is_business_hours: bool,
    pub month: u32,
    pub day_of_month: u32,
}

impl CalendarFeatures {
    pub fn from_epoch(epoch: f64) -> Option<Self> {
        let dt = from_epoch(epoch)?;
        let hour = dt.hour();
        let weekday = dt.weekday().num_days_from_monday();
        Some(Self {
            hour_of_day: hour,
            day_of_week: weekday,
            is_weekend: weekday >= 5,
            is_business_hours: (9..=17).contains(&hour),
            month: dt.month(),
            day_of_month: dt.day(),
        })
    }
}
