//! How unusual the latest event's hour and weekday are.

use crate::events::TransactionEvent;
use crate::time::CalendarFeatures;

/// 0.0 when the latest event lands on an hour and weekday every earlier
/// event shared, approaching 1.0 when neither was seen before.
///
/// Events without a positive epoch are skipped. Fewer than two usable
/// events score 0.0.
pub fn time_pattern_score(events: &[TransactionEvent]) -> f64 {
    let points: Vec<(u32, u32)> = events
        .iter()
        .map(TransactionEvent::epoch)
        .filter(|t| *t > 0.0)
        .filter_map(CalendarFeatures::from_epoch)
        .map(|c| (c.hour_of_day, c.day_of_week))
        .collect();

    let Some((&(recent_hour, recent_weekday), historical)) = points.split_last() else {
        return 0.0;
    };
    if historical.is_empty() {
        return 0.0;
    }

    let n = historical.len() as f64;
    let same_hour = historical.iter().filter(|(h, _)| *h == recent_hour).count() as f64;
    let same_weekday = historical.iter().filter(|(_, w)| *w == recent_weekday).count() as f64;
    1.0 - (same_hour / n + same_weekday / n) / 2.0
}
