//! Scheduled-versus-actual deviation of stop events.
//!
//! Delays are signed: positive is late, negative is early. Nothing here
//! clamps or filters outliers; aggregates over an empty set are `None`.

use chrono::TimeDelta;

use crate::model::StopEvent;

/// Signed milliseconds from `earlier` to `later` as a SQL expression over two
/// timestamp columns.
///
/// SQLite resolves timestamps to the millisecond, so rounding the julianday
/// difference gives the exact count and equal delays compare equal.
pub(crate) fn millis_between_sql(earlier: &str, later: &str) -> String {
    format!(
        "CAST(ROUND((julianday({}) - julianday({})) * 86400000.0) AS INTEGER)",
        later, earlier
    )
}

/// Delay of the stop event aliased `se`, in milliseconds; agrees with
/// [`compute_delay`] at millisecond precision
pub(crate) fn delay_millis_sql() -> String {
    millis_between_sql("se.scheduled", "se.actual")
}

pub fn compute_delay(event: &StopEvent) -> TimeDelta {
    event.actual - event.scheduled
}

/// Mean delay, or `None` when there are no events
pub fn average_delay(events: &[StopEvent]) -> Option<TimeDelta> {
    if events.is_empty() {
        return None;
    }
    let total_ms: i64 = events
        .iter()
        .map(|e| compute_delay(e).num_milliseconds())
        .sum();
    Some(TimeDelta::milliseconds(total_ms / events.len() as i64))
}

/// Fraction of events with `|delay| <= threshold`, or `None` when there are
/// no events
pub fn on_time_rate(events: &[StopEvent], threshold: TimeDelta) -> Option<f64> {
    if events.is_empty() {
        return None;
    }
    let limit = threshold.num_milliseconds().abs();
    let on_time = events
        .iter()
        .filter(|e| compute_delay(e).num_milliseconds().abs() <= limit)
        .count();
    Some(on_time as f64 / events.len() as f64)
}

/// Delay expressed in fractional minutes, for reporting
pub fn delay_minutes(delay: TimeDelta) -> f64 {
    delay.num_milliseconds() as f64 / 60_000.0
}
