//! Analytic query families built on the delay calculator and on indexed
//! time-range scans of stop events.

use chrono::{NaiveDateTime, TimeDelta};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::delay::{average_delay, compute_delay, delay_minutes, millis_between_sql, on_time_rate};
use crate::error::Result;
use crate::model::StopEvent;

/// Layout rusqlite writes `NaiveDateTime` values in; the fraction is omitted
/// when it is zero
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Half-open `[from, to)` filter on a timestamp column; open ends are unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

impl TimeWindow {
    /// Text bounds comparable against stored timestamps, so range scans can
    /// use the timestamp indexes
    fn bounds(&self) -> (String, String) {
        let lower = self
            .from
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default();
        let upper = self
            .to
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| "9999-12-31 23:59:59.999".to_string());
        (lower, upper)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineOnTime {
    pub line_name: String,
    pub events: usize,
    pub on_time_rate: f64,
    pub average_delay_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopBoardingVolume {
    pub stop_name: String,
    pub boardings: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayedTrip {
    pub trip_id: String,
    pub line_name: String,
    pub worst_stop: String,
    pub max_delay_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferOpportunity {
    pub stop_name: String,
    pub from_trip: String,
    pub from_line: String,
    pub from_time: NaiveDateTime,
    pub to_trip: String,
    pub to_line: String,
    pub to_time: NaiveDateTime,
    pub gap_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourBucket {
    pub line_name: String,
    pub hour: u32,
    pub passengers: i64,
    pub events: i64,
}

/// Stop events in the window together with their line and stop names
fn events_with_names(
    conn: &Connection,
    window: &TimeWindow,
) -> Result<Vec<(String, String, StopEvent)>> {
    let (lower, upper) = window.bounds();
    let mut stmt = conn.prepare_cached(
        "SELECT l.line_name, s.stop_name,
                se.trip_id AS trip_id, se.stop_id AS stop_id,
                se.scheduled AS scheduled, se.actual AS actual,
                se.passengers_on AS passengers_on, se.passengers_off AS passengers_off
         FROM stop_events se
         JOIN trips t ON t.trip_id = se.trip_id
         JOIN lines l ON l.line_id = t.line_id
         JOIN stops s ON s.stop_id = se.stop_id
         WHERE se.scheduled >= ?1 AND se.scheduled < ?2
         ORDER BY se.trip_id, se.scheduled",
    )?;
    let rows = stmt
        .query_map(params![lower, upper], |row| {
            Ok((row.get(0)?, row.get(1)?, StopEvent::from_row(row)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Lines ranked by the share of events within `threshold` of schedule, best
/// first; ties go to the smaller average delay. Lines without events in the
/// window have no defined rate and are left out.
pub fn on_time_ranking(
    conn: &Connection,
    threshold: TimeDelta,
    window: &TimeWindow,
) -> Result<Vec<LineOnTime>> {
    let mut by_line: BTreeMap<String, Vec<StopEvent>> = BTreeMap::new();
    for (line_name, _, event) in events_with_names(conn, window)? {
        by_line.entry(line_name).or_default().push(event);
    }

    let mut ranking: Vec<LineOnTime> = by_line
        .into_iter()
        .filter_map(|(line_name, events)| {
            let rate = on_time_rate(&events, threshold)?;
            let average = average_delay(&events)?;
            Some(LineOnTime {
                line_name,
                events: events.len(),
                on_time_rate: rate,
                average_delay_minutes: delay_minutes(average),
            })
        })
        .collect();

    ranking.sort_by(|a, b| {
        b.on_time_rate
            .partial_cmp(&a.on_time_rate)
            .unwrap_or(Ordering::Equal)
            .then(
                a.average_delay_minutes
                    .partial_cmp(&b.average_delay_minutes)
                    .unwrap_or(Ordering::Equal),
            )
            .then_with(|| a.line_name.cmp(&b.line_name))
    });
    Ok(ranking)
}

/// Top `limit` stops by boardings among events scheduled inside the window
pub fn top_boarding_stops(
    conn: &Connection,
    window: &TimeWindow,
    limit: usize,
) -> Result<Vec<StopBoardingVolume>> {
    let (lower, upper) = window.bounds();
    let mut stmt = conn.prepare_cached(
        "SELECT s.stop_name, SUM(se.passengers_on) AS boardings
         FROM stop_events se
         JOIN stops s ON s.stop_id = se.stop_id
         WHERE se.scheduled >= ?1 AND se.scheduled < ?2
         GROUP BY s.stop_id, s.stop_name
         ORDER BY boardings DESC, s.stop_name
         LIMIT ?3",
    )?;
    let rows = stmt
        .query_map(params![lower, upper, limit as i64], |row| {
            Ok(StopBoardingVolume {
                stop_name: row.get(0)?,
                boardings: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Trips whose largest delay is strictly greater than `threshold`, worst first
pub fn delayed_trips(conn: &Connection, threshold: TimeDelta) -> Result<Vec<DelayedTrip>> {
    let mut worst: BTreeMap<String, (String, String, TimeDelta)> = BTreeMap::new();

    for (line_name, stop_name, event) in events_with_names(conn, &TimeWindow::default())? {
        let delay = compute_delay(&event);
        let is_worse = worst
            .get(&event.trip_id)
            .map_or(true, |(_, _, current)| delay > *current);
        if is_worse {
            worst.insert(event.trip_id, (line_name, stop_name, delay));
        }
    }

    let mut trips: Vec<DelayedTrip> = worst
        .into_iter()
        .filter(|(_, (_, _, delay))| *delay > threshold)
        .map(|(trip_id, (line_name, worst_stop, delay))| DelayedTrip {
            trip_id,
            line_name,
            worst_stop,
            max_delay_minutes: delay_minutes(delay),
        })
        .collect();

    trips.sort_by(|a, b| {
        b.max_delay_minutes
            .partial_cmp(&a.max_delay_minutes)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.trip_id.cmp(&b.trip_id))
    });
    Ok(trips)
}

/// Pairs of trips on different lines whose actual times at the same stop are
/// at most `window` apart. Each pair is reported once, earlier trip first.
pub fn transfer_opportunities(
    conn: &Connection,
    window: TimeDelta,
    stop_name: Option<&str>,
) -> Result<Vec<TransferOpportunity>> {
    // The text bound keeps the scan of `b` on idx_stop_events_actual; it is
    // one second loose so stored fractions of any length stay inside it, and
    // the millisecond gap decides
    let sql = format!(
        "SELECT s.stop_name,
                a.trip_id, la.line_name, a.actual,
                b.trip_id, lb.line_name, b.actual
         FROM stop_events a
         JOIN stop_events b ON b.stop_id = a.stop_id
         JOIN trips ta ON ta.trip_id = a.trip_id
         JOIN trips tb ON tb.trip_id = b.trip_id
         JOIN lines la ON la.line_id = ta.line_id
         JOIN lines lb ON lb.line_id = tb.line_id
         JOIN stops s ON s.stop_id = a.stop_id
         WHERE ta.line_id <> tb.line_id
           AND b.actual >= a.actual
           AND b.actual <= strftime('%Y-%m-%d %H:%M:%f', a.actual, ?3)
           AND (b.actual > a.actual OR b.trip_id > a.trip_id)
           AND {} <= ?1
           AND (?2 IS NULL OR s.stop_name = ?2)
         ORDER BY s.stop_name, a.actual, b.actual, a.trip_id, b.trip_id",
        millis_between_sql("a.actual", "b.actual")
    );
    let mut stmt = conn.prepare_cached(&sql)?;

    let rows = stmt
        .query_map(
            params![window.num_milliseconds(), stop_name, range_modifier(window)],
            |row| {
                let from_time: NaiveDateTime = row.get(3)?;
                let to_time: NaiveDateTime = row.get(6)?;
                Ok(TransferOpportunity {
                    stop_name: row.get(0)?,
                    from_trip: row.get(1)?,
                    from_line: row.get(2)?,
                    from_time,
                    to_trip: row.get(4)?,
                    to_line: row.get(5)?,
                    to_time,
                    gap_minutes: delay_minutes(to_time - from_time),
                })
            },
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// SQLite date modifier reaching one second past `window`
fn range_modifier(window: TimeDelta) -> String {
    let ms = window.num_milliseconds() + 1000;
    format!("+{}.{:03} seconds", ms / 1000, ms % 1000)
}

/// Passengers (on + off) per scheduled hour of day, per line. Keeps the
/// `limit_per_line` busiest hours of each line.
pub fn busiest_hours(
    conn: &Connection,
    line_name: Option<&str>,
    limit_per_line: usize,
) -> Result<Vec<HourBucket>> {
    let mut stmt = conn.prepare_cached(
        "SELECT l.line_name,
                CAST(strftime('%H', se.scheduled) AS INTEGER) AS hour,
                SUM(se.passengers_on + se.passengers_off) AS passengers,
                COUNT(*) AS events
         FROM stop_events se
         JOIN trips t ON t.trip_id = se.trip_id
         JOIN lines l ON l.line_id = t.line_id
         WHERE ?1 IS NULL OR l.line_name = ?1
         GROUP BY l.line_id, l.line_name, hour
         ORDER BY l.line_name, passengers DESC, hour",
    )?;

    let buckets = stmt
        .query_map([line_name], |row| {
            Ok(HourBucket {
                line_name: row.get(0)?,
                hour: row.get(1)?,
                passengers: row.get(2)?,
                events: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut kept: Vec<HourBucket> = Vec::with_capacity(buckets.len());
    let mut current_line: Option<String> = None;
    let mut per_line = 0;
    for bucket in buckets {
        if current_line.as_deref() != Some(bucket.line_name.as_str()) {
            current_line = Some(bucket.line_name.clone());
            per_line = 0;
        }
        per_line += 1;
        if per_line <= limit_per_line {
            kept.push(bucket);
        }
    }
    Ok(kept)
}
