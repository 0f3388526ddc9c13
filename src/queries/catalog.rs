//! The fixed Q1–Q10 query catalog.
//!
//! Every function is a pure read of the connection it is given; the
//! dispatcher in [`super::run_query`] supplies parameters and renders rows.

use chrono::{NaiveDateTime, TimeDelta};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::Serialize;

use crate::delay::delay_millis_sql;
use crate::error::Result;
use crate::topology::{find_line, resolve_topology, TopologyStop};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripDeparture {
    pub trip_id: String,
    pub line_name: String,
    pub scheduled_departure: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferStop {
    pub stop_name: String,
    pub line_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineRidership {
    pub line_name: String,
    pub avg_passengers: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopActivity {
    pub stop_name: String,
    pub total_activity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineDelayCount {
    pub line_name: String,
    pub delay_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripDelayCount {
    pub trip_id: String,
    pub delayed_stop_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopBoardings {
    pub stop_name: String,
    pub total_boardings: i64,
}

/// Q1: stops of a line in sequence order
pub fn line_stops(conn: &Connection, line_name: &str) -> Result<Vec<TopologyStop>> {
    match find_line(conn, line_name)? {
        Some(line) => resolve_topology(conn, line.line_id),
        None => Ok(Vec::new()),
    }
}

/// Q2: trips whose scheduled departure hour lies in `start_hour..=end_hour`
pub fn trips_departing_between(
    conn: &Connection,
    start_hour: u32,
    end_hour: u32,
) -> Result<Vec<TripDeparture>> {
    let mut stmt = conn.prepare_cached(
        "SELECT t.trip_id, l.line_name, t.scheduled_departure
         FROM trips t
         JOIN lines l ON l.line_id = t.line_id
         WHERE CAST(strftime('%H', t.scheduled_departure) AS INTEGER) BETWEEN ?1 AND ?2
         ORDER BY t.scheduled_departure, t.trip_id",
    )?;
    let rows = stmt
        .query_map(params![start_hour, end_hour], |row| {
            Ok(TripDeparture {
                trip_id: row.get(0)?,
                line_name: row.get(1)?,
                scheduled_departure: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Q3: stops served by at least `min_lines` lines
pub fn transfer_stops(conn: &Connection, min_lines: i64) -> Result<Vec<TransferStop>> {
    let mut stmt = conn.prepare_cached(
        "SELECT s.stop_name, COUNT(DISTINCT ls.line_id) AS line_count
         FROM line_stops ls
         JOIN stops s ON s.stop_id = ls.stop_id
         GROUP BY s.stop_id, s.stop_name
         HAVING COUNT(DISTINCT ls.line_id) >= ?1
         ORDER BY line_count DESC, s.stop_name",
    )?;
    let rows = stmt
        .query_map([min_lines], |row| {
            Ok(TransferStop {
                stop_name: row.get(0)?,
                line_count: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Q4: ordered stops of the line a trip runs on
pub fn trip_stops(conn: &Connection, trip_id: &str) -> Result<Vec<TopologyStop>> {
    let line_id: Option<i64> = conn
        .query_row(
            "SELECT line_id FROM trips WHERE trip_id = ?1",
            [trip_id],
            |row| row.get(0),
        )
        .optional()?;

    match line_id {
        Some(line_id) => resolve_topology(conn, line_id),
        None => Ok(Vec::new()),
    }
}

/// Q5: names of lines that serve every one of `stop_names`
pub fn lines_serving_all(conn: &Connection, stop_names: &[String]) -> Result<Vec<String>> {
    let mut names: Vec<&str> = stop_names.iter().map(String::as_str).collect();
    names.sort_unstable();
    names.dedup();
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT l.line_name
         FROM line_stops ls
         JOIN lines l ON l.line_id = ls.line_id
         JOIN stops s ON s.stop_id = ls.stop_id
         WHERE s.stop_name IN ({})
         GROUP BY l.line_id, l.line_name
         HAVING COUNT(DISTINCT ls.stop_id) = {}
         ORDER BY l.line_name",
        placeholders.join(", "),
        names.len()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(names.iter()), |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(rows)
}

/// Q6: mean passengers (on + off) per stop event, by line
pub fn average_ridership_by_line(conn: &Connection) -> Result<Vec<LineRidership>> {
    let mut stmt = conn.prepare_cached(
        "SELECT l.line_name,
                ROUND(AVG(se.passengers_on + se.passengers_off), 2) AS avg_passengers
         FROM stop_events se
         JOIN trips t ON t.trip_id = se.trip_id
         JOIN lines l ON l.line_id = t.line_id
         GROUP BY l.line_id, l.line_name
         ORDER BY avg_passengers DESC, l.line_name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(LineRidership {
                line_name: row.get(0)?,
                avg_passengers: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Q7: stops with the most boardings plus alightings
pub fn busiest_stops(conn: &Connection, limit: usize) -> Result<Vec<StopActivity>> {
    let mut stmt = conn.prepare_cached(
        "SELECT s.stop_name, SUM(se.passengers_on + se.passengers_off) AS total_activity
         FROM stop_events se
         JOIN stops s ON s.stop_id = se.stop_id
         GROUP BY s.stop_id, s.stop_name
         ORDER BY total_activity DESC, s.stop_name
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok(StopActivity {
                stop_name: row.get(0)?,
                total_activity: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Q8: events later than `threshold`, counted per line
pub fn late_events_per_line(conn: &Connection, threshold: TimeDelta) -> Result<Vec<LineDelayCount>> {
    let sql = format!(
        "SELECT l.line_name, COUNT(*) AS delay_count
         FROM stop_events se
         JOIN trips t ON t.trip_id = se.trip_id
         JOIN lines l ON l.line_id = t.line_id
         WHERE {} > ?1
         GROUP BY l.line_id, l.line_name
         ORDER BY delay_count DESC, l.line_name",
        delay_millis_sql()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map([threshold.num_milliseconds()], |row| {
            Ok(LineDelayCount {
                line_name: row.get(0)?,
                delay_count: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Q9: trips with at least `min_count` stops later than `threshold`
pub fn trips_with_delayed_stops(
    conn: &Connection,
    threshold: TimeDelta,
    min_count: i64,
) -> Result<Vec<TripDelayCount>> {
    let sql = format!(
        "SELECT se.trip_id, COUNT(*) AS delayed_stop_count
         FROM stop_events se
         WHERE {} > ?1
         GROUP BY se.trip_id
         HAVING COUNT(*) >= ?2
         ORDER BY delayed_stop_count DESC, se.trip_id",
        delay_millis_sql()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map(params![threshold.num_milliseconds(), min_count], |row| {
            Ok(TripDelayCount {
                trip_id: row.get(0)?,
                delayed_stop_count: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Q10: stops whose total boardings exceed the mean over all stops with events
pub fn stops_above_average_boardings(conn: &Connection) -> Result<Vec<StopBoardings>> {
    let mut stmt = conn.prepare_cached(
        "WITH per_stop AS (
             SELECT s.stop_id, s.stop_name, SUM(se.passengers_on) AS total_boardings
             FROM stop_events se
             JOIN stops s ON s.stop_id = se.stop_id
             GROUP BY s.stop_id, s.stop_name
         ),
         avg_all AS (SELECT AVG(total_boardings) AS avg_b FROM per_stop)
         SELECT p.stop_name, p.total_boardings
         FROM per_stop p, avg_all a
         WHERE p.total_boardings > a.avg_b
         ORDER BY p.total_boardings DESC, p.stop_name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StopBoardings {
                stop_name: row.get(0)?,
                total_boardings: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
