use rusqlite::{params, Transaction};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

use super::Store;
use crate::error::{Result, StoreError};
use crate::model::Dataset;

/// Rows inserted by one load, per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub lines: usize,
    pub stops: usize,
    pub line_stops: usize,
    pub trips: usize,
    pub stop_events: usize,
}

impl LoadSummary {
    pub fn total(&self) -> usize {
        self.lines + self.stops + self.line_stops + self.trips + self.stop_events
    }
}

impl Store {
    /// Insert a dataset in one transaction.
    ///
    /// Any constraint failure (duplicate name, negative count, unknown line
    /// or stop, bad vehicle type) rolls back the whole dataset.
    pub fn load(&self, dataset: &Dataset) -> Result<LoadSummary> {
        let start = Instant::now();
        debug!(rows = dataset.row_count(), "Loading dataset");
        let mut conn = self.writer();
        let tx = conn.transaction()?;

        let summary = load_dataset(&tx, dataset)?;
        tx.commit()?;

        info!(
            rows = summary.total(),
            elapsed_ms = start.elapsed().as_millis(),
            "Loaded dataset"
        );
        Ok(summary)
    }
}

fn load_dataset(tx: &Transaction, dataset: &Dataset) -> Result<LoadSummary> {
    let mut summary = LoadSummary::default();

    {
        let mut stmt =
            tx.prepare_cached("INSERT INTO lines (line_name, vehicle_type) VALUES (?1, ?2)")?;
        for line in &dataset.lines {
            stmt.execute(params![line.line_name, line.vehicle_type])?;
        }
        summary.lines = dataset.lines.len();
    }

    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO stops (stop_name, latitude, longitude) VALUES (?1, ?2, ?3)",
        )?;
        for stop in &dataset.stops {
            stmt.execute(params![stop.stop_name, stop.latitude, stop.longitude])?;
        }
        summary.stops = dataset.stops.len();
    }

    // Records may reference lines and stops loaded earlier, so map from the store
    let line_ids = name_map(tx, "SELECT line_name, line_id FROM lines")?;
    let stop_ids = name_map(tx, "SELECT stop_name, stop_id FROM stops")?;
    debug!(lines = line_ids.len(), stops = stop_ids.len(), "Resolved name maps");

    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO line_stops (line_id, stop_id, sequence, time_offset)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for ls in &dataset.line_stops {
            let line_id = lookup(&line_ids, "line", &ls.line_name)?;
            let stop_id = lookup(&stop_ids, "stop", &ls.stop_name)?;
            stmt.execute(params![line_id, stop_id, ls.sequence, ls.time_offset])?;
        }
        summary.line_stops = dataset.line_stops.len();
    }

    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO trips (trip_id, line_id, scheduled_departure, vehicle_id)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for trip in &dataset.trips {
            let line_id = lookup(&line_ids, "line", &trip.line_name)?;
            stmt.execute(params![
                trip.trip_id,
                line_id,
                trip.scheduled_departure,
                trip.vehicle_id
            ])?;
        }
        summary.trips = dataset.trips.len();
    }

    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO stop_events
                 (trip_id, stop_id, scheduled, actual, passengers_on, passengers_off)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for event in &dataset.stop_events {
            let stop_id = lookup(&stop_ids, "stop", &event.stop_name)?;
            stmt.execute(params![
                event.trip_id,
                stop_id,
                event.scheduled,
                event.actual,
                event.passengers_on,
                event.passengers_off
            ])?;
        }
        summary.stop_events = dataset.stop_events.len();
    }

    Ok(summary)
}

fn name_map(tx: &Transaction, sql: &str) -> Result<HashMap<String, i64>> {
    let mut stmt = tx.prepare(sql)?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

fn lookup(map: &HashMap<String, i64>, kind: &str, name: &str) -> Result<i64> {
    map.get(name)
        .copied()
        .ok_or_else(|| StoreError::ConstraintViolation(format!("Unknown {}: {}", kind, name)))
}
