//! Fixture network shared by the integration tests.
//!
//! Three lines over six stops around Westwood:
//!
//! - Route 20 (bus): Wilshire / Veteran, Le Conte / Broxton, UCLA Terminal
//! - Route 720 (bus): Bundy, Wilshire / Veteran, Le Conte / Broxton
//! - Expo (rail): Santa Monica, Bundy
//!
//! Trips T0001/T0002 run Route 20, T0003 runs Route 720 and T0004 runs Expo.

#![allow(dead_code)]

use chrono::{NaiveDateTime, TimeDelta};
use once_cell::sync::Lazy;
use std::time::Duration;
use tempfile::TempDir;

use transit_analytics::model::{
    Dataset, LineRecord, LineStopRecord, StopEventRecord, StopRecord, TripRecord, VehicleType,
};
use transit_analytics::{Store, StoreConfig};

/// Generous so debug builds on slow machines do not trip it
pub const TEST_BUDGET: Duration = Duration::from_secs(5);

pub struct TestStore {
    _dir: TempDir,
    pub store: Store,
}

/// Fixture store loaded once and shared by read-only tests
pub static FIXTURE: Lazy<TestStore> = Lazy::new(|| {
    let test_store = empty_store();
    test_store
        .store
        .load(&fixture_dataset())
        .expect("Failed to load fixture network");
    test_store
});

/// A fresh file-backed store with the schema and no rows
pub fn empty_store() -> TestStore {
    empty_store_with_budget(TEST_BUDGET)
}

pub fn empty_store_with_budget(budget: Duration) -> TestStore {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = StoreConfig::new(dir.path().join("transit.db")).with_query_budget(budget);
    let store = Store::open(&config).expect("Failed to open store");
    TestStore { _dir: dir, store }
}

/// A fresh store holding the fixture network, for tests that write
pub fn loaded_store() -> TestStore {
    let test_store = empty_store();
    test_store
        .store
        .load(&fixture_dataset())
        .expect("Failed to load fixture network");
    test_store
}

pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("bad fixture timestamp")
}

pub fn line(name: &str, vehicle_type: VehicleType) -> LineRecord {
    LineRecord {
        line_name: name.to_string(),
        vehicle_type,
    }
}

pub fn stop(name: &str, latitude: f64, longitude: f64) -> StopRecord {
    StopRecord {
        stop_name: name.to_string(),
        latitude,
        longitude,
    }
}

pub fn line_stop(line_name: &str, stop_name: &str, sequence: i64, time_offset: i64) -> LineStopRecord {
    LineStopRecord {
        line_name: line_name.to_string(),
        stop_name: stop_name.to_string(),
        sequence,
        time_offset,
    }
}

pub fn trip(trip_id: &str, line_name: &str, departure: &str, vehicle_id: &str) -> TripRecord {
    TripRecord {
        trip_id: trip_id.to_string(),
        line_name: line_name.to_string(),
        scheduled_departure: at(departure),
        vehicle_id: vehicle_id.to_string(),
    }
}

/// A stop event `delay_minutes` after its scheduled time
pub fn event(
    trip_id: &str,
    stop_name: &str,
    scheduled: &str,
    delay_minutes: i64,
    passengers_on: i64,
    passengers_off: i64,
) -> StopEventRecord {
    let scheduled = at(scheduled);
    StopEventRecord {
        trip_id: trip_id.to_string(),
        stop_name: stop_name.to_string(),
        scheduled,
        actual: scheduled + TimeDelta::minutes(delay_minutes),
        passengers_on,
        passengers_off,
    }
}

pub fn fixture_dataset() -> Dataset {
    Dataset {
        lines: vec![
            line("Route 20", VehicleType::Bus),
            line("Route 720", VehicleType::Bus),
            line("Expo", VehicleType::Rail),
        ],
        stops: vec![
            stop("Wilshire / Veteran", 34.0580, -118.4440),
            stop("Le Conte / Broxton", 34.0630, -118.4470),
            stop("Westwood / Weyburn", 34.0620, -118.4460),
            stop("UCLA Terminal", 34.0700, -118.4440),
            stop("Bundy", 34.0410, -118.4650),
            stop("Santa Monica", 34.0140, -118.4910),
        ],
        line_stops: vec![
            line_stop("Route 20", "Wilshire / Veteran", 1, 0),
            line_stop("Route 20", "Le Conte / Broxton", 2, 4),
            line_stop("Route 20", "UCLA Terminal", 3, 9),
            line_stop("Route 720", "Bundy", 1, 0),
            line_stop("Route 720", "Wilshire / Veteran", 2, 6),
            line_stop("Route 720", "Le Conte / Broxton", 3, 10),
            line_stop("Expo", "Santa Monica", 1, 0),
            line_stop("Expo", "Bundy", 2, 5),
        ],
        trips: vec![
            trip("T0001", "Route 20", "2024-03-01 07:30:00", "B101"),
            trip("T0002", "Route 20", "2024-03-01 08:15:00", "B102"),
            trip("T0003", "Route 720", "2024-03-01 07:20:00", "B201"),
            trip("T0004", "Expo", "2024-03-01 09:05:00", "R301"),
        ],
        stop_events: vec![
            event("T0001", "Wilshire / Veteran", "2024-03-01 07:30:00", 0, 10, 0),
            event("T0001", "Le Conte / Broxton", "2024-03-01 07:34:00", 3, 5, 4),
            event("T0001", "UCLA Terminal", "2024-03-01 07:39:00", 4, 0, 11),
            event("T0002", "Wilshire / Veteran", "2024-03-01 08:15:00", 1, 6, 0),
            event("T0002", "Le Conte / Broxton", "2024-03-01 08:19:00", 0, 2, 1),
            event("T0002", "UCLA Terminal", "2024-03-01 08:24:00", 0, 0, 7),
            event("T0003", "Bundy", "2024-03-01 07:20:00", 3, 8, 0),
            event("T0003", "Wilshire / Veteran", "2024-03-01 07:26:00", 5, 4, 3),
            event("T0003", "Le Conte / Broxton", "2024-03-01 07:30:00", 6, 1, 10),
            event("T0004", "Santa Monica", "2024-03-01 09:05:00", 0, 12, 0),
            event("T0004", "Bundy", "2024-03-01 09:10:00", -1, 0, 12),
        ],
    }
}
