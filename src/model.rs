//! Entity types for the transit store.
//!
//! `*Record` types are what an external loader hands to [`Store::load`]:
//! parsed rows that reference lines and stops by name. The other types are
//! rows as read back from the store.
//!
//! [`Store::load`]: crate::store::Store::load

use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Rail,
    Bus,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Rail => "rail",
            VehicleType::Bus => "bus",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rail" => Ok(VehicleType::Rail),
            "bus" => Ok(VehicleType::Bus),
            other => Err(format!("Unknown vehicle type: {}", other)),
        }
    }
}

impl ToSql for VehicleType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for VehicleType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

// =============================================================================
// Stored rows
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub line_id: i64,
    pub line_name: String,
    pub vehicle_type: VehicleType,
}

impl Line {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            line_id: row.get("line_id")?,
            line_name: row.get("line_name")?,
            vehicle_type: row.get("vehicle_type")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stop {
    pub stop_id: i64,
    pub stop_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Stop {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            stop_id: row.get("stop_id")?,
            stop_name: row.get("stop_name")?,
            latitude: row.get("latitude")?,
            longitude: row.get("longitude")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trip {
    pub trip_id: String,
    pub line_id: i64,
    pub scheduled_departure: NaiveDateTime,
    pub vehicle_id: String,
}

impl Trip {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            trip_id: row.get("trip_id")?,
            line_id: row.get("line_id")?,
            scheduled_departure: row.get("scheduled_departure")?,
            vehicle_id: row.get("vehicle_id")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopEvent {
    pub trip_id: String,
    pub stop_id: i64,
    pub scheduled: NaiveDateTime,
    pub actual: NaiveDateTime,
    pub passengers_on: i64,
    pub passengers_off: i64,
}

impl StopEvent {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            trip_id: row.get("trip_id")?,
            stop_id: row.get("stop_id")?,
            scheduled: row.get("scheduled")?,
            actual: row.get("actual")?,
            passengers_on: row.get("passengers_on")?,
            passengers_off: row.get("passengers_off")?,
        })
    }
}

// =============================================================================
// Loader records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub line_name: String,
    pub vehicle_type: VehicleType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    pub stop_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStopRecord {
    pub line_name: String,
    pub stop_name: String,
    pub sequence: i64,
    /// Minutes from the line's first stop
    pub time_offset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub trip_id: String,
    pub line_name: String,
    pub scheduled_departure: NaiveDateTime,
    pub vehicle_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopEventRecord {
    pub trip_id: String,
    pub stop_name: String,
    pub scheduled: NaiveDateTime,
    pub actual: NaiveDateTime,
    pub passengers_on: i64,
    pub passengers_off: i64,
}

/// Everything one load operation inserts, applied all-or-nothing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub lines: Vec<LineRecord>,
    #[serde(default)]
    pub stops: Vec<StopRecord>,
    #[serde(default)]
    pub line_stops: Vec<LineStopRecord>,
    #[serde(default)]
    pub trips: Vec<TripRecord>,
    #[serde(default)]
    pub stop_events: Vec<StopEventRecord>,
}

impl Dataset {
    pub fn row_count(&self) -> usize {
        self.lines.len()
            + self.stops.len()
            + self.line_stops.len()
            + self.trips.len()
            + self.stop_events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_type_round_trips_through_text() {
        assert_eq!("rail".parse::<VehicleType>(), Ok(VehicleType::Rail));
        assert_eq!(VehicleType::Bus.to_string(), "bus");
        assert!("tram".parse::<VehicleType>().is_err());
    }

    #[test]
    fn test_dataset_deserializes_with_missing_tables() {
        let json = r#"{"lines": [{"line_name": "Route 20", "vehicle_type": "bus"}]}"#;
        let dataset: Dataset = serde_json::from_str(json).unwrap();
        assert_eq!(dataset.lines[0].vehicle_type, VehicleType::Bus);
        assert_eq!(dataset.row_count(), 1);
    }
}
