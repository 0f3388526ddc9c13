//! Table schema definitions for the transit store

use super::types::*;

// =============================================================================
// Reference Data (topology)
// =============================================================================

pub static LINES: TableSchema = TableSchema {
    name: "lines",
    columns: &[
        Column::required("line_id", ColumnType::Integer),
        Column::required("line_name", ColumnType::Text),
        Column::required("vehicle_type", ColumnType::Text)
            .check("vehicle_type IN ('rail', 'bus')"),
    ],
    primary_key: &["line_id"],
    foreign_keys: &[],
    indexes: &[Index::unique("idx_lines_name", &["line_name"])],
};

pub static STOPS: TableSchema = TableSchema {
    name: "stops",
    columns: &[
        Column::required("stop_id", ColumnType::Integer),
        Column::required("stop_name", ColumnType::Text),
        Column::required("latitude", ColumnType::Real).check("latitude BETWEEN -90 AND 90"),
        Column::required("longitude", ColumnType::Real).check("longitude BETWEEN -180 AND 180"),
    ],
    primary_key: &["stop_id"],
    foreign_keys: &[],
    indexes: &[Index::unique("idx_stops_name", &["stop_name"])],
};

pub static LINE_STOPS: TableSchema = TableSchema {
    name: "line_stops",
    columns: &[
        Column::required("line_id", ColumnType::Integer),
        Column::required("stop_id", ColumnType::Integer),
        Column::required("sequence", ColumnType::Integer).check("sequence >= 1"),
        Column::required("time_offset", ColumnType::Integer).check("time_offset >= 0"),
    ],
    primary_key: &["line_id", "stop_id"],
    foreign_keys: &[
        ForeignKey::cascade("line_id", "lines", "line_id"),
        ForeignKey::cascade("stop_id", "stops", "stop_id"),
    ],
    indexes: &[Index::unique(
        "idx_line_stops_line_sequence",
        &["line_id", "sequence"],
    )],
};

// =============================================================================
// Operational Data
// =============================================================================

pub static TRIPS: TableSchema = TableSchema {
    name: "trips",
    columns: &[
        Column::required("trip_id", ColumnType::Text),
        Column::required("line_id", ColumnType::Integer),
        Column::required("scheduled_departure", ColumnType::Timestamp),
        Column::required("vehicle_id", ColumnType::Text),
    ],
    primary_key: &["trip_id"],
    foreign_keys: &[ForeignKey::restrict("line_id", "lines", "line_id")],
    indexes: &[
        Index::on("idx_trips_line", &["line_id"]),
        Index::on("idx_trips_departure", &["scheduled_departure"]),
    ],
};

pub static STOP_EVENTS: TableSchema = TableSchema {
    name: "stop_events",
    columns: &[
        Column::required("trip_id", ColumnType::Text),
        Column::required("stop_id", ColumnType::Integer),
        Column::required("scheduled", ColumnType::Timestamp),
        Column::required("actual", ColumnType::Timestamp),
        Column::required("passengers_on", ColumnType::Integer).check("passengers_on >= 0"),
        Column::required("passengers_off", ColumnType::Integer).check("passengers_off >= 0"),
    ],
    primary_key: &["trip_id", "stop_id"],
    foreign_keys: &[
        ForeignKey::cascade("trip_id", "trips", "trip_id"),
        ForeignKey::cascade("stop_id", "stops", "stop_id"),
    ],
    indexes: &[
        Index::on("idx_stop_events_trip", &["trip_id"]),
        Index::on("idx_stop_events_stop", &["stop_id"]),
        Index::on("idx_stop_events_scheduled", &["scheduled"]),
        Index::on("idx_stop_events_actual", &["actual"]),
    ],
};

// =============================================================================
// Schema Registry
// =============================================================================

/// All table schemas in dependency order
pub static ALL_TABLES: &[&TableSchema] = &[
    // No dependencies
    &LINES,
    &STOPS,
    // Topology
    &LINE_STOPS,
    // Operations
    &TRIPS,
    &STOP_EVENTS,
];

/// Get table schema by name
pub fn get_table(name: &str) -> Option<&'static TableSchema> {
    ALL_TABLES.iter().find(|t| t.name == name).copied()
}
