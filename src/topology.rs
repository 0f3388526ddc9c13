//! Ordered stop sequences of lines.

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::anomaly::DataAnomaly;
use crate::error::Result;
use crate::model::Line;

/// One stop of a line's topology
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopologyStop {
    pub stop_id: i64,
    pub stop_name: String,
    pub sequence: i64,
    /// Minutes from the line's first stop
    pub time_offset: i64,
}

/// Stops of a line ordered by their stored sequence number. Empty when the
/// line has no stops or does not exist.
pub fn resolve_topology(conn: &Connection, line_id: i64) -> Result<Vec<TopologyStop>> {
    let mut stmt = conn.prepare_cached(
        "SELECT ls.stop_id, s.stop_name, ls.sequence, ls.time_offset
         FROM line_stops ls
         JOIN stops s ON s.stop_id = ls.stop_id
         WHERE ls.line_id = ?1
         ORDER BY ls.sequence",
    )?;

    let stops = stmt
        .query_map([line_id], |row| {
            Ok(TopologyStop {
                stop_id: row.get(0)?,
                stop_name: row.get(1)?,
                sequence: row.get(2)?,
                time_offset: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(stops)
}

pub fn find_line(conn: &Connection, line_name: &str) -> Result<Option<Line>> {
    let line = conn
        .query_row(
            "SELECT line_id, line_name, vehicle_type FROM lines WHERE line_name = ?1",
            [line_name],
            Line::from_row,
        )
        .optional()?;
    Ok(line)
}

pub fn all_lines(conn: &Connection) -> Result<Vec<Line>> {
    let mut stmt =
        conn.prepare_cached("SELECT line_id, line_name, vehicle_type FROM lines ORDER BY line_name")?;
    let lines = stmt
        .query_map([], Line::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(lines)
}

/// Report sequence numbers that leave the range 1..N and offsets that go
/// backwards. `stops` must be ordered by sequence.
pub fn check_topology(line_name: &str, stops: &[TopologyStop]) -> Vec<DataAnomaly> {
    let mut anomalies = Vec::new();
    let mut expected = 1;
    let mut previous_offset: Option<i64> = None;

    for stop in stops {
        if stop.sequence != expected {
            anomalies.push(DataAnomaly::SequenceGap {
                line_name: line_name.to_string(),
                expected,
                found: stop.sequence,
            });
        }
        expected = stop.sequence + 1;

        if let Some(previous) = previous_offset.filter(|&p| stop.time_offset < p) {
            anomalies.push(DataAnomaly::DecreasingOffset {
                line_name: line_name.to_string(),
                sequence: stop.sequence,
                time_offset: stop.time_offset,
                previous_offset: previous,
            });
        }
        previous_offset = Some(stop.time_offset);
    }

    anomalies
}

/// Run [`check_topology`] over every line in the store
pub fn check_all_topologies(conn: &Connection) -> Result<Vec<DataAnomaly>> {
    let mut anomalies = Vec::new();
    for line in all_lines(conn)? {
        let stops = resolve_topology(conn, line.line_id)?;
        anomalies.extend(check_topology(&line.line_name, &stops));
    }
    Ok(anomalies)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(name: &str, sequence: i64, time_offset: i64) -> TopologyStop {
        TopologyStop {
            stop_id: sequence,
            stop_name: name.to_string(),
            sequence,
            time_offset,
        }
    }

    #[test]
    fn test_contiguous_topology_is_clean() {
        let stops = vec![stop("A", 1, 0), stop("B", 2, 10), stop("C", 3, 25)];
        assert!(check_topology("Red", &stops).is_empty());
    }

    #[test]
    fn test_empty_topology_is_clean() {
        assert!(check_topology("Red", &[]).is_empty());
    }

    #[test]
    fn test_gap_and_late_start_are_reported() {
        let stops = vec![stop("A", 2, 0), stop("B", 3, 5), stop("C", 5, 9)];
        let anomalies = check_topology("Red", &stops);

        assert_eq!(
            anomalies,
            vec![
                DataAnomaly::SequenceGap {
                    line_name: "Red".into(),
                    expected: 1,
                    found: 2
                },
                DataAnomaly::SequenceGap {
                    line_name: "Red".into(),
                    expected: 4,
                    found: 5
                },
            ]
        );
    }

    #[test]
    fn test_decreasing_offset_is_reported() {
        let stops = vec![stop("A", 1, 0), stop("B", 2, 10), stop("C", 3, 7)];
        let anomalies = check_topology("Red", &stops);

        assert_eq!(
            anomalies,
            vec![DataAnomaly::DecreasingOffset {
                line_name: "Red".into(),
                sequence: 3,
                time_offset: 7,
                previous_offset: 10
            }]
        );
    }
}
