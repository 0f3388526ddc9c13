//! Passenger load along a trip.

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::anomaly::DataAnomaly;
use crate::error::Result;
use crate::model::StopEvent;
use crate::topology::{resolve_topology, TopologyStop};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadPoint {
    pub stop_id: i64,
    pub stop_name: String,
    pub sequence: i64,
    pub passengers_on: i64,
    pub passengers_off: i64,
    /// Passengers aboard after this stop; negative values are kept as-is
    pub load: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadProfile {
    pub trip_id: String,
    pub points: Vec<LoadPoint>,
    pub anomalies: Vec<DataAnomaly>,
}

impl LoadProfile {
    pub fn loads(&self) -> Vec<i64> {
        self.points.iter().map(|p| p.load).collect()
    }

    pub fn peak(&self) -> Option<&LoadPoint> {
        self.points.iter().max_by_key(|p| p.load)
    }
}

/// Walk the line's topology and accumulate `on - off` at every stop the
/// trip has an event for, starting from zero.
///
/// Stops without an event are skipped. Events at stops outside the topology
/// cannot be placed and are reported instead of counted.
pub fn compute_load_profile(
    trip_id: &str,
    topology: &[TopologyStop],
    events: &[StopEvent],
) -> LoadProfile {
    let by_stop: HashMap<i64, &StopEvent> = events.iter().map(|e| (e.stop_id, e)).collect();

    let mut points = Vec::new();
    let mut anomalies = Vec::new();
    let mut load = 0i64;

    for stop in topology {
        let Some(event) = by_stop.get(&stop.stop_id) else {
            continue;
        };

        load += event.passengers_on - event.passengers_off;
        if load < 0 {
            anomalies.push(DataAnomaly::NegativeLoad {
                trip_id: trip_id.to_string(),
                stop_name: stop.stop_name.clone(),
                sequence: stop.sequence,
                load,
            });
        }

        points.push(LoadPoint {
            stop_id: stop.stop_id,
            stop_name: stop.stop_name.clone(),
            sequence: stop.sequence,
            passengers_on: event.passengers_on,
            passengers_off: event.passengers_off,
            load,
        });
    }

    for event in events {
        if !topology.iter().any(|s| s.stop_id == event.stop_id) {
            anomalies.push(DataAnomaly::EventOffTopology {
                trip_id: trip_id.to_string(),
                stop_id: event.stop_id,
            });
        }
    }

    LoadProfile {
        trip_id: trip_id.to_string(),
        points,
        anomalies,
    }
}

/// Load profile of a stored trip; `None` when the trip does not exist
pub fn load_trip_profile(conn: &Connection, trip_id: &str) -> Result<Option<LoadProfile>> {
    let line_id: Option<i64> = conn
        .query_row(
            "SELECT line_id FROM trips WHERE trip_id = ?1",
            [trip_id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(line_id) = line_id else {
        return Ok(None);
    };

    let topology = resolve_topology(conn, line_id)?;
    let events = trip_events(conn, trip_id)?;

    let profile = compute_load_profile(trip_id, &topology, &events);
    debug!(
        trip_id,
        stops = profile.points.len(),
        peak = ?profile.peak().map(|p| p.load),
        "Computed load profile"
    );
    if !profile.anomalies.is_empty() {
        warn!(
            trip_id,
            anomalies = profile.anomalies.len(),
            "Load profile breaks flow invariants"
        );
    }
    Ok(Some(profile))
}

pub fn trip_events(conn: &Connection, trip_id: &str) -> Result<Vec<StopEvent>> {
    let mut stmt = conn.prepare_cached(
        "SELECT trip_id, stop_id, scheduled, actual, passengers_on, passengers_off
         FROM stop_events
         WHERE trip_id = ?1",
    )?;
    let events = stmt
        .query_map([trip_id], StopEvent::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn topology() -> Vec<TopologyStop> {
        ["A", "B", "C", "D"]
            .iter()
            .enumerate()
            .map(|(i, name)| TopologyStop {
                stop_id: i as i64 + 1,
                stop_name: name.to_string(),
                sequence: i as i64 + 1,
                time_offset: i as i64 * 10,
            })
            .collect()
    }

    fn event(stop_id: i64, on: i64, off: i64) -> StopEvent {
        let t = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        StopEvent {
            trip_id: "T1".into(),
            stop_id,
            scheduled: t,
            actual: t,
            passengers_on: on,
            passengers_off: off,
        }
    }

    #[test]
    fn test_load_follows_recurrence_in_topology_order() {
        // Event order is deliberately scrambled
        let events = vec![event(3, 4, 6), event(1, 10, 0), event(2, 5, 3), event(4, 0, 10)];
        let profile = compute_load_profile("T1", &topology(), &events);

        assert_eq!(profile.loads(), vec![10, 12, 10, 0]);
        assert!(profile.anomalies.is_empty());
        assert_eq!(profile.peak().map(|p| p.stop_name.as_str()), Some("B"));
    }

    #[test]
    fn test_missing_events_are_skipped() {
        let events = vec![event(1, 7, 0), event(4, 1, 5)];
        let profile = compute_load_profile("T1", &topology(), &events);

        let sequences: Vec<i64> = profile.points.iter().map(|p| p.sequence).collect();
        assert_eq!(sequences, vec![1, 4]);
        assert_eq!(profile.loads(), vec![7, 3]);
    }

    #[test]
    fn test_negative_load_is_reported_not_clamped() {
        let events = vec![event(1, 2, 0), event(2, 0, 5), event(3, 1, 0)];
        let profile = compute_load_profile("T1", &topology(), &events);

        assert_eq!(profile.loads(), vec![2, -3, -2]);
        assert_eq!(profile.anomalies.len(), 2);
        assert_eq!(
            profile.anomalies[0],
            DataAnomaly::NegativeLoad {
                trip_id: "T1".into(),
                stop_name: "B".into(),
                sequence: 2,
                load: -3
            }
        );
    }

    #[test]
    fn test_event_off_topology_is_reported() {
        let events = vec![event(1, 3, 0), event(99, 1, 1)];
        let profile = compute_load_profile("T1", &topology(), &events);

        assert_eq!(profile.loads(), vec![3]);
        assert_eq!(
            profile.anomalies,
            vec![DataAnomaly::EventOffTopology {
                trip_id: "T1".into(),
                stop_id: 99
            }]
        );
    }

    #[test]
    fn test_trip_without_events_has_empty_profile() {
        let profile = compute_load_profile("T1", &topology(), &[]);
        assert!(profile.points.is_empty());
        assert!(profile.peak().is_none());
    }
}
