//! Data-quality findings reported next to query results.
//!
//! An anomaly never aborts a query: it describes upstream data that breaks a
//! documented invariant, while the computed result is still returned as-is.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataAnomaly {
    /// Cumulative load went below zero: more alighted than ever boarded
    NegativeLoad {
        trip_id: String,
        stop_name: String,
        sequence: i64,
        load: i64,
    },
    /// A line's sequence numbers are not the contiguous range 1..N
    SequenceGap {
        line_name: String,
        expected: i64,
        found: i64,
    },
    /// Time offset went backwards along the stop sequence
    DecreasingOffset {
        line_name: String,
        sequence: i64,
        time_offset: i64,
        previous_offset: i64,
    },
    /// A stop event at a stop the trip's line never serves
    EventOffTopology { trip_id: String, stop_id: i64 },
}

impl fmt::Display for DataAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataAnomaly::NegativeLoad {
                trip_id,
                stop_name,
                sequence,
                load,
            } => write!(
                f,
                "trip {} has negative load {} at {} (sequence {})",
                trip_id, load, stop_name, sequence
            ),
            DataAnomaly::SequenceGap {
                line_name,
                expected,
                found,
            } => write!(
                f,
                "line {} expected sequence {} but found {}",
                line_name, expected, found
            ),
            DataAnomaly::DecreasingOffset {
                line_name,
                sequence,
                time_offset,
                previous_offset,
            } => write!(
                f,
                "line {} offset drops from {} to {} at sequence {}",
                line_name, previous_offset, time_offset, sequence
            ),
            DataAnomaly::EventOffTopology { trip_id, stop_id } => write!(
                f,
                "trip {} has an event at stop {}, which is not on its line",
                trip_id, stop_id
            ),
        }
    }
}
