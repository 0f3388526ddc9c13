//! Query catalog: identifiers, parameters and the stateless dispatcher.

pub mod analytics;
pub mod catalog;

use chrono::{NaiveDateTime, TimeDelta};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::anomaly::DataAnomaly;
use crate::error::{Result, StoreError};
use crate::flow::load_trip_profile;
use crate::topology::{check_topology, TopologyStop};
use analytics::TimeWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryId {
    Q1,
    Q2,
    Q3,
    Q4,
    Q5,
    Q6,
    Q7,
    Q8,
    Q9,
    Q10,
    OnTimeRanking,
    TopBoardingStops,
    DelayedTrips,
    TransferOpportunities,
    BusiestHours,
    LoadProfile,
}

impl QueryId {
    /// The fixed Q1–Q10 catalog, run by default
    pub const CATALOG: [QueryId; 10] = [
        QueryId::Q1,
        QueryId::Q2,
        QueryId::Q3,
        QueryId::Q4,
        QueryId::Q5,
        QueryId::Q6,
        QueryId::Q7,
        QueryId::Q8,
        QueryId::Q9,
        QueryId::Q10,
    ];

    pub const ALL: [QueryId; 16] = [
        QueryId::Q1,
        QueryId::Q2,
        QueryId::Q3,
        QueryId::Q4,
        QueryId::Q5,
        QueryId::Q6,
        QueryId::Q7,
        QueryId::Q8,
        QueryId::Q9,
        QueryId::Q10,
        QueryId::OnTimeRanking,
        QueryId::TopBoardingStops,
        QueryId::DelayedTrips,
        QueryId::TransferOpportunities,
        QueryId::BusiestHours,
        QueryId::LoadProfile,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            QueryId::Q1 => "Q1",
            QueryId::Q2 => "Q2",
            QueryId::Q3 => "Q3",
            QueryId::Q4 => "Q4",
            QueryId::Q5 => "Q5",
            QueryId::Q6 => "Q6",
            QueryId::Q7 => "Q7",
            QueryId::Q8 => "Q8",
            QueryId::Q9 => "Q9",
            QueryId::Q10 => "Q10",
            QueryId::OnTimeRanking => "on-time-ranking",
            QueryId::TopBoardingStops => "top-boarding-stops",
            QueryId::DelayedTrips => "delayed-trips",
            QueryId::TransferOpportunities => "transfer-opportunities",
            QueryId::BusiestHours => "busiest-hours",
            QueryId::LoadProfile => "load-profile",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            QueryId::Q1 => "All stops on a line in order",
            QueryId::Q2 => "Trips departing within an hour-of-day window",
            QueryId::Q3 => "Transfer stops (stops on several lines)",
            QueryId::Q4 => "Ordered stops (with offsets) for a trip",
            QueryId::Q5 => "Lines serving every listed stop",
            QueryId::Q6 => "Average ridership by line",
            QueryId::Q7 => "Busiest stops (board + alight)",
            QueryId::Q8 => "Late events count per line",
            QueryId::Q9 => "Trips with several delayed stops",
            QueryId::Q10 => "Stops with above-average boardings",
            QueryId::OnTimeRanking => "Lines ranked by on-time rate",
            QueryId::TopBoardingStops => "Top stops by boardings in a time window",
            QueryId::DelayedTrips => "Trips whose maximum delay exceeds a threshold",
            QueryId::TransferOpportunities => "Trips of different lines meeting at a stop",
            QueryId::BusiestHours => "Busiest hours of the day per line",
            QueryId::LoadProfile => "Passenger load along a trip",
        }
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for QueryId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        QueryId::ALL
            .iter()
            .find(|id| id.code().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("Unknown query: {}", s))
    }
}

impl Serialize for QueryId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

pub const DEFAULT_LINE: &str = "Route 20";
pub const DEFAULT_TRIP: &str = "T0001";
pub const DEFAULT_STOPS: [&str; 2] = ["Wilshire / Veteran", "Le Conte / Broxton"];

/// Largest accepted delay threshold or transfer window: one week
pub const MAX_MINUTES: i64 = 7 * 24 * 60;

/// Parameters shared by the catalog; each query reads only the fields it needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryParams {
    pub line: Option<String>,
    pub trip: Option<String>,
    /// Stops a line must serve (Q5)
    pub stops: Vec<String>,
    /// Restrict transfer detection to one stop
    pub transfer_stop: Option<String>,
    pub start_hour: u32,
    pub end_hour: u32,
    pub min_lines: i64,
    pub limit: usize,
    pub threshold_minutes: i64,
    pub min_count: i64,
    pub window_minutes: i64,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            line: None,
            trip: None,
            stops: Vec::new(),
            transfer_stop: None,
            start_hour: 7,
            end_hour: 8,
            min_lines: 2,
            limit: 10,
            threshold_minutes: 2,
            min_count: 3,
            window_minutes: 5,
            from: None,
            to: None,
        }
    }
}

impl QueryParams {
    pub fn validate(&self) -> Result<()> {
        if self.start_hour > 23 || self.end_hour > 23 {
            return Err(StoreError::InvalidParameter(format!(
                "hours must be within 0..=23 (got {}..={})",
                self.start_hour, self.end_hour
            )));
        }
        if self.start_hour > self.end_hour {
            return Err(StoreError::InvalidParameter(format!(
                "start hour {} is after end hour {}",
                self.start_hour, self.end_hour
            )));
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(StoreError::InvalidParameter(format!(
                    "window start {} is after its end {}",
                    from, to
                )));
            }
        }
        self.threshold()?;
        self.transfer_window()?;
        Ok(())
    }

    fn line_or_default(&self) -> &str {
        self.line.as_deref().unwrap_or(DEFAULT_LINE)
    }

    fn trip_or_default(&self) -> &str {
        self.trip.as_deref().unwrap_or(DEFAULT_TRIP)
    }

    fn stops_or_default(&self) -> Vec<String> {
        if self.stops.is_empty() {
            DEFAULT_STOPS.iter().map(|s| s.to_string()).collect()
        } else {
            self.stops.clone()
        }
    }

    fn window(&self) -> TimeWindow {
        TimeWindow {
            from: self.from,
            to: self.to,
        }
    }

    fn threshold(&self) -> Result<TimeDelta> {
        minutes_param("threshold", self.threshold_minutes)
    }

    fn transfer_window(&self) -> Result<TimeDelta> {
        minutes_param("window", self.window_minutes)
    }
}

fn minutes_param(name: &str, minutes: i64) -> Result<TimeDelta> {
    if !(0..=MAX_MINUTES).contains(&minutes) {
        return Err(StoreError::InvalidParameter(format!(
            "{} must be within 0..={} minutes (got {})",
            name, MAX_MINUTES, minutes
        )));
    }
    TimeDelta::try_minutes(minutes).ok_or_else(|| {
        StoreError::InvalidParameter(format!("{} of {} minutes is out of range", name, minutes))
    })
}

/// Tabular result of one query
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    pub query: QueryId,
    pub description: &'static str,
    pub count: usize,
    pub results: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<DataAnomaly>,
}

impl QueryOutput {
    fn new<T: Serialize>(id: QueryId, rows: Vec<T>) -> Result<Self> {
        let results = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<_>>>()?;
        Ok(Self {
            query: id,
            description: id.description(),
            count: results.len(),
            results,
            anomalies: Vec::new(),
        })
    }

    fn with_anomalies(mut self, anomalies: Vec<DataAnomaly>) -> Self {
        if !anomalies.is_empty() {
            warn!(query = %self.query, anomalies = anomalies.len(), "Query reported data anomalies");
        }
        self.anomalies = anomalies;
        self
    }
}

/// Run one query against a connection (normally a [`Snapshot`])
///
/// [`Snapshot`]: crate::store::Snapshot
pub fn run_query(conn: &Connection, id: QueryId, params: &QueryParams) -> Result<QueryOutput> {
    params.validate()?;

    match id {
        QueryId::Q1 => {
            let line = params.line_or_default();
            let stops = catalog::line_stops(conn, line)?;
            let anomalies = check_topology(line, &stops);
            Ok(QueryOutput::new(id, stops)?.with_anomalies(anomalies))
        }
        QueryId::Q2 => QueryOutput::new(
            id,
            catalog::trips_departing_between(conn, params.start_hour, params.end_hour)?,
        ),
        QueryId::Q3 => QueryOutput::new(id, catalog::transfer_stops(conn, params.min_lines)?),
        QueryId::Q4 => {
            let stops = catalog::trip_stops(conn, params.trip_or_default())?;
            let anomalies = trip_topology_anomalies(conn, params.trip_or_default(), &stops)?;
            Ok(QueryOutput::new(id, stops)?.with_anomalies(anomalies))
        }
        QueryId::Q5 => QueryOutput::new(
            id,
            catalog::lines_serving_all(conn, &params.stops_or_default())?
                .into_iter()
                .map(|line_name| serde_json::json!({ "line_name": line_name }))
                .collect(),
        ),
        QueryId::Q6 => QueryOutput::new(id, catalog::average_ridership_by_line(conn)?),
        QueryId::Q7 => QueryOutput::new(id, catalog::busiest_stops(conn, params.limit)?),
        QueryId::Q8 => {
            QueryOutput::new(id, catalog::late_events_per_line(conn, params.threshold()?)?)
        }
        QueryId::Q9 => QueryOutput::new(
            id,
            catalog::trips_with_delayed_stops(conn, params.threshold()?, params.min_count)?,
        ),
        QueryId::Q10 => QueryOutput::new(id, catalog::stops_above_average_boardings(conn)?),
        QueryId::OnTimeRanking => QueryOutput::new(
            id,
            analytics::on_time_ranking(conn, params.threshold()?, &params.window())?,
        ),
        QueryId::TopBoardingStops => QueryOutput::new(
            id,
            analytics::top_boarding_stops(conn, &params.window(), params.limit)?,
        ),
        QueryId::DelayedTrips => {
            QueryOutput::new(id, analytics::delayed_trips(conn, params.threshold()?)?)
        }
        QueryId::TransferOpportunities => QueryOutput::new(
            id,
            analytics::transfer_opportunities(
                conn,
                params.transfer_window()?,
                params.transfer_stop.as_deref(),
            )?,
        ),
        QueryId::BusiestHours => QueryOutput::new(
            id,
            analytics::busiest_hours(conn, params.line.as_deref(), params.limit)?,
        ),
        QueryId::LoadProfile => match load_trip_profile(conn, params.trip_or_default())? {
            Some(profile) => Ok(QueryOutput::new(id, profile.points)?.with_anomalies(profile.anomalies)),
            None => QueryOutput::new(id, Vec::<Value>::new()),
        },
    }
}

fn trip_topology_anomalies(
    conn: &Connection,
    trip_id: &str,
    stops: &[TopologyStop],
) -> Result<Vec<DataAnomaly>> {
    let line_name: Option<String> = conn
        .query_row(
            "SELECT l.line_name FROM trips t JOIN lines l ON l.line_id = t.line_id
             WHERE t.trip_id = ?1",
            [trip_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(line_name
        .map(|name| check_topology(&name, stops))
        .unwrap_or_default())
}
