use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::queries::QueryParams;

#[derive(Parser, Debug)]
#[command(name = "transit-analytics")]
#[command(version, about = "Relational store and analytic queries for a transit network")]
pub struct Cli {
    /// SQLite database path (defaults to the platform data directory)
    #[arg(long, global = true, env = "TRANSIT_DB")]
    pub db: Option<PathBuf>,

    /// Per-query latency budget in milliseconds
    #[arg(long, global = true, env = "TRANSIT_QUERY_BUDGET_MS", default_value_t = 500)]
    pub budget_ms: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the schema (safe to run on an existing store)
    Init,

    /// Run catalog or analytic queries and print JSON
    Query {
        /// Queries to run (Q1..Q10 or an analytic name); all of Q1..Q10 if omitted
        ids: Vec<String>,

        /// Run the catalog except these queries (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        exclude: Option<Vec<String>>,

        #[command(flatten)]
        args: QueryArgs,

        /// Print one line of JSON instead of indented output
        #[arg(long)]
        compact: bool,
    },

    /// List every query id with its description
    ListQueries,

    /// Print the DDL for all tables and indexes
    Schema,

    /// Report topology anomalies for every line
    Check,

    /// Delete a line and its topology (refused while trips reference it)
    DeleteLine {
        /// Line name
        name: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Line name (Q1, busiest-hours)
    #[arg(long)]
    pub line: Option<String>,

    /// Trip id (Q4, load-profile)
    #[arg(long)]
    pub trip: Option<String>,

    /// Stops every line must serve (Q5, comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub stops: Vec<String>,

    /// Only look for transfers at this stop
    #[arg(long)]
    pub stop: Option<String>,

    #[arg(long, default_value_t = 7)]
    pub start_hour: u32,

    #[arg(long, default_value_t = 8)]
    pub end_hour: u32,

    #[arg(long, default_value_t = 2)]
    pub min_lines: i64,

    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Lateness threshold in minutes
    #[arg(long, default_value_t = 2)]
    pub threshold: i64,

    #[arg(long, default_value_t = 3)]
    pub min_count: i64,

    /// Transfer window in minutes
    #[arg(long, default_value_t = 5)]
    pub window: i64,

    /// Only events scheduled at or after this time ("YYYY-MM-DD HH:MM:SS")
    #[arg(long, value_parser = parse_timestamp)]
    pub from: Option<NaiveDateTime>,

    /// Only events scheduled before this time
    #[arg(long, value_parser = parse_timestamp)]
    pub to: Option<NaiveDateTime>,
}

impl QueryArgs {
    pub fn into_params(self) -> QueryParams {
        QueryParams {
            line: self.line,
            trip: self.trip,
            stops: self.stops,
            transfer_stop: self.stop,
            start_hour: self.start_hour,
            end_hour: self.end_hour,
            min_lines: self.min_lines,
            limit: self.limit,
            threshold_minutes: self.threshold,
            min_count: self.min_count,
            window_minutes: self.window,
            from: self.from,
            to: self.to,
        }
    }
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| format!("expected YYYY-MM-DD HH:MM:SS: {}", e))
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
