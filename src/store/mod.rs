//! The store handle shared by every component.
//!
//! One [`Store`] is opened per process. It owns the single writer connection
//! (loads and deletes run in one transaction each) and hands out read-only
//! [`Snapshot`]s, so any number of queries can run in parallel without
//! blocking each other or observing a half-applied load.

mod delete;
mod load;
pub mod schema_gen;

pub use delete::DeleteSummary;
pub use load::LoadSummary;

use rusqlite::{Connection, OpenFlags};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::anomaly::DataAnomaly;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::queries::{run_query, QueryId, QueryOutput, QueryParams};
use crate::schema::DependencyResolver;
use crate::topology::check_all_topologies;
use schema_gen::generate_schema;

/// VM instructions between deadline checks
const PROGRESS_OPS: i32 = 1000;

pub struct Store {
    path: PathBuf,
    writer: Mutex<Connection>,
    query_budget: Duration,
}

impl Store {
    /// Open (or create) the store and make sure the schema exists
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let conn = Connection::open(&config.db_path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let store = Self {
            path: config.db_path.clone(),
            writer: Mutex::new(conn),
            query_budget: config.query_budget,
        };
        store.create_schema()?;

        info!(path = %store.path.display(), "Opened transit store");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn query_budget(&self) -> Duration {
        self.query_budget
    }

    /// Create all tables and indexes; safe to run against an existing store
    pub fn create_schema(&self) -> Result<()> {
        let tables = DependencyResolver::new()
            .load_order()
            .map_err(StoreError::Schema)?;
        let conn = self.writer();

        for sql in generate_schema(&tables) {
            conn.execute(&sql, [])?;
        }

        debug!(tables = tables.len(), "Schema ready");
        Ok(())
    }

    /// Open a read-only snapshot; everything read through it sees one
    /// consistent state of the store
    pub fn snapshot(&self) -> Result<Snapshot> {
        Snapshot::open(&self.path, self.query_budget)
    }

    /// Run one catalog query in its own snapshot
    pub fn query(&self, id: QueryId, params: &QueryParams) -> Result<QueryOutput> {
        let snapshot = self.snapshot()?;
        snapshot.run(id.code(), |conn| run_query(conn, id, params))
    }

    /// Check every line's topology for sequence gaps and decreasing offsets
    pub fn check_topology(&self) -> Result<Vec<DataAnomaly>> {
        let snapshot = self.snapshot()?;
        snapshot.run("check-topology", check_all_topologies)
    }

    fn writer(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-write drops its transaction, which rolls it back
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A read-only transaction over the store
pub struct Snapshot {
    conn: Connection,
    budget: Duration,
}

impl Snapshot {
    fn open(path: &Path, budget: Duration) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("BEGIN DEFERRED")?;
        // The read snapshot starts at the first read, so take it now
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |_| Ok(()))?;
        Ok(Self { conn, budget })
    }

    /// Run `f` under the query budget.
    ///
    /// Statements still running at the deadline are interrupted, and work that
    /// finishes late is discarded; both surface as [`StoreError::QueryTimeout`].
    pub fn run<T>(&self, name: &str, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let started = Instant::now();
        let deadline = started + self.budget;
        self.conn
            .progress_handler(PROGRESS_OPS, Some(move || Instant::now() >= deadline));

        let result = f(&self.conn);

        self.conn.progress_handler(PROGRESS_OPS, None::<fn() -> bool>);
        let elapsed = started.elapsed();

        let timed_out = match &result {
            Err(err) => err.is_interrupt(),
            Ok(_) => elapsed > self.budget,
        };
        if timed_out {
            warn!(query = name, elapsed_ms = elapsed.as_millis(), "Query exceeded budget");
            return Err(StoreError::QueryTimeout {
                query: name.to_string(),
                budget_ms: self.budget.as_millis(),
            });
        }

        debug!(query = name, elapsed_ms = elapsed.as_millis(), "Query finished");
        result
    }
}

impl Deref for Snapshot {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}
