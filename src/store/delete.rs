use rusqlite::types::Value;
use rusqlite::{OptionalExtension, Transaction};
use serde::Serialize;
use tracing::info;

use super::Store;
use crate::error::{Result, StoreError};
use crate::schema::{DependencyResolver, TableSchema, LINES, STOPS, TRIPS};

/// Rows removed by one delete, in the order they were removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    pub deleted: Vec<(&'static str, usize)>,
}

impl DeleteSummary {
    pub fn rows_in(&self, table: &str) -> usize {
        self.deleted
            .iter()
            .filter(|(t, _)| *t == table)
            .map(|(_, n)| n)
            .sum()
    }
}

impl Store {
    /// Delete a line and its topology. Fails with
    /// [`StoreError::ReferentialIntegrity`] while any trip runs on it.
    /// Returns `None` when no line has that name.
    pub fn delete_line(&self, line_name: &str) -> Result<Option<DeleteSummary>> {
        self.delete_by_name(&LINES, "SELECT line_id FROM lines WHERE line_name = ?1", line_name)
    }

    /// Delete a stop together with its topology entries and stop events
    pub fn delete_stop(&self, stop_name: &str) -> Result<Option<DeleteSummary>> {
        self.delete_by_name(&STOPS, "SELECT stop_id FROM stops WHERE stop_name = ?1", stop_name)
    }

    /// Delete a trip together with its stop events
    pub fn delete_trip(&self, trip_id: &str) -> Result<Option<DeleteSummary>> {
        self.delete_by_name(&TRIPS, "SELECT trip_id FROM trips WHERE trip_id = ?1", trip_id)
    }

    fn delete_by_name(
        &self,
        table: &TableSchema,
        key_sql: &str,
        name: &str,
    ) -> Result<Option<DeleteSummary>> {
        let mut conn = self.writer();
        let tx = conn.transaction()?;

        let key: Option<Value> = tx.query_row(key_sql, [name], |row| row.get(0)).optional()?;
        let Some(key) = key else {
            return Ok(None);
        };

        let summary = delete_row(&tx, table, &key)?;
        tx.commit()?;

        info!(table = table.name, key = name, deleted = ?summary.deleted, "Deleted row");
        Ok(Some(summary))
    }
}

/// Apply the table's delete plan: restrict checks first, then cascades
/// children-first, then the row itself
fn delete_row(tx: &Transaction, table: &TableSchema, key: &Value) -> Result<DeleteSummary> {
    let plan = DependencyResolver::new()
        .delete_plan(table.name)
        .map_err(StoreError::Schema)?;

    for restriction in &plan.restrictions {
        let count: i64 = tx.query_row(&restriction.count_sql(), [key], |row| row.get(0))?;
        if count > 0 {
            return Err(StoreError::ReferentialIntegrity {
                table: plan.table,
                referenced_by: restriction.table,
                count,
            });
        }
    }

    let mut summary = DeleteSummary::default();
    for step in &plan.deletes {
        let n = tx.execute(&step.delete_sql(), [key])?;
        summary.deleted.push((step.table, n));
    }

    Ok(summary)
}
