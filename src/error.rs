use rusqlite::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Uniqueness, range, enumeration or foreign-key failure on write
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Cannot delete from {table}: referenced by {count} row(s) in {referenced_by}")]
    ReferentialIntegrity {
        table: &'static str,
        referenced_by: &'static str,
        count: i64,
    },

    #[error("Query {query} exceeded its {budget_ms}ms budget")]
    QueryTimeout { query: String, budget_ms: u128 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True when SQLite aborted a statement through the progress handler
    pub fn is_interrupt(&self) -> bool {
        matches!(
            self,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::OperationInterrupted
        )
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref code, ref message)
                if code.code == ErrorCode::ConstraintViolation =>
            {
                let detail = message.clone().unwrap_or_else(|| code.to_string());
                StoreError::ConstraintViolation(detail)
            }
            other => StoreError::Sqlite(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
