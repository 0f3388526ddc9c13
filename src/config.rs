use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-query latency budget used when none is configured
pub const DEFAULT_QUERY_BUDGET: Duration = Duration::from_millis(500);

const DB_FILE_NAME: &str = "transit.db";

/// Where the store lives and how long a query may run
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub query_budget: Duration,
}

impl StoreConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            query_budget: DEFAULT_QUERY_BUDGET,
        }
    }

    pub fn with_query_budget(self, query_budget: Duration) -> Self {
        Self {
            query_budget,
            ..self
        }
    }

    /// Resolve the database path, falling back to the platform data directory
    pub fn resolve(custom_path: Option<PathBuf>, budget_ms: u64) -> Result<Self> {
        let db_path = match custom_path {
            Some(path) => path,
            None => {
                let proj_dirs = ProjectDirs::from("", "", "transit-analytics")
                    .context("Could not determine data directory")?;
                proj_dirs.data_dir().join(DB_FILE_NAME)
            }
        };

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        Ok(Self::new(db_path).with_query_budget(Duration::from_millis(budget_ms)))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_uses_custom_path_and_budget() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("network.db");

        let config = StoreConfig::resolve(Some(path.clone()), 250).unwrap();

        assert_eq!(config.db_path(), path.as_path());
        assert_eq!(config.query_budget, Duration::from_millis(250));
        assert!(path.parent().unwrap().exists());
    }

    #[test]
    fn test_new_uses_default_budget() {
        assert_eq!(StoreConfig::new("x.db").query_budget, DEFAULT_QUERY_BUDGET);
    }
}
