//! Storage module for the crawl ledger
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Run tracking (start, finish, final status)
//! - One record per processed page
//!
//! The ledger is an audit trail only; nothing is read back during a crawl.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::state::SiteType;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// A page to be recorded
#[derive(Debug, Clone, PartialEq)]
pub struct PageEntry {
    pub site_url: String,
    pub url: String,
    pub site_type: SiteType,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub saved_path: Option<String>,
    pub title: Option<String>,
}

/// Represents a recorded page in the database
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub run_id: i64,
    pub site_url: String,
    pub url: String,
    pub site_type: SiteType,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub saved_path: Option<String>,
    pub title: Option<String>,
    pub crawled_at: String,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Shared handle to one run of the ledger
///
/// Cheap to clone; every crawl task of the run records through its own clone.
#[derive(Clone)]
pub struct RunLedger {
    storage: Arc<Mutex<SqliteStorage>>,
    run_id: i64,
}

impl RunLedger {
    /// Creates a new run in `storage` and returns a handle to it
    pub fn begin(storage: Arc<Mutex<SqliteStorage>>, config_hash: &str) -> StorageResult<Self> {
        let run_id = lock(&storage).create_run(config_hash)?;
        Ok(Self { storage, run_id })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Records one processed page for this run
    pub fn record(&self, entry: &PageEntry) -> StorageResult<i64> {
        lock(&self.storage).record_page(self.run_id, entry)
    }

    /// Marks the run finished with `status`
    pub fn finish(&self, status: RunStatus) -> StorageResult<()> {
        lock(&self.storage).finish_run(self.run_id, status)
    }

    /// Gets the pages recorded for this run so far
    pub fn pages(&self) -> StorageResult<Vec<PageRecord>> {
        lock(&self.storage).get_pages_for_run(self.run_id)
    }
}

fn lock(storage: &Mutex<SqliteStorage>) -> MutexGuard<'_, SqliteStorage> {
    storage.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Interrupted,
            RunStatus::Failed,
        ] {
            let db_str = status.to_db_string();
            let parsed = RunStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }

    #[test]
    fn test_run_ledger_records_and_finishes() {
        let storage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
        let ledger = RunLedger::begin(storage.clone(), "hash").unwrap();

        ledger
            .record(&PageEntry {
                site_url: "https://docs.example.org".to_string(),
                url: "https://docs.example.org/".to_string(),
                site_type: SiteType::Sphinx,
                status_code: Some(200),
                content_type: Some("text/html".to_string()),
                saved_path: None,
                title: Some("Docs".to_string()),
            })
            .unwrap();
        ledger.finish(RunStatus::Interrupted).unwrap();

        let pages = ledger.pages().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].site_type, SiteType::Sphinx);

        let run = lock(&storage).get_run(ledger.run_id()).unwrap();
        assert_eq!(run.status, RunStatus::Interrupted);
        assert!(run.finished_at.is_some());
    }
}
