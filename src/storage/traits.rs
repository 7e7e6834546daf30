//! Storage traits and error types
//!
//! This module defines the trait interface for the crawl ledger backend and
//! associated error types.

use crate::storage::{PageEntry, PageRecord, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for ledger backend implementations
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run in the `Running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets the final status of a run and stamps its finish time
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Page Records =====

    /// Records one processed page
    ///
    /// # Returns
    ///
    /// The ID of the new page row
    fn record_page(&mut self, run_id: i64, entry: &PageEntry) -> StorageResult<i64>;

    /// Gets every page recorded for a run, in insertion order
    fn get_pages_for_run(&self, run_id: i64) -> StorageResult<Vec<PageRecord>>;

    // ===== Statistics =====

    /// Gets total page count across runs
    fn count_total_pages(&self) -> StorageResult<u64>;

    /// Gets count of pages whose content was saved to disk
    fn count_saved_pages(&self) -> StorageResult<u64>;

    /// Gets page counts per site type, sorted by site type
    fn count_pages_by_site_type(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Gets page counts per run, newest run first
    fn count_pages_by_run(&self) -> StorageResult<Vec<(i64, u64)>>;
}
