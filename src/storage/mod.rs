//! Storage module for persisting harvested records
//!
//! This module handles all database operations for the pipeline, including:
//! - SQLite database initialization and schema management
//! - Idempotent, identity-keyed record persistence
//! - Harvest run tracking
//! - Record export for reporting

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A fully extracted job record, keyed by identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    /// Stable identity key derived from the listing URL
    pub identity: String,

    /// The detail-page URL the record was scraped from
    pub url: String,

    /// Best-effort type classifier from the listing card
    pub type_hint: String,

    /// When the record was scraped
    pub scraped_at: DateTime<Utc>,

    /// Extracted fields in presentation order
    pub fields: Vec<(String, String)>,
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}

/// Trait for record store backends
///
/// The pipeline serializes the check-then-insert path externally (one shared
/// mutex across all workers), so implementations need no internal locking.
pub trait RecordStore: Send {
    /// Returns true if a record with this identity key is already stored
    fn exists_by_identity(&self, identity: &str) -> StoreResult<bool>;

    /// Inserts the record unless its identity key is already present.
    ///
    /// Returns true if the record was newly inserted, false if it already
    /// existed. Both outcomes are success.
    fn insert_if_absent(&mut self, record: &JobRecord) -> StoreResult<bool>;

    /// Fetches a record by identity key
    fn get_by_identity(&self, identity: &str) -> StoreResult<Option<JobRecord>>;

    /// Returns all stored records, oldest first
    fn all_records(&self) -> StoreResult<Vec<JobRecord>>;

    /// Total stored record count
    fn count_records(&self) -> StoreResult<u64>;

    /// Record counts broken down by type hint, descending
    fn count_by_type(&self) -> StoreResult<Vec<(String, u64)>>;

    // ===== Run Management =====

    /// Creates a new harvest run, returning its ID
    fn create_run(&mut self, config_hash: &str) -> StoreResult<i64>;

    /// Marks a run finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StoreResult<()>;

    /// Returns all runs, most recent first
    fn list_runs(&self) -> StoreResult<Vec<RunRecord>>;
}
