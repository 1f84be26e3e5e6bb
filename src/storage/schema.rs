//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Magpie database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per harvested job, keyed by identity
CREATE TABLE IF NOT EXISTS jobs (
    identity TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    job_type TEXT NOT NULL,
    scraped_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_type ON jobs(job_type);

-- Extracted fields per job, with presentation order preserved
CREATE TABLE IF NOT EXISTS job_fields (
    identity TEXT NOT NULL REFERENCES jobs(identity) ON DELETE CASCADE,
    pos INTEGER NOT NULL,
    name TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (identity, name)
);

CREATE INDEX IF NOT EXISTS idx_job_fields_identity ON job_fields(identity);
"#;

use rusqlite::Connection;

/// Initializes the database schema
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
