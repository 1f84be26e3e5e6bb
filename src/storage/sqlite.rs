//! SQLite record store implementation

use crate::storage::schema::initialize_schema;
use crate::storage::{JobRecord, RecordStore, RunRecord, RunStatus, StoreError, StoreResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory store (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn load_fields(&self, identity: &str) -> StoreResult<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, value FROM job_fields WHERE identity = ?1 ORDER BY pos")?;
        let rows = stmt.query_map(params![identity], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobRecord> {
        let scraped_at: String = row.get(3)?;
        Ok(JobRecord {
            identity: row.get(0)?,
            url: row.get(1)?,
            type_hint: row.get(2)?,
            scraped_at: scraped_at
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
            fields: Vec::new(),
        })
    }
}

impl RecordStore for SqliteStore {
    fn exists_by_identity(&self, identity: &str) -> StoreResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM jobs WHERE identity = ?1",
                params![identity],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_if_absent(&mut self, record: &JobRecord) -> StoreResult<bool> {
        let tx = self.conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO jobs (identity, url, job_type, scraped_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.identity,
                record.url,
                record.type_hint,
                record.scraped_at.to_rfc3339()
            ],
        )?;

        if inserted == 0 {
            // Identity already present; the existing record wins.
            return Ok(false);
        }

        for (pos, (name, value)) in record.fields.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO job_fields (identity, pos, name, value)
                 VALUES (?1, ?2, ?3, ?4)",
                params![record.identity, pos as i64, name, value],
            )?;
        }

        tx.commit()?;
        Ok(true)
    }

    fn get_by_identity(&self, identity: &str) -> StoreResult<Option<JobRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT identity, url, job_type, scraped_at FROM jobs WHERE identity = ?1",
                params![identity],
                Self::record_from_row,
            )
            .optional()?;

        match record {
            Some(mut record) => {
                record.fields = self.load_fields(identity)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn all_records(&self) -> StoreResult<Vec<JobRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT identity, url, job_type, scraped_at FROM jobs ORDER BY scraped_at, identity",
        )?;
        let records = stmt
            .query_map([], Self::record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut out = Vec::with_capacity(records.len());
        for mut record in records {
            record.fields = self.load_fields(&record.identity)?;
            out.push(record);
        }
        Ok(out)
    }

    fn count_records(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_by_type(&self) -> StoreResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT job_type, COUNT(*) AS n FROM jobs GROUP BY job_type ORDER BY n DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn create_run(&mut self, config_hash: &str) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;

        if updated == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn list_runs(&self) -> StoreResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status
             FROM runs ORDER BY id DESC",
        )?;
        let runs = stmt.query_map([], |row| {
            Ok(RunRecord {
                id: row.get(0)?,
                started_at: row.get(1)?,
                finished_at: row.get(2)?,
                config_hash: row.get(3)?,
                status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                    .unwrap_or(RunStatus::Running),
            })
        })?;
        Ok(runs.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
