//! CSV export of harvested records
//!
//! Records store their fields as ordered name/value pairs, and different
//! pages mention different fields. The export computes the column set as the
//! union of all field names, in first-seen order, after a fixed prefix of
//! bookkeeping columns.

use crate::extract::NOT_MENTIONED;
use crate::storage::RecordStore;
use crate::MagpieError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Columns present for every record, ahead of the extracted fields
const FIXED_COLUMNS: [&str; 4] = ["Identity", "Url", "Job Type", "Scrape Time"];

/// Exports every stored record to a CSV file
///
/// # Arguments
///
/// * `store` - The record store to export
/// * `path` - Destination file; overwritten if it exists
///
/// # Returns
///
/// * `Ok(count)` - Number of records written
/// * `Err(MagpieError)` - Storage or I/O failure
pub fn export_csv(store: &dyn RecordStore, path: &Path) -> Result<u64, MagpieError> {
    let records = store.all_records()?;

    // Union of field names across all records, first-seen order.
    let mut columns: Vec<String> = Vec::new();
    for record in &records {
        for (name, _) in &record.fields {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.clone());
            }
        }
    }

    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    let header: Vec<&str> = FIXED_COLUMNS
        .iter()
        .copied()
        .chain(columns.iter().map(String::as_str))
        .collect();
    write_row(&mut out, &header)?;

    for record in &records {
        let scrape_time = record.scraped_at.to_rfc3339();
        let mut row: Vec<&str> = vec![
            &record.identity,
            &record.url,
            &record.type_hint,
            &scrape_time,
        ];
        for column in &columns {
            let value = record
                .fields
                .iter()
                .find(|(name, _)| name == column)
                .map(|(_, value)| value.as_str())
                .unwrap_or(NOT_MENTIONED);
            row.push(value);
        }
        write_row(&mut out, &row)?;
    }

    out.flush()?;
    Ok(records.len() as u64)
}

fn write_row<W: Write>(out: &mut W, cells: &[&str]) -> std::io::Result<()> {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.write_all(b",")?;
        }
        write_cell(out, cell)?;
    }
    out.write_all(b"\r\n")
}

/// Quotes a cell when it contains a comma, quote, or line break, doubling
/// embedded quotes (RFC 4180).
fn write_cell<W: Write>(out: &mut W, cell: &str) -> std::io::Result<()> {
    let needs_quoting = cell.contains([',', '"', '\n', '\r']);
    if !needs_quoting {
        return out.write_all(cell.as_bytes());
    }

    out.write_all(b"\"")?;
    out.write_all(cell.replace('"', "\"\"").as_bytes())?;
    out.write_all(b"\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JobRecord, SqliteStore};
    use chrono::Utc;

    fn record(identity: &str, fields: Vec<(&str, &str)>) -> JobRecord {
        JobRecord {
            identity: identity.to_string(),
            url: format!("https://example.com/jobs/view/{}/", identity),
            type_hint: "Remote".to_string(),
            scraped_at: Utc::now(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn export_to_string(store: &SqliteStore) -> String {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.csv");
        export_csv(store, &path).unwrap();
        std::fs::read_to_string(&path).unwrap()
    }

    #[test]
    fn test_header_unions_fields_in_first_seen_order() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_if_absent(&record("1", vec![("Job Title", "A"), ("Company Name", "X")]))
            .unwrap();
        store
            .insert_if_absent(&record("2", vec![("Job Title", "B"), ("Salary Range", "50k")]))
            .unwrap();

        let csv = export_to_string(&store);
        let header = csv.lines().next().unwrap();
        assert_eq!(
            header,
            "Identity,Url,Job Type,Scrape Time,Job Title,Company Name,Salary Range"
        );
    }

    #[test]
    fn test_missing_fields_use_sentinel() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_if_absent(&record("1", vec![("Job Title", "A"), ("Company Name", "X")]))
            .unwrap();
        store
            .insert_if_absent(&record("2", vec![("Job Title", "B")]))
            .unwrap();

        let csv = export_to_string(&store);
        let second_record = csv.lines().nth(2).unwrap();
        assert!(second_record.ends_with(&format!("B,{}", NOT_MENTIONED)));
    }

    #[test]
    fn test_cells_with_commas_and_quotes_are_escaped() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_if_absent(&record(
                "1",
                vec![("Job Description", "Fast, \"safe\" systems")],
            ))
            .unwrap();

        let csv = export_to_string(&store);
        assert!(csv.contains("\"Fast, \"\"safe\"\" systems\""));
    }

    #[test]
    fn test_export_count() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.insert_if_absent(&record("1", vec![])).unwrap();
        store.insert_if_absent(&record("2", vec![])).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.csv");
        assert_eq!(export_csv(&store, &path).unwrap(), 2);
    }

    #[test]
    fn test_empty_store_writes_fixed_header_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        let csv = export_to_string(&store);
        assert_eq!(csv.trim_end(), "Identity,Url,Job Type,Scrape Time");
    }
}
