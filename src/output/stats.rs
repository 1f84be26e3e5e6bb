//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::storage::RecordStore;
use crate::storage::RunRecord;
use crate::MagpieError;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Total number of stored job records
    pub total_records: u64,

    /// Record counts per listing type, most common first
    pub records_by_type: Vec<(String, u64)>,

    /// Recorded runs, newest first
    pub runs: Vec<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `store` - The record store to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(MagpieError)` - Failed to query statistics
pub fn load_statistics(store: &dyn RecordStore) -> Result<HarvestStatistics, MagpieError> {
    Ok(HarvestStatistics {
        total_records: store.count_records()?,
        records_by_type: store.count_by_type()?,
        runs: store.list_runs()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Total job records: {}", stats.total_records);
    println!();

    if !stats.records_by_type.is_empty() {
        println!("Records by Type:");
        for (job_type, count) in &stats.records_by_type {
            let percentage = if stats.total_records > 0 {
                (*count as f64 / stats.total_records as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", job_type, count, percentage);
        }
        println!();
    }

    if !stats.runs.is_empty() {
        println!("Runs ({}):", stats.runs.len());
        for run in &stats.runs {
            let finished = run.finished_at.as_deref().unwrap_or("-");
            println!(
                "  #{} {} -> {} [{}]",
                run.id,
                run.started_at,
                finished,
                run.status.to_db_string()
            );
        }
    }
}
