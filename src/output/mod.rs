//! Output module for exports and reports
//!
//! This module handles:
//! - Exporting harvested records as CSV
//! - Summarizing the database for the `--stats` view

mod csv;
pub mod stats;

pub use csv::export_csv;
pub use stats::{load_statistics, print_statistics, HarvestStatistics};
