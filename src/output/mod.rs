//! Output module for reporting on the crawl ledger
//!
//! This module handles reading aggregate counts back out of the ledger and
//! printing them for the `--stats` command.

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
