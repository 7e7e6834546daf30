//! Statistics generation from the crawl ledger
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::SitewiseError;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of pages recorded across all runs
    pub total_pages: u64,

    /// Pages whose content was written to disk
    pub saved_pages: u64,

    /// Count of pages by site type, largest first
    pub pages_by_site_type: Vec<(String, u64)>,

    /// Count of pages by run id, newest run first
    pub pages_by_run: Vec<(i64, u64)>,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(SitewiseError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, SitewiseError> {
    let total_pages = storage.count_total_pages()?;
    let saved_pages = storage.count_saved_pages()?;

    let mut pages_by_site_type = storage.count_pages_by_site_type()?;
    pages_by_site_type.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut pages_by_run = storage.count_pages_by_run()?;
    pages_by_run.sort_by(|a, b| b.0.cmp(&a.0));

    let latest_run = storage.get_latest_run()?;

    Ok(CrawlStatistics {
        total_pages,
        saved_pages,
        pages_by_site_type,
        pages_by_run,
        latest_run,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Total pages recorded: {}", stats.total_pages);
    println!("  Pages saved to disk: {}", stats.saved_pages);
    println!();

    if !stats.pages_by_site_type.is_empty() {
        println!("Pages by Site Type:");
        for (site_type, count) in &stats.pages_by_site_type {
            let percentage = if stats.total_pages > 0 {
                (*count as f64 / stats.total_pages as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", site_type, count, percentage);
        }
        println!();
    }

    if !stats.pages_by_run.is_empty() {
        println!("Pages by Run:");
        for (run_id, count) in &stats.pages_by_run {
            println!("  #{}: {}", run_id, count);
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => println!(
            "Latest Run: #{} {} (started {}, finished {})",
            run.id,
            run.status.to_db_string(),
            run.started_at,
            run.finished_at.as_deref().unwrap_or("-")
        ),
        None => println!("No crawl runs recorded"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SiteType;
    use crate::storage::{PageEntry, RunStatus, SqliteStorage};

    fn entry(url: &str, site_type: SiteType, saved: bool) -> PageEntry {
        PageEntry {
            site_url: "https://example.com".to_string(),
            url: url.to_string(),
            site_type,
            status_code: Some(200),
            content_type: Some("text/html".to_string()),
            saved_path: saved.then(|| "/tmp/page.html".to_string()),
            title: None,
        }
    }

    #[test]
    fn test_empty_ledger() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let stats = load_statistics(&storage).unwrap();

        assert_eq!(stats.total_pages, 0);
        assert!(stats.pages_by_site_type.is_empty());
        assert!(stats.latest_run.is_none());
    }

    #[test]
    fn test_statistics_across_runs() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        let first = storage.create_run("hash").unwrap();
        storage
            .record_page(first, &entry("https://example.com/", SiteType::Sphinx, true))
            .unwrap();
        storage.finish_run(first, RunStatus::Completed).unwrap();

        let second = storage.create_run("hash").unwrap();
        storage
            .record_page(second, &entry("https://example.com/", SiteType::Sphinx, true))
            .unwrap();
        storage
            .record_page(second, &entry("https://example.com/a", SiteType::Generic, false))
            .unwrap();

        let stats = load_statistics(&storage).unwrap();

        assert_eq!(stats.total_pages, 3);
        assert_eq!(stats.saved_pages, 2);
        assert_eq!(stats.pages_by_site_type[0], ("sphinx".to_string(), 2));
        assert_eq!(stats.pages_by_run, vec![(second, 2), (first, 1)]);
        assert_eq!(stats.latest_run.unwrap().id, second);
    }
}
