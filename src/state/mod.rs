//! State module for crawl bookkeeping
//!
//! # Components
//!
//! - `SiteType`: The detected or configured kind of site, which selects the crawl variant
//! - `TaskState`: Lifecycle of one supervised crawl task

mod site_type;
mod task_state;

// Re-export main types
pub use site_type::SiteType;
pub use task_state::TaskState;
