//! Per-site-type crawl behavior
//!
//! Every variant runs the same engine; a variant only decides how a single page
//! is handled and which extra path, if any, is probed after each page.

use crate::state::SiteType;

/// How the engine treats each page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// Fetch, process, and recurse into same-host links
    Traverse,
    /// Fetch one PDF at depth 0 and extract its text; never recurse
    SingleDocument,
}

/// When a follow-up probe runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeTrigger {
    /// Only after the page at depth 0
    RootPageOnly,
    /// After every page, when the site has `include-pdf` set
    IncludePdf,
}

/// An extra path probed after a page, one level deeper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowUpProbe {
    /// Absolute path joined onto the page URL
    pub path: &'static str,
    pub trigger: ProbeTrigger,
}

impl FollowUpProbe {
    /// Returns true if the probe should run after a page at `depth`
    pub fn applies(&self, depth: u32, include_pdf: bool) -> bool {
        match self.trigger {
            ProbeTrigger::RootPageOnly => depth == 0,
            ProbeTrigger::IncludePdf => include_pdf,
        }
    }
}

/// The behavior table entry for one variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantBehavior {
    pub mode: PageMode,
    pub follow_up: Option<FollowUpProbe>,
}

/// Crawl variants with specialized behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlVariant {
    Generic,
    Flask,
    Sphinx,
    WordPress,
    Pdf,
}

impl CrawlVariant {
    /// Selects the variant for a site type
    ///
    /// Types without a specialization (`Api`, `Dynamic`) run `Generic`.
    pub fn for_site_type(site_type: SiteType) -> Self {
        match site_type {
            SiteType::Flask => Self::Flask,
            SiteType::Sphinx => Self::Sphinx,
            SiteType::WordPress => Self::WordPress,
            SiteType::Pdf => Self::Pdf,
            SiteType::Generic | SiteType::Api | SiteType::Dynamic => Self::Generic,
        }
    }

    pub fn behavior(&self) -> VariantBehavior {
        match self {
            Self::Generic | Self::WordPress => VariantBehavior {
                mode: PageMode::Traverse,
                follow_up: None,
            },
            Self::Flask => VariantBehavior {
                mode: PageMode::Traverse,
                follow_up: Some(FollowUpProbe {
                    path: "/static/",
                    trigger: ProbeTrigger::RootPageOnly,
                }),
            },
            Self::Sphinx => VariantBehavior {
                mode: PageMode::Traverse,
                follow_up: Some(FollowUpProbe {
                    path: "/_downloads/",
                    trigger: ProbeTrigger::IncludePdf,
                }),
            },
            Self::Pdf => VariantBehavior {
                mode: PageMode::SingleDocument,
                follow_up: None,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Flask => "flask",
            Self::Sphinx => "sphinx",
            Self::WordPress => "wordpress",
            Self::Pdf => "pdf",
        }
    }
}
