/// Site type definitions driving crawl behavior
///
/// A site type is either configured explicitly per site or guessed by the detection
/// pipeline from a single probe response.
use std::fmt;

/// The kind of site being crawled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SiteType {
    /// Plain recursive crawl, used when nothing more specific applies
    #[default]
    Generic,

    /// Flask application (also probes the `/static/` tree)
    Flask,

    /// Sphinx documentation (optionally probes `/_downloads/`)
    Sphinx,

    /// WordPress site
    WordPress,

    /// A single PDF document
    Pdf,

    /// JSON/REST API; crawled generically
    Api,

    /// Script-rendered site; crawled generically
    Dynamic,
}

impl SiteType {
    /// Returns the lowercase name used in configuration files and the ledger
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Flask => "flask",
            Self::Sphinx => "sphinx",
            Self::WordPress => "wordpress",
            Self::Pdf => "pdf",
            Self::Api => "api",
            Self::Dynamic => "dynamic",
        }
    }

    /// Parses a known site type name (case-insensitive)
    ///
    /// Returns None if the string doesn't name any known type.
    pub fn parse_known(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" => Some(Self::Generic),
            "flask" => Some(Self::Flask),
            "sphinx" => Some(Self::Sphinx),
            "wordpress" => Some(Self::WordPress),
            "pdf" => Some(Self::Pdf),
            "api" => Some(Self::Api),
            "dynamic" => Some(Self::Dynamic),
            _ => None,
        }
    }

    /// Parses a configured site type, mapping unknown names to `Generic`
    pub fn from_config_str(s: &str) -> Self {
        Self::parse_known(s).unwrap_or_default()
    }

    /// Returns all site types
    pub fn all() -> Vec<Self> {
        vec![
            Self::Generic,
            Self::Flask,
            Self::Sphinx,
            Self::WordPress,
            Self::Pdf,
            Self::Api,
            Self::Dynamic,
        ]
    }
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
