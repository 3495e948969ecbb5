mod host_matcher;

pub use host_matcher::HostPattern;

use crate::location::PageLocation;

/// Decides which pages may be scanned
///
/// A page is skipped when its host matches ANY excluded pattern.
#[derive(Debug, Default, Clone)]
pub struct SiteFilter {
    pub excluded: Vec<HostPattern>,
}

impl SiteFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add excluded host patterns from a list of pattern strings
    pub fn with_excluded(mut self, patterns: &[String]) -> crate::Result<Self> {
        for pattern in patterns {
            self.excluded.push(HostPattern::parse(pattern)?);
        }
        Ok(self)
    }

    /// Whether a page URL may be scanned
    pub fn allows_url(&self, url: &str) -> bool {
        if self.excluded.is_empty() {
            return true;
        }

        // Pages without a host (about:blank, data:) are never excluded
        let location = match PageLocation::parse(url) {
            Ok(location) => location,
            Err(e) => {
                tracing::debug!("Failed to parse URL {}: {}", url, e);
                return true;
            }
        };

        self.allows_host(location.hostname())
    }

    pub fn allows_host(&self, hostname: &str) -> bool {
        match self.excluded_by(hostname) {
            Some(pattern) => {
                tracing::debug!("{} excluded by pattern {}", hostname, pattern);
                false
            }
            None => true,
        }
    }

    /// The first exclusion pattern covering `hostname`
    pub fn excluded_by(&self, hostname: &str) -> Option<&HostPattern> {
        if hostname.is_empty() {
            return None;
        }
        self.excluded.iter().find(|pattern| pattern.matches(hostname))
    }
}
