use crate::filter::SiteFilter;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Runtime tuning for detection and autofill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Quiet period after the last mutation before a scan runs
    pub debounce_ms: u64,
    /// Interval of the safety-net polling scan
    pub poll_interval_ms: u64,
    /// Delay between writing a field and blurring it
    pub blur_delay_ms: u64,
    /// Delay before the first scan after page load
    pub initial_scan_delay_ms: u64,
    /// Host patterns that are never scanned
    pub excluded_hosts: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            poll_interval_ms: 5000,
            blur_delay_ms: 50,
            initial_scan_delay_ms: 1000,
            excluded_hosts: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Loading settings from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        settings.site_filter()?;
        Ok(settings)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn blur_delay(&self) -> Duration {
        Duration::from_millis(self.blur_delay_ms)
    }

    pub fn initial_scan_delay(&self) -> Duration {
        Duration::from_millis(self.initial_scan_delay_ms)
    }

    pub fn site_filter(&self) -> Result<SiteFilter> {
        SiteFilter::new().with_excluded(&self.excluded_hosts)
    }
}
