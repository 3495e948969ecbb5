use crate::{Error, Result};
use url::Url;

/// The page a scan ran against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    url: String,
    hostname: String,
}

impl PageLocation {
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;

        Ok(Self {
            url: parsed.to_string(),
            hostname: Self::normalize_host(parsed.host_str().unwrap_or("")),
        })
    }

    /// Hostname as sent to the host collaborator: lowercased and trimmed
    pub fn normalize_host(host: &str) -> String {
        host.trim().trim_end_matches('.').to_lowercase()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Lowercased hostname, empty for pages without a host
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Registrable domain from the Public Suffix List (`login.example.co.uk`
    /// becomes `example.co.uk`). IP addresses are returned unchanged.
    pub fn registrable_domain(&self) -> String {
        let host = self.hostname.trim_start_matches('[').trim_end_matches(']');
        if host.parse::<std::net::IpAddr>().is_ok() {
            return host.to_string();
        }

        match psl::domain(host.as_bytes()) {
            Some(root) => String::from_utf8_lossy(root.as_bytes()).to_string(),
            None => host.to_string(),
        }
    }
}
