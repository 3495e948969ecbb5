use crate::location::PageLocation;
use crate::{Error, Result};
use glob::{MatchOptions, Pattern};
use std::fmt;

const HOST_MATCH: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// One entry of the site exclusion list
#[derive(Debug, Clone)]
pub enum HostPattern {
    /// A single host, e.g. `intranet`
    Exact(String),
    /// `*` and `?` wildcards, e.g. `*.bank.example`
    Glob(Pattern),
}

impl HostPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        let host = PageLocation::normalize_host(pattern);
        if host.is_empty() {
            return Err(Error::InvalidPattern("Host pattern is empty".to_string()));
        }
        if host.contains(['/', ':']) {
            return Err(Error::InvalidPattern(format!(
                "'{}' is not a host (drop the scheme, port and path)",
                pattern.trim()
            )));
        }

        if !host.contains(['*', '?']) {
            return Ok(HostPattern::Exact(host));
        }

        Pattern::new(&host)
            .map(HostPattern::Glob)
            .map_err(|e| Error::InvalidPattern(format!("Invalid glob pattern '{}': {}", pattern, e)))
    }

    /// Whether `hostname` (any case, optional trailing dot) is covered
    pub fn matches(&self, hostname: &str) -> bool {
        let host = PageLocation::normalize_host(hostname);
        match self {
            HostPattern::Exact(exact) => host == *exact,
            HostPattern::Glob(glob) => glob.matches_with(&host, HOST_MATCH),
        }
    }
}

impl fmt::Display for HostPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostPattern::Exact(exact) => f.write_str(exact),
            HostPattern::Glob(glob) => f.write_str(glob.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_host() {
        let pattern = HostPattern::parse(" Intranet ").unwrap();
        assert!(pattern.matches("intranet"));
        assert!(pattern.matches("INTRANET."));
        assert!(!pattern.matches("intranet.example"));
        assert_eq!(pattern.to_string(), "intranet");
    }

    #[test]
    fn test_subdomain_glob() {
        let pattern = HostPattern::parse("*.Bank.Example").unwrap();
        assert!(pattern.matches("login.bank.example"));
        assert!(pattern.matches("a.b.bank.example"));
        assert!(!pattern.matches("bank.example"));
        assert_eq!(pattern.to_string(), "*.bank.example");
    }

    #[test]
    fn test_single_character_wildcard() {
        let pattern = HostPattern::parse("sso?.corp.example").unwrap();
        assert!(pattern.matches("sso1.corp.example"));
        assert!(!pattern.matches("sso.corp.example"));
    }

    #[test]
    fn test_rejects_non_hosts() {
        assert!(HostPattern::parse("  ").is_err());
        assert!(HostPattern::parse("https://bank.example").is_err());
        assert!(HostPattern::parse("[*.example.com").is_err());
    }
}
