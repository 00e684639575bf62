//! The domain whitelist consulted before fetching attestation data.

use std::collections::HashSet;

use oracle_shared::request::host_of;

/// Hosts the oracle is willing to notarize data from.
///
/// Matching is by exact host, case-insensitive, ignoring any port. Price
/// feed sentinels never reach the whitelist.
#[derive(Debug, Clone, Default)]
pub struct DomainWhitelist {
    domains: HashSet<String>,
}

impl DomainWhitelist {
    pub fn new(domains: impl IntoIterator<Item = String>) -> Self {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn is_accepted_domain(&self, url: &str) -> bool {
        let host = host_of(url).to_ascii_lowercase();
        self.domains.contains(&host)
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_hosts_case_insensitively_without_ports() {
        let whitelist = DomainWhitelist::new(["API.Example.com".to_string()]);
        assert!(whitelist.is_accepted_domain("api.example.com/v1/price"));
        assert!(whitelist.is_accepted_domain("api.example.com:8443/v1"));
        assert!(!whitelist.is_accepted_domain("evil.example.com/v1"));
    }

    #[test]
    fn empty_whitelist_rejects_everything() {
        let whitelist = DomainWhitelist::default();
        assert!(!whitelist.is_accepted_domain("api.example.com"));
        assert!(whitelist.is_empty());
    }
}
