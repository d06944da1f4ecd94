//! MX record resolution.
//!
//! Absence of MX data is a normal outcome for this crate: the
//! structured provider table simply won't match by MX pattern. Lookup
//! failures of any kind (NXDOMAIN, timeout, servfail) therefore
//! resolve to an empty list instead of propagating an error.

use hickory_resolver::TokioAsyncResolver;
use tracing::{debug, trace};

/// Simple DNS client using the tokio async resolver.
pub struct DnsClient {
    resolver: TokioAsyncResolver,
}

impl DnsClient {
    /// Create a new DNS client using defaults.
    pub fn new() -> Self {
        let resolver = TokioAsyncResolver::tokio(Default::default(), Default::default());
        Self { resolver }
    }

    /// Get the MX exchange hostnames of the given domain,
    /// lower-cased, lookup order preserved.
    pub async fn get_mx_hostnames(&self, domain: &str) -> Vec<String> {
        let records: Vec<String> = match self.resolver.mx_lookup(domain).await {
            Ok(lookup) => lookup
                .into_iter()
                .map(|record| {
                    record
                        .exchange()
                        .to_string()
                        .trim_end_matches('.')
                        .to_ascii_lowercase()
                })
                .collect(),
            Err(err) => {
                debug!("{domain}: MX lookup failed, assuming no records: {err}");
                return Vec::new();
            }
        };

        debug!("{domain}: discovered {} MX record(s)", records.len());
        trace!("{records:#?}");

        records
    }
}

impl Default for DnsClient {
    fn default() -> Self {
        Self::new()
    }
}
