//! Provider resolution and settings synthesis.
//!
//! [`Resolver::expand_with_common_settings`] is the central decision
//! function of the crate. For a given account it selects at most one
//! provider template, walking the sources in fixed priority order:
//!
//! 1. the structured table (domain or MX pattern match),
//! 2. the remote autoconfig document (two well-known locations),
//! 3. the preset table, whose generated fallback always matches.
//!
//! Failures inside the chain (DNS errors, unreachable autoconfig
//! endpoints, malformed documents) are absorbed: the chain has no
//! externally visible failure mode other than "used the generic
//! fallback". The synthesizer then turns the selected template into
//! concrete defaults and overlays any settings already present on the
//! account, which always win.

use std::str::FromStr;

use email_address::EmailAddress;
use thiserror::Error;
use tracing::debug;

use crate::{
    account::{Account, ConnectionSettings, SecurityMode},
    autoconfig,
    dns::DnsClient,
    providers::{ProviderTables, Template, TemplateSource},
};

/// The global `Result` alias of the module.
pub type Result<T> = std::result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot parse email address {0}: {1}")]
    ParseEmailAddressError(String, #[source] email_address::Error),
}

/// The sentinel container-folder label. A deployment configured with
/// any other label substitutes it into templates that leave the
/// container folder empty.
pub const DEFAULT_CONTAINER_FOLDER_LABEL: &str = "Mailspring";

/// How long to wait on any single autoconfig HTTP request before
/// treating the location as not found.
const HTTP_TIMEOUT_SECS: u64 = 10;

/// Account settings resolver.
///
/// Holds the provider tables, the DNS client, the HTTP client and the
/// deployment's container-folder label. Tables are injected so tests
/// can substitute fixtures.
pub struct Resolver {
    tables: ProviderTables,
    dns: DnsClient,
    http: reqwest::Client,
    container_folder_label: String,
}

impl Resolver {
    /// Create a resolver over the given provider tables.
    pub fn new(tables: ProviderTables) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            // only fails when the TLS backend cannot be initialized,
            // which no fallback client would survive either
            .expect("cannot build HTTP client");

        Self {
            tables,
            dns: DnsClient::new(),
            http,
            container_folder_label: DEFAULT_CONTAINER_FOLDER_LABEL.to_owned(),
        }
    }

    /// Change the deployment's default container-folder label.
    pub fn with_container_folder_label(mut self, label: impl ToString) -> Self {
        self.container_folder_label = label.to_string();
        self
    }

    /// Populate the account's connection settings from the best
    /// available provider template.
    ///
    /// Settings already present on the account are never overwritten.
    pub async fn expand_with_common_settings(&self, mut account: Account) -> Result<Account> {
        let addr = EmailAddress::from_str(&account.email_address).map_err(|err| {
            Error::ParseEmailAddressError(account.email_address.clone(), err)
        })?;
        let domain = addr.domain().trim_matches('.').to_ascii_lowercase();

        let template = self.resolve_template(&addr, &domain, &account.provider).await;
        debug!("{domain}: resolved template from {:?}", template.source);

        let defaults = self.synthesize(&template, &domain, &account.settings);
        account.settings = defaults.merged_with_existing(&account.settings);

        Ok(account)
    }

    /// Walk the resolution sources in priority order and return the
    /// first usable template. Never fails: the preset table's
    /// generated fallback always matches.
    async fn resolve_template(
        &self,
        addr: &EmailAddress,
        domain: &str,
        provider: &str,
    ) -> Template {
        let mx_hostnames = self.dns.get_mx_hostnames(domain).await;

        if let Some(template) = self.tables.match_structured(addr, domain, &mx_hostnames) {
            return template;
        }

        debug!("{domain}: no structured table match, trying autoconfig…");
        if let Some(template) = autoconfig::fetch(&self.http, addr, domain).await {
            return template;
        }

        debug!("{domain}: no autoconfig document, trying presets…");
        self.tables.preset_template(addr, domain, provider)
    }

    /// Turn a selected template into concrete default settings for
    /// the target domain.
    fn synthesize(
        &self,
        template: &Template,
        domain: &str,
        existing: &ConnectionSettings,
    ) -> ConnectionSettings {
        // port/security inference only applies to the preset path,
        // where either may be missing while the other is present
        let (imap_port, imap_security, smtp_port, smtp_security) =
            if template.source == TemplateSource::Preset {
                let (imap_port, imap_security) =
                    infer_imap(template.imap.port, template.imap.security);
                let (smtp_port, smtp_security) =
                    infer_smtp(template.smtp.port, template.smtp.security);
                (
                    Some(imap_port),
                    Some(imap_security),
                    Some(smtp_port),
                    Some(smtp_security),
                )
            } else {
                (
                    template.imap.port,
                    template.imap.security,
                    template.smtp.port,
                    template.smtp.security,
                )
            };

        ConnectionSettings {
            imap_host: Some(
                template
                    .imap
                    .host
                    .clone()
                    .unwrap_or_else(|| format!("imap.{domain}")),
            ),
            imap_port,
            imap_username: template.imap.username.clone(),
            imap_password: existing.imap_password.clone(),
            imap_security,
            imap_allow_insecure_ssl: Some(template.imap.allow_insecure_ssl.unwrap_or(false)),
            smtp_host: Some(
                template
                    .smtp
                    .host
                    .clone()
                    .unwrap_or_else(|| format!("smtp.{domain}")),
            ),
            smtp_port,
            smtp_username: template.smtp.username.clone(),
            smtp_password: existing
                .smtp_password
                .clone()
                .or_else(|| existing.imap_password.clone()),
            smtp_security,
            smtp_allow_insecure_ssl: Some(template.smtp.allow_insecure_ssl.unwrap_or(false)),
            container_folder: self.container_folder(template.container_folder.as_deref()),
            refresh_client_id: None,
            refresh_token: None,
        }
    }

    /// Container-folder override policy: the template value is kept,
    /// even empty, unless it is empty or unset while the deployment
    /// label differs from the sentinel.
    fn container_folder(&self, template_value: Option<&str>) -> Option<String> {
        match template_value {
            Some(value) if !value.is_empty() => Some(value.to_owned()),
            other => {
                if self.container_folder_label != DEFAULT_CONTAINER_FOLDER_LABEL {
                    Some(self.container_folder_label.clone())
                } else {
                    other.map(ToOwned::to_owned)
                }
            }
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(ProviderTables::builtin())
    }
}

/// Fill in a missing IMAP port or security mode from its well-known
/// counterpart. Both absent defaults to SSL/TLS on 993.
fn infer_imap(port: Option<u16>, security: Option<SecurityMode>) -> (u16, SecurityMode) {
    match (port, security) {
        (Some(port), Some(security)) => (port, security),
        (None, None) => (993, SecurityMode::SslTls),
        (Some(port), None) => {
            let security = if port == 993 {
                SecurityMode::SslTls
            } else {
                SecurityMode::None
            };
            (port, security)
        }
        (None, Some(security)) => {
            let port = match security {
                SecurityMode::SslTls => 993,
                _ => 143,
            };
            (port, security)
        }
    }
}

/// SMTP counterpart of [`infer_imap`]. Both absent defaults to
/// SSL/TLS on 465; an unrecognized port leaves the connection
/// plaintext on purpose.
fn infer_smtp(port: Option<u16>, security: Option<SecurityMode>) -> (u16, SecurityMode) {
    match (port, security) {
        (Some(port), Some(security)) => (port, security),
        (None, None) => (465, SecurityMode::SslTls),
        (Some(port), None) => {
            let security = match port {
                587 => SecurityMode::Starttls,
                465 => SecurityMode::SslTls,
                _ => SecurityMode::None,
            };
            (port, security)
        }
        (None, Some(security)) => {
            let port = match security {
                SecurityMode::Starttls => 587,
                SecurityMode::SslTls => 465,
                SecurityMode::None => 25,
            };
            (port, security)
        }
    }
}
