//! Static provider tables.
//!
//! Two independently-keyed lookup tables consulted by the resolver:
//!
//! - the *structured table*, matching providers by anchored regex
//!   over the account domain or over its MX exchange hostnames;
//! - the *preset table*, keyed by domain or provider name, with
//!   one-hop aliasing and a generated `imap.<domain>`/`smtp.<domain>`
//!   fallback when nothing matches.
//!
//! Both are immutable, process-lifetime data injected into the
//! resolver, so tests can substitute fixture tables.

use std::collections::HashMap;

use email_address::EmailAddress;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::account::SecurityMode;

/// A server template from whichever source matched, normalized to a
/// common shape before synthesis.
#[derive(Clone, Debug, Default)]
pub struct ServerTemplate {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub security: Option<SecurityMode>,
    pub username: Option<String>,
    pub allow_insecure_ssl: Option<bool>,
}

/// Which resolution source produced a template.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TemplateSource {
    Structured,
    Autoconfig,
    Preset,
}

/// A provider template selected by the resolution chain.
#[derive(Clone, Debug)]
pub struct Template {
    pub source: TemplateSource,
    pub imap: ServerTemplate,
    pub smtp: ServerTemplate,
    pub container_folder: Option<String>,
}

/// How a preset derives the login username from the email address.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UsernameFormat {
    /// The full email address.
    Email,
    /// The local part of the email address (before `@`).
    EmailWithoutDomain,
}

impl UsernameFormat {
    pub fn apply(&self, addr: &EmailAddress) -> String {
        match self {
            Self::Email => addr.to_string(),
            Self::EmailWithoutDomain => addr.local_part().to_string(),
        }
    }
}

/// One server entry of a structured table template.
#[derive(Clone, Debug)]
pub struct StructuredServer {
    pub hostname: String,
    pub port: u16,
    pub starttls: bool,
    pub ssl: bool,
    pub tls: bool,
}

impl StructuredServer {
    fn security(&self) -> SecurityMode {
        if self.starttls {
            SecurityMode::Starttls
        } else if self.ssl || self.tls {
            SecurityMode::SslTls
        } else {
            SecurityMode::None
        }
    }
}

/// A structured table entry, matched by domain or MX pattern.
#[derive(Clone, Debug)]
pub struct StructuredTemplate {
    pub name: String,
    pub domain_match: Vec<String>,
    pub mx_match: Vec<String>,
    pub imap: Vec<StructuredServer>,
    pub smtp: Vec<StructuredServer>,
}

impl StructuredTemplate {
    /// Whether any domain pattern fully matches the domain, or any MX
    /// pattern fully matches any resolved MX hostname.
    pub fn matches(&self, domain: &str, mx_hostnames: &[String]) -> bool {
        let domain_hit = self
            .domain_match
            .iter()
            .any(|pattern| full_match(pattern, domain));

        let mx_hit = self.mx_match.iter().any(|pattern| {
            mx_hostnames
                .iter()
                .any(|hostname| full_match(pattern, hostname))
        });

        domain_hit || mx_hit
    }
}

/// A preset table entry.
#[derive(Clone, Debug, Default)]
pub struct Preset {
    /// Key of another preset this entry delegates to, followed
    /// exactly one level.
    pub alias: Option<String>,
    pub imap_host: Option<String>,
    pub imap_port: Option<u16>,
    pub imap_security: Option<SecurityMode>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_security: Option<SecurityMode>,
    pub username_format: Option<UsernameFormat>,
    pub container_folder: Option<String>,
    pub allow_insecure_ssl: Option<bool>,
}

impl Preset {
    fn alias_to(key: impl ToString) -> Self {
        Self {
            alias: Some(key.to_string()),
            ..Default::default()
        }
    }
}

/// The two provider lookup tables.
#[derive(Clone, Debug, Default)]
pub struct ProviderTables {
    pub structured: Vec<StructuredTemplate>,
    pub presets: HashMap<String, Preset>,
}

impl ProviderTables {
    /// The builtin tables shipped with the crate.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Find the first structured template matching the domain or one
    /// of its MX hostnames, in table order.
    pub fn match_structured(
        &self,
        addr: &EmailAddress,
        domain: &str,
        mx_hostnames: &[String],
    ) -> Option<Template> {
        let entry = self
            .structured
            .iter()
            .find(|entry| entry.matches(domain, mx_hostnames))?;

        debug!("{domain}: matched structured provider entry {}", entry.name);

        let username = Some(UsernameFormat::Email.apply(addr));

        let server = |server: &StructuredServer| ServerTemplate {
            host: Some(expand_placeholders(&server.hostname, domain)),
            port: Some(server.port),
            security: Some(server.security()),
            username: username.clone(),
            allow_insecure_ssl: None,
        };

        Some(Template {
            source: TemplateSource::Structured,
            imap: entry.imap.first().map(&server)?,
            smtp: entry.smtp.first().map(&server)?,
            container_folder: None,
        })
    }

    /// Look up a preset by domain, then by provider hint, following
    /// aliases one hop; synthesize the generic fallback when neither
    /// matches.
    pub fn preset_template(
        &self,
        addr: &EmailAddress,
        domain: &str,
        provider: &str,
    ) -> Template {
        let preset = self
            .lookup_preset(domain)
            .or_else(|| self.lookup_preset(provider))
            .unwrap_or_else(|| {
                debug!("{domain}: no preset entry, using generic fallback");
                generic_preset()
            });

        let username_fn = |format: Option<UsernameFormat>| {
            format.map(|format| format.apply(addr))
        };

        Template {
            source: TemplateSource::Preset,
            imap: ServerTemplate {
                host: preset
                    .imap_host
                    .as_deref()
                    .map(|host| expand_placeholders(host, domain)),
                port: preset.imap_port,
                security: preset.imap_security,
                username: username_fn(preset.username_format),
                allow_insecure_ssl: preset.allow_insecure_ssl,
            },
            smtp: ServerTemplate {
                host: preset
                    .smtp_host
                    .as_deref()
                    .map(|host| expand_placeholders(host, domain)),
                port: preset.smtp_port,
                security: preset.smtp_security,
                username: username_fn(preset.username_format),
                allow_insecure_ssl: preset.allow_insecure_ssl,
            },
            container_folder: preset.container_folder.clone(),
        }
    }

    fn lookup_preset(&self, key: &str) -> Option<Preset> {
        let preset = self.presets.get(key)?;

        match &preset.alias {
            None => Some(preset.clone()),
            // aliases are followed exactly one level, never chained
            Some(alias) => {
                let target = self.presets.get(alias)?;
                if target.alias.is_some() {
                    debug!("{key}: alias {alias} points at another alias, ignoring");
                    None
                } else {
                    Some(target.clone())
                }
            }
        }
    }
}

/// The generated fallback preset for unmatched domains. Ports and
/// security are left to the inference rules.
fn generic_preset() -> Preset {
    Preset {
        imap_host: Some("imap.%EMAILDOMAIN%".into()),
        smtp_host: Some("smtp.%EMAILDOMAIN%".into()),
        username_format: Some(UsernameFormat::Email),
        container_folder: Some(String::new()),
        ..Default::default()
    }
}

/// Substitute the domain placeholders used across template sources.
pub(crate) fn expand_placeholders(value: &str, domain: &str) -> String {
    value
        .replace("{domain}", domain)
        .replace("%EMAILDOMAIN%", domain)
}

/// Anchored full match, tolerant of invalid patterns.
fn full_match(pattern: &str, value: &str) -> bool {
    match Regex::new(&format!("^{pattern}$")) {
        Ok(re) => re.is_match(value),
        Err(err) => {
            debug!("skipping invalid provider pattern {pattern}: {err}");
            false
        }
    }
}

static BUILTIN: Lazy<ProviderTables> = Lazy::new(|| ProviderTables {
    structured: builtin_structured(),
    presets: builtin_presets(),
});

fn structured_server(
    hostname: &str,
    port: u16,
    starttls: bool,
    ssl: bool,
) -> StructuredServer {
    StructuredServer {
        hostname: hostname.into(),
        port,
        starttls,
        ssl,
        tls: false,
    }
}

fn builtin_structured() -> Vec<StructuredTemplate> {
    vec![
        // Google Workspace custom domains
        StructuredTemplate {
            name: "googlemail".into(),
            domain_match: vec![],
            mx_match: vec![
                r"aspmx.*\.googlemail\.com".into(),
                r"aspmx.*\.l\.google\.com".into(),
                r".*\.smtp\.goog".into(),
            ],
            imap: vec![structured_server("imap.gmail.com", 993, false, true)],
            smtp: vec![structured_server("smtp.gmail.com", 465, false, true)],
        },
        // Microsoft 365 custom domains
        StructuredTemplate {
            name: "office365".into(),
            domain_match: vec![r".*\.onmicrosoft\.com".into()],
            mx_match: vec![r".*\.mail\.protection\.outlook\.com".into()],
            imap: vec![structured_server("outlook.office365.com", 993, false, true)],
            smtp: vec![structured_server("smtp.office365.com", 587, true, false)],
        },
        // Fastmail, including custom domains hosted there
        StructuredTemplate {
            name: "fastmail".into(),
            domain_match: vec![r"fastmail\.(com|fm)".into()],
            mx_match: vec![r"in[0-9]+-smtp\.messagingengine\.com".into()],
            imap: vec![structured_server("imap.fastmail.com", 993, false, true)],
            smtp: vec![structured_server("smtp.fastmail.com", 465, false, true)],
        },
        // Yandex 360 hosted domains
        StructuredTemplate {
            name: "yandex".into(),
            domain_match: vec![r"yandex\.(com|ru)".into()],
            mx_match: vec![r"mx\.yandex\.net".into()],
            imap: vec![structured_server("imap.yandex.com", 993, false, true)],
            smtp: vec![structured_server("smtp.yandex.com", 465, false, true)],
        },
        // Zoho Mail hosted domains
        StructuredTemplate {
            name: "zoho".into(),
            domain_match: vec![],
            mx_match: vec![r"mx[0-9]*\.zoho(mail)?\.(com|eu)".into()],
            imap: vec![structured_server("imap.zoho.com", 993, false, true)],
            smtp: vec![structured_server("smtp.zoho.com", 465, false, true)],
        },
        // OVH MX Plan hosted domains
        StructuredTemplate {
            name: "ovh".into(),
            domain_match: vec![],
            mx_match: vec![r"mx[0-9]+\.mail\.ovh\.net".into()],
            imap: vec![structured_server("ssl0.ovh.net", 993, false, true)],
            smtp: vec![structured_server("ssl0.ovh.net", 465, false, true)],
        },
    ]
}

fn builtin_presets() -> HashMap<String, Preset> {
    let mut presets = HashMap::new();

    presets.insert(
        "gmail".into(),
        Preset {
            imap_host: Some("imap.gmail.com".into()),
            imap_port: Some(993),
            imap_security: Some(SecurityMode::SslTls),
            smtp_host: Some("smtp.gmail.com".into()),
            smtp_port: Some(465),
            smtp_security: Some(SecurityMode::SslTls),
            username_format: Some(UsernameFormat::Email),
            ..Default::default()
        },
    );
    presets.insert("gmail.com".into(), Preset::alias_to("gmail"));
    presets.insert("googlemail.com".into(), Preset::alias_to("gmail"));

    presets.insert(
        "office365".into(),
        Preset {
            imap_host: Some("outlook.office365.com".into()),
            imap_port: Some(993),
            imap_security: Some(SecurityMode::SslTls),
            smtp_host: Some("smtp.office365.com".into()),
            smtp_port: Some(587),
            smtp_security: Some(SecurityMode::Starttls),
            username_format: Some(UsernameFormat::Email),
            ..Default::default()
        },
    );
    presets.insert("outlook.com".into(), Preset::alias_to("office365"));
    presets.insert("hotmail.com".into(), Preset::alias_to("office365"));
    presets.insert("live.com".into(), Preset::alias_to("office365"));
    presets.insert("msn.com".into(), Preset::alias_to("office365"));

    presets.insert(
        "yahoo".into(),
        Preset {
            imap_host: Some("imap.mail.yahoo.com".into()),
            imap_port: Some(993),
            imap_security: Some(SecurityMode::SslTls),
            smtp_host: Some("smtp.mail.yahoo.com".into()),
            smtp_port: Some(465),
            smtp_security: Some(SecurityMode::SslTls),
            username_format: Some(UsernameFormat::Email),
            ..Default::default()
        },
    );
    presets.insert("yahoo.com".into(), Preset::alias_to("yahoo"));
    presets.insert("ymail.com".into(), Preset::alias_to("yahoo"));
    presets.insert("rocketmail.com".into(), Preset::alias_to("yahoo"));
    presets.insert("aol.com".into(), Preset::alias_to("yahoo"));

    // iCloud logs in with the local part only
    presets.insert(
        "icloud.com".into(),
        Preset {
            imap_host: Some("imap.mail.me.com".into()),
            imap_port: Some(993),
            imap_security: Some(SecurityMode::SslTls),
            smtp_host: Some("smtp.mail.me.com".into()),
            smtp_port: Some(587),
            smtp_security: Some(SecurityMode::Starttls),
            username_format: Some(UsernameFormat::EmailWithoutDomain),
            ..Default::default()
        },
    );
    presets.insert("me.com".into(), Preset::alias_to("icloud.com"));
    presets.insert("mac.com".into(), Preset::alias_to("icloud.com"));

    presets.insert(
        "fastmail.com".into(),
        Preset {
            imap_host: Some("imap.fastmail.com".into()),
            imap_port: Some(993),
            imap_security: Some(SecurityMode::SslTls),
            smtp_host: Some("smtp.fastmail.com".into()),
            smtp_port: Some(465),
            smtp_security: Some(SecurityMode::SslTls),
            username_format: Some(UsernameFormat::Email),
            ..Default::default()
        },
    );
    presets.insert("fastmail.fm".into(), Preset::alias_to("fastmail.com"));

    // ProtonMail is reached through the local bridge, which presents
    // a self-signed certificate and flattens folders under a single
    // container
    presets.insert(
        "protonmail.com".into(),
        Preset {
            imap_host: Some("127.0.0.1".into()),
            imap_port: Some(1143),
            imap_security: Some(SecurityMode::Starttls),
            smtp_host: Some("127.0.0.1".into()),
            smtp_port: Some(1025),
            smtp_security: Some(SecurityMode::Starttls),
            username_format: Some(UsernameFormat::Email),
            container_folder: Some("Folders".into()),
            allow_insecure_ssl: Some(true),
            ..Default::default()
        },
    );
    presets.insert("proton.me".into(), Preset::alias_to("protonmail.com"));
    presets.insert("pm.me".into(), Preset::alias_to("protonmail.com"));

    presets.insert(
        "gmx.com".into(),
        Preset {
            imap_host: Some("imap.gmx.com".into()),
            imap_port: Some(993),
            imap_security: Some(SecurityMode::SslTls),
            smtp_host: Some("mail.gmx.com".into()),
            smtp_port: Some(587),
            smtp_security: Some(SecurityMode::Starttls),
            username_format: Some(UsernameFormat::Email),
            ..Default::default()
        },
    );
    presets.insert("gmx.net".into(), Preset::alias_to("gmx.com"));
    presets.insert("gmx.de".into(), Preset::alias_to("gmx.com"));

    presets.insert(
        "zoho.com".into(),
        Preset {
            imap_host: Some("imap.zoho.com".into()),
            imap_port: Some(993),
            imap_security: Some(SecurityMode::SslTls),
            smtp_host: Some("smtp.zoho.com".into()),
            smtp_port: Some(465),
            smtp_security: Some(SecurityMode::SslTls),
            username_format: Some(UsernameFormat::Email),
            ..Default::default()
        },
    );

    presets
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn addr(s: &str) -> EmailAddress {
        EmailAddress::from_str(s).unwrap()
    }

    #[test]
    fn expands_both_placeholder_styles() {
        assert_eq!(
            expand_placeholders("imap.{domain}", "example.com"),
            "imap.example.com"
        );
        assert_eq!(
            expand_placeholders("smtp.%EMAILDOMAIN%", "example.com"),
            "smtp.example.com"
        );
    }

    #[test]
    fn structured_matches_by_domain_without_mx_records() {
        let tables = ProviderTables::builtin();
        let template = tables
            .match_structured(&addr("user@fastmail.com"), "fastmail.com", &[])
            .unwrap();

        assert_eq!(template.source, TemplateSource::Structured);
        assert_eq!(template.imap.host.as_deref(), Some("imap.fastmail.com"));
        assert_eq!(template.imap.security, Some(SecurityMode::SslTls));
    }

    #[test]
    fn structured_matches_by_mx_hostname() {
        let tables = ProviderTables::builtin();
        let mx = vec!["in1-smtp.messagingengine.com".to_string()];
        let template = tables
            .match_structured(&addr("user@customdomain.org"), "customdomain.org", &mx)
            .unwrap();

        assert_eq!(template.imap.host.as_deref(), Some("imap.fastmail.com"));
        assert_eq!(
            template.imap.username.as_deref(),
            Some("user@customdomain.org")
        );
    }

    #[test]
    fn structured_patterns_are_anchored() {
        let tables = ProviderTables::builtin();
        // contains but does not equal the fastmail domain pattern
        assert!(tables
            .match_structured(
                &addr("user@notfastmail.com"),
                "notfastmail.com",
                &["mx.notfastmail.com".to_string()]
            )
            .is_none());
    }

    #[test]
    fn structured_host_placeholder_expands_to_domain() {
        let tables = ProviderTables {
            structured: vec![StructuredTemplate {
                name: "hosted".into(),
                domain_match: vec![r".*\.example-hosting\.net".into()],
                mx_match: vec![],
                imap: vec![structured_server("imap.{domain}", 993, false, true)],
                smtp: vec![structured_server("smtp.{domain}", 465, false, true)],
            }],
            presets: HashMap::new(),
        };

        let template = tables
            .match_structured(
                &addr("user@mail.example-hosting.net"),
                "mail.example-hosting.net",
                &[],
            )
            .unwrap();

        assert_eq!(
            template.imap.host.as_deref(),
            Some("imap.mail.example-hosting.net")
        );
    }

    #[test]
    fn preset_lookup_by_domain_follows_alias_one_hop() {
        let tables = ProviderTables::builtin();
        let template =
            tables.preset_template(&addr("user@hotmail.com"), "hotmail.com", "");

        assert_eq!(template.imap.host.as_deref(), Some("outlook.office365.com"));
        assert_eq!(template.smtp.port, Some(587));
    }

    #[test]
    fn chained_aliases_degrade_to_generic_fallback() {
        let mut presets = HashMap::new();
        presets.insert("a.com".into(), Preset::alias_to("b.com"));
        presets.insert("b.com".into(), Preset::alias_to("c.com"));
        presets.insert(
            "c.com".into(),
            Preset {
                imap_host: Some("imap.real.example".into()),
                ..Default::default()
            },
        );
        let tables = ProviderTables {
            structured: vec![],
            presets,
        };

        let template = tables.preset_template(&addr("user@a.com"), "a.com", "");
        assert_eq!(template.imap.host.as_deref(), Some("imap.a.com"));
    }

    #[test]
    fn preset_lookup_by_provider_hint() {
        let tables = ProviderTables::builtin();
        let template = tables.preset_template(&addr("user@gmail.com"), "gmail.com", "gmail");

        // distinct from the generic imap.<domain> fallback
        assert_eq!(template.imap.host.as_deref(), Some("imap.gmail.com"));
        assert_eq!(template.smtp.host.as_deref(), Some("smtp.gmail.com"));
    }

    #[test]
    fn unknown_domain_yields_generic_fallback() {
        let tables = ProviderTables::builtin();
        let template = tables.preset_template(
            &addr("user@example-unlisted-test.com"),
            "example-unlisted-test.com",
            "",
        );

        assert_eq!(
            template.imap.host.as_deref(),
            Some("imap.example-unlisted-test.com")
        );
        assert_eq!(
            template.smtp.host.as_deref(),
            Some("smtp.example-unlisted-test.com")
        );
        assert_eq!(template.imap.port, None);
        assert_eq!(template.imap.security, None);
        assert_eq!(template.container_folder.as_deref(), Some(""));
    }

    #[test]
    fn icloud_preset_uses_local_part_username() {
        let tables = ProviderTables::builtin();
        let template = tables.preset_template(&addr("jane@icloud.com"), "icloud.com", "");

        assert_eq!(template.imap.username.as_deref(), Some("jane"));
        assert_eq!(template.imap.host.as_deref(), Some("imap.mail.me.com"));
    }

    #[test]
    fn protonmail_preset_sets_bridge_and_container_folder() {
        let tables = ProviderTables::builtin();
        let template = tables.preset_template(&addr("user@pm.me"), "pm.me", "");

        assert_eq!(template.imap.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(template.imap.port, Some(1143));
        assert_eq!(template.imap.allow_insecure_ssl, Some(true));
        assert_eq!(template.container_folder.as_deref(), Some("Folders"));
    }
}
