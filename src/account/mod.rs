//! Module dedicated to mail accounts.
//!
//! This module contains the representation of a mail account being
//! set up ([`Account`]) and its connection settings
//! ([`ConnectionSettings`]). Settings start empty or partially filled
//! and are populated once by the resolver (see [`crate::expand`]),
//! then verified by an external validator (see [`crate::finalize`]).

pub mod id;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The security mode of an IMAP or SMTP connection.
///
/// Serialized forms match the common provider-settings notation:
/// `None`, `STARTTLS` and `SSL / TLS`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum SecurityMode {
    #[serde(rename = "None")]
    None,
    #[serde(rename = "STARTTLS")]
    Starttls,
    #[default]
    #[serde(rename = "SSL / TLS")]
    SslTls,
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Starttls => write!(f, "STARTTLS"),
            Self::SslTls => write!(f, "SSL / TLS"),
        }
    }
}

/// Flat IMAP/SMTP connection settings of an account.
///
/// Every field is optional: a field left empty by the caller is
/// filled in by the resolver, while a field already present always
/// wins over a synthesized default (see
/// [`ConnectionSettings::merged_with_existing`]).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imap_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imap_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imap_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imap_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imap_security: Option<SecurityMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imap_allow_insecure_ssl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_security: Option<SecurityMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_allow_insecure_ssl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_folder: Option<String>,

    /// OAuth client id used later on to refresh the access token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_client_id: Option<String>,

    /// OAuth refresh token associated to the account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl ConnectionSettings {
    /// Overlay existing settings on top of synthesized defaults,
    /// field by field.
    ///
    /// `self` holds the defaults; any field already present in
    /// `existing` takes precedence.
    pub fn merged_with_existing(self, existing: &ConnectionSettings) -> ConnectionSettings {
        ConnectionSettings {
            imap_host: existing.imap_host.clone().or(self.imap_host),
            imap_port: existing.imap_port.or(self.imap_port),
            imap_username: existing.imap_username.clone().or(self.imap_username),
            imap_password: existing.imap_password.clone().or(self.imap_password),
            imap_security: existing.imap_security.or(self.imap_security),
            imap_allow_insecure_ssl: existing.imap_allow_insecure_ssl.or(self.imap_allow_insecure_ssl),
            smtp_host: existing.smtp_host.clone().or(self.smtp_host),
            smtp_port: existing.smtp_port.or(self.smtp_port),
            smtp_username: existing.smtp_username.clone().or(self.smtp_username),
            smtp_password: existing.smtp_password.clone().or(self.smtp_password),
            smtp_security: existing.smtp_security.or(self.smtp_security),
            smtp_allow_insecure_ssl: existing.smtp_allow_insecure_ssl.or(self.smtp_allow_insecure_ssl),
            container_folder: existing.container_folder.clone().or(self.container_folder),
            refresh_client_id: existing.refresh_client_id.clone().or(self.refresh_client_id),
            refresh_token: existing.refresh_token.clone().or(self.refresh_token),
        }
    }
}

/// A mail account going through the setup flow.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The email address of the account. Immutable identity input.
    pub email_address: String,

    /// The provider hint, e.g. `gmail`, `office365` or a preset key.
    pub provider: String,

    /// The connection settings, possibly empty or partially filled.
    #[serde(default)]
    pub settings: ConnectionSettings,

    /// The derived account identifier. Not authoritative until
    /// assigned by a builder or by the finalizer.
    #[serde(default)]
    pub id: String,

    /// The display label of the account.
    #[serde(default)]
    pub label: String,

    /// When the account last passed validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authed_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(email_address: impl ToString, provider: impl ToString) -> Self {
        let email_address = email_address.to_string();

        Self {
            label: email_address.clone(),
            email_address,
            provider: provider.to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_settings_win_over_defaults() {
        let defaults = ConnectionSettings {
            imap_host: Some("imap.example.com".into()),
            imap_port: Some(993),
            imap_password: Some("synthesized".into()),
            smtp_host: Some("smtp.example.com".into()),
            ..Default::default()
        };

        let existing = ConnectionSettings {
            imap_host: Some("mail.example.com".into()),
            imap_password: Some("hunter2".into()),
            ..Default::default()
        };

        let merged = defaults.merged_with_existing(&existing);

        assert_eq!(merged.imap_host.as_deref(), Some("mail.example.com"));
        assert_eq!(merged.imap_password.as_deref(), Some("hunter2"));
        assert_eq!(merged.imap_port, Some(993));
        assert_eq!(merged.smtp_host.as_deref(), Some("smtp.example.com"));
    }

    #[test]
    fn security_mode_display_matches_serialized_form() {
        assert_eq!(SecurityMode::SslTls.to_string(), "SSL / TLS");
        assert_eq!(SecurityMode::Starttls.to_string(), "STARTTLS");
        assert_eq!(SecurityMode::None.to_string(), "None");
    }
}
