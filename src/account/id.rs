//! Account identity derivation.
//!
//! The account id is a stable function of the email address and the
//! subset of connection settings that affect mail contents: the IMAP
//! and SMTP usernames and hosts. Changing any other field (password,
//! port, security mode) must not change the id.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::ConnectionSettings;

/// The settings fields that participate in the identity, in
/// canonical order.
#[derive(Serialize)]
struct IdentityFields<'a> {
    imap_username: &'a str,
    imap_host: &'a str,
    smtp_username: &'a str,
    smtp_host: &'a str,
}

/// Derive the stable identifier of an account from its email address
/// and connection settings.
///
/// The identifier is the first 8 hex characters of the SHA-256 digest
/// of the email address followed by the canonical JSON representation
/// of the identity fields. Deterministic, never fails.
pub fn id_for_account(email_address: &str, settings: &ConnectionSettings) -> String {
    let fields = IdentityFields {
        imap_username: settings.imap_username.as_deref().unwrap_or_default(),
        imap_host: settings.imap_host.as_deref().unwrap_or_default(),
        smtp_username: settings.smtp_username.as_deref().unwrap_or_default(),
        smtp_host: settings.smtp_host.as_deref().unwrap_or_default(),
    };

    // field order is fixed by the struct, so the JSON form is canonical
    let json = serde_json::to_string(&fields).unwrap();

    let mut hasher = Sha256::new();
    hasher.update(email_address.as_bytes());
    hasher.update(json.as_bytes());

    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(8);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ConnectionSettings {
        ConnectionSettings {
            imap_host: Some("imap.example.com".into()),
            imap_port: Some(993),
            imap_username: Some("user@example.com".into()),
            imap_password: Some("secret".into()),
            smtp_host: Some("smtp.example.com".into()),
            smtp_port: Some(465),
            smtp_username: Some("user@example.com".into()),
            ..Default::default()
        }
    }

    #[test]
    fn id_is_deterministic() {
        let a = id_for_account("user@example.com", &settings());
        let b = id_for_account("user@example.com", &settings());
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn id_ignores_non_identity_fields() {
        let base = id_for_account("user@example.com", &settings());

        let mut changed = settings();
        changed.imap_password = Some("other".into());
        changed.imap_port = Some(143);
        changed.smtp_security = Some(crate::account::SecurityMode::Starttls);
        changed.container_folder = Some("Folders".into());

        assert_eq!(base, id_for_account("user@example.com", &changed));
    }

    #[test]
    fn id_changes_with_each_identity_field() {
        let base = id_for_account("user@example.com", &settings());

        let mut changed = settings();
        changed.imap_username = Some("user".into());
        assert_ne!(base, id_for_account("user@example.com", &changed));

        let mut changed = settings();
        changed.imap_host = Some("mail.example.com".into());
        assert_ne!(base, id_for_account("user@example.com", &changed));

        let mut changed = settings();
        changed.smtp_username = Some("user".into());
        assert_ne!(base, id_for_account("user@example.com", &changed));

        let mut changed = settings();
        changed.smtp_host = Some("mail.example.com".into());
        assert_ne!(base, id_for_account("user@example.com", &changed));

        assert_ne!(base, id_for_account("other@example.com", &settings()));
    }
}
