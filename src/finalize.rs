//! Account finalization and external validation.
//!
//! The last step of the setup flow: normalize what the resolver and
//! the user produced, recompute the identity (hosts or usernames may
//! have changed since it was assigned) and hand the account over to
//! the external validator, which performs the live IMAP/SMTP
//! connection tests this crate deliberately does not.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use crate::account::{id::id_for_account, Account};

/// The global `Result` alias of the module.
pub type Result<T> = std::result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot validate connection settings of account {1}")]
    ValidateAccountError(
        #[source] Box<dyn std::error::Error + Send + Sync>,
        String,
    ),
}

/// External collaborator verifying that connection settings actually
/// work, typically by logging in to the IMAP and SMTP servers.
#[async_trait]
pub trait AccountValidator: Send + Sync {
    async fn validate(
        &self,
        account: &Account,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Normalize the account, recompute its identity and run it through
/// the external validator. On success the account is stamped with the
/// validation time.
pub async fn finalize_and_validate(
    mut account: Account,
    validator: &dyn AccountValidator,
) -> Result<Account> {
    if let Some(host) = &account.settings.imap_host {
        account.settings.imap_host = Some(host.trim().to_owned());
    }
    if let Some(host) = &account.settings.smtp_host {
        account.settings.smtp_host = Some(host.trim().to_owned());
    }

    // an address used as label collapses to the account's own address
    if account.label.contains('@') {
        account.label = account.email_address.clone();
    }

    account.id = id_for_account(&account.email_address, &account.settings);

    debug!("validating account {} ({})", account.id, account.email_address);
    validator
        .validate(&account)
        .await
        .map_err(|err| Error::ValidateAccountError(err, account.email_address.clone()))?;

    account.authed_at = Some(Utc::now());

    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::ConnectionSettings;

    struct AcceptAll;

    #[async_trait]
    impl AccountValidator for AcceptAll {
        async fn validate(
            &self,
            _: &Account,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Ok(())
        }
    }

    struct RejectAll;

    #[async_trait]
    impl AccountValidator for RejectAll {
        async fn validate(
            &self,
            _: &Account,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("IMAP login failed".into())
        }
    }

    fn account() -> Account {
        let mut account = Account::new("user@example.com", "");
        account.settings = ConnectionSettings {
            imap_host: Some("  imap.example.com ".into()),
            imap_username: Some("user@example.com".into()),
            smtp_host: Some("smtp.example.com\n".into()),
            smtp_username: Some("user@example.com".into()),
            ..Default::default()
        };
        account
    }

    #[tokio::test]
    async fn trims_hosts_and_recomputes_id() {
        let account = finalize_and_validate(account(), &AcceptAll).await.unwrap();

        assert_eq!(account.settings.imap_host.as_deref(), Some("imap.example.com"));
        assert_eq!(account.settings.smtp_host.as_deref(), Some("smtp.example.com"));

        let expected = id_for_account(&account.email_address, &account.settings);
        assert_eq!(account.id, expected);
        assert!(account.authed_at.is_some());
    }

    #[tokio::test]
    async fn label_looking_like_an_address_becomes_the_account_address() {
        let mut input = account();
        input.email_address = "user@example.com".into();
        input.label = "someone-else@example.com".into();

        let account = finalize_and_validate(input, &AcceptAll).await.unwrap();
        assert_eq!(account.label, "user@example.com");

        let mut input = account.clone();
        input.label = "Jane Doe".into();
        let account = finalize_and_validate(input, &AcceptAll).await.unwrap();
        assert_eq!(account.label, "Jane Doe");
    }

    #[tokio::test]
    async fn validator_failure_surfaces_with_context() {
        let err = finalize_and_validate(account(), &RejectAll)
            .await
            .unwrap_err();

        let Error::ValidateAccountError(source, email) = err;
        assert_eq!(email, "user@example.com");
        assert_eq!(source.to_string(), "IMAP login failed");
    }
}
