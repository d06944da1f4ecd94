//! Microsoft variant of the OAuth account builder.
//!
//! Uses the common-tenant v2.0 endpoints with PKCE instead of a
//! client secret, and Microsoft Graph for the user profile. Personal
//! Microsoft accounts may carry no mailbox at all, in which case the
//! builder fails with a dedicated error.

use serde::Deserialize;
use tracing::debug;

use super::{
    exchange_authorization_code, fetch_profile, query_string, Error, PkcePair, Result,
};
use crate::{
    account::{id::id_for_account, Account},
    expand::Resolver,
    finalize::{finalize_and_validate, AccountValidator},
};

pub const CLIENT_ID: &str = "8787a430-6eb4-4e76-91fe-a9f2a79c256d";

const REDIRECT_URI: &str = "http://127.0.0.1:12141";
const AUTH_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/authorize";
const TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
const PROFILE_URL: &str = "https://graph.microsoft.com/v1.0/me";

const SCOPES: &str = "user.read offline_access \
    https://outlook.office.com/IMAP.AccessAsUser.All \
    https://outlook.office.com/SMTP.Send";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    #[serde(default)]
    mail: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

/// Build the Microsoft authorization URL the user is sent to, bound
/// to the given PKCE pair. Pure string construction, no I/O.
pub fn authorization_url(pkce: &PkcePair) -> String {
    let query = query_string(&[
        ("client_id", CLIENT_ID),
        ("redirect_uri", REDIRECT_URI),
        ("response_type", "code"),
        ("scope", SCOPES),
        ("code_challenge", &pkce.challenge),
        ("code_challenge_method", "S256"),
        ("prompt", "select_account"),
    ]);

    format!("{AUTH_URL}?{query}")
}

/// Exchange the authorization code using the PKCE verifier, fetch the
/// Graph profile, expand the account settings and hand the account
/// off to the validator.
pub async fn build_account(
    http: &reqwest::Client,
    resolver: &Resolver,
    validator: &dyn AccountValidator,
    code: &str,
    code_verifier: &str,
) -> Result<Account> {
    let token = exchange_authorization_code(
        http,
        TOKEN_URL,
        &[
            ("code", code),
            ("client_id", CLIENT_ID),
            ("code_verifier", code_verifier),
            ("redirect_uri", REDIRECT_URI),
            ("grant_type", "authorization_code"),
            ("scope", SCOPES),
        ],
    )
    .await?;

    let profile: Profile = fetch_profile(http, PROFILE_URL, &token.access_token).await?;

    let email = profile.mail.ok_or(Error::MissingMailboxAddressError)?;
    debug!("building office365 account for {email}");

    let mut account = Account::new(&email, "office365");
    if let Some(name) = profile.display_name {
        account.label = name;
    }
    account.settings.refresh_client_id = Some(CLIENT_ID.to_owned());
    account.settings.refresh_token = token.refresh_token;

    let mut account = resolver.expand_with_common_settings(account).await?;
    account.id = id_for_account(&account.email_address, &account.settings);

    Ok(finalize_and_validate(account, validator).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_carries_pkce_challenge() {
        let pkce = PkcePair::new_random();
        let url = authorization_url(&pkce);

        assert!(url.starts_with("https://login.microsoftonline.com/common/oauth2/v2.0/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains(&format!("code_challenge={}", pkce.challenge)));
        assert!(url.contains("scope=user.read%20offline_access"));
    }

    #[test]
    fn profile_without_mailbox_is_rejected() {
        let profile: Profile =
            serde_json::from_str(r#"{"displayName":"Jane Doe","mail":null}"#).unwrap();
        assert!(profile.mail.is_none());
    }
}
