//! Gmail variant of the OAuth account builder.

use serde::Deserialize;
use tracing::debug;

use super::{exchange_authorization_code, fetch_profile, query_string, Result};
use crate::{
    account::{id::id_for_account, Account},
    expand::Resolver,
    finalize::{finalize_and_validate, AccountValidator},
};

pub const CLIENT_ID: &str =
    "662287800555-0a5h4ii0e9hsbpq0mqtul7fja0jhf9uf.apps.googleusercontent.com";

// secret of an installed application, not confidential by design
const CLIENT_SECRET: &str = "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";

const REDIRECT_URI: &str = "http://127.0.0.1:12141";
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v4/token";
const PROFILE_URL: &str = "https://www.googleapis.com/oauth2/v1/userinfo?alt=json";

const SCOPES: &str = "https://mail.google.com/ \
    https://www.googleapis.com/auth/userinfo.email \
    https://www.googleapis.com/auth/userinfo.profile";

#[derive(Debug, Deserialize)]
struct Profile {
    email: String,
    #[serde(default)]
    name: Option<String>,
}

/// Build the Gmail authorization URL the user is sent to. Pure string
/// construction, no I/O.
pub fn authorization_url() -> String {
    let query = query_string(&[
        ("client_id", CLIENT_ID),
        ("redirect_uri", REDIRECT_URI),
        ("response_type", "code"),
        ("scope", SCOPES),
        ("access_type", "offline"),
        ("prompt", "select_account consent"),
    ]);

    format!("{AUTH_URL}?{query}")
}

/// Exchange the authorization code, fetch the user profile, expand
/// the account settings and hand the account off to the validator.
pub async fn build_account(
    http: &reqwest::Client,
    resolver: &Resolver,
    validator: &dyn AccountValidator,
    code: &str,
) -> Result<Account> {
    let token = exchange_authorization_code(
        http,
        TOKEN_URL,
        &[
            ("code", code),
            ("client_id", CLIENT_ID),
            ("client_secret", CLIENT_SECRET),
            ("redirect_uri", REDIRECT_URI),
            ("grant_type", "authorization_code"),
        ],
    )
    .await?;

    let profile: Profile = fetch_profile(http, PROFILE_URL, &token.access_token).await?;
    debug!("building gmail account for {}", profile.email);

    let mut account = Account::new(&profile.email, "gmail");
    if let Some(name) = profile.name {
        account.label = name;
    }
    account.settings.refresh_client_id = Some(CLIENT_ID.to_owned());
    account.settings.refresh_token = token.refresh_token;

    let mut account = resolver.expand_with_common_settings(account).await?;
    account.id = id_for_account(&account.email_address, &account.settings);

    Ok(finalize_and_validate(account, validator).await?)
}
