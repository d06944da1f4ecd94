//! # OAuth account builders
//!
//! This module builds fully configured accounts out of an OAuth
//! authorization code, following the Authorization Code Grant flow of
//! [RFC6749] (with the PKCE extension of [RFC7636] for the Microsoft
//! variant).
//!
//! Unlike the resolution chain, OAuth calls have a hard failure mode:
//! a non-2xx token exchange or profile fetch surfaces an error
//! carrying the HTTP status and response body.
//!
//! [RFC6749]: https://datatracker.ietf.org/doc/html/rfc6749
//! [RFC7636]: https://datatracker.ietf.org/doc/html/rfc7636

pub mod gmail;
pub mod outlook;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

/// The global `Result` alias of the module.
pub type Result<T> = std::result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot exchange authorization code ({0}): {1}")]
    ExchangeAuthorizationCodeError(StatusCode, String),
    #[error("cannot fetch user profile ({0}): {1}")]
    FetchProfileError(StatusCode, String),
    #[error("user profile is missing a mailbox address")]
    MissingMailboxAddressError,
    #[error("error while sending request to {1}")]
    SendRequestError(#[source] reqwest::Error, String),
    #[error("cannot read response body from {1}")]
    ReadResponseBodyError(#[source] reqwest::Error, String),
    #[error("cannot decode JSON response from {1}")]
    DecodeResponseError(#[source] serde_json::Error, String),
    #[error(transparent)]
    ExpandError(#[from] crate::expand::Error),
    #[error(transparent)]
    FinalizeError(#[from] crate::finalize::Error),
}

/// Token endpoint response of a successful code exchange.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// A PKCE code verifier and its S256 challenge.
#[derive(Clone, Debug)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    /// Generate a random pair as defined in RFC7636: a 64-char
    /// verifier from the unreserved set and its base64url-encoded
    /// SHA-256 challenge.
    pub fn new_random() -> Self {
        let verifier: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();

        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));

        Self {
            verifier,
            challenge,
        }
    }
}

/// Build a percent-encoded query string out of key/value pairs.
pub(crate) fn query_string(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Exchange an authorization code for tokens via a form-encoded POST
/// to the given token endpoint.
pub(crate) async fn exchange_authorization_code(
    http: &reqwest::Client,
    token_url: &str,
    params: &[(&str, &str)],
) -> Result<TokenResponse> {
    let res = http
        .post(token_url)
        .form(params)
        .send()
        .await
        .map_err(|err| Error::SendRequestError(err, token_url.to_owned()))?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|err| Error::ReadResponseBodyError(err, token_url.to_owned()))?;

    if !status.is_success() {
        return Err(Error::ExchangeAuthorizationCodeError(status, body));
    }

    debug!("successfully exchanged authorization code at {token_url}");

    serde_json::from_str(&body).map_err(|err| Error::DecodeResponseError(err, token_url.to_owned()))
}

/// Fetch the user profile of the given access token.
pub(crate) async fn fetch_profile<P: DeserializeOwned>(
    http: &reqwest::Client,
    profile_url: &str,
    access_token: &str,
) -> Result<P> {
    let res = http
        .get(profile_url)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|err| Error::SendRequestError(err, profile_url.to_owned()))?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|err| Error::ReadResponseBodyError(err, profile_url.to_owned()))?;

    if !status.is_success() {
        return Err(Error::FetchProfileError(status, body));
    }

    serde_json::from_str(&body)
        .map_err(|err| Error::DecodeResponseError(err, profile_url.to_owned()))
}
