#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! # Account autoconfiguration
//!
//! This library resolves the connection parameters (IMAP/SMTP host,
//! port, security mode, username format) needed to configure a mail
//! account, given only an email address or an OAuth authorization
//! code.
//!
//! Resolution falls back through sources of decreasing reliability,
//! stopping at the first usable one:
//!
//! - the builtin structured provider table (domain/MX regex rules),
//! - the provider's self-published autoconfig document at
//!   <https://autoconfig.example.com> or under `/.well-known`,
//! - the builtin preset table, whose generated
//!   `imap.<domain>`/`smtp.<domain>` fallback always matches.
//!
//! The chain never fails: DNS and HTTP problems only push resolution
//! to the next source. See [`expand::Resolver`] for the entry point,
//! [`oauth`] for the Gmail/Microsoft account builders and
//! [`finalize`] for the hand-off to the external validator.

pub mod account;
pub mod autoconfig;
pub mod dns;
pub mod expand;
pub mod finalize;
pub mod oauth;
pub mod providers;

use thiserror::Error;

#[doc(inline)]
pub use crate::{
    account::{id::id_for_account, Account, ConnectionSettings, SecurityMode},
    expand::Resolver,
    finalize::{finalize_and_validate, AccountValidator},
    providers::ProviderTables,
};

/// The global `Result` alias of the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The global `Error` enum of the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    ExpandError(#[from] expand::Error),
    #[error(transparent)]
    OAuthError(#[from] oauth::Error),
    #[error(transparent)]
    FinalizeError(#[from] finalize::Error),
}
