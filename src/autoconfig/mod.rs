//! # Remote autoconfiguration
//!
//! This module fetches and interprets a provider's self-published
//! autoconfiguration document, heavily inspired by the Thunderbird
//! [Autoconfiguration] standard.
//!
//! Two well-known locations are tried in order:
//!
//! - `https://autoconfig.<domain>/mail/config-v1.1.xml`
//! - `https://<domain>/.well-known/autoconfig/mail/config-v1.1.xml`
//!
//! Any network failure, non-2xx response or unparsable body counts as
//! "not found" for that location: this source can only succeed or
//! silently yield nothing, it never surfaces an error to the
//! resolution chain.
//!
//! [Autoconfiguration]: https://wiki.mozilla.org/Thunderbird:Autoconfiguration

pub mod config;

use email_address::EmailAddress;
use tracing::{debug, trace};

use self::config::{ClientConfig, Server, ServerType, SocketType};
use crate::{
    account::SecurityMode,
    providers::{ServerTemplate, Template, TemplateSource},
};

/// Username template placeholder standing for the local part of the
/// email address.
const EMAIL_LOCAL_PART: &str = "%EMAILLOCALPART%";

/// Fetch the autoconfiguration document of the given domain and
/// derive a provider template from it.
///
/// Returns `None` when no location yields a document, or when the
/// document lacks an IMAP incoming server or an SMTP outgoing server.
pub async fn fetch(
    http: &reqwest::Client,
    addr: &EmailAddress,
    domain: &str,
) -> Option<Template> {
    let urls = [
        format!("https://autoconfig.{domain}/mail/config-v1.1.xml"),
        format!("https://{domain}/.well-known/autoconfig/mail/config-v1.1.xml"),
    ];

    for url in urls {
        if let Some(config) = get_config(http, &url).await {
            debug!("{domain}: discovered autoconfig document at {url}");
            return from_client_config(config, addr, domain);
        }
    }

    None
}

/// Send a GET request to the given URL and try to parse the response
/// body as an autoconfig document.
async fn get_config(http: &reqwest::Client, url: &str) -> Option<ClientConfig> {
    let res = match http.get(url).send().await {
        Ok(res) => res,
        Err(err) => {
            debug!("skipping autoconfig location {url}: {err}");
            return None;
        }
    };

    let status = res.status();
    if !status.is_success() {
        debug!("skipping autoconfig location {url}: {status}");
        return None;
    }

    let body = match res.text().await {
        Ok(body) => body,
        Err(err) => {
            debug!("cannot read autoconfig body from {url}: {err}");
            return None;
        }
    };

    match serde_xml_rs::from_str(&body) {
        Ok(config) => {
            trace!("{config:#?}");
            Some(config)
        }
        Err(err) => {
            debug!("cannot decode autoconfig document from {url}: {err}");
            None
        }
    }
}

/// Derive a provider template from a parsed document.
fn from_client_config(
    config: ClientConfig,
    addr: &EmailAddress,
    domain: &str,
) -> Option<Template> {
    let provider = config.provider_for(domain)?;

    let imap = provider.incoming_server(ServerType::Imap)?;
    let smtp = provider.outgoing_server(ServerType::Smtp)?;

    Some(Template {
        source: TemplateSource::Autoconfig,
        imap: server_template(imap, addr),
        smtp: server_template(smtp, addr),
        container_folder: None,
    })
}

fn server_template(server: &Server, addr: &EmailAddress) -> ServerTemplate {
    let username = match server.username() {
        Some(EMAIL_LOCAL_PART) => addr.local_part().to_string(),
        _ => addr.to_string(),
    };

    // conservative default when the socket type is missing or
    // unrecognized
    let security = match server.socket_type() {
        Some(SocketType::Plain) => SecurityMode::None,
        Some(SocketType::Ssl) => SecurityMode::SslTls,
        Some(SocketType::Starttls) | Some(SocketType::Unknown) | None => SecurityMode::Starttls,
    };

    ServerTemplate {
        host: server.hostname().map(ToString::to_string),
        port: server.port(),
        security: Some(security),
        username: Some(username),
        allow_insecure_ssl: None,
    }
}
