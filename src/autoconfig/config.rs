//! # Autoconfig document
//!
//! This module contains the [`serde`] representation of the Mozilla
//! [Autoconfiguration] document (`clientConfig`), as published by
//! mail providers at their well-known locations.
//!
//! XML attributes (such as the provider `id` or the server `type`)
//! deserialize into named struct fields, while child elements collect
//! into `$value` property vectors, keeping the two bags distinct.
//! Values outside the modeled vocabulary fall into `Unknown` catch-all
//! variants so a single odd entry never rejects the whole document.
//!
//! [Autoconfiguration]: https://wiki.mozilla.org/Thunderbird:Autoconfiguration:ConfigFileFormat

use serde::Deserialize;

/// The root level of the autoconfiguration document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub version: Option<String>,
    #[serde(rename = "emailProvider", default)]
    pub email_providers: Vec<EmailProvider>,
}

impl ClientConfig {
    /// Select the provider entry describing the given domain.
    ///
    /// A document with a single entry matches regardless of its id;
    /// with several entries, the one whose id equals the queried
    /// domain is selected.
    pub fn provider_for(&self, domain: &str) -> Option<&EmailProvider> {
        match self.email_providers.as_slice() {
            [provider] => Some(provider),
            providers => providers.iter().find(|provider| provider.id == domain),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailProvider {
    pub id: String,
    #[serde(rename = "$value", default)]
    pub properties: Vec<EmailProviderProperty>,
}

impl EmailProvider {
    /// The first incoming server of the given type.
    pub fn incoming_server(&self, r#type: ServerType) -> Option<&Server> {
        self.properties.iter().find_map(|property| match property {
            EmailProviderProperty::IncomingServer(server) if server.r#type == r#type => {
                Some(server)
            }
            _ => None,
        })
    }

    /// The first outgoing server of the given type.
    pub fn outgoing_server(&self, r#type: ServerType) -> Option<&Server> {
        self.properties.iter().find_map(|property| match property {
            EmailProviderProperty::OutgoingServer(server) if server.r#type == r#type => {
                Some(server)
            }
            _ => None,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmailProviderProperty {
    Domain(String),
    DisplayName(String),
    DisplayShortName(String),
    IncomingServer(Server),
    OutgoingServer(Server),
    Documentation(Documentation),
    // catch-all for empty unmodeled child elements
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub r#type: ServerType,
    #[serde(rename = "$value", default)]
    pub properties: Vec<ServerProperty>,
}

impl Server {
    /// The server hostname, if declared.
    pub fn hostname(&self) -> Option<&str> {
        self.properties.iter().find_map(|property| match property {
            ServerProperty::Hostname(hostname) => Some(hostname.as_str()),
            _ => None,
        })
    }

    /// The server port, if declared.
    pub fn port(&self) -> Option<u16> {
        self.properties.iter().find_map(|property| match property {
            ServerProperty::Port(port) => Some(*port),
            _ => None,
        })
    }

    /// The socket type of the server, if declared.
    pub fn socket_type(&self) -> Option<SocketType> {
        self.properties.iter().find_map(|property| match property {
            ServerProperty::SocketType(socket_type) => Some(*socket_type),
            _ => None,
        })
    }

    /// The username template of the server, if declared.
    pub fn username(&self) -> Option<&str> {
        self.properties.iter().find_map(|property| match property {
            ServerProperty::Username(username) => Some(username.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerProperty {
    Hostname(String),
    Port(u16),
    SocketType(SocketType),
    Authentication(AuthenticationType),
    Username(String),
    Password(String),
    OwaURL(String),
    EwsURL(String),
    UseGlobalPreferredServer(bool),
    Pop3(Pop3Config),
    // catch-all for empty unmodeled child elements
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
pub enum SocketType {
    #[serde(rename = "plain")]
    Plain,
    #[serde(rename = "STARTTLS")]
    Starttls,
    #[serde(rename = "SSL")]
    Ssl,
    // tolerate values outside the published vocabulary instead of
    // rejecting the whole document
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ServerType {
    Exchange,
    Imap,
    Smtp,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
pub enum AuthenticationType {
    #[serde(rename = "password-cleartext")]
    PasswordCleartext,
    #[serde(rename = "password-encrypted")]
    PasswordEncrypted,
    #[serde(rename = "NTLM")]
    Ntlm,
    #[serde(rename = "GSAPI")]
    GsApi,
    #[serde(rename = "client-IP-address")]
    ClientIPAddress,
    #[serde(rename = "TLS-client-cert")]
    TlsClientCert,
    OAuth2,
    #[serde(rename = "None")]
    None,
    #[serde(other)]
    Unknown,
}

/// POP3-specific configuration. Parsed for tolerance only: POP3
/// servers never contribute to resolved settings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pop3Config {
    pub leave_messages_on_server: Option<bool>,
    pub download_on_biff: Option<bool>,
    pub days_to_leave_messages_on_server: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Documentation {
    pub url: String,
    #[serde(rename = "$value", default)]
    pub descriptions: Vec<DocumentationDescription>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentationDescription {
    pub lang: Option<String>,
    #[serde(rename = "$value", default)]
    pub description: String,
}
