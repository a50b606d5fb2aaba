//! # Client Options
//!
//! Composable options applied to a [`ClientSettings`] builder when a
//! [`ConfigServerClient`](super::ConfigServerClient) is constructed.
//!
//! Each option touches a disjoint part of the settings, so the order in which
//! they are supplied does not change the resulting client.

use crate::constants::DEFAULT_CONFIG_SERVER_TIMEOUT_SECS;
use std::fmt;
use std::time::Duration;

/// A single client configuration step
#[derive(Clone)]
pub enum ClientOption {
    BearerToken(String),
    BasicAuth { username: String, password: String },
    ClientCertificate { cert: Vec<u8>, key: Vec<u8> },
    TrustStore(Vec<Vec<u8>>),
    Proxy(String),
    Insecure,
    Timeout(Duration),
}

// Credentials must never end up in logs
impl fmt::Debug for ClientOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientOption::BearerToken(_) => f.write_str("BearerToken(***)"),
            ClientOption::BasicAuth { username, .. } => f
                .debug_struct("BasicAuth")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            ClientOption::ClientCertificate { .. } => f.write_str("ClientCertificate(***)"),
            ClientOption::TrustStore(certs) => write!(f, "TrustStore({} certificates)", certs.len()),
            ClientOption::Proxy(url) => f.debug_tuple("Proxy").field(url).finish(),
            ClientOption::Insecure => f.write_str("Insecure"),
            ClientOption::Timeout(timeout) => f.debug_tuple("Timeout").field(timeout).finish(),
        }
    }
}

pub fn with_bearer_token(token: impl Into<String>) -> ClientOption {
    ClientOption::BearerToken(token.into())
}

pub fn with_basic_auth(username: impl Into<String>, password: impl Into<String>) -> ClientOption {
    ClientOption::BasicAuth {
        username: username.into(),
        password: password.into(),
    }
}

pub fn with_client_certificate(cert: impl Into<Vec<u8>>, key: impl Into<Vec<u8>>) -> ClientOption {
    ClientOption::ClientCertificate {
        cert: cert.into(),
        key: key.into(),
    }
}

/// Trust the given PEM certificates instead of the built-in web PKI roots
pub fn with_trust_store(certs: Vec<Vec<u8>>) -> ClientOption {
    ClientOption::TrustStore(certs)
}

pub fn with_proxy(url: impl Into<String>) -> ClientOption {
    ClientOption::Proxy(url.into())
}

/// Permit plaintext transport and disable certificate verification
pub fn with_insecure() -> ClientOption {
    ClientOption::Insecure
}

pub fn with_timeout(timeout: Duration) -> ClientOption {
    ClientOption::Timeout(timeout)
}

/// Mutable settings the options are applied to
#[derive(Clone)]
pub struct ClientSettings {
    pub bearer_token: Option<String>,
    pub basic_auth: Option<(String, String)>,
    pub identity: Option<(Vec<u8>, Vec<u8>)>,
    pub trust_anchors: Vec<Vec<u8>>,
    pub replace_roots: bool,
    pub proxy: Option<String>,
    pub insecure: bool,
    pub timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            bearer_token: None,
            basic_auth: None,
            identity: None,
            trust_anchors: Vec::new(),
            replace_roots: false,
            proxy: None,
            insecure: false,
            timeout: Duration::from_secs(DEFAULT_CONFIG_SERVER_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "***"))
            .field(
                "basic_auth",
                &self.basic_auth.as_ref().map(|(username, _)| username),
            )
            .field("identity", &self.identity.is_some())
            .field("trust_anchors", &self.trust_anchors.len())
            .field("replace_roots", &self.replace_roots)
            .field("proxy", &self.proxy)
            .field("insecure", &self.insecure)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientSettings {
    /// Apply options in the order given
    pub fn from_options(options: impl IntoIterator<Item = ClientOption>) -> Self {
        let mut settings = Self::default();
        for option in options {
            settings.apply(option);
        }
        settings
    }

    pub fn apply(&mut self, option: ClientOption) {
        match option {
            ClientOption::BearerToken(token) => self.bearer_token = Some(token),
            ClientOption::BasicAuth { username, password } => {
                self.basic_auth = Some((username, password));
            }
            ClientOption::ClientCertificate { cert, key } => self.identity = Some((cert, key)),
            ClientOption::TrustStore(certs) => {
                self.trust_anchors.extend(certs);
                self.replace_roots = true;
            }
            ClientOption::Proxy(url) => self.proxy = Some(url),
            ClientOption::Insecure => self.insecure = true,
            ClientOption::Timeout(timeout) => self.timeout = timeout,
        }
    }
}
