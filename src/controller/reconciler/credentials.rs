//! # Credentials
//!
//! Turns credential and trust store secret content into config server client
//! options.
//!
//! Priority is bearer over basic. Client certificates stack with either. A
//! username without a password, or a certificate without a key, is a
//! configuration error.

use crate::config_server::{
    with_basic_auth, with_bearer_token, with_client_certificate, with_insecure, with_proxy,
    with_timeout, with_trust_store, ClientOption,
};
use crate::controller::error::{FieldViolation, ReconcileError};
use crate::controller::reconciler::resolve::{CredentialKeys, EnvironmentConfig};
use crate::controller::secrets::{SecretData, SecretSource};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Credential material resolved from a secret
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub token: Option<String>,
    pub basic: Option<(String, String)>,
    pub identity: Option<(Vec<u8>, Vec<u8>)>,
    pub root_ca: Option<Vec<u8>>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token.is_some())
            .field("basic", &self.basic.as_ref().map(|(username, _)| username))
            .field("identity", &self.identity.is_some())
            .field("root_ca", &self.root_ca.is_some())
            .finish()
    }
}

impl Credentials {
    /// Read the entries named by `keys` out of `data`
    pub fn from_secret_data(
        keys: &CredentialKeys,
        secret_name: &str,
        data: &SecretData,
    ) -> Result<Self, ReconcileError> {
        let mut violations = Vec::new();
        let entry = |key: &str| data.get(key).filter(|value| !value.is_empty());
        let text = |key: &str, violations: &mut Vec<FieldViolation>| {
            entry(key).and_then(|value| match String::from_utf8(value.clone()) {
                Ok(text) => Some(text.trim_end_matches(['\n', '\r']).to_string()),
                Err(_) => {
                    violations.push(FieldViolation::new(
                        format!("credentials.{key}"),
                        format!("entry '{key}' of secret '{secret_name}' is not valid UTF-8"),
                    ));
                    None
                }
            })
        };

        let token = text(&keys.token, &mut violations);
        let username = text(&keys.username, &mut violations);
        let password = text(&keys.password, &mut violations);
        let basic = match (username, password) {
            (Some(username), Some(password)) => Some((username, password)),
            (Some(_), None) => {
                violations.push(FieldViolation::new(
                    "credentials.password",
                    format!(
                        "secret '{secret_name}' has a username under '{}' but no password under '{}'",
                        keys.username, keys.password
                    ),
                ));
                None
            }
            (None, Some(_)) => {
                violations.push(FieldViolation::new(
                    "credentials.username",
                    format!(
                        "secret '{secret_name}' has a password under '{}' but no username under '{}'",
                        keys.password, keys.username
                    ),
                ));
                None
            }
            (None, None) => None,
        };

        let identity = match (entry(&keys.cert), entry(&keys.key)) {
            (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
            (Some(_), None) => {
                violations.push(FieldViolation::new(
                    "credentials.key",
                    format!(
                        "secret '{secret_name}' has a certificate under '{}' but no key under '{}'",
                        keys.cert, keys.key
                    ),
                ));
                None
            }
            (None, Some(_)) => {
                violations.push(FieldViolation::new(
                    "credentials.cert",
                    format!(
                        "secret '{secret_name}' has a key under '{}' but no certificate under '{}'",
                        keys.key, keys.cert
                    ),
                ));
                None
            }
            (None, None) => None,
        };

        if !violations.is_empty() {
            return Err(ReconcileError::Validation(violations));
        }

        Ok(Self {
            token,
            basic,
            identity,
            root_ca: entry(&keys.root_ca).cloned(),
        })
    }

    #[must_use]
    pub fn into_options(self) -> Vec<ClientOption> {
        let mut options = Vec::new();
        if let Some(token) = self.token {
            options.push(with_bearer_token(token));
        }
        if let Some((username, password)) = self.basic {
            options.push(with_basic_auth(username, password));
        }
        if let Some((cert, key)) = self.identity {
            options.push(with_client_certificate(cert, key));
        }
        if let Some(root_ca) = self.root_ca {
            options.push(with_trust_store(vec![root_ca]));
        }
        options
    }
}

/// Every entry of a trust store secret is a trusted certificate
#[must_use]
pub fn trust_store_certificates(data: &SecretData) -> Vec<Vec<u8>> {
    data.values()
        .filter(|value| !value.is_empty())
        .cloned()
        .collect()
}

/// Build the client options of `env`, reading its secrets from `namespace`
pub async fn client_options(
    env: &EnvironmentConfig,
    secrets: &dyn SecretSource,
    namespace: &str,
    timeout: Duration,
) -> Result<Vec<ClientOption>, ReconcileError> {
    let mut options = vec![with_timeout(timeout)];

    if let Some(secret_name) = &env.credentials_secret {
        let data = secrets.secret_data(namespace, secret_name).await?;
        let credentials = Credentials::from_secret_data(&env.credential_keys, secret_name, &data)?;
        debug!(
            environment = %env.key,
            "Loaded credentials from secret {}: {:?}",
            secret_name,
            credentials
        );
        options.extend(credentials.into_options());
    }

    if let Some(trust_store) = &env.trust_store {
        let data = secrets.secret_data(namespace, trust_store).await?;
        let certs = trust_store_certificates(&data);
        if certs.is_empty() {
            return Err(ReconcileError::invalid(
                "trustStore",
                format!("secret '{trust_store}' has no certificates"),
            ));
        }
        options.push(with_trust_store(certs));
    }

    if let Some(proxy) = &env.proxy {
        options.push(with_proxy(proxy.clone()));
    }

    if env.insecure {
        options.push(with_insecure());
    }

    Ok(options)
}
