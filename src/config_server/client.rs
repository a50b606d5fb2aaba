//! # Config Server Client
//!
//! HTTP(S) client for a Spring Cloud Config server.
//!
//! The transport is configured once from [`ClientOption`]s and is immutable
//! afterwards. Each environment builds its own client so TLS and auth material
//! never crosses environments.
//!
//! ## Endpoints
//!
//! - raw config: `{base}{label}/{app}-{profiles}.json`
//! - file: `{base}{app}/{profiles}/{label}/{file}`

use super::discovery::parse_app_list;
use super::options::{ClientOption, ClientSettings};
use crate::controller::error::ReconcileError;
use crate::observability::metrics;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Certificate, Identity, Proxy, StatusCode};
use std::time::Instant;
use tracing::debug;

/// Profile used in request paths when none is configured
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone)]
pub struct ConfigServerClient {
    base_url: String,
    http: reqwest::Client,
    authorization: Option<HeaderValue>,
}

impl ConfigServerClient {
    /// Build a client for `server`, applying `options` in order
    ///
    /// Fails with a validation error if the address uses plaintext HTTP without
    /// [`with_insecure`](super::with_insecure), or if any supplied TLS or proxy
    /// material cannot be loaded.
    pub fn new(
        server: &str,
        options: impl IntoIterator<Item = ClientOption>,
    ) -> Result<Self, ReconcileError> {
        let settings = ClientSettings::from_options(options);
        let base_url = normalize_server_url(server, settings.insecure)?;
        let authorization = authorization_header(&settings)?;
        let http = build_transport(&settings)?;

        Ok(Self {
            base_url,
            http,
            authorization,
        })
    }

    /// Normalized base URL, always ending in a single `/`
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `Authorization` header attached to every request, if any
    #[must_use]
    pub fn authorization(&self) -> Option<&HeaderValue> {
        self.authorization.as_ref()
    }

    /// Fetch the merged configuration of `app` as JSON
    pub async fn get_raw_config(
        &self,
        app: &str,
        label: &str,
        profiles: &[String],
    ) -> Result<Vec<u8>, ReconcileError> {
        let url = format!(
            "{}{}/{}-{}.json",
            self.base_url,
            label,
            app,
            join_profiles(profiles)
        );
        self.get(&url, "raw_config").await
    }

    /// Fetch a plain text file served for `app`
    pub async fn get_config_file(
        &self,
        file_name: &str,
        app: &str,
        label: &str,
        profiles: &[String],
    ) -> Result<Vec<u8>, ReconcileError> {
        let url = format!(
            "{}{}/{}/{}/{}",
            self.base_url,
            app,
            join_profiles(profiles),
            label,
            file_name
        );
        self.get(&url, "config_file").await
    }

    /// Read the list of apps named by `field` from the raw config of `app`
    pub async fn discover_apps(
        &self,
        field: &str,
        app: &str,
        label: &str,
        profiles: &[String],
    ) -> Result<Vec<String>, ReconcileError> {
        let raw = self.get_raw_config(app, label, profiles).await?;
        parse_app_list(&raw, field, app)
    }

    async fn get(&self, url: &str, operation: &str) -> Result<Vec<u8>, ReconcileError> {
        let start = Instant::now();
        debug!(url = %url, operation = operation, "config_server.request");

        let mut request = self.http.get(url);
        if let Some(authorization) = &self.authorization {
            request = request.header(AUTHORIZATION, authorization.clone());
        }

        let response = request.send().await.map_err(|source| {
            metrics::increment_config_server_requests(operation, "transport_error");
            ReconcileError::Transport {
                url: url.to_string(),
                source,
            }
        })?;
        metrics::observe_config_server_request_duration(start.elapsed().as_secs_f64());

        let status = response.status();
        if status != StatusCode::OK {
            metrics::increment_config_server_requests(operation, "error");
            return Err(ReconcileError::Remote {
                url: url.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| ReconcileError::Transport {
                url: url.to_string(),
                source,
            })?;
        metrics::increment_config_server_requests(operation, "success");
        Ok(body.to_vec())
    }
}

/// Normalize a server address into a base URL
///
/// A scheme-less address gets `https://`, or `http://` when insecure. A plaintext
/// `http://` address is rejected unless insecure. The result ends in exactly one `/`.
pub fn normalize_server_url(server: &str, insecure: bool) -> Result<String, ReconcileError> {
    let server = server.trim();
    if server.is_empty() {
        return Err(ReconcileError::invalid("server", "is required"));
    }

    let lower = server.to_ascii_lowercase();
    let plaintext = lower.starts_with("http://");
    if plaintext && !insecure {
        return Err(ReconcileError::invalid(
            "server",
            format!("'{server}' must be secured (https) unless insecure is set"),
        ));
    }

    let mut url = if plaintext || lower.starts_with("https://") {
        server.to_string()
    } else if insecure {
        format!("http://{server}")
    } else {
        format!("https://{server}")
    };

    while url.ends_with('/') {
        url.pop();
    }
    url.push('/');

    reqwest::Url::parse(&url)
        .map_err(|e| ReconcileError::invalid("server", format!("'{server}' is not a valid URL: {e}")))?;

    Ok(url)
}

fn join_profiles(profiles: &[String]) -> String {
    if profiles.is_empty() {
        DEFAULT_PROFILE.to_string()
    } else {
        profiles.join(",")
    }
}

/// Bearer wins over basic when both are configured
fn authorization_header(settings: &ClientSettings) -> Result<Option<HeaderValue>, ReconcileError> {
    let value = if let Some(token) = &settings.bearer_token {
        format!("Bearer {token}")
    } else if let Some((username, password)) = &settings.basic_auth {
        format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
    } else {
        return Ok(None);
    };

    let mut header = HeaderValue::from_str(&value).map_err(|_| {
        ReconcileError::invalid("credentials", "contains characters not allowed in a header")
    })?;
    header.set_sensitive(true);
    Ok(Some(header))
}

fn build_transport(settings: &ClientSettings) -> Result<reqwest::Client, ReconcileError> {
    let mut builder = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(settings.timeout);

    if settings.replace_roots {
        builder = builder.tls_built_in_root_certs(false);
    }
    for pem in &settings.trust_anchors {
        let certs = Certificate::from_pem_bundle(pem).map_err(|e| {
            ReconcileError::invalid("trustStore", format!("invalid PEM certificate: {e}"))
        })?;
        if certs.is_empty() {
            return Err(ReconcileError::invalid(
                "trustStore",
                "no PEM certificates found",
            ));
        }
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
    }

    if let Some((cert, key)) = &settings.identity {
        let mut pem = cert.clone();
        pem.push(b'\n');
        pem.extend_from_slice(key);
        let identity = Identity::from_pem(&pem).map_err(|e| {
            ReconcileError::invalid("credentials.cert", format!("invalid client certificate: {e}"))
        })?;
        builder = builder.identity(identity);
    }

    if let Some(proxy) = &settings.proxy {
        let proxy = Proxy::all(proxy.as_str())
            .map_err(|e| ReconcileError::invalid("proxy", format!("'{proxy}' is invalid: {e}")))?;
        builder = builder.proxy(proxy);
    }

    if settings.insecure {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| ReconcileError::invalid("server", format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_server::options::{
        with_basic_auth, with_bearer_token, with_insecure, with_proxy, with_trust_store,
    };

    mod normalization {
        use super::*;

        #[test]
        fn test_normalize_server_url() {
            let cases = vec![
                ("https://test.com", false, "https://test.com/"),
                ("https://test.com/", false, "https://test.com/"),
                ("https://test.com//", false, "https://test.com/"),
                ("test.com", false, "https://test.com/"),
                ("test.com", true, "http://test.com/"),
                ("https://test.com", true, "https://test.com/"),
                ("http://test.com", true, "http://test.com/"),
                ("cloud-config-server:8888", false, "https://cloud-config-server:8888/"),
            ];

            for (server, insecure, expected) in cases {
                let url = normalize_server_url(server, insecure).unwrap();
                assert_eq!(
                    url, expected,
                    "normalizing '{server}' (insecure={insecure}) should give '{expected}'"
                );
            }
        }

        #[test]
        fn test_plaintext_rejected_unless_insecure() {
            let error = normalize_server_url("http://test.com", false).unwrap_err();
            assert_eq!(error.violations()[0].field, "server");
            assert!(error.to_string().contains("must be secured"));

            let error = normalize_server_url("HTTP://test.com", false).unwrap_err();
            assert!(error.to_string().contains("must be secured"));
        }

        #[test]
        fn test_empty_server_rejected() {
            let error = normalize_server_url("  ", false).unwrap_err();
            assert_eq!(error.violations()[0].message, "is required");
        }
    }

    mod auth {
        use super::*;

        #[test]
        fn test_bearer_overrides_basic() {
            let client = ConfigServerClient::new(
                "https://test.com",
                [with_basic_auth("username", "password"), with_bearer_token("token")],
            )
            .unwrap();
            assert_eq!(client.authorization().unwrap(), "Bearer token");
        }

        #[test]
        fn test_basic_auth_header() {
            let client =
                ConfigServerClient::new("https://test.com", [with_basic_auth("username", "password")])
                    .unwrap();
            let expected = format!("Basic {}", STANDARD.encode("username:password"));
            assert_eq!(client.authorization().unwrap(), expected.as_str());
        }

        #[test]
        fn test_no_auth_header_by_default() {
            let client = ConfigServerClient::new("https://test.com", []).unwrap();
            assert!(client.authorization().is_none());
        }
    }

    mod construction {
        use super::*;

        #[test]
        fn test_insecure_allows_plaintext() {
            let client = ConfigServerClient::new("http://test.com", [with_insecure()]).unwrap();
            assert_eq!(client.base_url(), "http://test.com/");
        }

        #[test]
        fn test_plaintext_without_insecure_fails() {
            let error = ConfigServerClient::new("http://test.com", []).unwrap_err();
            assert!(matches!(error, ReconcileError::Validation(_)));
        }

        #[test]
        fn test_invalid_trust_store_fails() {
            let error = ConfigServerClient::new(
                "https://test.com",
                [with_trust_store(vec![b"not a certificate".to_vec()])],
            )
            .unwrap_err();
            assert_eq!(error.violations()[0].field, "trustStore");
        }

        #[test]
        fn test_proxy_accepted() {
            let client =
                ConfigServerClient::new("https://test.com", [with_proxy("http://proxy:3128")]);
            assert!(client.is_ok());
        }
    }

    #[test]
    fn test_join_profiles() {
        assert_eq!(join_profiles(&[]), "default");
        assert_eq!(
            join_profiles(&["cloud".to_string(), "prod".to_string()]),
            "cloud,prod"
        );
    }
}
