//! # CloudConfig Spec
//!
//! The declarative resource: resource-wide defaults plus a map of named
//! environments, each of which may override any default.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// CloudConfig custom resource
///
/// Every field of [`EnvironmentSpec`] can be set at the top level of the spec,
/// where it acts as the default for all environments.
///
/// ```yaml
/// apiVersion: k8.jabberwocky.se/v1alpha1
/// kind: CloudConfig
/// metadata:
///   name: shop
/// spec:
///   server: https://config.example.com
///   appList: services
///   period: 300
///   credentials:
///     secret: config-server-credentials
///   environments:
///     dev:
///       label: develop
///     prod:
///       profile: [prod]
/// ```
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "k8.jabberwocky.se",
    version = "v1alpha1",
    kind = "CloudConfig",
    plural = "cloudconfigs",
    shortname = "cc",
    namespaced,
    status = "crate::crd::CloudConfigStatus",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Failed","type":"integer","jsonPath":".status.environmentsFailed"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CloudConfigSpec {
    /// Defaults shared by every environment
    #[serde(flatten)]
    pub defaults: EnvironmentSpec,
    /// Environments keyed by their identifier
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentSpec>,
}

/// Settings for one environment, or the resource-wide defaults
///
/// All fields are optional. An empty string is treated the same as an absent field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSpec {
    /// Display name (defaults to the environment key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Target namespace (defaults to `{resource}-{key}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Application name queried on the config server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    /// Config server profiles, in query order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Vec<String>>,
    /// Config server label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Config server address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Manifest file fetched for each app
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_file: Option<String>,
    /// Configuration field listing the managed apps; unset means a single app
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_list: Option<String>,
    /// Seconds between cycles; zero or negative runs once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<i64>,
    /// Allow plaintext transport and skip certificate verification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    /// Secret whose entries are all trusted CA certificates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_store: Option<String>,
    /// Proxy URL for config server requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Credentials secret reference and entry names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CredentialsSpec>,
}

/// Credentials secret reference
///
/// The entry names select which keys of the secret hold each credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, rename = "rootCA", skip_serializing_if = "Option::is_none")]
    pub root_ca: Option<String>,
}
