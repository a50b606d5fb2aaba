//! # Configuration Resolution
//!
//! Computes the effective configuration of one environment from three layers:
//! the environment's own settings, the resource-wide defaults, and the
//! built-in defaults. An explicitly set field always wins over lower layers.
//!
//! `name` and `namespace` only come from the environment layer. The namespace is
//! derived as `{resource}-{key}` when not set.
//!
//! `period` is the one numeric field: absent or `0` in the environment layer
//! inherits the resource-wide value; a negative value explicitly runs once.

use crate::constants::{
    DEFAULT_CERT_KEY, DEFAULT_KEY_KEY, DEFAULT_LABEL, DEFAULT_PASSWORD_KEY, DEFAULT_PERIOD_SECS, MAX_PERIOD_SECS,
    DEFAULT_ROOT_CA_KEY, DEFAULT_SERVER, DEFAULT_SPEC_FILE, DEFAULT_TOKEN_KEY,
    DEFAULT_USERNAME_KEY,
};
use crate::controller::error::{FieldViolation, ReconcileError};
use crate::controller::reconciler::validation::{validate_namespace, validate_server};
use crate::crd::{CredentialsSpec, EnvironmentSpec};
use std::time::Duration;

/// Names of the credential secret entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialKeys {
    pub username: String,
    pub password: String,
    pub token: String,
    pub cert: String,
    pub key: String,
    pub root_ca: String,
}

impl Default for CredentialKeys {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME_KEY.to_string(),
            password: DEFAULT_PASSWORD_KEY.to_string(),
            token: DEFAULT_TOKEN_KEY.to_string(),
            cert: DEFAULT_CERT_KEY.to_string(),
            key: DEFAULT_KEY_KEY.to_string(),
            root_ca: DEFAULT_ROOT_CA_KEY.to_string(),
        }
    }
}

/// Effective configuration of one environment for one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentConfig {
    pub key: String,
    pub parent_name: String,
    pub display_name: String,
    pub namespace: String,
    pub app_name: String,
    pub profiles: Vec<String>,
    pub label: String,
    pub server: String,
    pub spec_file: String,
    /// Field holding the app list; `None` manages `app_name` only
    pub app_list: Option<String>,
    pub period_secs: i64,
    pub insecure: bool,
    pub trust_store: Option<String>,
    pub proxy: Option<String>,
    pub credentials_secret: Option<String>,
    pub credential_keys: CredentialKeys,
}

impl EnvironmentConfig {
    /// Sync period, `None` when the environment runs once
    #[must_use]
    pub fn period(&self) -> Option<Duration> {
        u64::try_from(self.period_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Resolve environment `key` of resource `parent_name`
///
/// Pure: neither input is modified. Every violated field is reported at once.
pub fn resolve(
    parent_name: &str,
    defaults: &EnvironmentSpec,
    overrides: &EnvironmentSpec,
    key: &str,
) -> Result<EnvironmentConfig, ReconcileError> {
    let mut violations = Vec::new();

    let insecure = overrides.insecure.or(defaults.insecure).unwrap_or(false);
    let server = pick(&overrides.server, &defaults.server).unwrap_or_else(|| DEFAULT_SERVER.to_string());
    if let Err(violation) = validate_server(&server, insecure) {
        violations.push(violation);
    }

    let namespace = set(&overrides.namespace).unwrap_or_else(|| format!("{parent_name}-{key}"));
    if let Err(violation) = validate_namespace(&namespace) {
        violations.push(violation);
    }

    let app_name = pick(&overrides.app_name, &defaults.app_name)
        .unwrap_or_else(|| parent_name.trim().to_string());
    if app_name.is_empty() {
        violations.push(FieldViolation::new("appName", "is required"));
    }

    let proxy = pick(&overrides.proxy, &defaults.proxy);
    if let Some(proxy) = &proxy {
        if reqwest::Url::parse(proxy).is_err() {
            violations.push(FieldViolation::new(
                "proxy",
                format!("'{proxy}' is not a valid URL"),
            ));
        }
    }

    let period_secs = pick_period(overrides.period, defaults.period);
    if period_secs > MAX_PERIOD_SECS {
        violations.push(FieldViolation::new(
            "period",
            format!("{period_secs}s exceeds the maximum of {MAX_PERIOD_SECS}s"),
        ));
    }

    if !violations.is_empty() {
        return Err(ReconcileError::Validation(violations));
    }

    Ok(EnvironmentConfig {
        key: key.to_string(),
        parent_name: parent_name.to_string(),
        display_name: set(&overrides.name).unwrap_or_else(|| key.to_string()),
        namespace,
        app_name,
        profiles: pick_profiles(&overrides.profile, &defaults.profile),
        label: pick(&overrides.label, &defaults.label).unwrap_or_else(|| DEFAULT_LABEL.to_string()),
        server,
        spec_file: pick(&overrides.spec_file, &defaults.spec_file)
            .unwrap_or_else(|| DEFAULT_SPEC_FILE.to_string()),
        app_list: pick(&overrides.app_list, &defaults.app_list),
        period_secs,
        insecure,
        trust_store: pick(&overrides.trust_store, &defaults.trust_store),
        proxy,
        credentials_secret: pick(
            &overrides.credentials.as_ref().and_then(|c| c.secret.clone()),
            &defaults.credentials.as_ref().and_then(|c| c.secret.clone()),
        ),
        credential_keys: merge_credential_keys(
            overrides.credentials.as_ref(),
            defaults.credentials.as_ref(),
        ),
    })
}

/// A non-blank value
fn set(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn pick(overrides: &Option<String>, defaults: &Option<String>) -> Option<String> {
    set(overrides).or_else(|| set(defaults))
}

fn pick_profiles(overrides: &Option<Vec<String>>, defaults: &Option<Vec<String>>) -> Vec<String> {
    let clean = |profiles: &Option<Vec<String>>| {
        profiles
            .as_ref()
            .map(|p| {
                p.iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|p| !p.is_empty())
    };
    clean(overrides).or_else(|| clean(defaults)).unwrap_or_default()
}

fn pick_period(overrides: Option<i64>, defaults: Option<i64>) -> i64 {
    match overrides {
        Some(period) if period != 0 => period,
        _ => defaults.unwrap_or(DEFAULT_PERIOD_SECS),
    }
}

fn merge_credential_keys(
    overrides: Option<&CredentialsSpec>,
    defaults: Option<&CredentialsSpec>,
) -> CredentialKeys {
    let o = overrides.cloned().unwrap_or_default();
    let d = defaults.cloned().unwrap_or_default();
    let builtin = CredentialKeys::default();

    CredentialKeys {
        username: pick(&o.username, &d.username).unwrap_or(builtin.username),
        password: pick(&o.password, &d.password).unwrap_or(builtin.password),
        token: pick(&o.token, &d.token).unwrap_or(builtin.token),
        cert: pick(&o.cert, &d.cert).unwrap_or(builtin.cert),
        key: pick(&o.key, &d.key).unwrap_or(builtin.key),
        root_ca: pick(&o.root_ca, &d.root_ca).unwrap_or(builtin.root_ca),
    }
}
