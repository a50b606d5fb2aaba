//! End-to-end reconciliation tests
//!
//! Drives the resolve, fetch, assemble and apply pipeline for several
//! environments against a Pact mock config server, with the secret store and
//! the cluster replaced by in-memory stand-ins.

#[cfg(test)]
mod common;

use cloud_config_operator::prelude::*;
use common::{init_rustls, MemorySecrets, RecordingApplier};
use pact_consumer::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn context(secrets: MemorySecrets, applier: &Arc<RecordingApplier>) -> EnvironmentContext {
    EnvironmentContext {
        secrets: Arc::new(secrets),
        applier: Arc::clone(applier) as Arc<dyn ClusterApplier>,
        secret_namespace: "operators".to_string(),
        request_timeout: Duration::from_secs(5),
    }
}

fn defaults(server: &str) -> EnvironmentSpec {
    EnvironmentSpec {
        server: Some(server.to_string()),
        insecure: Some(true),
        ..EnvironmentSpec::default()
    }
}

#[tokio::test]
async fn test_one_failing_environment_does_not_block_siblings() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Cloud-Config-Operator", "Spring-Cloud-Config");

    pact_builder.interaction("deployment file on the develop label", "", |mut i| {
        i.request
            .method("GET")
            .path("/shop/default/develop/deployment.yaml");
        i.response
            .status(200)
            .header("content-type", "text/plain")
            .body("kind: ConfigMap\nmetadata:\n  name: shop\n");
        i
    });
    pact_builder.interaction("deployment file on a forbidden label", "", |mut i| {
        i.request
            .method("GET")
            .path("/shop/default/restricted/deployment.yaml");
        i.response.status(403);
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let applier = Arc::new(RecordingApplier::default());
    let ctx = context(MemorySecrets::default(), &applier);

    let mut environments = BTreeMap::new();
    environments.insert(
        "dev".to_string(),
        EnvironmentSpec {
            label: Some("develop".to_string()),
            ..EnvironmentSpec::default()
        },
    );
    environments.insert(
        "prod".to_string(),
        EnvironmentSpec {
            label: Some("restricted".to_string()),
            ..EnvironmentSpec::default()
        },
    );

    let summary = reconcile_all(
        "shop",
        &defaults(mock_server.url().as_str()),
        &environments,
        &ctx,
    )
    .await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert!(summary.failed_environments.contains("prod"));

    let prod = summary
        .outcomes
        .iter()
        .find(|o| o.key == "prod")
        .expect("prod outcome");
    let error = prod.result.as_ref().expect_err("prod should fail");
    assert_eq!(error.kind(), FailureKind::Remote);
    assert!(error.to_string().contains("403"), "unexpected message: {error}");

    assert_eq!(
        applier.applies(),
        vec![(
            "shop-dev".to_string(),
            "---\nkind: ConfigMap\nmetadata:\n  name: shop\n".to_string()
        )]
    );
    let namespaces = applier.namespaces();
    assert_eq!(namespaces.len(), 1);
    assert_eq!(
        namespaces[0].1,
        NamespaceLabels {
            app: "shop".to_string(),
            sys: "shop".to_string(),
            env: "dev".to_string(),
        }
    );
}

#[tokio::test]
async fn test_discovered_apps_are_applied_as_one_manifest() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Cloud-Config-Operator", "Spring-Cloud-Config");

    pact_builder.interaction("raw config of the platform app", "", |mut i| {
        i.request.method("GET").path("/master/platform-staging.json");
        i.request.header("authorization", "Bearer platform-token");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "apps": ["orders", "billing"] }));
        i
    });
    pact_builder.interaction("billing deployment file", "", |mut i| {
        i.request
            .method("GET")
            .path("/billing/staging/master/k8s.yaml")
            .header("authorization", "Bearer platform-token");
        i.response
            .status(200)
            .header("content-type", "text/plain")
            .body("---\nkind: Deployment\nmetadata:\n  name: billing\n---\n");
        i
    });
    pact_builder.interaction("orders deployment file", "", |mut i| {
        i.request
            .method("GET")
            .path("/orders/staging/master/k8s.yaml")
            .header("authorization", "Bearer platform-token");
        i.response
            .status(200)
            .header("content-type", "text/plain")
            .body("kind: Deployment\nmetadata:\n  name: orders");
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let applier = Arc::new(RecordingApplier::default());
    let secrets =
        MemorySecrets::default().with_secret("operators", "platform-creds", &[("token", "platform-token\n")]);
    let ctx = context(secrets, &applier);

    let mut environments = BTreeMap::new();
    environments.insert(
        "staging".to_string(),
        EnvironmentSpec {
            namespace: Some("platform-stage".to_string()),
            app_name: Some("platform".to_string()),
            profile: Some(vec!["staging".to_string()]),
            spec_file: Some("k8s.yaml".to_string()),
            app_list: Some("apps".to_string()),
            credentials: Some(CredentialsSpec {
                secret: Some("platform-creds".to_string()),
                ..CredentialsSpec::default()
            }),
            ..EnvironmentSpec::default()
        },
    );

    let summary = reconcile_all(
        "ops",
        &defaults(mock_server.url().as_str()),
        &environments,
        &ctx,
    )
    .await;

    assert!(!summary.has_failures(), "outcomes: {:?}", summary.outcomes);
    let applied = summary.outcomes[0].result.as_ref().expect("staging should succeed");
    assert_eq!(applied, &vec!["billing".to_string(), "orders".to_string()]);

    assert_eq!(
        applier.applies(),
        vec![(
            "platform-stage".to_string(),
            "---\nkind: Deployment\nmetadata:\n  name: billing\n---\nkind: Deployment\nmetadata:\n  name: orders\n"
                .to_string()
        )]
    );
    assert_eq!(applier.namespaces()[0].1.sys, "ops");
}

#[tokio::test]
async fn test_missing_credentials_secret_fails_before_any_request() {
    init_rustls();
    let applier = Arc::new(RecordingApplier::default());
    let ctx = context(MemorySecrets::default(), &applier);

    let mut environments = BTreeMap::new();
    environments.insert(
        "dev".to_string(),
        EnvironmentSpec {
            credentials: Some(CredentialsSpec {
                secret: Some("absent".to_string()),
                ..CredentialsSpec::default()
            }),
            ..EnvironmentSpec::default()
        },
    );

    // Nothing listens here; the secret lookup fails first
    let summary = reconcile_all("shop", &defaults("127.0.0.1:9"), &environments, &ctx).await;

    assert_eq!(summary.failed, 1);
    let error = summary.outcomes[0].result.as_ref().expect_err("dev should fail");
    assert_eq!(error.kind(), FailureKind::Remote);
    assert!(applier.applies().is_empty());
}

#[tokio::test]
async fn test_reconcile_once_uses_resource_namespace_for_secrets() {
    init_rustls();
    let applier = Arc::new(RecordingApplier::default());
    // The secret exists only in the operators namespace
    let secrets = MemorySecrets::default().with_secret("operators", "creds", &[("token", "t")]);
    let ctx = context(secrets, &applier);

    let mut resource = CloudConfig::new(
        "shop",
        CloudConfigSpec {
            defaults: defaults("127.0.0.1:9"),
            environments: BTreeMap::from([(
                "dev".to_string(),
                EnvironmentSpec {
                    credentials: Some(CredentialsSpec {
                        secret: Some("creds".to_string()),
                        ..CredentialsSpec::default()
                    }),
                    ..EnvironmentSpec::default()
                },
            )]),
        },
    );
    resource.metadata.namespace = Some("shop-system".to_string());

    let summary = reconcile_once(&resource, &ctx).await;
    assert_eq!(summary.total, 1);
    let error = summary.outcomes[0].result.as_ref().expect_err("dev should fail");
    assert_eq!(error.kind(), FailureKind::Remote);
    assert!(error.to_string().contains("shop-system/creds"), "unexpected message: {error}");
}

#[tokio::test]
async fn test_one_missing_app_file_aborts_the_environment() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Cloud-Config-Operator", "Spring-Cloud-Config");

    pact_builder.interaction("raw config listing two apps", "", |mut i| {
        i.request.method("GET").path("/master/platform-default.json");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "apps": ["orders", "billing"] }));
        i
    });
    pact_builder.interaction("billing deployment file", "", |mut i| {
        i.request
            .method("GET")
            .path("/billing/default/master/deployment.yaml");
        i.response
            .status(200)
            .header("content-type", "text/plain")
            .body("kind: Deployment\nmetadata:\n  name: billing\n");
        i
    });
    pact_builder.interaction("orders deployment file that does not exist", "", |mut i| {
        i.request
            .method("GET")
            .path("/orders/default/master/deployment.yaml");
        i.response.status(404);
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let applier = Arc::new(RecordingApplier::default());
    let ctx = context(MemorySecrets::default(), &applier);

    let mut environments = BTreeMap::new();
    environments.insert(
        "dev".to_string(),
        EnvironmentSpec {
            app_name: Some("platform".to_string()),
            app_list: Some("apps".to_string()),
            ..EnvironmentSpec::default()
        },
    );

    let summary = reconcile_all(
        "ops",
        &defaults(mock_server.url().as_str()),
        &environments,
        &ctx,
    )
    .await;

    assert_eq!(summary.failed, 1);
    let error = summary.outcomes[0].result.as_ref().expect_err("dev should fail");
    assert_eq!(error.kind(), FailureKind::Remote);
    assert!(error.to_string().contains("404"), "unexpected message: {error}");
    assert!(applier.applies().is_empty());
    assert!(applier.namespaces().is_empty());
}

#[tokio::test]
async fn test_invalid_credentials_are_not_rescheduled() {
    init_rustls();
    let applier = Arc::new(RecordingApplier::default());
    let secrets = MemorySecrets::default().with_secret("operators", "creds", &[("username", "deploy")]);
    let ctx = context(secrets, &applier);

    let mut environments = BTreeMap::new();
    environments.insert(
        "dev".to_string(),
        EnvironmentSpec {
            period: Some(60),
            credentials: Some(CredentialsSpec {
                secret: Some("creds".to_string()),
                ..CredentialsSpec::default()
            }),
            ..EnvironmentSpec::default()
        },
    );
    environments.insert(
        "test".to_string(),
        EnvironmentSpec {
            period: Some(60),
            credentials: Some(CredentialsSpec {
                secret: Some("absent".to_string()),
                ..CredentialsSpec::default()
            }),
            ..EnvironmentSpec::default()
        },
    );

    let summary = reconcile_all("shop", &defaults("127.0.0.1:9"), &environments, &ctx).await;
    assert_eq!(summary.failed, 2);

    let dev = summary.outcomes.iter().find(|o| o.key == "dev").expect("dev outcome");
    let error = dev.result.as_ref().expect_err("dev should fail");
    assert_eq!(error.kind(), FailureKind::Validation);
    assert_eq!(dev.period, None);

    // Remote failures keep their period and retry on the next cycle
    let test = summary.outcomes.iter().find(|o| o.key == "test").expect("test outcome");
    assert_eq!(test.period, Some(Duration::from_secs(60)));
}
