#![allow(clippy::unwrap_used)]
// Integration tests for role detection and request routing using wiremock.

mod common;

use std::time::Duration;

use secrecy::SecretString;
use url::Url;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{client_for, connect, mount_fallback, mount_reply, mount_spool_status, pair, received_containing, OK};
use semprov_api::ApplianceClient;
use semprov_core::{Cluster, CoreError, Role, SempVersion, Target};

// ── Role detection ──────────────────────────────────────────────────

#[tokio::test]
async fn test_active_spool_becomes_primary_regardless_of_order() {
    let (primary, backup) = pair().await;

    // Backup listed first.
    let cluster = Cluster::from_clients(
        "dev",
        vec![client_for(&backup), client_for(&primary)],
        Some(SempVersion::default()),
        false,
    )
    .await
    .unwrap();

    assert_eq!(cluster.primary_host(), client_for(&primary).host());
    assert_eq!(cluster.backup_host(), Some(client_for(&backup).host()));
    assert_eq!(cluster.roles(), &[Role::Primary, Role::Backup]);
}

#[tokio::test]
async fn test_no_active_appliance_is_fatal() {
    let a = MockServer::start().await;
    let b = MockServer::start().await;
    mount_spool_status(&a, "AD-Standby").await;
    mount_spool_status(&b, "AD-Standby").await;

    let err = Cluster::from_clients(
        "dev",
        vec![client_for(&a), client_for(&b)],
        Some(SempVersion::default()),
        false,
    )
    .await
    .unwrap_err();

    match err {
        CoreError::RoleDetection { reason, .. } => assert_eq!(reason, "failed to detect primary/backup"),
        other => panic!("expected RoleDetection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_two_active_appliances_is_fatal() {
    let a = MockServer::start().await;
    let b = MockServer::start().await;
    mount_spool_status(&a, "AD-Active").await;
    mount_spool_status(&b, "AD-Active").await;

    let result = Cluster::from_clients(
        "dev",
        vec![client_for(&a), client_for(&b)],
        Some(SempVersion::default()),
        false,
    )
    .await;
    assert!(
        matches!(result, Err(CoreError::MultiplePrimaries { .. })),
        "expected MultiplePrimaries, got: {result:?}"
    );
}

#[tokio::test]
async fn test_version_is_detected_from_primary() {
    let (primary, backup) = pair().await;
    mount_reply(
        &primary,
        "<show><version/></show>",
        r#"<rpc-reply semp-version="soltr/7_1_1"><rpc><show><version/></show></rpc><execute-result code="ok"/></rpc-reply>"#,
    )
    .await;

    let cluster = Cluster::from_clients("dev", vec![client_for(&primary), client_for(&backup)], None, false)
        .await
        .unwrap();
    assert_eq!(cluster.version().as_str(), "soltr/7_1_1");
    assert!(cluster.version().vpn_scoped_client_profiles());
}

#[tokio::test]
async fn test_single_appliance_has_no_backup() {
    let primary = MockServer::start().await;
    mount_spool_status(&primary, "AD-Active").await;
    mount_fallback(&primary).await;

    let cluster = Cluster::from_clients("lab", vec![client_for(&primary)], Some(SempVersion::default()), false)
        .await
        .unwrap();
    assert!(!cluster.has_backup());

    // Both resolves to the primary alone.
    let mut doc = cluster.document("enable vpn");
    doc.set("message_vpn.vpn_name", "v").flag("message_vpn.no.shutdown");
    let replies = cluster.run(&doc, Target::Both).await.unwrap();
    assert_eq!(replies.len(), 1);

    let err = cluster.run(&doc, Target::BackupOnly).await.unwrap_err();
    assert!(matches!(err, CoreError::NoBackup { .. }));
}

// ── Routing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_both_sends_one_request_per_appliance() {
    let (primary, backup) = pair().await;
    for server in [&primary, &backup] {
        Mock::given(method("POST"))
            .and(body_string_contains("<vpn-name>countme</vpn-name>"))
            .respond_with(ResponseTemplate::new(200).set_body_string(OK))
            .expect(1)
            .mount(server)
            .await;
    }
    let cluster = connect(&primary, &backup, false).await;

    let mut doc = cluster.document("enable vpn");
    doc.set("message_vpn.vpn_name", "countme").flag("message_vpn.no.shutdown");
    let replies = cluster.run(&doc, Target::Both).await.unwrap();

    let roles: Vec<Role> = replies.iter().map(|r| r.role).collect();
    assert_eq!(roles, vec![Role::Primary, Role::Backup]);
}

#[tokio::test]
async fn test_primary_only_sends_one_request() {
    let (primary, backup) = pair().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<vpn-name>countme</vpn-name>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(OK))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("<vpn-name>countme</vpn-name>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(OK))
        .expect(0)
        .mount(&backup)
        .await;
    let cluster = connect(&primary, &backup, false).await;

    let mut doc = cluster.document("enable vpn");
    doc.set("message_vpn.vpn_name", "countme").flag("message_vpn.no.shutdown");
    let replies = cluster.run(&doc, Target::PrimaryOnly).await.unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].role, Role::Primary);
}

// ── Reply errors ────────────────────────────────────────────────────

#[tokio::test]
async fn test_parse_error_names_the_host() {
    let (primary, backup) = pair().await;
    mount_reply(
        &primary,
        "<message-vpn>",
        r#"<rpc-reply semp-version="soltr/6_0"><parse-error>unknown element</parse-error></rpc-reply>"#,
    )
    .await;
    let cluster = connect(&primary, &backup, false).await;

    let mut doc = cluster.document("enable vpn");
    doc.set("message_vpn.vpn_name", "v").flag("message_vpn.no.shutdown");
    let err = cluster.run(&doc, Target::Both).await.unwrap_err();

    assert!(matches!(err, CoreError::ApplianceParseError { .. }), "got {err:?}");
    assert_eq!(err.host(), Some(cluster.primary_host().as_str()));
}

#[tokio::test]
async fn test_permission_error_is_tolerated_only_when_read_only() {
    let (primary, backup) = pair().await;
    let denied = r#"<rpc-reply semp-version="soltr/6_0"><permission-error>read-only user</permission-error></rpc-reply>"#;
    mount_reply(&primary, "<message-vpn>", denied).await;
    mount_reply(&backup, "<message-vpn>", denied).await;

    let mut doc = semprov_core::ConfigDocument::new("enable vpn", &SempVersion::default());
    doc.set("message_vpn.vpn_name", "v").flag("message_vpn.no.shutdown");

    let cluster = connect(&primary, &backup, false).await;
    let err = cluster.run(&doc, Target::Both).await.unwrap_err();
    assert!(matches!(err, CoreError::PermissionDenied { .. }), "got {err:?}");

    let read_only = connect(&primary, &backup, true).await;
    let replies = read_only.run(&doc, Target::Both).await.unwrap();
    assert!(replies.is_empty());
}

#[tokio::test]
async fn test_failed_execute_result_is_returned() {
    let (primary, backup) = pair().await;
    let failed = r#"<rpc-reply semp-version="soltr/6_0"><execute-result code="fail" reason="already exists"/></rpc-reply>"#;
    mount_reply(&primary, "<create>", failed).await;
    mount_reply(&backup, "<create>", failed).await;
    let cluster = connect(&primary, &backup, false).await;

    let mut doc = cluster.document("create vpn");
    doc.set("create.message_vpn.vpn_name", "v");
    let replies = cluster.run(&doc, Target::Both).await.unwrap();

    assert_eq!(replies.len(), 2);
    let result = replies[0].reply.execute_result().unwrap();
    assert!(!result.is_ok());
    assert_eq!(result.reason.as_deref(), Some("already exists"));
}

#[tokio::test]
async fn test_non_xml_error_status() {
    let (primary, backup) = pair().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<message-vpn>"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&primary)
        .await;
    let cluster = connect(&primary, &backup, false).await;

    let mut doc = cluster.document("enable vpn");
    doc.set("message_vpn.vpn_name", "v").flag("message_vpn.no.shutdown");
    let err = cluster.run(&doc, Target::PrimaryOnly).await.unwrap_err();
    assert!(matches!(err, CoreError::HttpStatus { status: 500, .. }), "got {err:?}");
}

// ── Network failures ────────────────────────────────────────────────

/// A client that gives up quickly, for appliances that stop answering.
fn impatient_client_for(server: &MockServer) -> ApplianceClient {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(250))
        .build()
        .unwrap();
    let url = Url::parse(&format!("{}/SEMP", server.uri())).unwrap();
    ApplianceClient::with_client(http, url, "admin".into(), SecretString::from("admin".to_string()))
}

async fn mount_hang(server: &MockServer, needle: &str) {
    Mock::given(method("POST"))
        .and(body_string_contains(needle))
        .respond_with(ResponseTemplate::new(200).set_body_string(OK).set_delay(Duration::from_secs(5)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_unreachable_backup_fails_the_whole_submit() {
    let (primary, backup) = pair().await;
    mount_fallback(&primary).await;
    mount_hang(&backup, "<vpn-name>countme</vpn-name>").await;
    let cluster = Cluster::from_clients(
        "dev",
        vec![impatient_client_for(&primary), impatient_client_for(&backup)],
        Some(SempVersion::default()),
        false,
    )
    .await
    .unwrap();

    let mut doc = cluster.document("enable vpn");
    doc.set("message_vpn.vpn_name", "countme").flag("message_vpn.no.shutdown");
    let cmd = doc.prepare(Target::Both).unwrap();

    let result = cluster.submit(&cmd).await;
    match result {
        Err(CoreError::Timeout { host, .. } | CoreError::ConnectionFailed { host, .. }) => {
            assert_eq!(Some(host), cluster.backup_host());
        }
        other => panic!("expected a network failure, got {other:?}"),
    }
    assert!(cluster.rpc(&cmd, false).await.is_err());
}

#[tokio::test]
async fn test_unreachable_primary_never_reaches_the_backup() {
    let (primary, backup) = pair().await;
    mount_hang(&primary, "<vpn-name>countme</vpn-name>").await;
    mount_fallback(&backup).await;
    let cluster = Cluster::from_clients(
        "dev",
        vec![impatient_client_for(&primary), impatient_client_for(&backup)],
        Some(SempVersion::default()),
        false,
    )
    .await
    .unwrap();

    let mut doc = cluster.document("enable vpn");
    doc.set("message_vpn.vpn_name", "countme").flag("message_vpn.no.shutdown");
    let err = cluster.run(&doc, Target::Both).await.unwrap_err();

    assert_eq!(err.host(), Some(cluster.primary_host().as_str()));
    assert_eq!(received_containing(&backup, "countme").await, 0);
}
