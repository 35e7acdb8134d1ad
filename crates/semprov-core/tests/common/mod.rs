// Shared wiremock fixtures for a primary/backup appliance pair.
#![allow(dead_code, clippy::unwrap_used)]

use secrecy::SecretString;
use url::Url;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use semprov_api::ApplianceClient;
use semprov_core::{Cluster, SempVersion};

pub const OK: &str = r#"<rpc-reply semp-version="soltr/6_0"><execute-result code="ok"/></rpc-reply>"#;

pub fn spool_reply(status: &str) -> String {
    format!(
        r#"<rpc-reply semp-version="soltr/6_0"><rpc><show><message-spool><message-spool-info><operational-status>{status}</operational-status></message-spool-info></message-spool></show></rpc><execute-result code="ok"/></rpc-reply>"#
    )
}

pub fn client_for(server: &MockServer) -> ApplianceClient {
    let url = Url::parse(&format!("{}/SEMP", server.uri())).unwrap();
    ApplianceClient::with_client(
        reqwest::Client::new(),
        url,
        "admin".into(),
        SecretString::from("admin".to_string()),
    )
}

/// Answer the role-detection lookup with the given spool status.
pub async fn mount_spool_status(server: &MockServer, status: &str) {
    Mock::given(method("POST"))
        .and(body_string_contains("<show><message-spool/></show>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(spool_reply(status)))
        .mount(server)
        .await;
}

/// Answer requests whose body contains `needle`.
pub async fn mount_reply(server: &MockServer, needle: &str, body: &str) {
    Mock::given(method("POST"))
        .and(body_string_contains(needle))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Answer everything else with an ok execute-result. Mount last.
pub async fn mount_fallback(server: &MockServer) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(OK))
        .mount(server)
        .await;
}

/// A primary (active spool) and a backup (standby spool).
pub async fn pair() -> (MockServer, MockServer) {
    let primary = MockServer::start().await;
    let backup = MockServer::start().await;
    mount_spool_status(&primary, "AD-Active").await;
    mount_spool_status(&backup, "AD-Standby").await;
    (primary, backup)
}

pub async fn connect(primary: &MockServer, backup: &MockServer, read_only: bool) -> Cluster {
    Cluster::from_clients(
        "dev",
        vec![client_for(primary), client_for(backup)],
        Some(SempVersion::default()),
        read_only,
    )
    .await
    .unwrap()
}

/// Requests received by `server` whose body contains `needle`.
pub async fn received_containing(server: &MockServer, needle: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| String::from_utf8_lossy(&r.body).contains(needle))
        .count()
}
