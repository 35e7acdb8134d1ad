#![allow(clippy::unwrap_used)]
// Integration tests for `ApplianceClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use url::Url;
use wiremock::matchers::{body_string, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use semprov_api::{ApplianceClient, Error, Reply};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApplianceClient) {
    let server = MockServer::start().await;
    let url = Url::parse(&format!("{}/SEMP", server.uri())).unwrap();
    let client = ApplianceClient::with_client(
        reqwest::Client::new(),
        url,
        "admin".into(),
        SecretString::from("admin".to_string()),
    );
    (server, client)
}

const SHOW_VERSION: &str = "<rpc semp-version=\"soltr/6_0\"><show><version/></show></rpc>";

// ── Request shape ───────────────────────────────────────────────────

#[tokio::test]
async fn test_post_sends_xml_with_basic_auth() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/SEMP"))
        .and(header("content-type", "text/xml"))
        .and(header("accept", "text/xml"))
        // admin:admin
        .and(header("authorization", "Basic YWRtaW46YWRtaW4="))
        .and(body_string(SHOW_VERSION))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<rpc-reply semp-version=\"soltr/7_1_1\"/>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let raw = client.post_xml(SHOW_VERSION).await.unwrap();
    assert_eq!(raw.status, 200);
    assert_eq!(raw.host, client.host());

    let reply = Reply::parse(&raw.host, &raw.body).unwrap();
    assert_eq!(reply.semp_version(), Some("soltr/7_1_1"));
}

#[tokio::test]
async fn test_host_label_includes_port() {
    let (server, client) = setup().await;
    let port = Url::parse(&server.uri()).unwrap().port().unwrap();
    assert_eq!(client.host(), format!("127.0.0.1:{port}"));
}

// ── Status handling ─────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_is_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.post_xml(SHOW_VERSION).await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_server_error_is_returned_raw() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let raw = client.post_xml(SHOW_VERSION).await.unwrap();
    assert_eq!(raw.status, 500);
    assert_eq!(raw.body, "internal");
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let url = Url::parse("http://127.0.0.1:9/SEMP").unwrap();
    let client = ApplianceClient::with_client(
        reqwest::Client::new(),
        url,
        "admin".into(),
        SecretString::from("admin".to_string()),
    );

    let err = client.post_xml(SHOW_VERSION).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got: {err:?}");
    assert!(err.is_transient());
}
