// SEMP HTTP client for one appliance
//
// Wraps `reqwest::Client` with the appliance's management URL and Basic
// credentials. Every request is a POST of an XML document; the reply body
// is handed back raw together with its HTTP status so the dispatcher can
// inspect it per host.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::DEFAULT_TIMEOUT;

/// Raw reply from one appliance.
#[derive(Debug, Clone)]
pub struct RawReply {
    pub host: String,
    pub status: u16,
    pub body: String,
}

/// HTTP client bound to a single appliance's SEMP endpoint.
pub struct ApplianceClient {
    http: reqwest::Client,
    url: Url,
    username: String,
    password: SecretString,
    timeout: Duration,
}

impl ApplianceClient {
    pub(crate) fn bound(
        http: reqwest::Client,
        timeout: Duration,
        url: Url,
        username: String,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            url,
            username,
            password,
            timeout,
        }
    }

    /// Create a client over a pre-built `reqwest::Client`.
    ///
    /// `url` is the full management endpoint, e.g. `http://10.0.0.1:8080/SEMP`.
    /// Environments build their clients through
    /// [`Transport::appliance`](crate::Transport::appliance) instead.
    pub fn with_client(http: reqwest::Client, url: Url, username: String, password: SecretString) -> Self {
        Self::bound(http, DEFAULT_TIMEOUT, url, username, password)
    }

    /// The management endpoint URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `host:port` label used in logs and diagnostics.
    pub fn host(&self) -> String {
        let host = self.url.host_str().unwrap_or("<unknown>");
        match self.url.port_or_known_default() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        }
    }

    // ── Request ──────────────────────────────────────────────────────

    /// POST an XML document and return the raw reply.
    ///
    /// Network failures and HTTP 401 are errors. Any other status is
    /// returned to the caller alongside the body.
    pub async fn post_xml(&self, xml: &str) -> Result<RawReply, Error> {
        let host = self.host();
        debug!("POST {}", self.url);

        let resp = self
            .http
            .post(self.url.clone())
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .header(CONTENT_TYPE, "text/xml")
            .header(ACCEPT, "text/xml")
            .body(xml.to_owned())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout {
                        host: host.clone(),
                        timeout_secs: self.timeout.as_secs(),
                    }
                } else {
                    Error::Transport(e)
                }
            })?;

        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                host,
                message: format!("appliance rejected credentials for user '{}'", self.username),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            let preview: String = body.chars().take(200).collect();
            debug!(%host, status = status.as_u16(), "non-success reply: {preview}");
        }

        Ok(RawReply {
            host,
            status: status.as_u16(),
            body,
        })
    }
}
