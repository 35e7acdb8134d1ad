// InfluxDB line-protocol writer
//
// Metrics snapshots leave the process as a single POST to the 1.x `/write`
// endpoint. The writer rides on the environment's `Transport`, so it shares
// the certificate policy and timeout of the appliance clients.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::error::Error;

/// One InfluxDB database, reached through its `/write` and `/query`
/// endpoints.
pub struct InfluxWriter {
    http: reqwest::Client,
    timeout: Duration,
    root: Url,
    database: String,
    credentials: Option<(String, SecretString)>,
}

impl InfluxWriter {
    pub(crate) fn bound(http: reqwest::Client, timeout: Duration, base: &Url, database: String) -> Result<Self, Error> {
        let root = base.join("/")?;
        Ok(Self {
            http,
            timeout,
            root,
            database,
            credentials: None,
        })
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.credentials = Some((username.into(), password));
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Full `/write` URL, query included.
    pub fn write_url(&self) -> Result<Url, Error> {
        let mut url = self.root.join("write")?;
        url.query_pairs_mut()
            .append_pair("db", &self.database)
            .append_pair("precision", "ns");
        Ok(url)
    }

    fn query_url(&self, statement: &str) -> Result<Url, Error> {
        let mut url = self.root.join("query")?;
        url.query_pairs_mut()
            .append_pair("db", &self.database)
            .append_pair("q", statement);
        Ok(url)
    }

    fn host(&self) -> String {
        let host = self.root.host_str().unwrap_or("<unknown>");
        match self.root.port_or_known_default() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        }
    }

    /// POST newline-separated points. Any non-2xx status is an error
    /// carrying the server's explanation.
    pub async fn write(&self, lines: &str) -> Result<(), Error> {
        let url = self.write_url()?;
        debug!(db = %self.database, bytes = lines.len(), "POST {url}");
        self.send(url, lines.to_owned()).await
    }

    /// Create the database. The server treats an existing one as success.
    pub async fn ensure_database(&self) -> Result<(), Error> {
        self.statement(&format!("CREATE DATABASE \"{}\"", self.database)).await
    }

    /// Make `duration` (e.g. `4w`, `12h`) the lifetime of the database's
    /// default retention policy.
    pub async fn set_default_retention(&self, duration: &str) -> Result<(), Error> {
        self.statement(&format!(
            "ALTER RETENTION POLICY \"default\" ON \"{}\" DURATION {duration} REPLICATION 1 DEFAULT",
            self.database
        ))
        .await
    }

    async fn statement(&self, statement: &str) -> Result<(), Error> {
        debug!(db = %self.database, "{statement}");
        self.send(self.query_url(statement)?, String::new()).await
    }

    async fn send(&self, url: Url, body: String) -> Result<(), Error> {
        let host = self.host();
        let mut req = self.http.post(url).body(body);
        if let Some((user, password)) = &self.credentials {
            req = req.basic_auth(user, Some(password.expose_secret()));
        }

        let resp = req.send().await.map_err(|e| {
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
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                host,
                message: format!("database '{}' refused the request", self.database),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Rejected {
                host,
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
