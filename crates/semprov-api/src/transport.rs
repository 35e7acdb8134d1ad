// Per-environment HTTP transport.
//
// The appliances of one environment sit behind the same certificate policy
// and answer within the same timeout, so they share one `reqwest::Client`.
// A `Transport` owns that pool and binds it to each management endpoint,
// and to the metrics sink when one is configured.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use tracing::debug;
use url::Url;

use crate::client::ApplianceClient;
use crate::error::Error;
use crate::influx::InfluxWriter;

/// Request timeout when an environment sets none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How server certificates are checked on `https` endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CertPolicy {
    /// Platform trust roots.
    #[default]
    Verify,
    /// Platform roots plus every certificate in a PEM bundle.
    TrustBundle(PathBuf),
    /// Accept any certificate. Appliances commonly ship self-signed.
    AcceptAny,
}

/// Shared HTTP pool for one environment.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    timeout: Duration,
}

impl Transport {
    pub fn new(policy: &CertPolicy, timeout: Duration) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("semprov/", env!("CARGO_PKG_VERSION")));

        builder = match policy {
            CertPolicy::Verify => builder,
            CertPolicy::TrustBundle(path) => trust_bundle(path)?
                .into_iter()
                .fold(builder, reqwest::ClientBuilder::add_root_certificate),
            CertPolicy::AcceptAny => builder.danger_accept_invalid_certs(true),
        };

        let http = builder
            .build()
            .map_err(|e| Error::Tls(format!("cannot build HTTP client: {e}")))?;
        debug!(?policy, timeout_secs = timeout.as_secs(), "built transport");
        Ok(Self { http, timeout })
    }

    /// Wrap an existing pool, e.g. one built with test-only settings.
    pub fn from_client(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Bind the pool to one appliance's management endpoint.
    pub fn appliance(&self, url: Url, username: impl Into<String>, password: SecretString) -> ApplianceClient {
        ApplianceClient::bound(self.http.clone(), self.timeout, url, username.into(), password)
    }

    /// Bind the pool to an InfluxDB `/write` endpoint.
    pub fn influx(&self, base: &Url, database: impl Into<String>) -> Result<InfluxWriter, Error> {
        InfluxWriter::bound(self.http.clone(), self.timeout, base, database.into())
    }
}

/// Every certificate in a PEM file. A file with none is an error.
fn trust_bundle(path: &Path) -> Result<Vec<reqwest::Certificate>, Error> {
    let pem = std::fs::read(path)
        .map_err(|e| Error::Tls(format!("cannot read CA bundle {}: {e}", path.display())))?;
    let certs = reqwest::Certificate::from_pem_bundle(&pem)
        .map_err(|e| Error::Tls(format!("invalid CA bundle {}: {e}", path.display())))?;
    if certs.is_empty() {
        return Err(Error::Tls(format!("no certificates in {}", path.display())));
    }
    Ok(certs)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_bundle_names_the_file() {
        let err = Transport::new(&CertPolicy::TrustBundle("/nonexistent/ca.pem".into()), DEFAULT_TIMEOUT)
            .unwrap_err();
        match err {
            Error::Tls(msg) => assert!(msg.contains("/nonexistent/ca.pem"), "{msg}"),
            other => panic!("expected Tls, got {other:?}"),
        }
    }

    #[test]
    fn bundle_without_certificates_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a certificate\n").unwrap();
        let err = Transport::new(&CertPolicy::TrustBundle(file.path().into()), DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, Error::Tls(_)), "got {err:?}");
    }

    #[test]
    fn appliances_inherit_the_environment_timeout() {
        let transport = Transport::new(&CertPolicy::AcceptAny, Duration::from_secs(5)).unwrap();
        let url = Url::parse("https://10.0.0.1:943/SEMP").unwrap();
        let client = transport.appliance(url, "admin", SecretString::from("pw".to_string()));
        assert_eq!(client.timeout(), Duration::from_secs(5));
        assert_eq!(client.host(), "10.0.0.1:943");
    }
}
