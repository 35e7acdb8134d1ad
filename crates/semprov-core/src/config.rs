// ── Runtime cluster configuration ──
//
// These types describe how to reach one appliance pair. They carry
// credentials and connection tuning but never touch disk; the CLI builds a
// `ClusterConfig` from the settings file and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use semprov_api::{CertPolicy, DEFAULT_TIMEOUT, Transport};
use url::Url;

use crate::version::SempVersion;

/// Basic credentials for the management API.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed appliance certificates).
    DangerAcceptInvalid,
}

/// Configuration for one environment's appliance pair.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Environment name, used in logs and diagnostics.
    pub name: String,
    /// Management endpoints in configured order, e.g.
    /// `http://10.0.0.1:8080/SEMP`. One or two entries.
    pub endpoints: Vec<Url>,
    pub credentials: Credentials,
    /// Read-only mode: replies with a `permission-error` are tolerated and
    /// workflows never mutate.
    pub read_only: bool,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Protocol version override. Detected from the primary when `None`.
    pub version: Option<SempVersion>,
}

impl ClusterConfig {
    pub fn new(name: impl Into<String>, endpoints: Vec<Url>, credentials: Credentials) -> Self {
        Self {
            name: name.into(),
            endpoints,
            credentials,
            read_only: false,
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
            version: None,
        }
    }

    /// The shared HTTP pool every appliance of this environment uses.
    pub fn transport(&self) -> Result<Transport, semprov_api::Error> {
        let policy = match &self.tls {
            TlsVerification::SystemDefaults => CertPolicy::Verify,
            TlsVerification::CustomCa(path) => CertPolicy::TrustBundle(path.clone()),
            TlsVerification::DangerAcceptInvalid => CertPolicy::AcceptAny,
        };
        Transport::new(&policy, self.timeout)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(tls: TlsVerification) -> ClusterConfig {
        let mut config = ClusterConfig::new(
            "dev",
            vec![Url::parse("https://10.0.0.1:943/SEMP").unwrap()],
            Credentials {
                username: "admin".into(),
                password: SecretString::from("admin".to_string()),
            },
        );
        config.tls = tls;
        config.timeout = Duration::from_secs(7);
        config
    }

    #[test]
    fn transport_carries_the_environment_timeout() {
        let transport = config(TlsVerification::DangerAcceptInvalid).transport().unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(7));
    }

    #[test]
    fn missing_ca_file_fails_before_any_request() {
        let err = config(TlsVerification::CustomCa("/nonexistent/dev-ca.pem".into()))
            .transport()
            .unwrap_err();
        assert!(err.to_string().contains("dev-ca.pem"), "{err}");
    }
}
