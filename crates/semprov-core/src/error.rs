// ── Core error types ──
//
// User-facing errors from semprov-core. The `From<semprov_api::Error>` impl
// translates transport-layer failures into domain variants that name the
// appliance involved. Guard skips are outcomes and never show up here.

use thiserror::Error;

use crate::schema::SchemaValidationError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to appliance at {host}: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request to {host} timed out after {timeout_secs}s")]
    Timeout { host: String, timeout_secs: u64 },

    // ── Cluster errors ───────────────────────────────────────────────
    #[error("Cluster {cluster}: {reason}")]
    RoleDetection { cluster: String, reason: String },

    #[error("Cluster {cluster}: both {first} and {second} report an active message spool")]
    MultiplePrimaries {
        cluster: String,
        first: String,
        second: String,
    },

    #[error("Cluster {cluster} has no backup appliance")]
    NoBackup { cluster: String },

    // ── Document errors ──────────────────────────────────────────────
    #[error(transparent)]
    SchemaValidation(#[from] SchemaValidationError),

    // ── Appliance-reported errors ────────────────────────────────────
    #[error("{host} could not parse the request: {detail}")]
    ApplianceParseError { host: String, detail: String },

    #[error("{host} denied the request: {detail}")]
    PermissionDenied { host: String, detail: String },

    #[error("Unreadable reply from {host}: {message}")]
    MalformedReply { host: String, message: String },

    #[error("{host} answered with HTTP {status}")]
    HttpStatus { host: String, status: u16 },

    // ── Entity errors ────────────────────────────────────────────────
    #[error("{entity} is in use: {reason}")]
    InUse { entity: String, reason: String },

    #[error("{entity} not found")]
    NotFound { entity: String },

    #[error("{entity} differs between appliances: {detail}")]
    Inconsistent { entity: String, detail: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<semprov_api::Error> for CoreError {
    fn from(err: semprov_api::Error) -> Self {
        match err {
            semprov_api::Error::Authentication { host, message } => CoreError::AuthenticationFailed {
                message: format!("{host}: {message}"),
            },
            semprov_api::Error::Transport(ref e) => {
                let host = e
                    .url()
                    .and_then(|u| u.host_str().map(|h| match u.port_or_known_default() {
                        Some(port) => format!("{h}:{port}"),
                        None => h.to_owned(),
                    }))
                    .unwrap_or_else(|| "<unknown>".into());
                if e.is_timeout() {
                    CoreError::Timeout {
                        host,
                        timeout_secs: 0,
                    }
                } else {
                    CoreError::ConnectionFailed {
                        host,
                        reason: e.to_string(),
                    }
                }
            }
            semprov_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            semprov_api::Error::Timeout { host, timeout_secs } => {
                CoreError::Timeout { host, timeout_secs }
            }
            semprov_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                host: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            semprov_api::Error::Rejected { host, status, .. } => CoreError::HttpStatus { host, status },
            semprov_api::Error::MalformedReply { host, message, .. } => {
                CoreError::MalformedReply { host, message }
            }
        }
    }
}

impl CoreError {
    /// The appliance a failure is attributed to, when there is one.
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::ConnectionFailed { host, .. }
            | Self::Timeout { host, .. }
            | Self::ApplianceParseError { host, .. }
            | Self::PermissionDenied { host, .. }
            | Self::MalformedReply { host, .. }
            | Self::HttpStatus { host, .. } => Some(host.as_str()).filter(|h| !h.is_empty()),
            _ => None,
        }
    }
}
