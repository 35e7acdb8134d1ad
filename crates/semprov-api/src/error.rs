use thiserror::Error;

/// Top-level error type for the `semprov-api` crate.
///
/// Covers transport failures talking to a single appliance and replies that
/// cannot be decoded. Appliance-reported errors inside a well-formed reply
/// (`parse-error`, `permission-error`, `execute-result`) are not errors at
/// this layer; `semprov-core` decides what they mean.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The appliance rejected the Basic credentials (HTTP 401).
    #[error("Authentication failed for {host}: {message}")]
    Authentication { host: String, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request to {host} timed out after {timeout_secs}s")]
    Timeout { host: String, timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The server answered with a non-success status it explains in the
    /// body.
    #[error("{host} rejected the request (HTTP {status}): {body}")]
    Rejected { host: String, status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Reply body was not well-formed XML, with the raw body for debugging.
    #[error("Malformed reply from {host}: {message}")]
    MalformedReply {
        host: String,
        message: String,
        body: String,
    },
}

impl Error {
    /// Returns `true` if the appliance refused the credentials.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient network error.
    ///
    /// Nothing in this workspace retries; callers use this to word
    /// diagnostics.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}
