//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use semprov_config::ConfigError;
use semprov_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to appliance at {host}")]
    #[diagnostic(
        code(semprov::connection_failed),
        help(
            "Check that the management interface is reachable.\n\
             Reason: {reason}\n\
             Try: semprov status -e <env>"
        )
    )]
    ConnectionFailed { host: String, reason: String },

    #[error("Could not determine the primary appliance of {cluster}")]
    #[diagnostic(
        code(semprov::role_detection),
        help("{reason}\nExactly one appliance must report an active message spool.")
    )]
    RoleDetection { cluster: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed")]
    #[diagnostic(
        code(semprov::auth_failed),
        help(
            "{message}\n\
             Store the password with: semprov config set-password -n <env>"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for '{profile}'")]
    #[diagnostic(
        code(semprov::no_credentials),
        help(
            "Add a password (or password_env) to the environment in semprov.yaml,\n\
             or run: semprov config set-password -n <env>"
        )
    )]
    NoCredentials { profile: String },

    // ── Appliance replies ────────────────────────────────────────────

    #[error("{host} rejected the request: {detail}")]
    #[diagnostic(
        code(semprov::parse_error),
        help("The appliance could not parse the command. Check the protocol version (defaults.version).")
    )]
    ApplianceRejected { host: String, detail: String },

    #[error("{host} denied the request: {detail}")]
    #[diagnostic(
        code(semprov::permission_denied),
        help("The account lacks the access level this command needs. --testmode uses the read-only account.")
    )]
    PermissionDenied { host: String, detail: String },

    #[error("Unexpected reply from {host}: {message}")]
    #[diagnostic(code(semprov::bad_reply))]
    BadReply { host: String, message: String },

    // ── Entities ─────────────────────────────────────────────────────

    #[error("{entity} not found")]
    #[diagnostic(code(semprov::not_found))]
    NotFound { entity: String },

    #[error("{entity} is in use")]
    #[diagnostic(
        code(semprov::in_use),
        help("{reason}\nUse --force (-f) to proceed anyway.")
    )]
    InUse { entity: String, reason: String },

    #[error("{entity} differs between appliances")]
    #[diagnostic(
        code(semprov::inconsistent),
        help("{detail}\nRepair the appliance that is out of step before retrying.")
    )]
    Inconsistent { entity: String, detail: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(semprov::validation))]
    Validation { field: String, reason: String },

    #[error("Command failed schema validation")]
    #[diagnostic(code(semprov::schema), help("{detail}"))]
    Schema { detail: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Environment '{name}' not found in settings")]
    #[diagnostic(
        code(semprov::unknown_environment),
        help("Configured environments: {available}\nList them with: semprov config envs")
    )]
    UnknownEnvironment { name: String, available: String },

    #[error("No environment selected")]
    #[diagnostic(
        code(semprov::no_environment),
        help("Pass one or more with -e/--env (e.g. -e dev,ci1) or set SEMPROV_ENV.")
    )]
    NoEnvironment,

    #[error(transparent)]
    #[diagnostic(
        code(semprov::config),
        help("Check the settings file shown by: semprov config path")
    )]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(semprov::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request to {host} timed out after {seconds}s")]
    #[diagnostic(
        code(semprov::timeout),
        help("Raise the timeout in semprov.yaml or check appliance responsiveness.")
    )]
    Timeout { host: String, seconds: u64 },

    #[error("{message}")]
    #[diagnostic(code(semprov::internal))]
    Internal { message: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not use site definition {path}")]
    #[diagnostic(code(semprov::site), help("{reason}"))]
    Site { path: String, reason: String },
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::RoleDetection { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::InUse { .. } | Self::Inconsistent { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::UnknownEnvironment { .. }
            | Self::NoEnvironment
            | Self::Site { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownEnvironment { name, available } => Self::UnknownEnvironment { name, available },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { host, reason } => CliError::ConnectionFailed { host, reason },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout { host, timeout_secs } => CliError::Timeout {
                host,
                seconds: timeout_secs,
            },

            CoreError::RoleDetection { cluster, reason } => CliError::RoleDetection { cluster, reason },

            CoreError::MultiplePrimaries {
                cluster,
                first,
                second,
            } => CliError::RoleDetection {
                cluster,
                reason: format!("both {first} and {second} report an active message spool"),
            },

            CoreError::NoBackup { cluster } => CliError::Validation {
                field: "target".into(),
                reason: format!("cluster {cluster} has no backup appliance"),
            },

            CoreError::SchemaValidation(e) => CliError::Schema { detail: e.to_string() },

            CoreError::ApplianceParseError { host, detail } => CliError::ApplianceRejected { host, detail },

            CoreError::PermissionDenied { host, detail } => CliError::PermissionDenied { host, detail },

            CoreError::MalformedReply { host, message } => CliError::BadReply { host, message },

            CoreError::HttpStatus { host, status } => CliError::BadReply {
                host,
                message: format!("HTTP {status}"),
            },

            CoreError::InUse { entity, reason } => CliError::InUse { entity, reason },

            CoreError::NotFound { entity } => CliError::NotFound { entity },

            CoreError::Inconsistent { entity, detail } => CliError::Inconsistent { entity, detail },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "settings".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        let in_use = CliError::from(CoreError::InUse {
            entity: "queue 'q' in vpn 'v'".into(),
            reason: "bind count 1".into(),
        });
        assert_eq!(in_use.exit_code(), exit_code::CONFLICT);

        let missing = CliError::from(CoreError::NotFound { entity: "vpn 'v'".into() });
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);

        let two_primaries = CliError::from(CoreError::MultiplePrimaries {
            cluster: "dev".into(),
            first: "a".into(),
            second: "b".into(),
        });
        assert_eq!(two_primaries.exit_code(), exit_code::CONNECTION);

        assert_eq!(CliError::NoEnvironment.exit_code(), exit_code::USAGE);
        assert_eq!(exit_code::SUCCESS, 0);
    }

    #[test]
    fn config_errors_keep_their_class() {
        let err = CliError::from(ConfigError::NoCredentials { profile: "dev".into() });
        assert_eq!(err.exit_code(), exit_code::AUTH);
        let err = CliError::from(ConfigError::UnknownEnvironment {
            name: "prod".into(),
            available: "dev".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
