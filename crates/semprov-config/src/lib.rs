//! Settings for the semprov CLI.
//!
//! YAML settings discovery, environment overrides, credential resolution
//! (env var + keyring + plaintext), and translation to
//! `semprov_core::ClusterConfig`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use semprov_core::{ClusterConfig, Credentials, NamingStandard, SempVersion, TlsVerification};

/// Environment variable that redirects the settings path.
pub const CONFIG_ENV: &str = "SEMPROV_CONFIG";

const KEYRING_SERVICE: &str = "semprov";
const FILE_NAME: &str = "semprov.yaml";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("settings file {} does not exist", path.display())]
    Missing { path: PathBuf },

    #[error("unknown environment '{name}' (configured: {available})")]
    UnknownEnvironment { name: String, available: String },

    #[error("no credentials configured for '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize settings: {0}")]
    Serialization(#[from] serde_yaml::Error),

    #[error("settings loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<keyring::Error> for ConfigError {
    fn from(err: keyring::Error) -> Self {
        Self::Keyring(err.to_string())
    }
}

// ── Settings structs ────────────────────────────────────────────────

/// Top-level settings file.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub defaults: Defaults,

    /// Appliance pairs by environment name.
    #[serde(default)]
    pub environments: BTreeMap<String, Environment>,

    /// File the settings were read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Naming standard: `zoinks`, `prefix`, or `literal`.
    #[serde(default = "default_naming")]
    pub naming: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Protocol version override for every environment.
    pub version: Option<String>,

    /// Read-only account used by `--testmode` when an environment has none.
    pub read_only: Option<Account>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            naming: default_naming(),
            insecure: false,
            timeout: default_timeout(),
            version: None,
            read_only: None,
        }
    }
}

fn default_naming() -> String {
    "zoinks".into()
}

fn default_timeout() -> u64 {
    30
}

/// A username with its password sources.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Account {
    pub username: String,

    /// Plaintext password (prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,
}

/// One appliance pair.
#[derive(Debug, Deserialize, Serialize)]
pub struct Environment {
    /// Management URLs, e.g. `http://10.0.0.1:8080/SEMP`. One or two.
    pub endpoints: Vec<String>,

    #[serde(default = "default_username")]
    pub username: String,

    /// Plaintext password (prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// Read-only account for this environment.
    pub read_only: Option<Account>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    pub insecure: Option<bool>,

    pub timeout: Option<u64>,

    pub version: Option<String>,
}

fn default_username() -> String {
    "admin".into()
}

// ── Settings file path ──────────────────────────────────────────────

/// Candidate settings paths in lookup order.
pub fn search_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        paths.push(PathBuf::from(path));
    }
    if let Some(path) = explicit {
        paths.push(path.to_path_buf());
    }
    paths.push(PathBuf::from(FILE_NAME));
    if let Some(dirs) = ProjectDirs::from("com", "semprov", "semprov") {
        paths.push(dirs.config_dir().join(FILE_NAME));
    }
    paths.push(PathBuf::from("/etc/semprov").join(FILE_NAME));
    paths.push(PathBuf::from("/opt/semprov").join(FILE_NAME));
    paths
}

/// The settings file to load.
///
/// A path from `SEMPROV_CONFIG` or `--settings` must exist. Otherwise the
/// first existing default location wins, and `None` means there is none.
pub fn settings_path(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    let forced = std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .or_else(|| explicit.map(Path::to_path_buf));
    if let Some(path) = forced {
        return if path.is_file() {
            Ok(Some(path))
        } else {
            Err(ConfigError::Missing { path })
        };
    }
    Ok(search_paths(None).into_iter().find(|p| p.is_file()))
}

// ── Settings loading ────────────────────────────────────────────────

/// Locate and load the settings.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    let path = settings_path(explicit)?;
    load_from(path.as_deref())
}

/// Load settings from `path` (or defaults alone) plus `SEMPROV_*`
/// environment overrides. Nested keys use `__`, e.g.
/// `SEMPROV_DEFAULTS__TIMEOUT=60`.
pub fn load_from(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));
    if let Some(path) = path {
        debug!(path = %path.display(), "loading settings");
        figment = figment.merge(Yaml::file(path));
    }
    let figment = figment.merge(Env::prefixed("SEMPROV_").ignore(&["config"]).split("__"));

    let mut settings: Settings = figment.extract()?;
    settings.source = path.map(Path::to_path_buf);
    Ok(settings)
}

impl Settings {
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// YAML with every plaintext `password` replaced by a mask.
    pub fn to_redacted_yaml(&self) -> Result<String, ConfigError> {
        let mut value = serde_yaml::to_value(self)?;
        redact(&mut value);
        Ok(serde_yaml::to_string(&value)?)
    }

    pub fn environment(&self, name: &str) -> Result<&Environment, ConfigError> {
        self.environments
            .get(name)
            .ok_or_else(|| ConfigError::UnknownEnvironment {
                name: name.into(),
                available: if self.environments.is_empty() {
                    "none".into()
                } else {
                    self.environments.keys().cloned().collect::<Vec<_>>().join(", ")
                },
            })
    }

    pub fn naming(&self) -> Result<NamingStandard, ConfigError> {
        NamingStandard::from_kind(&self.defaults.naming).map_err(|e| ConfigError::Validation {
            field: "defaults.naming".into(),
            reason: e.to_string(),
        })
    }

    /// Build the runtime configuration for one environment. `read_only`
    /// selects the read-only account.
    pub fn cluster_config(&self, name: &str, read_only: bool) -> Result<ClusterConfig, ConfigError> {
        let env = self.environment(name)?;

        if env.endpoints.is_empty() || env.endpoints.len() > 2 {
            return Err(ConfigError::Validation {
                field: format!("environments.{name}.endpoints"),
                reason: format!("expected one or two endpoints, got {}", env.endpoints.len()),
            });
        }
        let endpoints = env
            .endpoints
            .iter()
            .map(|raw| {
                raw.parse::<Url>().map_err(|e| ConfigError::Validation {
                    field: format!("environments.{name}.endpoints"),
                    reason: format!("invalid URL '{raw}': {e}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let credentials = if read_only {
            self.read_only_credentials(name, env)?
        } else {
            let password = resolve_password(
                env.password_env.as_deref(),
                &keyring_user(name, false),
                env.password.as_deref(),
                name,
            )?;
            Credentials {
                username: env.username.clone(),
                password,
            }
        };

        let tls = if env.insecure.unwrap_or(self.defaults.insecure) {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = env.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        let mut config = ClusterConfig::new(name, endpoints, credentials);
        config.read_only = read_only;
        config.tls = tls;
        config.timeout = Duration::from_secs(env.timeout.unwrap_or(self.defaults.timeout));
        config.version = env
            .version
            .as_deref()
            .or(self.defaults.version.as_deref())
            .map(SempVersion::from);
        Ok(config)
    }

    fn read_only_credentials(&self, name: &str, env: &Environment) -> Result<Credentials, ConfigError> {
        let (account, keyring_account) = match (&env.read_only, &self.defaults.read_only) {
            (Some(account), _) => (account, keyring_user(name, true)),
            (None, Some(account)) => (account, keyring_user("defaults", true)),
            (None, None) => {
                return Err(ConfigError::NoCredentials {
                    profile: format!("{name} (read-only)"),
                });
            }
        };
        let password = resolve_password(
            account.password_env.as_deref(),
            &keyring_account,
            account.password.as_deref(),
            &format!("{name} (read-only)"),
        )?;
        Ok(Credentials {
            username: account.username.clone(),
            password,
        })
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a password: named env var, then keyring, then plaintext.
fn resolve_password(
    env_name: Option<&str>,
    keyring_user: &str,
    plaintext: Option<&str>,
    profile: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Env var named in the settings
    if let Some(env_name) = env_name {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, keyring_user) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in settings
    if let Some(pw) = plaintext {
        return Ok(SecretString::from(pw.to_owned()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile.into(),
    })
}

fn redact(value: &mut serde_yaml::Value) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, entry) in map.iter_mut() {
                if key.as_str() == Some("password") && entry.is_string() {
                    *entry = serde_yaml::Value::String("********".into());
                } else {
                    redact(entry);
                }
            }
        }
        serde_yaml::Value::Sequence(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

/// Keyring account name for an environment's password.
pub fn keyring_user(environment: &str, read_only: bool) -> String {
    if read_only {
        format!("{environment}/read-only-password")
    } else {
        format!("{environment}/password")
    }
}

/// Store a password in the system keyring.
pub fn store_password(environment: &str, read_only: bool, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(environment, read_only))?;
    entry.set_password(password)?;
    Ok(())
}
