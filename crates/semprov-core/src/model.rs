// ── Site definitions ──
//
// Declarative description of what an environment should contain: VPNs,
// their owner users and extra users, queues, and per-environment overrides.
// Scalars are accepted either as YAML scalars or quoted strings
// (`queue_size: 1024` and `queue_size: "1024"` are equivalent).

use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use crate::error::CoreError;

pub const DEFAULT_CLIENT_PROFILE: &str = "glassfish";

/// Owner placeholder meaning "the VPN itself".
pub const OWNER_IS_VPN: &str = "%lsVPN";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteDefinition {
    /// Client profile every provisioned user is attached to.
    pub client_profile: Option<String>,
    pub vpns: Vec<VpnDefinition>,
}

impl SiteDefinition {
    pub fn from_yaml(text: &str) -> Result<Self, CoreError> {
        serde_yaml::from_str(text).map_err(|e| CoreError::ValidationFailed {
            message: format!("invalid site definition: {e}"),
        })
    }

    pub fn client_profile(&self) -> &str {
        self.client_profile.as_deref().unwrap_or(DEFAULT_CLIENT_PROFILE)
    }

    /// VPNs owned by `owner`, or all of them when `owner` is `None`.
    pub fn vpns_owned_by<'a>(&'a self, owner: Option<&'a str>) -> impl Iterator<Item = &'a VpnDefinition> {
        self.vpns
            .iter()
            .filter(move |v| owner.is_none_or(|o| v.owner.as_deref() == Some(o)))
    }
}

// ── VPNs ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VpnDefinition {
    /// Name template, e.g. `%s_testvpn`.
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    /// Password of the VPN's own client username.
    pub password: String,
    #[serde(default)]
    pub vpn_config: VpnSettings,
    #[serde(default)]
    pub env: Vec<VpnEnvironment>,
    #[serde(default, alias = "queues")]
    pub queue: Vec<QueueDefinition>,
    #[serde(default)]
    pub users: Vec<UserDefinition>,
}

impl VpnDefinition {
    /// VPN settings for `environment`, with that environment's override
    /// taking precedence over the definition's own values.
    pub fn settings_for(&self, environment: &str) -> VpnSettings {
        self.env
            .iter()
            .find(|e| e.name == environment)
            .map_or_else(
                || self.vpn_config.clone(),
                |e| {
                    debug!(vpn = %self.name, environment, "using environment vpn_config");
                    e.vpn_config.over(&self.vpn_config)
                },
            )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct VpnSettings {
    #[serde(deserialize_with = "lenient")]
    pub spool_size: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub large_message_threshold: Option<u64>,
}

impl VpnSettings {
    pub const DEFAULT_SPOOL_SIZE: u64 = 4096;
    pub const DEFAULT_LARGE_MESSAGE_THRESHOLD: u64 = 4096;

    fn over(&self, base: &Self) -> Self {
        Self {
            spool_size: self.spool_size.or(base.spool_size),
            large_message_threshold: self.large_message_threshold.or(base.large_message_threshold),
        }
    }

    pub fn spool_size(&self) -> u64 {
        self.spool_size.unwrap_or(Self::DEFAULT_SPOOL_SIZE)
    }

    pub fn large_message_threshold(&self) -> u64 {
        self.large_message_threshold
            .unwrap_or(Self::DEFAULT_LARGE_MESSAGE_THRESHOLD)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VpnEnvironment {
    pub name: String,
    #[serde(default)]
    pub vpn_config: VpnSettings,
}

// ── Users ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserDefinition {
    /// Name template, e.g. `%s_marcom`.
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub client_profile: Option<String>,
    #[serde(default)]
    pub acl_profile: Option<String>,
}

// ── Queues ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueDefinition {
    pub name: String,
    #[serde(default)]
    pub queue_config: Option<QueueSettings>,
    #[serde(default)]
    pub env: Vec<QueueEnvironment>,
}

impl QueueDefinition {
    /// Queue settings for `environment`: the environment override when one
    /// exists, otherwise the queue's own settings, with defaults filling
    /// whatever neither sets.
    pub fn config_for(&self, environment: &str, vpn: &str) -> QueueConfig {
        let settings = self
            .env
            .iter()
            .find(|e| e.name == environment)
            .map(|e| {
                debug!(queue = %self.name, environment, "using environment queue_config");
                &e.queue_config
            })
            .or(self.queue_config.as_ref());
        settings.cloned().unwrap_or_default().resolve(vpn)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueEnvironment {
    pub name: String,
    #[serde(default)]
    pub queue_config: QueueSettings,
}

/// Partially specified queue settings as written in a site definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueSettings {
    #[serde(deserialize_with = "lenient")]
    pub retries: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub exclusive: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub queue_size: Option<u64>,
    pub consume: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub max_bind_count: Option<u32>,
    pub owner: Option<String>,
}

impl QueueSettings {
    /// Fill unset fields with defaults. The owner defaults to the VPN, and
    /// the `%lsVPN` placeholder also means the VPN.
    pub fn resolve(self, vpn: &str) -> QueueConfig {
        let owner = match self.owner.as_deref() {
            None | Some(OWNER_IS_VPN) => vpn.to_owned(),
            Some(other) => other.to_owned(),
        };
        QueueConfig {
            retries: self.retries,
            exclusive: self.exclusive.unwrap_or(true),
            queue_size: self.queue_size.unwrap_or(QueueConfig::DEFAULT_QUEUE_SIZE),
            consume: self
                .consume
                .unwrap_or_else(|| QueueConfig::CONSUME_ALL.to_owned()),
            max_bind_count: self
                .max_bind_count
                .unwrap_or(QueueConfig::DEFAULT_MAX_BIND_COUNT),
            owner,
        }
    }
}

/// Fully resolved queue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueConfig {
    /// `max-redelivery`; left untouched when `None`.
    pub retries: Option<u32>,
    pub exclusive: bool,
    /// Spool quota in MB.
    pub queue_size: u64,
    pub consume: String,
    pub max_bind_count: u32,
    pub owner: String,
}

impl QueueConfig {
    pub const DEFAULT_QUEUE_SIZE: u64 = 1024;
    pub const DEFAULT_MAX_BIND_COUNT: u32 = 1000;
    pub const CONSUME_ALL: &'static str = "all";

    pub fn defaults(vpn: &str) -> Self {
        QueueSettings::default().resolve(vpn)
    }

    pub fn consume_all(&self) -> bool {
        self.consume.eq_ignore_ascii_case(Self::CONSUME_ALL)
    }
}

/// Access everyone other than the owner has to a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum QueuePermission {
    NoAccess,
    ReadOnly,
    #[default]
    Consume,
    ModifyTopic,
    Delete,
}

// ── Lenient scalars ──────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(u64),
    Text(String),
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = Option::<Scalar>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let text = match raw {
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(n) => n.to_string(),
        Scalar::Text(s) => s.trim().to_ascii_lowercase(),
    };
    text.parse()
        .map(Some)
        .map_err(|e| serde::de::Error::custom(format!("invalid value '{text}': {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SITE: &str = r#"
client_profile: glassfish
vpns:
  - name: "%s_testvpn"
    owner: SolaceTest
    password: d0nt_u5se_thIs
    vpn_config:
      spool_size: "4096"
    env:
      - name: dev
        vpn_config:
          spool_size: 1024
    queue:
      - name: testqueue1
        queue_config:
          exclusive: "true"
          queue_size: "1024"
        env:
          - name: pt1
            queue_config:
              exclusive: "false"
              queue_size: 4096
              owner: dev_testproductA
    users:
      - username: "%s_marcom"
        password: secret
"#;

    #[test]
    fn parses_site_with_string_scalars() {
        let site = SiteDefinition::from_yaml(SITE).unwrap();
        assert_eq!(site.client_profile(), "glassfish");
        let vpn = &site.vpns[0];
        assert_eq!(vpn.settings_for("dev").spool_size(), 1024);
        assert_eq!(vpn.settings_for("qa1").spool_size(), 4096);
        assert_eq!(vpn.users[0].username, "%s_marcom");
    }

    #[test]
    fn queue_defaults_fill_missing_keys() {
        let site = SiteDefinition::from_yaml(SITE).unwrap();
        let q = &site.vpns[0].queue[0];
        assert_eq!(
            q.config_for("dev", "dev_testvpn"),
            QueueConfig {
                retries: None,
                exclusive: true,
                queue_size: 1024,
                consume: "all".into(),
                max_bind_count: 1000,
                owner: "dev_testvpn".into(),
            }
        );
    }

    #[test]
    fn environment_override_replaces_queue_config() {
        let site = SiteDefinition::from_yaml(SITE).unwrap();
        let cfg = site.vpns[0].queue[0].config_for("pt1", "pt1_testvpn");
        assert!(!cfg.exclusive);
        assert_eq!(cfg.queue_size, 4096);
        assert_eq!(cfg.owner, "dev_testproductA");
    }

    #[test]
    fn owner_placeholder_means_vpn() {
        let settings = QueueSettings {
            owner: Some(OWNER_IS_VPN.into()),
            ..QueueSettings::default()
        };
        assert_eq!(settings.resolve("prod_x").owner, "prod_x");
    }

    #[test]
    fn owner_filter() {
        let site = SiteDefinition::from_yaml(SITE).unwrap();
        assert_eq!(site.vpns_owned_by(Some("SolaceTest")).count(), 1);
        assert_eq!(site.vpns_owned_by(Some("Other")).count(), 0);
        assert_eq!(site.vpns_owned_by(None).count(), 1);
    }

    #[test]
    fn queue_permissions_parse_by_element_name() {
        assert_eq!("modify-topic".parse::<QueuePermission>().unwrap(), QueuePermission::ModifyTopic);
        assert_eq!("No-Access".parse::<QueuePermission>().unwrap(), QueuePermission::NoAccess);
        assert_eq!(QueuePermission::ReadOnly.to_string(), "read-only");
        assert!("everything".parse::<QueuePermission>().is_err());
    }
}
