// ── Managed entities ──

use std::fmt;

use serde::Serialize;
use strum::{Display, EnumString};

/// Classes of object the workflows manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EntityKind {
    Queue,
    ClientUsername,
    ClientProfile,
    AclProfile,
    Vpn,
    Bridge,
}

/// Identity of one managed object: kind, name, and owning VPN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub name: String,
    /// Owning VPN. `None` for VPNs themselves and for global client
    /// profiles.
    pub vpn: Option<String>,
}

impl EntityKey {
    pub fn new(kind: EntityKind, name: impl Into<String>, vpn: Option<&str>) -> Self {
        Self {
            kind,
            name: name.into(),
            vpn: vpn.map(str::to_owned),
        }
    }

    pub fn queue(name: &str, vpn: &str) -> Self {
        Self::new(EntityKind::Queue, name, Some(vpn))
    }

    pub fn user(name: &str, vpn: &str) -> Self {
        Self::new(EntityKind::ClientUsername, name, Some(vpn))
    }

    pub fn vpn(name: &str) -> Self {
        Self::new(EntityKind::Vpn, name, None)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.vpn {
            Some(vpn) => write!(f, "{} '{}' in vpn '{vpn}'", self.kind, self.name),
            None => write!(f, "{} '{}'", self.kind, self.name),
        }
    }
}
