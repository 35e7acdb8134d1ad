// ── Appliance roles and request routing ──

use std::fmt;

use serde::Serialize;

/// Which side of a redundant pair an appliance currently plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Primary,
    Backup,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Backup => f.write_str("backup"),
        }
    }
}

/// Where a request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// Primary then backup, sequentially.
    #[default]
    Both,
    PrimaryOnly,
    BackupOnly,
}

impl Target {
    /// Map the `primaryOnly` / `backupOnly` flag pair to a target.
    ///
    /// Setting both flags is an explicit request for both appliances.
    pub fn from_flags(primary_only: bool, backup_only: bool) -> Self {
        match (primary_only, backup_only) {
            (true, false) => Self::PrimaryOnly,
            (false, true) => Self::BackupOnly,
            _ => Self::Both,
        }
    }

    /// Roles this target addresses, primary first.
    pub fn roles(self) -> &'static [Role] {
        match self {
            Self::Both => &[Role::Primary, Role::Backup],
            Self::PrimaryOnly => &[Role::Primary],
            Self::BackupOnly => &[Role::Backup],
        }
    }

    pub fn includes(self, role: Role) -> bool {
        self.roles().contains(&role)
    }

    /// Restrict this target to the given roles.
    ///
    /// Returns `None` when nothing of this target is left.
    pub fn restrict(self, roles: &[Role]) -> Option<Self> {
        let primary = self.includes(Role::Primary) && roles.contains(&Role::Primary);
        let backup = self.includes(Role::Backup) && roles.contains(&Role::Backup);
        match (primary, backup) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::PrimaryOnly),
            (false, true) => Some(Self::BackupOnly),
            (false, false) => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Both => f.write_str("both"),
            Self::PrimaryOnly => f.write_str("primary"),
            Self::BackupOnly => f.write_str("backup"),
        }
    }
}
