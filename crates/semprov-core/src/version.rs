// ── SEMP protocol version tag ──

use std::fmt;

use serde::{Deserialize, Serialize};

/// A SEMP protocol version string such as `soltr/6_0`.
///
/// Every request carries one in its envelope and the appliance stamps one on
/// every reply. Unknown versions are carried verbatim; schema lookup falls
/// back to the default grammar for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SempVersion(String);

impl SempVersion {
    pub const DEFAULT: &'static str = "soltr/6_0";

    /// Versions with a bundled grammar.
    pub const KNOWN: &'static [&'static str] = &[
        "soltr/6_0",
        "soltr/6_2",
        "soltr/7_0",
        "soltr/7_1",
        "soltr/7_1_1",
    ];

    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if tag.contains('/') {
            Self(tag)
        } else {
            Self(format!("soltr/{tag}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_known(&self) -> bool {
        Self::KNOWN.contains(&self.0.as_str())
    }

    /// `(major, minor)` parsed from the `soltr/M_m[_p]` form.
    pub fn major_minor(&self) -> Option<(u32, u32)> {
        let (_, numbers) = self.0.split_once('/')?;
        let mut parts = numbers.split('_');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().map_or(Some(0), |m| m.parse().ok())?;
        Some((major, minor))
    }

    /// Client profiles became VPN scoped in 6.2.
    pub fn vpn_scoped_client_profiles(&self) -> bool {
        self.major_minor().is_some_and(|v| v >= (6, 2))
    }
}

impl Default for SempVersion {
    fn default() -> Self {
        Self(Self::DEFAULT.into())
    }
}

impl fmt::Display for SempVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SempVersion {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}
