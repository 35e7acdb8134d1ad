// ── Naming standards ──
//
// Site definitions name objects relative to an environment so one appliance
// pair can host several environments side by side. A standard turns the
// template name plus the environment into the name on the appliance.

use std::fmt;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingStandard {
    /// `%s` in the template is replaced by the environment:
    /// `%s_testvpn` in `dev` becomes `dev_testvpn`.
    #[default]
    Zoinks,
    /// The environment is prefixed: `testvpn` in `dev` becomes `dev_testvpn`.
    Prefix,
    /// Names pass through unchanged.
    Literal,
}

impl NamingStandard {
    /// Select a standard by its settings-file name.
    pub fn from_kind(kind: &str) -> Result<Self, CoreError> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "" | "zoinks" | "substitute" => Ok(Self::Zoinks),
            "prefix" | "default" => Ok(Self::Prefix),
            "literal" | "none" => Ok(Self::Literal),
            other => Err(CoreError::Config {
                message: format!("unknown naming standard '{other}' (expected zoinks, prefix or literal)"),
            }),
        }
    }

    /// Resolve a template name for an environment.
    pub fn solve(self, template: &str, environment: &str) -> String {
        match self {
            Self::Zoinks => template.replace("%s", environment),
            Self::Prefix => format!("{environment}_{template}"),
            Self::Literal => template.to_owned(),
        }
    }
}

impl fmt::Display for NamingStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Zoinks => "zoinks",
            Self::Prefix => "prefix",
            Self::Literal => "literal",
        })
    }
}
