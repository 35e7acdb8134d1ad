// ── Schema validation ──
//
// Every document is checked against the element grammar of its protocol
// version before it may enter a batch. The grammars are compiled into the
// binary (see `grammar.rs`); validation is local and synchronous.

mod grammar;

use std::fmt;
use std::sync::LazyLock;

use semprov_api::xml::{self, XmlNode};
use thiserror::Error;
use tracing::warn;

use crate::version::SempVersion;

pub(crate) use grammar::{Content, ElementRule};

// ── Errors ──────────────────────────────────────────────────────────

/// What was wrong with a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Markup could not be parsed at all.
    Malformed(String),
    /// The root element is not `rpc`.
    WrongRoot(String),
    /// Element not defined anywhere in the grammar.
    UnknownElement(String),
    /// Element defined in the grammar, but not under this parent.
    Misplaced(String),
    /// Text inside an element that only takes children or presence.
    UnexpectedText,
    MissingChild(String),
    MissingAttribute(String),
    UnknownAttribute(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed document: {msg}"),
            Self::WrongRoot(name) => write!(f, "root element must be <rpc>, found <{name}>"),
            Self::UnknownElement(name) => write!(f, "unknown element <{name}>"),
            Self::Misplaced(name) => write!(f, "element <{name}> is not allowed here"),
            Self::UnexpectedText => f.write_str("element does not take a text value"),
            Self::MissingChild(name) => write!(f, "missing required element <{name}>"),
            Self::MissingAttribute(name) => write!(f, "missing required attribute '{name}'"),
            Self::UnknownAttribute(name) => write!(f, "unknown attribute '{name}'"),
        }
    }
}

/// A document failed validation for its protocol version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema {version}: {violation} at /{path}")]
pub struct SchemaValidationError {
    pub version: SempVersion,
    /// Slash-separated element path where the violation was found.
    pub path: String,
    pub violation: Violation,
}

// ── Schemas ─────────────────────────────────────────────────────────

/// The grammar for one protocol version.
#[derive(Debug)]
pub struct Schema {
    version: SempVersion,
    root: ElementRule,
    names: Vec<&'static str>,
}

static SOLTR_6_0: LazyLock<Schema> = LazyLock::new(|| Schema::build("soltr/6_0"));
static SOLTR_6_2: LazyLock<Schema> = LazyLock::new(|| Schema::build("soltr/6_2"));
static SOLTR_7_0: LazyLock<Schema> = LazyLock::new(|| Schema::build("soltr/7_0"));
static SOLTR_7_1: LazyLock<Schema> = LazyLock::new(|| Schema::build("soltr/7_1"));
static SOLTR_7_1_1: LazyLock<Schema> = LazyLock::new(|| Schema::build("soltr/7_1_1"));

impl Schema {
    fn build(tag: &str) -> Self {
        let version = SempVersion::new(tag);
        let root = grammar::rpc(&version);
        let mut names = Vec::new();
        root.collect_names(&mut names);
        names.sort_unstable();
        names.dedup();
        Self {
            version,
            root,
            names,
        }
    }

    /// Schema for a version, falling back to the default grammar when the
    /// version has none bundled.
    pub fn for_version(version: &SempVersion) -> &'static Schema {
        match version.as_str() {
            "soltr/6_0" => &SOLTR_6_0,
            "soltr/6_2" => &SOLTR_6_2,
            "soltr/7_0" => &SOLTR_7_0,
            "soltr/7_1" => &SOLTR_7_1,
            "soltr/7_1_1" => &SOLTR_7_1_1,
            other => {
                warn!(version = other, "no schema for version, using {}", SempVersion::DEFAULT);
                &SOLTR_6_0
            }
        }
    }

    pub fn version(&self) -> &SempVersion {
        &self.version
    }

    /// Validate serialized markup against this schema.
    pub fn validate(&self, markup: &str) -> Result<(), SchemaValidationError> {
        let doc = xml::parse_document(markup).map_err(|msg| self.error("", Violation::Malformed(msg)))?;
        if doc.name != self.root.name {
            return Err(self.error("", Violation::WrongRoot(doc.name)));
        }
        self.check(&self.root, &doc, doc.name.clone())
    }

    fn check(&self, rule: &ElementRule, node: &XmlNode, path: String) -> Result<(), SchemaValidationError> {
        for (key, _) in &node.attributes {
            if !rule.attributes.iter().any(|a| *a == key.as_str()) {
                return Err(self.error(&path, Violation::UnknownAttribute(key.clone())));
            }
        }
        for attr in &rule.attributes {
            if node.attr(attr).is_none() {
                return Err(self.error(&path, Violation::MissingAttribute((*attr).to_owned())));
            }
        }

        match &rule.content {
            Content::Flag => {
                if node.text.is_some() {
                    return Err(self.error(&path, Violation::UnexpectedText));
                }
                if let Some(child) = node.children.first() {
                    return Err(self.unexpected(&path, &child.name));
                }
            }
            Content::Text => {
                if let Some(child) = node.children.first() {
                    return Err(self.unexpected(&path, &child.name));
                }
            }
            Content::Children(children) => {
                if node.text.is_some() {
                    return Err(self.error(&path, Violation::UnexpectedText));
                }
                for child in &node.children {
                    let child_path = format!("{path}/{}", child.name);
                    let Some(child_rule) = children.iter().find(|r| r.name == child.name) else {
                        return Err(self.unexpected(&path, &child.name));
                    };
                    self.check(child_rule, child, child_path)?;
                }
                for required in &rule.required {
                    if node.child(required).is_none() {
                        return Err(self.error(&path, Violation::MissingChild((*required).to_owned())));
                    }
                }
            }
        }
        Ok(())
    }

    fn unexpected(&self, path: &str, name: &str) -> SchemaValidationError {
        let violation = if self.names.binary_search_by(|n| (*n).cmp(name)).is_ok() {
            Violation::Misplaced(name.to_owned())
        } else {
            Violation::UnknownElement(name.to_owned())
        };
        self.error(path, violation)
    }

    fn error(&self, path: &str, violation: Violation) -> SchemaValidationError {
        SchemaValidationError {
            version: self.version.clone(),
            path: path.to_owned(),
            violation,
        }
    }
}

/// Validate markup against the schema matching `version`.
pub fn validate(markup: &str, version: &SempVersion) -> Result<(), SchemaValidationError> {
    Schema::for_version(version).validate(markup)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::ConfigDocument;

    fn v(tag: &str) -> SempVersion {
        SempVersion::new(tag)
    }

    fn check(tag: &str, build: impl FnOnce(&mut ConfigDocument)) -> Result<(), SchemaValidationError> {
        let version = v(tag);
        let mut doc = ConfigDocument::new("test", &version);
        build(&mut doc);
        validate(&doc.to_xml(), &version)
    }

    #[test]
    fn accepts_queue_configuration() {
        check("soltr/6_0", |d| {
            d.set("message_spool.vpn_name", "dev_testvpn")
                .set("message_spool.queue.name", "testqueue1")
                .flag("message_spool.queue.permission.all")
                .flag("message_spool.queue.permission.consume");
        })
        .unwrap();
    }

    #[test]
    fn spool_purge_needs_a_queue_name() {
        check("soltr/6_0", |d| {
            d.set("admin.message_spool.vpn_name", "dev_testvpn")
                .set("admin.message_spool.delete_messages.queue_name", "testqueue1");
        })
        .unwrap();

        let err = check("soltr/6_0", |d| {
            d.set("admin.message_spool.vpn_name", "dev_testvpn")
                .flag("admin.message_spool.delete_messages");
        })
        .unwrap_err();
        assert_eq!(err.violation, Violation::MissingChild("queue-name".into()));
    }

    #[test]
    fn unknown_element_is_rejected() {
        let err = check("soltr/6_0", |d| {
            d.set("message_spool.vpn_name", "v").flag("message_spool.warp");
        })
        .unwrap_err();
        assert_eq!(err.violation, Violation::UnknownElement("warp".into()));
        assert_eq!(err.path, "rpc/message-spool");
    }

    #[test]
    fn wrong_nesting_is_misplaced() {
        // `vpn-name` exists, but never directly under <show>.
        let err = check("soltr/6_0", |d| {
            d.set("show.vpn_name", "v");
        })
        .unwrap_err();
        assert_eq!(err.violation, Violation::Misplaced("vpn-name".into()));
    }

    #[test]
    fn text_on_flag_is_rejected() {
        let err = check("soltr/6_0", |d| {
            d.set("show.version", "yes");
        })
        .unwrap_err();
        assert_eq!(err.violation, Violation::UnexpectedText);
    }

    #[test]
    fn missing_version_attribute() {
        let err = validate("<rpc><show><version/></show></rpc>", &v("soltr/6_0")).unwrap_err();
        assert_eq!(err.violation, Violation::MissingAttribute("semp-version".into()));
    }

    #[test]
    fn missing_required_child() {
        let err = check("soltr/6_0", |d| {
            d.flag("message_spool.create.queue");
        })
        .unwrap_err();
        assert_eq!(err.violation, Violation::MissingChild("name".into()));
    }

    #[test]
    fn client_profile_scope_depends_on_version() {
        let scoped = |d: &mut ConfigDocument| {
            d.set("create.client_profile.name", "p").set("create.client_profile.vpn_name", "v");
        };
        assert!(check("soltr/6_0", scoped).is_err());
        assert!(check("soltr/6_2", scoped).is_ok());
        assert!(check("soltr/7_1_1", scoped).is_ok());

        let global = |d: &mut ConfigDocument| {
            d.set("create.client_profile.name", "p");
        };
        assert!(check("soltr/6_0", global).is_ok());
        let err = check("soltr/7_0", global).unwrap_err();
        assert_eq!(err.violation, Violation::MissingChild("vpn-name".into()));
    }

    #[test]
    fn unrecognized_version_falls_back_to_default() {
        let schema = Schema::for_version(&v("soltr/99_9"));
        assert_eq!(schema.version().as_str(), SempVersion::DEFAULT);
        // The envelope carries the unknown tag; the default grammar only
        // requires that the attribute is present.
        check("soltr/99_9", |d| {
            d.flag("show.version");
        })
        .unwrap();
    }

    #[test]
    fn malformed_markup() {
        let err = validate("<rpc semp-version=\"soltr/6_0\"><show>", &v("soltr/6_0")).unwrap_err();
        assert!(matches!(err.violation, Violation::Malformed(_)));
    }
}
