// ── Configuration documents ──
//
// A `ConfigDocument` is the tree for one SEMP command, built from dotted
// paths. Once `prepare`d it is validated, rendered, and frozen into a
// `PreparedCommand`; only prepared commands are ever batched or sent.

use std::fmt;

use quick_xml::escape::escape;

use crate::routing::Target;
use crate::schema::{self, SchemaValidationError};
use crate::version::SempVersion;

/// One element. A node with children is a parent, a node with text is a
/// leaf value, and a node with neither is a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    name: String,
    text: Option<String>,
    children: Vec<Node>,
}

impl Node {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            text: None,
            children: Vec::new(),
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.children.is_empty() {
            write!(f, "<{}>", self.name)?;
            for child in &self.children {
                child.write(f)?;
            }
            write!(f, "</{}>", self.name)
        } else if let Some(text) = &self.text {
            write!(f, "<{0}>{1}</{0}>", self.name, escape(text.as_str()))
        } else {
            write!(f, "<{}/>", self.name)
        }
    }
}

/// An ordered tree of named nodes for one configuration command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    description: String,
    version: SempVersion,
    nodes: Vec<Node>,
}

impl ConfigDocument {
    pub fn new(description: impl Into<String>, version: &SempVersion) -> Self {
        Self {
            description: description.into(),
            version: version.clone(),
            nodes: Vec::new(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn version(&self) -> &SempVersion {
        &self.version
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Set a dotted path to a scalar value, e.g.
    /// `set("message_spool.vpn_name", "dev_testvpn")`.
    pub fn set(&mut self, path: &str, value: impl ToString) -> &mut Self {
        let segments: Vec<&str> = path.split('.').collect();
        self.set_segments(&segments, Some(value.to_string()))
    }

    /// Create a flag node at a dotted path; presence means true.
    pub fn flag(&mut self, path: &str) -> &mut Self {
        let segments: Vec<&str> = path.split('.').collect();
        self.set_segments(&segments, None)
    }

    /// Set a path given as explicit segments.
    ///
    /// Intermediate nodes are created or reused by name. Underscores become
    /// hyphens. Setting an existing leaf replaces its value; empty segments
    /// are ignored.
    pub fn set_segments(&mut self, segments: &[&str], value: Option<String>) -> &mut Self {
        let names: Vec<String> = segments
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.replace('_', "-"))
            .collect();
        let Some((leaf, parents)) = names.split_last() else {
            return self;
        };

        let mut level = &mut self.nodes;
        for name in parents {
            let idx = match level.iter().position(|n| &n.name == name) {
                Some(idx) => idx,
                None => {
                    level.push(Node::new(name));
                    level.len() - 1
                }
            };
            let parent = &mut level[idx];
            parent.text = None;
            level = &mut parent.children;
        }

        let idx = match level.iter().position(|n| &n.name == leaf) {
            Some(idx) => idx,
            None => {
                level.push(Node::new(leaf));
                level.len() - 1
            }
        };
        let node = &mut level[idx];
        node.children.clear();
        node.text = value;
        self
    }

    /// Render the full `<rpc semp-version="..">` document.
    pub fn to_xml(&self) -> String {
        self.to_string()
    }

    /// Validate against the schema for this document's version and freeze
    /// it into a sendable command.
    pub fn prepare(&self, target: Target) -> Result<PreparedCommand, SchemaValidationError> {
        let xml = self.to_xml();
        schema::validate(&xml, &self.version)?;
        Ok(PreparedCommand {
            description: self.description.clone(),
            version: self.version.clone(),
            xml,
            target,
        })
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<rpc semp-version=\"{}\">", escape(self.version.as_str()))?;
        for node in &self.nodes {
            node.write(f)?;
        }
        f.write_str("</rpc>")
    }
}

/// A validated, serialized command with its routing. Immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommand {
    description: String,
    version: SempVersion,
    xml: String,
    target: Target,
}

impl PreparedCommand {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn version(&self) -> &SempVersion {
        &self.version
    }

    pub fn xml(&self) -> &str {
        &self.xml
    }

    pub fn target(&self) -> Target {
        self.target
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn v6() -> SempVersion {
        SempVersion::default()
    }

    #[test]
    fn renders_show_queue() {
        let mut doc = ConfigDocument::new("show queue", &v6());
        doc.set("show.queue.name", "solacetest.prov.queue")
            .set("show.queue.vpn_name", "default");
        insta::assert_snapshot!(
            doc.to_xml(),
            @r#"<rpc semp-version="soltr/6_0"><show><queue><name>solacetest.prov.queue</name><vpn-name>default</vpn-name></queue></show></rpc>"#
        );
    }

    #[test]
    fn flags_render_as_empty_elements() {
        let mut doc = ConfigDocument::new("enable vpn", &v6());
        doc.set("message_vpn.vpn_name", "dev_testvpn")
            .flag("message_vpn.no.shutdown");
        assert_eq!(
            doc.to_xml(),
            "<rpc semp-version=\"soltr/6_0\"><message-vpn><vpn-name>dev_testvpn</vpn-name>\
             <no><shutdown/></no></message-vpn></rpc>"
        );
    }

    #[test]
    fn setting_a_leaf_twice_replaces_it() {
        let mut doc = ConfigDocument::new("x", &v6());
        doc.set("show.queue.name", "a").set("show.queue.name", "b");
        assert!(doc.to_xml().contains("<name>b</name>"));
        assert!(!doc.to_xml().contains("<name>a</name>"));
    }

    #[test]
    fn flag_becomes_parent_when_extended() {
        let mut doc = ConfigDocument::new("x", &v6());
        doc.flag("show.message_spool").flag("show.message_spool.detail");
        assert!(doc.to_xml().contains("<message-spool><detail/></message-spool>"));
    }

    #[test]
    fn text_is_escaped() {
        let mut doc = ConfigDocument::new("x", &v6());
        doc.set("client_username.password.password", "a<b&c");
        assert!(doc.to_xml().contains("<password>a&lt;b&amp;c</password>"));
    }

    #[test]
    fn explicit_segments_and_empty_paths() {
        let mut doc = ConfigDocument::new("x", &v6());
        doc.set_segments(&["show", "", "version"], None).set_segments(&[], None);
        assert_eq!(doc.to_xml(), "<rpc semp-version=\"soltr/6_0\"><show><version/></show></rpc>");
    }

    #[test]
    fn prepare_validates_and_freezes() {
        let mut doc = ConfigDocument::new("create vpn", &v6());
        doc.set("create.message_vpn.vpn_name", "dev_testvpn");
        let cmd = doc.prepare(Target::Both).unwrap();
        assert_eq!(cmd.description(), "create vpn");
        assert_eq!(cmd.xml(), doc.to_xml());
        assert_eq!(cmd.target(), Target::Both);

        let mut bad = ConfigDocument::new("bogus", &v6());
        bad.set("create.warp_drive.name", "x");
        assert!(bad.prepare(Target::Both).is_err());
    }
}
