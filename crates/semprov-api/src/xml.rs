// ── Minimal XML element tree ──
//
// SEMP replies and request documents are small, attribute-light trees.
// This module turns markup into an owned `XmlNode` tree and offers dotted
// path lookups (`rpc-reply.rpc.show.queue`) over it. Namespaces, comments,
// and processing instructions are ignored.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// One element with its attributes, text content, and child elements in
/// document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, String> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            attributes.push((key, value.into_owned()));
        }
        Ok(Self {
            name,
            attributes,
            text: None,
            children: Vec::new(),
        })
    }

    /// The first child element with this name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Every child element with this name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Value of an attribute on this element.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed text content, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Walk a dotted path of child names below this node.
    ///
    /// The path does *not* include this node's own name.
    pub fn descend(&self, path: &str) -> Option<&XmlNode> {
        segments(path).try_fold(self, |node, seg| node.child(seg))
    }

    /// Every node reachable by a dotted path, fanning out over repeated
    /// elements at each level.
    pub fn descend_all<'a>(&'a self, path: &str) -> Vec<&'a XmlNode> {
        let mut current = vec![self];
        for seg in segments(path) {
            current = current
                .into_iter()
                .flat_map(|n| n.children.iter().filter(|c| c.name == seg))
                .collect();
            if current.is_empty() {
                break;
            }
        }
        current
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|s| !s.is_empty())
}

/// Parse a complete document into its root element.
///
/// Text content is trimmed; whitespace-only text is dropped. Fails on
/// malformed markup, mismatched end tags, or an empty document.
pub fn parse_document(input: &str) -> Result<XmlNode, String> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(XmlNode::from_start(&start)?),
            Ok(Event::Empty(start)) => {
                let node = XmlNode::from_start(&start)?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::End(_)) => {
                let node = stack.pop().ok_or("unexpected closing tag")?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(text)) => {
                let value = text.unescape().map_err(|e| e.to_string())?;
                push_text(&mut stack, &value)?;
            }
            Ok(Event::CData(data)) => {
                let value = String::from_utf8_lossy(&data).into_owned();
                push_text(&mut stack, &value)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "at byte {}: {e}",
                    reader.buffer_position()
                ));
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.name));
    }
    root.ok_or_else(|| "document has no root element".into())
}

fn attach(
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
    node: XmlNode,
) -> Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        Ok(())
    } else if root.is_some() {
        Err(format!("second root element <{}>", node.name))
    } else {
        *root = Some(node);
        Ok(())
    }
}

fn push_text(stack: &mut [XmlNode], value: &str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    let Some(top) = stack.last_mut() else {
        return Err(format!("text outside the root element: {trimmed}"));
    };
    match top.text {
        Some(ref mut existing) => existing.push_str(trimmed),
        None => top.text = Some(trimmed.to_owned()),
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_attributes_and_text() {
        let root = parse_document(
            r#"<?xml version="1.0"?>
            <rpc-reply semp-version="soltr/7_1_1">
              <rpc><show><queue><queues>
                <queue><name>q1</name></queue>
                <queue><name>q2</name></queue>
              </queues></queue></show></rpc>
              <execute-result code="ok"/>
            </rpc-reply>"#,
        )
        .unwrap();

        assert_eq!(root.name, "rpc-reply");
        assert_eq!(root.attr("semp-version"), Some("soltr/7_1_1"));
        assert_eq!(root.descend("execute-result").unwrap().attr("code"), Some("ok"));

        let names: Vec<_> = root
            .descend_all("rpc.show.queue.queues.queue.name")
            .into_iter()
            .filter_map(XmlNode::text)
            .collect();
        assert_eq!(names, ["q1", "q2"]);
    }

    #[test]
    fn unescapes_entities_in_text() {
        let root = parse_document("<a><b>x &amp; y</b></a>").unwrap();
        assert_eq!(root.descend("b").unwrap().text(), Some("x & y"));
    }

    #[test]
    fn rejects_mismatched_and_unclosed_markup() {
        assert!(parse_document("<a><b></a>").is_err());
        assert!(parse_document("<a><b>").is_err());
        assert!(parse_document("").is_err());
        assert!(parse_document("<a/><b/>").is_err());
    }

    #[test]
    fn missing_path_is_none() {
        let root = parse_document("<a><b/></a>").unwrap();
        assert!(root.descend("b.c").is_none());
        assert!(root.descend_all("x.y").is_empty());
    }
}
