// ── Structured SEMP replies ──
//
// A `Reply` is the parsed `<rpc-reply>` from one appliance, tagged with the
// host that produced it. Lookups use dotted paths rooted at the document
// element, e.g. `rpc-reply.rpc.show.message-vpn.vpn`.

use crate::error::Error;
use crate::xml::{self, XmlNode};

/// The `<execute-result code=".." reason=".."/>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteResult {
    pub code: String,
    pub reason: Option<String>,
}

impl ExecuteResult {
    pub fn is_ok(&self) -> bool {
        self.code == "ok"
    }
}

/// A parsed reply from a single appliance.
#[derive(Debug, Clone)]
pub struct Reply {
    host: String,
    root: XmlNode,
}

impl Reply {
    /// Parse a raw reply body. Fails with `Error::MalformedReply` if the body
    /// is not XML.
    pub fn parse(host: &str, body: &str) -> Result<Self, Error> {
        let root = xml::parse_document(body).map_err(|message| Error::MalformedReply {
            host: host.to_owned(),
            message,
            body: body.to_owned(),
        })?;
        Ok(Self {
            host: host.to_owned(),
            root,
        })
    }

    /// Host (address:port) that produced this reply.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn root(&self) -> &XmlNode {
        &self.root
    }

    /// Look up a node by a dotted path that starts with the root name.
    pub fn lookup(&self, path: &str) -> Option<&XmlNode> {
        let (first, rest) = split_root(path);
        if first != self.root.name {
            return None;
        }
        self.root.descend(rest)
    }

    /// Every node matching a rooted dotted path.
    pub fn lookup_all(&self, path: &str) -> Vec<&XmlNode> {
        let (first, rest) = split_root(path);
        if first != self.root.name {
            return Vec::new();
        }
        self.root.descend_all(rest)
    }

    /// `true` if the rooted dotted path exists in this reply.
    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Text at a rooted dotted path.
    pub fn text(&self, path: &str) -> Option<&str> {
        self.lookup(path).and_then(XmlNode::text)
    }

    /// The `semp-version` attribute the appliance stamped on the reply.
    pub fn semp_version(&self) -> Option<&str> {
        self.root.attr("semp-version")
    }

    /// Detail of a `<parse-error>` element, if the appliance could not
    /// understand the request.
    pub fn parse_error(&self) -> Option<String> {
        self.root.child("parse-error").map(describe)
    }

    /// Detail of a `<permission-error>` element, if the credentials lack
    /// rights for the request.
    pub fn permission_error(&self) -> Option<String> {
        self.root.child("permission-error").map(describe)
    }

    pub fn execute_result(&self) -> Option<ExecuteResult> {
        self.root.child("execute-result").map(|node| ExecuteResult {
            code: node.attr("code").unwrap_or_default().to_owned(),
            reason: node.attr("reason").map(str::to_owned),
        })
    }
}

fn split_root(path: &str) -> (&str, &str) {
    path.split_once('.').unwrap_or((path, ""))
}

fn describe(node: &XmlNode) -> String {
    node.text()
        .map(str::to_owned)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| node.name.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const QUEUE_REPLY: &str = r#"<rpc-reply semp-version="soltr/6_0">
        <rpc><show><queue><queues><queue>
          <name>testqueue1</name><info><owner>dev_testvpn</owner></info>
        </queue></queues></queue></show></rpc>
        <execute-result code="ok"/>
    </rpc-reply>"#;

    #[test]
    fn rooted_lookup() {
        let reply = Reply::parse("10.0.0.1:8080", QUEUE_REPLY).unwrap();
        assert!(reply.contains("rpc-reply.rpc.show.queue.queues.queue.info"));
        assert!(!reply.contains("reply.rpc.show.queue"));
        assert_eq!(
            reply.text("rpc-reply.rpc.show.queue.queues.queue.info.owner"),
            Some("dev_testvpn")
        );
        assert_eq!(reply.semp_version(), Some("soltr/6_0"));
        assert!(reply.execute_result().unwrap().is_ok());
        assert!(reply.parse_error().is_none());
    }

    #[test]
    fn error_elements() {
        let reply = Reply::parse(
            "h:80",
            r#"<rpc-reply semp-version="soltr/6_0">
                 <permission-error>read-only user</permission-error>
                 <execute-result code="fail" reason="not allowed"/>
               </rpc-reply>"#,
        )
        .unwrap();
        assert_eq!(reply.permission_error().as_deref(), Some("read-only user"));
        let result = reply.execute_result().unwrap();
        assert!(!result.is_ok());
        assert_eq!(result.reason.as_deref(), Some("not allowed"));
    }

    #[test]
    fn empty_error_element_is_described_by_name() {
        let reply = Reply::parse("h:80", "<rpc-reply><parse-error/></rpc-reply>").unwrap();
        assert_eq!(reply.parse_error().as_deref(), Some("parse-error"));
    }

    #[test]
    fn html_body_is_malformed() {
        let err = Reply::parse("h:80", "<html><body>oops").unwrap_err();
        assert!(matches!(err, Error::MalformedReply { ref host, .. } if host == "h:80"));
    }
}
