// ── Read-only queries ──
//
// Getters over a connected cluster. Each sends one `show` request and
// returns the per-appliance replies or a typed summary extracted from them.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use semprov_api::XmlNode;
use serde::Serialize;
use tracing::debug;

use crate::dispatcher::{Cluster, RoleReply};
use crate::entity::EntityKey;
use crate::error::CoreError;
use crate::routing::{Role, Target};

const QUEUES_PATH: &str = "rpc-reply.rpc.show.queue.queues.queue";
const USERS_PATH: &str = "rpc-reply.rpc.show.client-username.client-usernames.client-username";
const CLIENTS_PATH: &str = "rpc-reply.rpc.show.client.primary-virtual-router.client";
const VPNS_PATH: &str = "rpc-reply.rpc.show.message-vpn.vpn";

// ── Summaries ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueSummary {
    pub name: String,
    pub owner: Option<String>,
    pub bind_count: u64,
    pub topic_subscription_count: u64,
    pub spool_usage_mb: f64,
}

impl QueueSummary {
    fn from_node(node: &XmlNode) -> Self {
        let info = |path: &str| node.descend(path).and_then(XmlNode::text);
        Self {
            name: node.child("name").and_then(XmlNode::text).unwrap_or_default().to_owned(),
            owner: info("info.owner").map(str::to_owned),
            bind_count: info("info.bind-count").and_then(|v| v.parse().ok()).unwrap_or(0),
            topic_subscription_count: info("info.topic-subscription-count")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            spool_usage_mb: info("info.current-spool-usage-in-mb")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0),
        }
    }

    /// Bound consumers, subscriptions, or spooled messages.
    pub fn in_use_reason(&self) -> Option<String> {
        if self.bind_count > 0 {
            Some(format!("bind count {}", self.bind_count))
        } else if self.topic_subscription_count > 0 {
            Some(format!("topic subscription count {}", self.topic_subscription_count))
        } else if self.spool_usage_mb > 0.0 {
            Some(format!("{}MB spooled", self.spool_usage_mb))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub role: Role,
    pub username: String,
    pub enabled: bool,
    pub client_profile: Option<String>,
    pub acl_profile: Option<String>,
}

impl UserSummary {
    fn from_node(role: Role, node: &XmlNode) -> Self {
        let text = |name: &str| node.child(name).and_then(XmlNode::text).map(str::to_owned);
        Self {
            role,
            username: text("client-username").unwrap_or_default(),
            enabled: text("enabled").as_deref() == Some("true"),
            client_profile: text("profile"),
            acl_profile: text("acl-profile"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    pub name: String,
    pub client_username: String,
    pub vpn: Option<String>,
    pub address: Option<String>,
}

/// A flattened set of numeric counters for one object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub measurement: String,
    pub time: DateTime<Utc>,
    pub tags: IndexMap<String, String>,
    pub fields: IndexMap<String, i64>,
}

impl MetricSample {
    /// Flatten every integer leaf under `node` into `parent_child` keys.
    /// `name` and `message-vpn` children become tags.
    pub fn from_node(measurement: &str, environment: &str, node: &XmlNode, time: DateTime<Utc>) -> Self {
        let mut tags = IndexMap::new();
        tags.insert("environment".to_owned(), environment.to_owned());
        for key in ["name", "message-vpn"] {
            if let Some(value) = node.child(key).and_then(XmlNode::text) {
                tags.insert(key.to_owned(), value.to_owned());
            }
        }
        let mut fields = IndexMap::new();
        for child in &node.children {
            flatten(child, String::new(), &mut fields);
        }
        Self {
            measurement: measurement.to_owned(),
            time,
            tags,
            fields,
        }
    }
}

fn flatten(node: &XmlNode, prefix: String, out: &mut IndexMap<String, i64>) {
    let key = if prefix.is_empty() {
        node.name.clone()
    } else {
        format!("{prefix}_{}", node.name)
    };
    if node.children.is_empty() {
        if let Some(value) = node.text().and_then(|t| t.parse::<i64>().ok()) {
            out.insert(key, value);
        }
        return;
    }
    for child in &node.children {
        flatten(child, key.clone(), out);
    }
}

/// Which statistics block to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsKind {
    Clients,
    ClientSpools,
    Vpns,
    Spool,
}

// ── Cluster getters ──────────────────────────────────────────────────

impl Cluster {
    pub async fn message_spool(&self) -> Result<Vec<RoleReply>, CoreError> {
        let mut doc = self.document("Show message spool");
        doc.flag("show.message_spool");
        self.run(&doc, Target::Both).await
    }

    pub async fn redundancy(&self) -> Result<Vec<RoleReply>, CoreError> {
        let mut doc = self.document("Show redundancy");
        doc.flag("show.redundancy");
        self.run(&doc, Target::Both).await
    }

    pub async fn memory(&self) -> Result<Vec<RoleReply>, CoreError> {
        let mut doc = self.document("Show memory");
        doc.flag("show.memory");
        self.run(&doc, Target::Both).await
    }

    pub async fn show_version(&self) -> Result<Vec<RoleReply>, CoreError> {
        let mut doc = self.document("Show version");
        doc.flag("show.version");
        self.run(&doc, Target::Both).await
    }

    /// Raw `show queue` replies. The queue is asked of the primary unless
    /// `target` says otherwise.
    pub async fn get_queue(
        &self,
        queue: &str,
        vpn: &str,
        detail: bool,
        target: Target,
    ) -> Result<Vec<RoleReply>, CoreError> {
        let target = if target == Target::BackupOnly {
            target
        } else {
            Target::PrimaryOnly
        };
        let mut doc = self.document(format!("Querying queue {queue}"));
        doc.set("show.queue.name", queue).set("show.queue.vpn_name", vpn);
        if detail {
            doc.flag("show.queue.detail");
        }
        self.run(&doc, target).await
    }

    /// Queues matching `filter` in a VPN, from the primary.
    pub async fn list_queues(&self, vpn: &str, filter: &str) -> Result<Vec<QueueSummary>, CoreError> {
        let replies = self.get_queue(filter, vpn, true, Target::PrimaryOnly).await?;
        Ok(replies
            .iter()
            .flat_map(|r| r.reply.lookup_all(QUEUES_PATH))
            .map(QueueSummary::from_node)
            .collect())
    }

    /// Detail for one queue. Missing queues are `NotFound`.
    pub async fn queue_detail(&self, queue: &str, vpn: &str) -> Result<QueueSummary, CoreError> {
        self.list_queues(vpn, queue)
            .await?
            .into_iter()
            .find(|q| q.name == queue)
            .ok_or_else(|| CoreError::NotFound {
                entity: EntityKey::queue(queue, vpn).to_string(),
            })
    }

    /// Names of the queues owned by a client username.
    pub async fn user_queues(&self, username: &str, vpn: &str) -> Result<Vec<String>, CoreError> {
        Ok(self
            .list_queues(vpn, "*")
            .await?
            .into_iter()
            .filter(|q| q.owner.as_deref() == Some(username))
            .map(|q| q.name)
            .collect())
    }

    pub async fn get_client_username(
        &self,
        username: &str,
        vpn: &str,
        detail: bool,
    ) -> Result<Vec<RoleReply>, CoreError> {
        let mut doc = self.document(format!("Querying client username {username}"));
        doc.set("show.client_username.name", username)
            .set("show.client_username.vpn_name", vpn);
        if detail {
            doc.flag("show.client_username.detail");
        }
        self.run(&doc, Target::Both).await
    }

    /// Client usernames matching `filter`, one entry per appliance.
    pub async fn list_users(&self, vpn: &str, filter: &str) -> Result<Vec<UserSummary>, CoreError> {
        let replies = self.get_client_username(filter, vpn, true).await?;
        Ok(replies
            .iter()
            .flat_map(|r| {
                r.reply
                    .lookup_all(USERS_PATH)
                    .into_iter()
                    .map(|n| UserSummary::from_node(r.role, n))
            })
            .collect())
    }

    /// Whether a client username exists on every appliance.
    ///
    /// Present on some appliances only is `Inconsistent`.
    pub async fn user_exists(&self, username: &str, vpn: &str) -> Result<bool, CoreError> {
        let replies = self.get_client_username(username, vpn, false).await?;
        let found = replies
            .iter()
            .filter(|r| {
                r.reply
                    .lookup_all(USERS_PATH)
                    .iter()
                    .any(|n| n.child("client-username").and_then(XmlNode::text) == Some(username))
            })
            .count();
        debug!(username, vpn, found, of = replies.len(), "client username existence");
        match found {
            0 => Ok(false),
            n if n == replies.len() => Ok(true),
            _ => Err(CoreError::Inconsistent {
                entity: EntityKey::user(username, vpn).to_string(),
                detail: "exists on some appliances only".into(),
            }),
        }
    }

    /// Whether a client username is enabled. Missing, partially present,
    /// or mixed enabled state are errors.
    pub async fn user_enabled(&self, username: &str, vpn: &str) -> Result<bool, CoreError> {
        let users: Vec<UserSummary> = self
            .list_users(vpn, username)
            .await?
            .into_iter()
            .filter(|u| u.username == username)
            .collect();
        let entity = EntityKey::user(username, vpn).to_string();
        let Some(first) = users.first() else {
            return Err(CoreError::NotFound { entity });
        };
        if users.len() < self.roles().len() {
            return Err(CoreError::Inconsistent {
                entity,
                detail: "does not exist on all appliances".into(),
            });
        }
        if users.iter().any(|u| u.enabled != first.enabled) {
            return Err(CoreError::Inconsistent {
                entity,
                detail: "enabled on some appliances and disabled on others".into(),
            });
        }
        Ok(first.enabled)
    }

    pub async fn get_client(&self, client: &str, vpn: &str, detail: bool) -> Result<Vec<RoleReply>, CoreError> {
        let mut doc = self.document(format!("Querying clients {client}"));
        doc.set("show.client.name", client).set("show.client.vpn_name", vpn);
        if detail {
            doc.flag("show.client.detail");
        }
        self.run(&doc, Target::Both).await
    }

    /// Connected clients in a VPN.
    pub async fn list_clients(&self, vpn: &str, filter: &str) -> Result<Vec<ClientSummary>, CoreError> {
        let replies = self.get_client(filter, vpn, true).await?;
        Ok(replies
            .iter()
            .flat_map(|r| r.reply.lookup_all(CLIENTS_PATH))
            .map(|n| {
                let text = |name: &str| n.child(name).and_then(XmlNode::text).map(str::to_owned);
                ClientSummary {
                    name: text("name").unwrap_or_default(),
                    client_username: text("client-username").unwrap_or_default(),
                    vpn: text("message-vpn"),
                    address: text("client-address"),
                }
            })
            .collect())
    }

    /// Whether any client is connected with this username.
    pub async fn user_in_use(&self, username: &str, vpn: &str) -> Result<bool, CoreError> {
        Ok(self
            .list_clients(vpn, "*")
            .await?
            .iter()
            .any(|c| c.client_username == username))
    }

    pub async fn get_vpn(&self, vpn: &str, stats: bool) -> Result<Vec<RoleReply>, CoreError> {
        let mut doc = self.document(format!("Querying vpn {vpn}"));
        doc.set("show.message_vpn.vpn_name", vpn);
        if stats {
            doc.flag("show.message_vpn.stats");
        }
        self.run(&doc, Target::Both).await
    }

    /// VPN names matching `filter`, from the primary's view.
    pub async fn list_vpns(&self, filter: &str) -> Result<Vec<String>, CoreError> {
        let replies = self.get_vpn(filter, false).await?;
        let Some(primary) = replies.iter().find(|r| r.role == Role::Primary) else {
            return Ok(Vec::new());
        };
        Ok(primary
            .reply
            .lookup_all(VPNS_PATH)
            .into_iter()
            .filter_map(|n| n.child("name").and_then(XmlNode::text))
            .map(str::to_owned)
            .collect())
    }

    /// Statistics from the primary, flattened into numeric samples.
    pub async fn stats(&self, kind: StatsKind, filter: &str) -> Result<Vec<MetricSample>, CoreError> {
        let (measurement, path) = match kind {
            StatsKind::Clients => ("client-stats", CLIENTS_PATH),
            StatsKind::ClientSpools => ("client-spool-stats", CLIENTS_PATH),
            StatsKind::Vpns => ("vpn-stats", VPNS_PATH),
            StatsKind::Spool => ("spool-stats", "rpc-reply.rpc.show.message-spool.message-spool-stats"),
        };
        let mut doc = self.document(format!("Gathering {measurement}"));
        match kind {
            StatsKind::Clients => {
                doc.set("show.client.name", filter).flag("show.client.stats");
            }
            StatsKind::ClientSpools => {
                doc.set("show.client.name", filter)
                    .flag("show.client.message_spool_stats");
            }
            StatsKind::Vpns => {
                doc.set("show.message_vpn.vpn_name", filter)
                    .flag("show.message_vpn.stats");
            }
            StatsKind::Spool => {
                if filter != "*" {
                    doc.set("show.message_spool.vpn_name", filter);
                }
                doc.flag("show.message_spool.stats");
            }
        }

        let now = Utc::now();
        let replies = self.run(&doc, Target::PrimaryOnly).await?;
        Ok(replies
            .iter()
            .flat_map(|r| r.reply.lookup_all(path))
            .map(|n| MetricSample::from_node(measurement, self.name(), n, now))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use semprov_api::xml::parse_document;

    #[test]
    fn flattens_numeric_leaves_into_fields() {
        let node = parse_document(
            "<vpn><name>dev_testvpn</name><stats>\
             <client-data-messages-received>12</client-data-messages-received>\
             <ingress-discards><total-ingress-discards>3</total-ingress-discards></ingress-discards>\
             </stats><status>Up</status></vpn>",
        )
        .unwrap();
        let sample = MetricSample::from_node("vpn-stats", "dev", &node, Utc::now());

        assert_eq!(sample.tags.get("name").map(String::as_str), Some("dev_testvpn"));
        assert_eq!(sample.fields.get("stats_client-data-messages-received"), Some(&12));
        assert_eq!(
            sample.fields.get("stats_ingress-discards_total-ingress-discards"),
            Some(&3)
        );
        assert!(!sample.fields.contains_key("status"));
    }

    #[test]
    fn queue_in_use_reasons() {
        let node = parse_document(
            "<queue><name>q1</name><info><owner>u</owner><bind-count>0</bind-count>\
             <topic-subscription-count>0</topic-subscription-count>\
             <current-spool-usage-in-mb>0.5</current-spool-usage-in-mb></info></queue>",
        )
        .unwrap();
        let q = QueueSummary::from_node(&node);
        assert_eq!(q.owner.as_deref(), Some("u"));
        assert_eq!(q.in_use_reason().as_deref(), Some("0.5MB spooled"));
    }
}
