// ── VPN bridges between two clusters ──
//
// A bridge links identically named VPNs on a local cluster and a remote
// (DR) cluster. Each appliance carries its own copy of the bridge, so every
// step here targets exactly one appliance and the plan spans two clusters.
// Bridge steps are not existence guarded.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::info;

use crate::dispatcher::{Cluster, RoleReply};
use crate::document::{ConfigDocument, PreparedCommand};
use crate::error::CoreError;
use crate::routing::{Role, Target};

pub const DEFAULT_PHYS_INTF: &str = "1/1/lag1";
pub const DEFAULT_NODE: &str = "solace1";

/// Which cluster of the pair a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeSide {
    Local,
    Remote,
}

impl BridgeSide {
    fn bridge_prefix(self) -> &'static str {
        match self {
            Self::Local => "primary",
            Self::Remote => "backup",
        }
    }
}

impl fmt::Display for BridgeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Remote => "remote",
        })
    }
}

fn single(role: Role) -> Target {
    match role {
        Role::Primary => Target::PrimaryOnly,
        Role::Backup => Target::BackupOnly,
    }
}

#[derive(Debug, Clone)]
pub struct BridgeWorkflow {
    pub vpns: Vec<String>,
    /// Service address of the remote cluster, e.g. `10.96.12.6:55555`.
    pub remote_addr: String,
    /// Local interface used to reach the remote cluster.
    pub phys_intf: String,
    /// Router name of the local cluster's primary node.
    pub node: String,
    /// Password of the bridge client username (named after the VPN).
    pub password: SecretString,
}

impl BridgeWorkflow {
    pub fn new(vpns: Vec<String>, remote_addr: impl Into<String>, password: SecretString) -> Self {
        Self {
            vpns,
            remote_addr: remote_addr.into(),
            phys_intf: DEFAULT_PHYS_INTF.to_owned(),
            node: DEFAULT_NODE.to_owned(),
            password,
        }
    }

    /// Bridge name for `vpn` on `side`.
    pub fn bridge_name(side: BridgeSide, vpn: &str) -> String {
        format!("{}_{vpn}", side.bridge_prefix())
    }

    fn bridge_doc(cluster: &Cluster, description: String, side: BridgeSide, vpn: &str, role: Role) -> ConfigDocument {
        let mut doc = cluster.document(description);
        doc.set("bridge.bridge_name", Self::bridge_name(side, vpn))
            .set("bridge.vpn_name", vpn)
            .flag(&format!("bridge.{role}"));
        doc
    }

    /// Address the far end of the bridge under `prefix`.
    fn remote_vpn(&self, doc: &mut ConfigDocument, prefix: &str, side: BridgeSide, vpn: &str) {
        doc.set(&format!("{prefix}.vpn_name"), vpn);
        match side {
            BridgeSide::Local => {
                doc.flag(&format!("{prefix}.connect_via"))
                    .set(&format!("{prefix}.addr"), &self.remote_addr)
                    .flag(&format!("{prefix}.interface"))
                    .set(&format!("{prefix}.phys_intf"), &self.phys_intf);
            }
            BridgeSide::Remote => {
                doc.flag(&format!("{prefix}.router"))
                    .set(&format!("{prefix}.virtual_router_name"), format!("v:{}", self.node));
            }
        }
    }

    /// Build every step for both clusters. Appliances missing from a
    /// cluster are left out.
    pub fn plan(&self, local: &Cluster, remote: &Cluster) -> Result<BridgePlan, CoreError> {
        let sides = [(BridgeSide::Local, local), (BridgeSide::Remote, remote)];
        let mut plan = BridgePlan::default();

        for vpn in &self.vpns {
            info!(
                vpn = %vpn,
                local = %Self::bridge_name(BridgeSide::Local, vpn),
                remote = %Self::bridge_name(BridgeSide::Remote, vpn),
                "planning bridge"
            );

            for (side, cluster) in sides {
                for &role in cluster.roles() {
                    let name = Self::bridge_name(side, vpn);
                    let mut doc = cluster.document(format!("{side} cluster, create bridge {name} on {role} appliance"));
                    doc.set("create.bridge.bridge_name", &name)
                        .set("create.bridge.vpn_name", vpn)
                        .flag(&format!("create.bridge.{role}"));
                    plan.push(side, &doc, role)?;
                }
            }

            for (side, cluster) in sides {
                for &role in cluster.roles() {
                    let name = Self::bridge_name(side, vpn);
                    let mut doc = Self::bridge_doc(
                        cluster,
                        format!("{side} cluster, create remote vpn for bridge {name} on {role} appliance"),
                        side,
                        vpn,
                        role,
                    );
                    self.remote_vpn(&mut doc, "bridge.remote.create.message_vpn", side, vpn);
                    plan.push(side, &doc, role)?;

                    let mut doc = Self::bridge_doc(
                        cluster,
                        format!("{side} cluster, set remote username for bridge {name} on {role} appliance"),
                        side,
                        vpn,
                        role,
                    );
                    self.remote_vpn(&mut doc, "bridge.remote.message_vpn", side, vpn);
                    doc.set("bridge.remote.message_vpn.client_username.name", vpn)
                        .set(
                            "bridge.remote.message_vpn.client_username.password",
                            self.password.expose_secret(),
                        );
                    plan.push(side, &doc, role)?;
                }
            }

            for (side, cluster) in sides {
                for &role in cluster.roles() {
                    let name = Self::bridge_name(side, vpn);
                    let mut doc = Self::bridge_doc(
                        cluster,
                        format!("{side} cluster, enable bridge {name} on {role} appliance"),
                        side,
                        vpn,
                        role,
                    );
                    doc.flag("bridge.no.shutdown");
                    plan.push(side, &doc, role)?;
                }
            }

            for (side, cluster) in sides {
                for &role in cluster.roles() {
                    let name = Self::bridge_name(side, vpn);
                    let mut doc = Self::bridge_doc(
                        cluster,
                        format!("{side} cluster, enable remote vpn of bridge {name} on {role} appliance"),
                        side,
                        vpn,
                        role,
                    );
                    self.remote_vpn(&mut doc, "bridge.remote.message_vpn", side, vpn);
                    doc.flag("bridge.remote.message_vpn.no.shutdown");
                    plan.push(side, &doc, role)?;
                }
            }
        }
        Ok(plan)
    }
}

#[derive(Debug, Clone)]
pub struct BridgeStep {
    pub side: BridgeSide,
    pub command: PreparedCommand,
}

/// Bridge steps across both clusters, in send order.
#[derive(Debug, Clone, Default)]
pub struct BridgePlan {
    steps: Vec<BridgeStep>,
}

impl BridgePlan {
    fn push(&mut self, side: BridgeSide, doc: &ConfigDocument, role: Role) -> Result<(), CoreError> {
        self.steps.push(BridgeStep {
            side,
            command: doc.prepare(single(role))?,
        });
        Ok(())
    }

    pub fn steps(&self) -> &[BridgeStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Send each step to its cluster in order. Nothing is sent when either
    /// cluster is read-only.
    pub async fn execute(&self, local: &Cluster, remote: &Cluster) -> Result<Vec<RoleReply>, CoreError> {
        if local.read_only() || remote.read_only() {
            info!(steps = self.len(), "read-only mode, not applying bridge");
            return Ok(Vec::new());
        }
        let total = self.len();
        let mut replies = Vec::new();
        for (idx, step) in self.steps.iter().enumerate() {
            let cluster = match step.side {
                BridgeSide::Local => local,
                BridgeSide::Remote => remote,
            };
            info!(
                cluster = cluster.name(),
                step = idx + 1,
                total,
                target = %step.command.target(),
                "{}",
                step.command.description()
            );
            replies.extend(cluster.rpc(&step.command, false).await?);
        }
        Ok(replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_names_are_prefixed_by_side() {
        assert_eq!(BridgeWorkflow::bridge_name(BridgeSide::Local, "dev_event"), "primary_dev_event");
        assert_eq!(BridgeWorkflow::bridge_name(BridgeSide::Remote, "dev_event"), "backup_dev_event");
    }

    #[test]
    fn single_role_targets() {
        assert_eq!(single(Role::Primary), Target::PrimaryOnly);
        assert_eq!(single(Role::Backup), Target::BackupOnly);
    }
}
