// ── Deletion workflows ──
//
// Deletions check live usage while planning, so a refused deletion sends
// nothing at all. Queues are deleted on the primary; everything else on
// both appliances.

use tracing::{info, warn};

use super::client_profile::{ProfileScope, profile_key, set_profile_keys};
use super::{Planner, Workflow};
use crate::document::ConfigDocument;
use crate::entity::{EntityKey, EntityKind};
use crate::error::CoreError;
use crate::guard::{ExistenceQuery, GuardOutcome};
use crate::routing::Target;

const CLIENT_PROFILE_PATH: &str = "rpc-reply.rpc.show.client-profile.profiles.profile";
const ACL_PROFILE_PATH: &str = "rpc-reply.rpc.show.acl-profile.acl-profiles.acl-profile";

fn queue_shutdown(planner: &Planner<'_>, queue: &str, vpn: &str) -> ConfigDocument {
    let mut doc = planner.document(format!("Shutting down queue {queue}"));
    doc.set("message_spool.vpn_name", vpn)
        .set("message_spool.queue.name", queue)
        .flag("message_spool.queue.shutdown.full");
    doc
}

fn queue_delete(planner: &Planner<'_>, queue: &str, vpn: &str) -> ConfigDocument {
    let mut doc = planner.document(format!("Deleting queue {queue}"));
    doc.set("message_spool.vpn_name", vpn)
        .set("message_spool.no.queue.name", queue);
    doc
}

fn user_shutdown(planner: &Planner<'_>, username: &str, vpn: &str) -> ConfigDocument {
    let mut doc = planner.document(format!("Shutting down client username {username}"));
    doc.set("client_username.username", username)
        .set("client_username.vpn_name", vpn)
        .flag("client_username.shutdown");
    doc
}

fn user_delete(planner: &Planner<'_>, username: &str, vpn: &str) -> ConfigDocument {
    let mut doc = planner.document(format!("Deleting client username {username}"));
    doc.set("no.client_username.username", username)
        .set("no.client_username.vpn_name", vpn);
    doc
}

fn acl_delete(planner: &Planner<'_>, name: &str, vpn: &str) -> ConfigDocument {
    let mut doc = planner.document(format!("VPN {vpn} Deleting ACL Profile {name}"));
    doc.set("no.acl_profile.name", name)
        .set("no.acl_profile.vpn_name", vpn);
    doc
}

// ── Queues ───────────────────────────────────────────────────────────

/// Shut down and delete queues. A queue with bound consumers, topic
/// subscriptions or spooled messages is refused unless the run is forced.
#[derive(Debug, Clone)]
pub struct DeleteQueues {
    pub vpn: String,
    pub queues: Vec<String>,
    /// Stop after the shutdown.
    pub shutdown_only: bool,
}

impl Workflow for DeleteQueues {
    fn label(&self) -> String {
        format!("delete queues in vpn {}", self.vpn)
    }

    async fn plan_into(&self, planner: &mut Planner<'_>) -> Result<(), CoreError> {
        let cluster = planner.cluster();
        let vpn = self.vpn.as_str();
        for queue in &self.queues {
            let summary = cluster.queue_detail(queue, vpn).await?;
            if let Some(reason) = summary.in_use_reason() {
                let entity = EntityKey::queue(queue, vpn).to_string();
                if !planner.guard().force() {
                    return Err(CoreError::InUse { entity, reason });
                }
                warn!(%entity, %reason, "queue in use, deleting anyway");
            }

            let doc = queue_shutdown(planner, queue, vpn);
            planner.push(&doc, Target::PrimaryOnly)?;
            if self.shutdown_only {
                info!(queue = %queue, "shutdown only, keeping queue");
                continue;
            }
            let doc = queue_delete(planner, queue, vpn);
            planner.push(&doc, Target::PrimaryOnly)?;
        }
        Ok(())
    }
}

// ── Client usernames ─────────────────────────────────────────────────

/// Disable client usernames and optionally remove them. A username that
/// owns queues or has connected clients is left alone.
#[derive(Debug, Clone)]
pub struct DeleteUsers {
    pub vpn: String,
    pub users: Vec<String>,
    pub remove: bool,
}

impl Workflow for DeleteUsers {
    fn label(&self) -> String {
        format!("delete client usernames in vpn {}", self.vpn)
    }

    async fn plan_into(&self, planner: &mut Planner<'_>) -> Result<(), CoreError> {
        let cluster = planner.cluster();
        let vpn = self.vpn.as_str();
        for username in &self.users {
            let entity = EntityKey::user(username, vpn);
            if !cluster.user_exists(username, vpn).await? {
                return Err(CoreError::NotFound {
                    entity: entity.to_string(),
                });
            }

            let owned = cluster.user_queues(username, vpn).await?;
            if !owned.is_empty() {
                warn!(%entity, queues = %owned.join(","), "client username owns queues, skipping");
                let doc = user_shutdown(planner, username, vpn);
                planner.skip(&doc, GuardOutcome::SkippedInUse);
                continue;
            }
            if cluster.user_in_use(username, vpn).await? {
                warn!(%entity, "client username has connected clients, skipping");
                let doc = user_shutdown(planner, username, vpn);
                planner.skip(&doc, GuardOutcome::SkippedInUse);
                continue;
            }

            if cluster.user_enabled(username, vpn).await? {
                let doc = user_shutdown(planner, username, vpn);
                planner.push(&doc, Target::Both)?;
            } else {
                info!(%entity, "already shut down");
            }
            if self.remove {
                let doc = user_delete(planner, username, vpn);
                planner.push(&doc, Target::Both)?;
            }
        }
        Ok(())
    }
}

// ── Profiles ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DeleteClientProfile {
    pub name: String,
    pub scope: ProfileScope,
}

impl Workflow for DeleteClientProfile {
    fn label(&self) -> String {
        format!("delete client profile {}", self.name)
    }

    async fn plan_into(&self, planner: &mut Planner<'_>) -> Result<(), CoreError> {
        let entity = profile_key(&self.name, self.scope.vpn());
        let mut show = planner.document(format!("Querying client profile {}", self.name));
        set_profile_keys(&mut show, "show.client_profile", &self.name, &self.scope);
        let lookup = ExistenceQuery::new(&show, CLIENT_PROFILE_PATH, Target::Both)?;

        let mut doc = planner.document(format!("Deleting client profile {}", self.name));
        set_profile_keys(&mut doc, "no.client_profile", &self.name, &self.scope);
        planner.configure(&doc, Target::Both, &entity, &lookup, false).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DeleteAclProfile {
    pub name: String,
    pub vpn: String,
}

impl Workflow for DeleteAclProfile {
    fn label(&self) -> String {
        format!("delete acl profile {} in vpn {}", self.name, self.vpn)
    }

    async fn plan_into(&self, planner: &mut Planner<'_>) -> Result<(), CoreError> {
        let (name, vpn) = (self.name.as_str(), self.vpn.as_str());
        let entity = EntityKey::new(EntityKind::AclProfile, name, Some(vpn));
        let mut show = planner.document(format!("Querying acl profile {name}"));
        show.set("show.acl_profile.name", name)
            .set("show.acl_profile.vpn_name", vpn);
        let lookup = ExistenceQuery::new(&show, ACL_PROFILE_PATH, Target::Both)?;

        let doc = acl_delete(planner, name, vpn);
        planner.configure(&doc, Target::Both, &entity, &lookup, false).await?;
        Ok(())
    }
}

// ── VPN ──────────────────────────────────────────────────────────────

/// Tear down a VPN with its queues, client usernames and ACL profile.
///
/// Every queue must be idle and no client may be connected, unless the run
/// is forced. The VPN is shut down first and deleted last.
#[derive(Debug, Clone)]
pub struct DeleteVpn {
    pub vpn: String,
}

impl Workflow for DeleteVpn {
    fn label(&self) -> String {
        format!("delete vpn {}", self.vpn)
    }

    async fn plan_into(&self, planner: &mut Planner<'_>) -> Result<(), CoreError> {
        let cluster = planner.cluster();
        let vpn = self.vpn.as_str();
        let force = planner.guard().force();

        let mut doc = planner.document(format!("Shutdown the VPN {vpn}"));
        doc.set("message_vpn.vpn_name", vpn).flag("message_vpn.shutdown");
        planner.push(&doc, Target::Both)?;

        let queues = cluster.list_queues(vpn, "*").await?;
        let busy: Vec<String> = queues
            .iter()
            .filter_map(|q| q.in_use_reason().map(|r| format!("{} ({r})", q.name)))
            .collect();
        if !busy.is_empty() {
            let reason = format!("queues still in use: {}", busy.join(", "));
            if !force {
                return Err(CoreError::InUse {
                    entity: EntityKey::vpn(vpn).to_string(),
                    reason,
                });
            }
            warn!(vpn, %reason, "forced");
        }
        info!(vpn, queues = queues.len(), "no queues are being used");

        let mut users: Vec<String> = Vec::new();
        for user in cluster.list_users(vpn, "*").await? {
            if !users.contains(&user.username) {
                users.push(user.username);
            }
        }
        let clients = cluster.list_clients(vpn, "*").await?;
        let connected: Vec<&str> = users
            .iter()
            .filter(|u| clients.iter().any(|c| &c.client_username == *u))
            .map(String::as_str)
            .collect();
        if !connected.is_empty() {
            let reason = format!("users still in use: {}", connected.join(", "));
            if !force {
                return Err(CoreError::InUse {
                    entity: EntityKey::vpn(vpn).to_string(),
                    reason,
                });
            }
            warn!(vpn, %reason, "forced");
        }

        for queue in &queues {
            let doc = queue_shutdown(planner, &queue.name, vpn);
            planner.push(&doc, Target::PrimaryOnly)?;
            let doc = queue_delete(planner, &queue.name, vpn);
            planner.push(&doc, Target::PrimaryOnly)?;
        }

        for username in &users {
            let doc = user_shutdown(planner, username, vpn);
            planner.push(&doc, Target::Both)?;
            let doc = user_delete(planner, username, vpn);
            planner.push(&doc, Target::Both)?;
        }

        let doc = acl_delete(planner, vpn, vpn);
        planner.push(&doc, Target::Both)?;

        let mut doc = planner.document(format!("Deleting VPN {vpn}"));
        doc.set("no.message_vpn.vpn_name", vpn);
        planner.push(&doc, Target::Both)?;
        Ok(())
    }
}
