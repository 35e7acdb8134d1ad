// ── Queue maintenance ──
//
// Operations on queues that already exist: purging spooled messages and
// changing the permission everyone else holds. Both run on the primary.
// A permission change stops egress itself and re-enables the queue
// afterwards, so it does not consult the shutdown mode.

use super::{Planner, Workflow};
use crate::document::ConfigDocument;
use crate::entity::EntityKey;
use crate::error::CoreError;
use crate::guard::ExistenceQuery;
use crate::model::QueuePermission;
use crate::routing::Target;

const QUEUE_INFO_PATH: &str = "rpc-reply.rpc.show.queue.queues.queue.info";

fn queue_lookup(planner: &Planner<'_>, queue: &str, vpn: &str) -> Result<ExistenceQuery, CoreError> {
    let mut show = planner.document(format!("Querying queue {queue}"));
    show.set("show.queue.name", queue).set("show.queue.vpn_name", vpn);
    Ok(ExistenceQuery::new(&show, QUEUE_INFO_PATH, Target::PrimaryOnly)?)
}

fn queue_doc(planner: &Planner<'_>, queue: &str, vpn: &str, description: String) -> ConfigDocument {
    let mut doc = planner.document(description);
    doc.set("message_spool.vpn_name", vpn)
        .set("message_spool.queue.name", queue);
    doc
}

// ── Purge ────────────────────────────────────────────────────────────

/// Delete every spooled message in the named queues. Missing queues are
/// skipped.
#[derive(Debug, Clone)]
pub struct PurgeQueues {
    pub vpn: String,
    pub queues: Vec<String>,
}

impl Workflow for PurgeQueues {
    fn label(&self) -> String {
        format!("delete spooled messages in vpn {}", self.vpn)
    }

    async fn plan_into(&self, planner: &mut Planner<'_>) -> Result<(), CoreError> {
        let vpn = self.vpn.as_str();
        for queue in &self.queues {
            let entity = EntityKey::queue(queue, vpn);
            let lookup = queue_lookup(planner, queue, vpn)?;

            let mut doc = planner.document(format!("Deleting messages in queue {queue} of vpn {vpn}"));
            doc.set("admin.message_spool.vpn_name", vpn)
                .set("admin.message_spool.delete_messages.queue_name", queue);
            planner
                .configure(&doc, Target::PrimaryOnly, &entity, &lookup, false)
                .await?;
        }
        Ok(())
    }
}

// ── Permission ───────────────────────────────────────────────────────

/// Change the non-owner permission of existing queues: stop egress, set
/// the permission, enable the queue.
#[derive(Debug, Clone)]
pub struct SetQueuePermission {
    pub vpn: String,
    pub queues: Vec<String>,
    pub permission: QueuePermission,
}

impl Workflow for SetQueuePermission {
    fn label(&self) -> String {
        format!("set {} permission on queues in vpn {}", self.permission, self.vpn)
    }

    async fn plan_into(&self, planner: &mut Planner<'_>) -> Result<(), CoreError> {
        let vpn = self.vpn.as_str();
        let target = Target::PrimaryOnly;
        for queue in &self.queues {
            let entity = EntityKey::queue(queue, vpn);
            let lookup = queue_lookup(planner, queue, vpn)?;

            let mut doc = queue_doc(planner, queue, vpn, format!("Shutting down egress on queue {queue}"));
            doc.flag("message_spool.queue.shutdown.egress");
            planner.configure(&doc, target, &entity, &lookup, false).await?;

            let mut doc = queue_doc(
                planner,
                queue,
                vpn,
                format!("Setting permission on queue {queue} to {}", self.permission),
            );
            doc.flag("message_spool.queue.permission.all")
                .flag(&format!("message_spool.queue.permission.{}", self.permission));
            planner.configure(&doc, target, &entity, &lookup, false).await?;

            let mut doc = queue_doc(planner, queue, vpn, format!("Enabling queue {queue}"));
            doc.flag("message_spool.queue.no.shutdown.full");
            planner.configure(&doc, target, &entity, &lookup, false).await?;
        }
        Ok(())
    }
}
