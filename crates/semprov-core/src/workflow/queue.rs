// ── Queue provisioning ──
//
// Message-spool configuration replicates from the primary, so every queue
// step is sent to the primary alone.

use tracing::debug;

use super::{Planner, Workflow};
use crate::document::ConfigDocument;
use crate::entity::{EntityKey, EntityKind};
use crate::error::CoreError;
use crate::guard::{ExistenceQuery, GuardOutcome};
use crate::model::QueueConfig;
use crate::routing::Target;

const QUEUE_INFO_PATH: &str = "rpc-reply.rpc.show.queue.queues.queue.info";

/// Create or reconfigure queues in one VPN.
#[derive(Debug, Clone)]
pub struct QueueWorkflow {
    pub vpn: String,
    pub queues: Vec<(String, QueueConfig)>,
}

impl QueueWorkflow {
    pub fn new(vpn: impl Into<String>) -> Self {
        Self {
            vpn: vpn.into(),
            queues: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_queue(mut self, name: impl Into<String>, config: QueueConfig) -> Self {
        self.queues.push((name.into(), config));
        self
    }

    fn queue_doc(&self, planner: &Planner<'_>, name: &str, description: String) -> ConfigDocument {
        let mut doc = planner.document(description);
        doc.set("message_spool.vpn_name", &self.vpn)
            .set("message_spool.queue.name", name);
        doc
    }

    async fn plan_queue(&self, planner: &mut Planner<'_>, name: &str, config: &QueueConfig) -> Result<(), CoreError> {
        let vpn = self.vpn.as_str();
        let entity = EntityKey::queue(name, vpn);
        let target = Target::PrimaryOnly;

        let mut show = planner.document(format!("Querying queue {name}"));
        show.set("show.queue.name", name).set("show.queue.vpn_name", vpn);
        let lookup = ExistenceQuery::new(&show, QUEUE_INFO_PATH, target)?;

        debug!(queue = name, vpn, ?config, "planning queue");

        // create
        let mut doc = planner.document(format!("Creating queue {name}"));
        doc.set("message_spool.vpn_name", vpn)
            .set("message_spool.create.queue.name", name);
        planner.create(&doc, target, &entity, &lookup).await?;

        // Live queues stop egress before structural changes.
        let mut doc = self.queue_doc(planner, name, format!("Shutting down egress on queue {name}"));
        doc.flag("message_spool.queue.shutdown.egress");
        let guard = planner.guard();
        let live = !guard.created(&entity);
        let permitted = guard.force() || guard.shutdown_mode().covers(EntityKind::Queue);
        if live {
            if permitted {
                planner.configure(&doc, target, &entity, &lookup, false).await?;
            } else {
                planner.skip(&doc, GuardOutcome::SkippedNotShutdown);
            }
        }

        let access = if config.exclusive {
            "message_spool.queue.access_type.exclusive"
        } else {
            "message_spool.queue.access_type.non_exclusive"
        };
        let mut doc = self.queue_doc(planner, name, format!("Setting access type on queue {name}"));
        doc.flag(access);
        planner.configure(&doc, target, &entity, &lookup, true).await?;

        let mut doc = self.queue_doc(planner, name, format!("Setting owner of queue {name} to {}", config.owner));
        doc.set("message_spool.queue.owner.owner", &config.owner);
        planner.configure(&doc, target, &entity, &lookup, true).await?;

        let mut doc = self.queue_doc(planner, name, format!("Setting max bind count on queue {name}"));
        doc.set("message_spool.queue.max_bind_count.value", config.max_bind_count);
        planner.configure(&doc, target, &entity, &lookup, false).await?;

        let mut doc = self.queue_doc(planner, name, format!("Setting consume permission on queue {name}"));
        if config.consume_all() {
            doc.flag("message_spool.queue.permission.all")
                .flag("message_spool.queue.permission.consume");
        } else {
            doc.flag("message_spool.queue.permission.consume");
        }
        planner.configure(&doc, target, &entity, &lookup, true).await?;

        let mut doc = self.queue_doc(planner, name, format!("Setting spool size on queue {name}"));
        doc.set("message_spool.queue.max_spool_usage.size", config.queue_size);
        planner.configure(&doc, target, &entity, &lookup, false).await?;

        if let Some(retries) = config.retries {
            let mut doc = self.queue_doc(planner, name, format!("Setting max redelivery on queue {name}"));
            doc.set("message_spool.queue.max_redelivery.value", retries);
            planner.configure(&doc, target, &entity, &lookup, false).await?;
        }

        let mut doc = self.queue_doc(planner, name, format!("Rejecting messages to sender on discard for queue {name}"));
        doc.flag("message_spool.queue.reject_msg_to_sender_on_discard");
        planner.configure(&doc, target, &entity, &lookup, false).await?;

        let mut doc = self.queue_doc(planner, name, format!("Enabling queue {name}"));
        doc.flag("message_spool.queue.no.shutdown.full");
        planner.configure(&doc, target, &entity, &lookup, false).await?;

        Ok(())
    }
}

impl Workflow for QueueWorkflow {
    fn label(&self) -> String {
        format!("queues in vpn {}", self.vpn)
    }

    async fn plan_into(&self, planner: &mut Planner<'_>) -> Result<(), CoreError> {
        for (name, config) in &self.queues {
            self.plan_queue(planner, name, config).await?;
        }
        Ok(())
    }
}
