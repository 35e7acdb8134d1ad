// ── Provisioning workflows ──
//
// A workflow plans a fixed, ordered sequence of steps for one kind of
// object. Planning consults the guard (which may query live state) and
// pushes each step that survives into a `CommandBatch`; executing the plan
// then sends the batch in order. A failed step aborts the run. Nothing is
// rolled back or re-enabled.

pub mod acl_profile;
pub mod bridge;
pub mod client_profile;
pub mod delete;
pub mod queue;
pub mod site;
pub mod spool;
pub mod user;
pub mod vpn;

pub use acl_profile::AclProfileWorkflow;
pub use bridge::{BridgePlan, BridgeSide, BridgeWorkflow};
pub use client_profile::{ClientProfileWorkflow, ProfileScope, client_profile_for};
pub use delete::{DeleteAclProfile, DeleteClientProfile, DeleteQueues, DeleteUsers, DeleteVpn};
pub use queue::QueueWorkflow;
pub use site::SiteWorkflow;
pub use spool::{PurgeQueues, SetQueuePermission};
pub use user::{UserSpec, UserWorkflow};
pub use vpn::VpnWorkflow;

use serde::Serialize;
use tracing::info;

use crate::batch::CommandBatch;
use crate::dispatcher::{Cluster, RoleReply};
use crate::document::{ConfigDocument, PreparedCommand};
use crate::entity::EntityKey;
use crate::error::CoreError;
use crate::guard::{ExistenceFlag, ExistenceQuery, Guard, GuardDecision, GuardOutcome, Precondition};
use crate::routing::Target;

// ── Reports ──────────────────────────────────────────────────────────

/// What planning decided for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub description: String,
    /// Where the step goes; `None` when skipped.
    pub target: Option<Target>,
    pub outcome: GuardOutcome,
}

// ── Planner ──────────────────────────────────────────────────────────

/// Planning context shared by the steps of one run.
pub struct Planner<'a> {
    cluster: &'a Cluster,
    guard: &'a mut Guard,
    batch: CommandBatch,
    steps: Vec<StepReport>,
}

impl<'a> Planner<'a> {
    pub fn new(cluster: &'a Cluster, guard: &'a mut Guard) -> Self {
        Self {
            cluster,
            guard,
            batch: CommandBatch::new(),
            steps: Vec::new(),
        }
    }

    pub fn cluster(&self) -> &'a Cluster {
        self.cluster
    }

    pub fn guard(&self) -> &Guard {
        self.guard
    }

    pub fn guard_mut(&mut self) -> &mut Guard {
        self.guard
    }

    pub fn document(&self, description: impl Into<String>) -> ConfigDocument {
        self.cluster.document(description)
    }

    /// Add a step with no precondition.
    pub fn push(&mut self, doc: &ConfigDocument, target: Target) -> Result<(), CoreError> {
        self.batch.push(doc, target)?;
        self.record(doc, Some(target), GuardOutcome::Executed);
        Ok(())
    }

    /// Add a creation step, sent only to the sides where the entity is
    /// missing. A created entity counts as existing for later steps.
    ///
    /// Only a creation on every requested side makes the entity new to this
    /// run. When one side already held it, that side is live and later
    /// structural steps stay behind the shutdown gate.
    pub async fn create(
        &mut self,
        doc: &ConfigDocument,
        target: Target,
        entity: &EntityKey,
        lookup: &ExistenceQuery,
    ) -> Result<GuardOutcome, CoreError> {
        let decision = self
            .guard
            .check(self.cluster, entity, Precondition::MustNotExist, lookup, target)
            .await?;
        let narrowed = matches!(decision, GuardDecision::Proceed(t) if t != target);
        let outcome = self.apply(doc, decision)?;
        if outcome == GuardOutcome::Executed && !self.guard.force() {
            if narrowed {
                self.guard.set_flag(entity.clone(), ExistenceFlag::Exists);
            } else {
                self.guard.mark_created(entity);
            }
        }
        Ok(outcome)
    }

    /// Add a configuration step on an existing entity. Structural steps
    /// (`needs_shutdown`) also pass the shutdown gate.
    pub async fn configure(
        &mut self,
        doc: &ConfigDocument,
        target: Target,
        entity: &EntityKey,
        lookup: &ExistenceQuery,
        needs_shutdown: bool,
    ) -> Result<GuardOutcome, CoreError> {
        let decision = self
            .guard
            .check(self.cluster, entity, Precondition::MustExist, lookup, target)
            .await?;
        let decision = match decision {
            GuardDecision::Proceed(t) if needs_shutdown => match self.guard.permits_shutdown(entity) {
                GuardDecision::Proceed(_) => GuardDecision::Proceed(t),
                skip @ GuardDecision::Skip(_) => skip,
            },
            other => other,
        };
        self.apply(doc, decision)
    }

    /// Record a step that was decided without sending anything.
    pub fn skip(&mut self, doc: &ConfigDocument, outcome: GuardOutcome) {
        self.record(doc, None, outcome);
    }

    fn apply(&mut self, doc: &ConfigDocument, decision: GuardDecision) -> Result<GuardOutcome, CoreError> {
        match decision {
            GuardDecision::Proceed(target) => {
                self.push(doc, target)?;
                Ok(GuardOutcome::Executed)
            }
            GuardDecision::Skip(outcome) => {
                self.skip(doc, outcome);
                Ok(outcome)
            }
        }
    }

    fn record(&mut self, doc: &ConfigDocument, target: Option<Target>, outcome: GuardOutcome) {
        self.steps.push(StepReport {
            description: doc.description().to_owned(),
            target,
            outcome,
        });
    }

    pub fn finish(self) -> Plan {
        Plan {
            batch: self.batch,
            steps: self.steps,
        }
    }
}

// ── Plan ─────────────────────────────────────────────────────────────

/// Planned steps for one cluster, ready to send.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    batch: CommandBatch,
    steps: Vec<StepReport>,
}

impl Plan {
    pub fn batch(&self) -> &CommandBatch {
        &self.batch
    }

    pub fn commands(&self) -> impl Iterator<Item = &PreparedCommand> {
        self.batch.iter()
    }

    pub fn steps(&self) -> &[StepReport] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Send every command in order. Read-only clusters only report what
    /// would be sent.
    pub async fn execute(&self, cluster: &Cluster) -> Result<Vec<RoleReply>, CoreError> {
        if cluster.read_only() {
            info!(
                cluster = cluster.name(),
                commands = self.len(),
                "read-only mode, not applying"
            );
            return Ok(Vec::new());
        }
        let total = self.len();
        let mut replies = Vec::new();
        for (idx, cmd) in self.batch.iter().enumerate() {
            info!(
                cluster = cluster.name(),
                step = idx + 1,
                total,
                target = %cmd.target(),
                "{}",
                cmd.description()
            );
            replies.extend(cluster.rpc(cmd, false).await?);
        }
        Ok(replies)
    }
}

/// Something that can plan steps against a cluster.
#[allow(async_fn_in_trait)]
pub trait Workflow {
    /// Short label for logs and reports.
    fn label(&self) -> String;

    async fn plan_into(&self, planner: &mut Planner<'_>) -> Result<(), CoreError>;

    /// Plan this workflow on its own.
    async fn plan(&self, cluster: &Cluster, guard: &mut Guard) -> Result<Plan, CoreError> {
        let mut planner = Planner::new(cluster, guard);
        self.plan_into(&mut planner).await?;
        Ok(planner.finish())
    }
}
