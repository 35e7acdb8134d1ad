// semprov-core: Document building, validation, dual-appliance dispatch and provisioning workflows.

pub mod batch;
pub mod config;
pub mod dispatcher;
pub mod document;
pub mod entity;
pub mod error;
pub mod guard;
pub mod model;
pub mod naming;
pub mod query;
pub mod routing;
pub mod schema;
pub mod version;
pub mod workflow;

// ── Primary re-exports ──────────────────────────────────────────────
pub use batch::CommandBatch;
pub use config::{ClusterConfig, Credentials, TlsVerification};
pub use dispatcher::{Cluster, RoleReply};
pub use document::{ConfigDocument, PreparedCommand};
pub use entity::{EntityKey, EntityKind};
pub use error::CoreError;
pub use guard::{ExistenceFlag, ExistenceQuery, Guard, GuardDecision, GuardOutcome, Precondition, ShutdownMode};
pub use naming::NamingStandard;
pub use routing::{Role, Target};
pub use schema::{SchemaValidationError, Violation};
pub use version::SempVersion;

pub use model::{
    DEFAULT_CLIENT_PROFILE, QueueConfig, QueueDefinition, QueuePermission, QueueSettings, SiteDefinition, UserDefinition,
    VpnDefinition, VpnSettings,
};
pub use query::{ClientSummary, MetricSample, QueueSummary, StatsKind, UserSummary};
pub use workflow::{
    AclProfileWorkflow, BridgePlan, BridgeSide, BridgeWorkflow, ClientProfileWorkflow, DeleteAclProfile,
    DeleteClientProfile, DeleteQueues, DeleteUsers, DeleteVpn, Plan, Planner, ProfileScope, PurgeQueues, QueueWorkflow,
    SetQueuePermission, SiteWorkflow, StepReport, UserSpec, UserWorkflow, VpnWorkflow, Workflow, client_profile_for,
};
