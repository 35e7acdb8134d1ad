// ── Existence and shutdown guards ──
//
// A `Guard` decides whether a mutating step may run. It looks at remote
// state through an `ExistenceQuery`, remembers what it learned per entity
// for the rest of the run, and gates structural changes on live objects
// behind the shutdown mode. Skipping is an outcome, never an error.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dispatcher::Cluster;
use crate::document::{ConfigDocument, PreparedCommand};
use crate::entity::{EntityKey, EntityKind};
use crate::error::CoreError;
use crate::routing::{Role, Target};
use crate::schema::SchemaValidationError;

// ── Flags and modes ──────────────────────────────────────────────────

/// What the run knows about an entity's existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistenceFlag {
    #[default]
    Unknown,
    Exists,
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    MustExist,
    MustNotExist,
}

/// Which entity classes may be shut down to apply structural changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownMode {
    #[default]
    Off,
    Queue,
    User,
    Both,
}

impl ShutdownMode {
    pub fn covers(self, kind: EntityKind) -> bool {
        match self {
            Self::Off => false,
            Self::Both => true,
            Self::Queue => kind == EntityKind::Queue,
            Self::User => kind == EntityKind::ClientUsername,
        }
    }
}

impl FromStr for ShutdownMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "off" | "false" | "no" | "none" => Ok(Self::Off),
            "q" | "queue" => Ok(Self::Queue),
            "u" | "user" => Ok(Self::User),
            "b" | "both" | "true" => Ok(Self::Both),
            other => Err(format!(
                "invalid shutdown mode '{other}' (expected off, q, u, b or true)"
            )),
        }
    }
}

impl fmt::Display for ShutdownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::Queue => "queue",
            Self::User => "user",
            Self::Both => "both",
        })
    }
}

/// Result of a guarded step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuardOutcome {
    Executed,
    SkippedExists,
    SkippedNotFound,
    SkippedNotShutdown,
    SkippedInUse,
}

impl GuardOutcome {
    pub fn is_skip(self) -> bool {
        self != Self::Executed
    }
}

impl fmt::Display for GuardOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Executed => "executed",
            Self::SkippedExists => "skipped (exists)",
            Self::SkippedNotFound => "skipped (not found)",
            Self::SkippedNotShutdown => "skipped (not shut down)",
            Self::SkippedInUse => "skipped (in use)",
        })
    }
}

/// Whether to send a step, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed(Target),
    Skip(GuardOutcome),
}

// ── Query ────────────────────────────────────────────────────────────

/// A getter plus the rooted reply path whose presence means "exists".
#[derive(Debug, Clone)]
pub struct ExistenceQuery {
    query: PreparedCommand,
    path: String,
}

impl ExistenceQuery {
    pub fn new(
        query: &ConfigDocument,
        path: impl Into<String>,
        target: Target,
    ) -> Result<Self, SchemaValidationError> {
        Ok(Self {
            query: query.prepare(target)?,
            path: path.into(),
        })
    }

    pub fn query(&self) -> &PreparedCommand {
        &self.query
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn target(&self) -> Target {
        self.query.target()
    }

    /// Query the cluster and report which of the queried sides hold the
    /// object.
    async fn sides(&self, cluster: &Cluster) -> Result<Presence, CoreError> {
        let replies = cluster.rpc(&self.query, true).await?;
        let mut presence = Presence::default();
        for reply in &replies {
            if reply.reply.contains(&self.path) {
                presence.present.push(reply.role);
            } else {
                presence.absent.push(reply.role);
            }
        }
        Ok(presence)
    }
}

#[derive(Debug, Default)]
struct Presence {
    present: Vec<Role>,
    absent: Vec<Role>,
}

// ── Guard ────────────────────────────────────────────────────────────

/// Per-run existence cache and gating policy.
#[derive(Debug, Default)]
pub struct Guard {
    force: bool,
    shutdown: ShutdownMode,
    flags: HashMap<EntityKey, ExistenceFlag>,
    created: HashSet<EntityKey>,
}

impl Guard {
    pub fn new(force: bool, shutdown: ShutdownMode) -> Self {
        Self {
            force,
            shutdown,
            ..Self::default()
        }
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn shutdown_mode(&self) -> ShutdownMode {
        self.shutdown
    }

    pub fn flag(&self, entity: &EntityKey) -> ExistenceFlag {
        self.flags.get(entity).copied().unwrap_or_default()
    }

    pub fn set_flag(&mut self, entity: EntityKey, flag: ExistenceFlag) {
        self.flags.insert(entity, flag);
    }

    /// Record that this run sent the creation of `entity`.
    pub fn mark_created(&mut self, entity: &EntityKey) {
        self.flags.insert(entity.clone(), ExistenceFlag::Exists);
        self.created.insert(entity.clone());
    }

    /// Whether `entity` was created earlier in this run.
    pub fn created(&self, entity: &EntityKey) -> bool {
        self.created.contains(entity)
    }

    /// Existence check for a step aimed at `target`.
    ///
    /// Forced runs proceed without a query. A known cached flag decides
    /// without a query. Otherwise the lookup runs; the entity exists when
    /// every queried side holds it. A `MustNotExist` step is narrowed to
    /// the sides where the entity is missing.
    pub async fn check(
        &mut self,
        cluster: &Cluster,
        entity: &EntityKey,
        precondition: Precondition,
        lookup: &ExistenceQuery,
        target: Target,
    ) -> Result<GuardDecision, CoreError> {
        if self.force {
            debug!(%entity, "forced, skipping existence check");
            self.flags.insert(entity.clone(), ExistenceFlag::Exists);
            return Ok(GuardDecision::Proceed(target));
        }

        match (self.flag(entity), precondition) {
            (ExistenceFlag::Exists, Precondition::MustExist)
            | (ExistenceFlag::Absent, Precondition::MustNotExist) => {
                debug!(%entity, "cache hit");
                return Ok(GuardDecision::Proceed(target));
            }
            (ExistenceFlag::Exists, Precondition::MustNotExist) => {
                info!(%entity, "already exists, skipping");
                return Ok(GuardDecision::Skip(GuardOutcome::SkippedExists));
            }
            (ExistenceFlag::Absent, Precondition::MustExist) => {
                info!(%entity, "not found, skipping");
                return Ok(GuardDecision::Skip(GuardOutcome::SkippedNotFound));
            }
            (ExistenceFlag::Unknown, _) => debug!(%entity, path = lookup.path(), "cache miss"),
        }

        let presence = lookup.sides(cluster).await?;
        let exists = presence.absent.is_empty() && !presence.present.is_empty();
        self.flags.insert(
            entity.clone(),
            if exists {
                ExistenceFlag::Exists
            } else {
                ExistenceFlag::Absent
            },
        );

        match precondition {
            Precondition::MustExist if exists => Ok(GuardDecision::Proceed(target)),
            Precondition::MustExist => {
                info!(%entity, missing = ?presence.absent, "not found, skipping");
                Ok(GuardDecision::Skip(GuardOutcome::SkippedNotFound))
            }
            Precondition::MustNotExist if exists => {
                info!(%entity, "already exists, skipping");
                Ok(GuardDecision::Skip(GuardOutcome::SkippedExists))
            }
            Precondition::MustNotExist => {
                let narrowed = if presence.present.is_empty() {
                    Some(target)
                } else {
                    target.restrict(&presence.absent)
                };
                match narrowed {
                    Some(t) => {
                        if t != target {
                            info!(%entity, target = %t, "missing on one side only");
                        }
                        Ok(GuardDecision::Proceed(t))
                    }
                    None => Ok(GuardDecision::Skip(GuardOutcome::SkippedExists)),
                }
            }
        }
    }

    /// Shutdown check for a structural step on `entity`.
    ///
    /// Proceeds when forced, when the entity is new in this run, or when
    /// the shutdown mode covers its class.
    pub fn permits_shutdown(&self, entity: &EntityKey) -> GuardDecision {
        if self.force || self.created(entity) || self.shutdown.covers(entity.kind) {
            return GuardDecision::Proceed(Target::Both);
        }
        warn!(
            %entity,
            mode = %self.shutdown,
            "change requires shutdown and shutdown mode does not cover it, skipping"
        );
        GuardDecision::Skip(GuardOutcome::SkippedNotShutdown)
    }
}
