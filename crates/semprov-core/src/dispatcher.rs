// ── Dual-appliance dispatcher ──
//
// A `Cluster` holds the clients for one primary/backup pair. Roles are
// resolved on connect from live message-spool state, and every prepared
// command is routed to one or both sides sequentially.

use semprov_api::{ApplianceClient, RawReply, Reply};
use tracing::{debug, info, warn};

use crate::config::ClusterConfig;
use crate::document::{ConfigDocument, PreparedCommand};
use crate::error::CoreError;
use crate::routing::{Role, Target};
use crate::version::SempVersion;

const SPOOL_STATUS_PATH: &str =
    "rpc-reply.rpc.show.message-spool.message-spool-info.operational-status";
const ACTIVE: &str = "AD-Active";

/// A parsed reply tagged with the role of the appliance that sent it.
#[derive(Debug, Clone)]
pub struct RoleReply {
    pub role: Role,
    pub reply: Reply,
}

/// One primary/backup appliance pair with resolved roles.
pub struct Cluster {
    name: String,
    primary: ApplianceClient,
    backup: Option<ApplianceClient>,
    version: SempVersion,
    read_only: bool,
}

impl std::fmt::Debug for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cluster")
            .field("name", &self.name)
            .field("primary", &self.primary.host())
            .field("backup", &self.backup.as_ref().map(ApplianceClient::host))
            .field("version", &self.version)
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl Cluster {
    // ── Connection ───────────────────────────────────────────────────

    /// Build clients for every configured endpoint, resolve roles, and
    /// settle the protocol version.
    pub async fn connect(config: &ClusterConfig) -> Result<Self, CoreError> {
        let transport = config.transport()?;
        let clients = config
            .endpoints
            .iter()
            .map(|url| {
                transport.appliance(
                    url.clone(),
                    config.credentials.username.as_str(),
                    config.credentials.password.clone(),
                )
            })
            .collect::<Vec<_>>();

        Self::from_clients(&config.name, clients, config.version.clone(), config.read_only).await
    }

    /// Resolve roles across pre-built clients, in configured order.
    ///
    /// The appliance reporting an active message spool becomes primary and
    /// the other configured appliance becomes backup. A single client gives
    /// a cluster without a backup.
    pub async fn from_clients(
        name: &str,
        mut clients: Vec<ApplianceClient>,
        version: Option<SempVersion>,
        read_only: bool,
    ) -> Result<Self, CoreError> {
        if clients.is_empty() || clients.len() > 2 {
            return Err(CoreError::Config {
                message: format!(
                    "environment '{name}' needs one or two appliance endpoints, found {}",
                    clients.len()
                ),
            });
        }

        let mut lookup = ConfigDocument::new("Detecting appliance roles", &SempVersion::default());
        lookup.flag("show.message_spool");
        let lookup = lookup.prepare(Target::Both)?;

        let mut primary_idx: Option<usize> = None;
        for (idx, client) in clients.iter().enumerate() {
            let reply = exchange(client, &lookup, read_only, false).await?;
            let status = reply.as_ref().and_then(|r| r.text(SPOOL_STATUS_PATH));
            info!(host = %client.host(), status = status.unwrap_or("<none>"), "message spool status");

            if status == Some(ACTIVE) {
                if let Some(first) = primary_idx {
                    return Err(CoreError::MultiplePrimaries {
                        cluster: name.to_owned(),
                        first: clients[first].host(),
                        second: client.host(),
                    });
                }
                primary_idx = Some(idx);
            }
        }

        let Some(primary_idx) = primary_idx else {
            return Err(CoreError::RoleDetection {
                cluster: name.to_owned(),
                reason: "failed to detect primary/backup".into(),
            });
        };

        let primary = clients.remove(primary_idx);
        let backup = clients.pop();
        debug!(
            primary = %primary.host(),
            backup = ?backup.as_ref().map(ApplianceClient::host),
            "resolved appliance roles"
        );

        let mut cluster = Self {
            name: name.to_owned(),
            primary,
            backup,
            version: version.clone().unwrap_or_default(),
            read_only,
        };

        match version {
            Some(v) => info!(version = %v, "using configured protocol version"),
            None => {
                cluster.version = cluster.detect_version().await?;
                info!(version = %cluster.version, "detected protocol version");
            }
        }
        Ok(cluster)
    }

    async fn detect_version(&self) -> Result<SempVersion, CoreError> {
        let mut doc = ConfigDocument::new("Getting version", &SempVersion::default());
        doc.flag("show.version");
        let cmd = doc.prepare(Target::PrimaryOnly)?;
        let host = self.primary.host();
        let reply = exchange(&self.primary, &cmd, self.read_only, false)
            .await?
            .ok_or_else(|| CoreError::PermissionDenied {
                host: host.clone(),
                detail: "cannot read version".into(),
            })?;
        reply
            .semp_version()
            .map(SempVersion::new)
            .ok_or(CoreError::ApplianceParseError {
                host,
                detail: "reply carries no semp-version".into(),
            })
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &SempVersion {
        &self.version
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn primary_host(&self) -> String {
        self.primary.host()
    }

    pub fn backup_host(&self) -> Option<String> {
        self.backup.as_ref().map(ApplianceClient::host)
    }

    pub fn has_backup(&self) -> bool {
        self.backup.is_some()
    }

    /// Start a document stamped with this cluster's protocol version.
    pub fn document(&self, description: impl Into<String>) -> ConfigDocument {
        ConfigDocument::new(description, &self.version)
    }

    /// Sides a target resolves to. `Both` on a cluster without a backup is
    /// the primary alone.
    fn appliances(&self, target: Target) -> Result<Vec<(Role, &ApplianceClient)>, CoreError> {
        let mut out = Vec::with_capacity(2);
        for role in target.roles() {
            match role {
                Role::Primary => out.push((Role::Primary, &self.primary)),
                Role::Backup => match &self.backup {
                    Some(backup) => out.push((Role::Backup, backup)),
                    None if target == Target::BackupOnly => {
                        return Err(CoreError::NoBackup {
                            cluster: self.name.clone(),
                        });
                    }
                    None => {}
                },
            }
        }
        Ok(out)
    }

    /// Roles present in this cluster, primary first.
    pub fn roles(&self) -> &'static [Role] {
        if self.has_backup() {
            &[Role::Primary, Role::Backup]
        } else {
            &[Role::Primary]
        }
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    /// POST a prepared command to every side its target names.
    ///
    /// Requests are sequential, primary first. Any network failure aborts
    /// the whole submission.
    pub async fn submit(&self, cmd: &PreparedCommand) -> Result<Vec<(Role, RawReply)>, CoreError> {
        let mut out = Vec::with_capacity(2);
        for (role, client) in self.appliances(cmd.target())? {
            debug!(host = %client.host(), %role, description = cmd.description(), "submitting");
            let raw = client.post_xml(cmd.xml()).await?;
            out.push((role, raw));
        }
        Ok(out)
    }

    /// Submit a command and interpret every reply.
    ///
    /// A `parse-error` fails the call. A `permission-error` fails it too,
    /// except in read-only mode where that reply is dropped. A non-ok
    /// `execute-result` is logged and returned. With `allow_fail` replies
    /// are returned without those checks.
    pub async fn rpc(&self, cmd: &PreparedCommand, allow_fail: bool) -> Result<Vec<RoleReply>, CoreError> {
        let raws = self.submit(cmd).await?;
        let mut out = Vec::with_capacity(raws.len());
        for (role, raw) in raws {
            if let Some(reply) = interpret(&raw, cmd, self.read_only, allow_fail)? {
                out.push(RoleReply { role, reply });
            }
        }
        Ok(out)
    }

    /// Prepare a document for `target` and run it through [`rpc`](Self::rpc).
    pub async fn run(&self, doc: &ConfigDocument, target: Target) -> Result<Vec<RoleReply>, CoreError> {
        let cmd = doc.prepare(target)?;
        self.rpc(&cmd, false).await
    }
}

// ── Reply handling ───────────────────────────────────────────────────

async fn exchange(
    client: &ApplianceClient,
    cmd: &PreparedCommand,
    read_only: bool,
    allow_fail: bool,
) -> Result<Option<Reply>, CoreError> {
    debug!(host = %client.host(), description = cmd.description(), "submitting");
    let raw = client.post_xml(cmd.xml()).await?;
    interpret(&raw, cmd, read_only, allow_fail)
}

fn interpret(
    raw: &RawReply,
    cmd: &PreparedCommand,
    read_only: bool,
    allow_fail: bool,
) -> Result<Option<Reply>, CoreError> {
    let reply = match Reply::parse(&raw.host, &raw.body) {
        Ok(reply) => reply,
        Err(_) if !(200..300).contains(&raw.status) => {
            return Err(CoreError::HttpStatus {
                host: raw.host.clone(),
                status: raw.status,
            });
        }
        Err(e) => return Err(e.into()),
    };

    match reply.execute_result() {
        Some(result) if !result.is_ok() => warn!(
            host = %raw.host,
            code = %result.code,
            reason = result.reason.as_deref().unwrap_or(""),
            description = cmd.description(),
            "appliance reported failure"
        ),
        Some(result) => debug!(host = %raw.host, code = %result.code, "execute-result"),
        None => debug!(host = %raw.host, "no execute-result in reply"),
    }

    if allow_fail {
        return Ok(Some(reply));
    }
    if let Some(detail) = reply.parse_error() {
        return Err(CoreError::ApplianceParseError {
            host: raw.host.clone(),
            detail,
        });
    }
    if let Some(detail) = reply.permission_error() {
        if read_only {
            debug!(host = %raw.host, %detail, "permission error tolerated in read-only mode");
            return Ok(None);
        }
        return Err(CoreError::PermissionDenied {
            host: raw.host.clone(),
            detail,
        });
    }
    Ok(Some(reply))
}
