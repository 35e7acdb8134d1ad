//! Role, spool and redundancy state of each appliance.

use serde::Serialize;
use tabled::Tabled;

use semprov_core::{Cluster, Role, RoleReply};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

const SPOOL_STATUS: &str = "rpc-reply.rpc.show.message-spool.message-spool-info.operational-status";
const REDUNDANCY_STATUS: &str = "rpc-reply.rpc.show.redundancy.redundancy-status";
const ACTIVITY_STATUS: &str = "rpc-reply.rpc.show.redundancy.active-standby-role";

#[derive(Clone, Serialize, Tabled)]
struct StatusRow {
    #[tabled(rename = "Environment")]
    environment: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Spool")]
    spool: String,
    #[tabled(rename = "Redundancy")]
    redundancy: String,
    #[tabled(rename = "SEMP")]
    version: String,
}

fn text_for(replies: &[RoleReply], role: Role, path: &str) -> String {
    replies
        .iter()
        .find(|r| r.role == role)
        .and_then(|r| r.reply.text(path))
        .unwrap_or("-")
        .to_owned()
}

pub async fn handle(cluster: &Cluster, global: &GlobalOpts) -> Result<(), CliError> {
    let spool = cluster.message_spool().await?;
    let redundancy = cluster.redundancy().await?;

    let rows: Vec<StatusRow> = cluster
        .roles()
        .iter()
        .map(|&role| {
            let host = match role {
                Role::Primary => cluster.primary_host(),
                Role::Backup => cluster.backup_host().unwrap_or_default(),
            };
            let state = text_for(&redundancy, role, REDUNDANCY_STATUS);
            let activity = text_for(&redundancy, role, ACTIVITY_STATUS);
            StatusRow {
                environment: cluster.name().to_owned(),
                role: role.to_string(),
                host,
                spool: text_for(&spool, role, SPOOL_STATUS),
                redundancy: if activity == "-" { state } else { format!("{state} ({activity})") },
                version: cluster.version().to_string(),
            }
        })
        .collect();

    let out = output::render_list(&global.output, &rows, Clone::clone, |r| {
        format!("{}\t{}\t{}", r.environment, r.role, r.host)
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
