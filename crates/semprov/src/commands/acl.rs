//! ACL profile command handlers.

use semprov_core::{AclProfileWorkflow, Cluster, DeleteAclProfile, ShutdownMode};

use crate::cli::{AclArgs, AclCommand, GlobalOpts};
use crate::error::CliError;

use super::util;

pub async fn handle(cluster: &Cluster, args: &AclArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match &args.command {
        AclCommand::Create { name, vpn } => {
            let name = name.as_deref().unwrap_or(vpn);
            util::apply(cluster, &AclProfileWorkflow::new(name, vpn), ShutdownMode::Off, global, false).await
        }

        AclCommand::Delete { name, vpn } => {
            let wf = DeleteAclProfile {
                name: name.clone().unwrap_or_else(|| vpn.clone()),
                vpn: vpn.clone(),
            };
            util::apply(cluster, &wf, ShutdownMode::Off, global, true).await
        }
    }
}
