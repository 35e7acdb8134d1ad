//! Client profile command handlers.

use semprov_core::{Cluster, DeleteClientProfile, ShutdownMode, client_profile_for};

use crate::cli::{GlobalOpts, ProfileArgs, ProfileCommand};
use crate::error::CliError;

use super::util;

pub async fn handle(cluster: &Cluster, args: &ProfileArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match &args.command {
        ProfileCommand::Create {
            name,
            vpn,
            max_clients,
            bridging,
        } => {
            // Profiles are global before soltr/7_1_1, per VPN after.
            let mut wf = client_profile_for(cluster.version(), name, vpn).allow_bridging(*bridging);
            if let Some(max) = max_clients {
                wf = wf.max_connections(*max);
            }
            util::apply(cluster, &wf, ShutdownMode::Off, global, false).await
        }

        ProfileCommand::Delete { name, vpn } => {
            let scope = client_profile_for(cluster.version(), name, vpn).scope;
            let wf = DeleteClientProfile {
                name: name.clone(),
                scope,
            };
            util::apply(cluster, &wf, ShutdownMode::Off, global, true).await
        }
    }
}
