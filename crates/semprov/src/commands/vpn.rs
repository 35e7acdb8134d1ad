//! Message VPN command handlers.

use semprov_core::{Cluster, DeleteVpn, ShutdownMode, VpnSettings, VpnWorkflow};

use crate::cli::{GlobalOpts, VpnArgs, VpnCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(tabled::Tabled)]
struct VpnRow {
    #[tabled(rename = "VPN")]
    name: String,
}

pub async fn handle(cluster: &Cluster, args: &VpnArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match &args.command {
        VpnCommand::List { filter } => {
            let vpns = cluster.list_vpns(filter).await?;
            let out = output::render_list(
                &global.output,
                &vpns,
                |v| VpnRow { name: v.clone() },
                Clone::clone,
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        VpnCommand::Create {
            vpn,
            spool_size,
            large_message_threshold,
        } => {
            let settings = VpnSettings {
                spool_size: *spool_size,
                large_message_threshold: *large_message_threshold,
            };
            util::apply(cluster, &VpnWorkflow::new(vpn, settings), ShutdownMode::Off, global, false).await
        }

        VpnCommand::Delete { vpn } => {
            let wf = DeleteVpn { vpn: vpn.clone() };
            util::apply(cluster, &wf, ShutdownMode::Off, global, true).await
        }
    }
}
