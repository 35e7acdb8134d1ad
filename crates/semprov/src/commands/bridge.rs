//! VPN bridging between two environments.

use serde::Serialize;
use tabled::Tabled;

use semprov_config::Settings;
use semprov_core::BridgeWorkflow;

use crate::cli::{BridgeArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Clone, Serialize, Tabled)]
struct BridgeRow {
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Step")]
    description: String,
    #[tabled(rename = "Target")]
    target: String,
}

pub async fn handle(settings: &Settings, args: &BridgeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if args.local == args.remote {
        return Err(CliError::Validation {
            field: "remote".into(),
            reason: "local and remote environments must differ".into(),
        });
    }

    let local = util::connect(settings, &args.local, global).await?;
    let remote = util::connect(settings, &args.remote, global).await?;

    let password = util::secret(args.password.as_deref(), "Bridge client username password: ")?;
    let mut wf = BridgeWorkflow::new(args.vpns.clone(), &args.remote_addr, password);
    wf.phys_intf.clone_from(&args.phys_intf);
    wf.node.clone_from(&args.node);

    let plan = wf.plan(&local, &remote)?;
    let rows: Vec<BridgeRow> = plan
        .steps()
        .iter()
        .map(|s| BridgeRow {
            side: s.side.to_string(),
            description: s.command.description().to_owned(),
            target: s.command.target().to_string(),
        })
        .collect();
    let out = output::render_list(&global.output, &rows, Clone::clone, |r| r.description.clone());
    output::print_output(&out, global.quiet);

    if local.read_only() || remote.read_only() {
        util::summary(global, &format!("bridge: testmode, {} command(s) not sent", plan.len()));
        return Ok(());
    }

    plan.execute(&local, &remote).await?;
    util::summary(
        global,
        &format!("bridge {} <-> {}: {} command(s) sent", args.local, args.remote, plan.len()),
    );
    Ok(())
}
