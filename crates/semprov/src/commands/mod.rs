//! Command dispatch: bridges CLI args -> core workflows -> output formatting.

pub mod acl;
pub mod bridge;
pub mod clients;
pub mod config_cmd;
pub mod metrics;
pub mod profile;
pub mod provision;
pub mod queue;
pub mod status;
pub mod user;
pub mod util;
pub mod vpn;

use semprov_config::Settings;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an appliance-bound command.
///
/// Bridging pairs two named environments itself. Every other command runs
/// once per environment given with `-e`, in order, stopping at the first
/// failure.
pub async fn dispatch(cmd: &Command, settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    if let Command::Bridge(args) = cmd {
        return bridge::handle(settings, args, global).await;
    }

    for env in util::environments(global)? {
        let cluster = util::connect(settings, env, global).await?;
        match cmd {
            Command::Provision(args) => provision::handle(&cluster, settings, args, global).await?,
            Command::Queue(args) => queue::handle(&cluster, args, global).await?,
            Command::User(args) => user::handle(&cluster, args, global).await?,
            Command::Vpn(args) => vpn::handle(&cluster, args, global).await?,
            Command::Profile(args) => profile::handle(&cluster, args, global).await?,
            Command::Acl(args) => acl::handle(&cluster, args, global).await?,
            Command::Clients(args) => clients::handle(&cluster, args, global).await?,
            Command::Metrics(args) => metrics::handle(&cluster, settings, env, args, global).await?,
            Command::Status => status::handle(&cluster, global).await?,
            // Bridge, Config and Completions are handled before the loop
            Command::Bridge(_) | Command::Config(_) | Command::Completions(_) => unreachable!(),
        }
    }
    Ok(())
}
