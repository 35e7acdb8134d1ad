//! Client username command handlers.

use tabled::Tabled;

use semprov_core::{Cluster, DeleteUsers, ShutdownMode, UserSpec, UserSummary, UserWorkflow};

use crate::cli::{GlobalOpts, UserArgs, UserCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "Appliance")]
    role: String,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Client Profile")]
    client_profile: String,
    #[tabled(rename = "ACL Profile")]
    acl_profile: String,
}

impl From<&UserSummary> for UserRow {
    fn from(u: &UserSummary) -> Self {
        Self {
            role: u.role.to_string(),
            username: u.username.clone(),
            enabled: if u.enabled { "yes" } else { "no" }.into(),
            client_profile: u.client_profile.clone().unwrap_or_else(|| "-".into()),
            acl_profile: u.acl_profile.clone().unwrap_or_else(|| "-".into()),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(cluster: &Cluster, args: &UserArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match &args.command {
        UserCommand::List { vpn, filter } => {
            let users = cluster.list_users(vpn, filter).await?;
            let out = output::render_list(&global.output, &users, |u| UserRow::from(u), |u| {
                format!("{}\t{}", u.role, u.username)
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UserCommand::Create {
            vpn,
            username,
            password,
            client_profile,
            acl_profile,
            shutdown,
        } => {
            let password = util::secret(password.as_deref(), &format!("Password for {username}: "))?;
            let mut spec = UserSpec::new(username, password).client_profile(client_profile);
            if let Some(acl) = acl_profile {
                spec = spec.acl_profile(acl);
            }
            let wf = UserWorkflow::new(vpn, vec![spec]);
            util::apply(cluster, &wf, *shutdown, global, false).await
        }

        UserCommand::Delete { vpn, users, remove } => {
            let wf = DeleteUsers {
                vpn: vpn.clone(),
                users: users.clone(),
                remove: *remove,
            };
            util::apply(cluster, &wf, ShutdownMode::Off, global, true).await
        }
    }
}
