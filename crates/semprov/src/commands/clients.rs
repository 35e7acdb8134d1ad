//! Connected client listing.

use tabled::Tabled;

use semprov_core::{ClientSummary, Cluster};

use crate::cli::{ClientsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "Client")]
    name: String,
    #[tabled(rename = "Username")]
    client_username: String,
    #[tabled(rename = "VPN")]
    vpn: String,
    #[tabled(rename = "Address")]
    address: String,
}

impl From<&ClientSummary> for ClientRow {
    fn from(c: &ClientSummary) -> Self {
        Self {
            name: c.name.clone(),
            client_username: c.client_username.clone(),
            vpn: c.vpn.clone().unwrap_or_else(|| "-".into()),
            address: c.address.clone().unwrap_or_else(|| "-".into()),
        }
    }
}

pub async fn handle(cluster: &Cluster, args: &ClientsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let clients = cluster.list_clients(&args.vpn, &args.filter).await?;
    let out = output::render_list(&global.output, &clients, |c| ClientRow::from(c), |c| c.name.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
