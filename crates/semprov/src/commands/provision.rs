//! Site provisioning handler.

use std::path::Path;

use tracing::info;

use semprov_config::Settings;
use semprov_core::{Cluster, SiteDefinition, SiteWorkflow};

use crate::cli::{GlobalOpts, ProvisionArgs};
use crate::error::CliError;

use super::util;

fn read_site(path: &Path) -> Result<SiteDefinition, CliError> {
    let site_error = |reason: String| CliError::Site {
        path: path.display().to_string(),
        reason,
    };
    let text = std::fs::read_to_string(path).map_err(|e| site_error(e.to_string()))?;
    SiteDefinition::from_yaml(&text).map_err(|e| site_error(e.to_string()))
}

pub async fn handle(
    cluster: &Cluster,
    settings: &Settings,
    args: &ProvisionArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let site = read_site(&args.site)?;
    let mut wf = SiteWorkflow::new(site, cluster.name(), settings.naming()?);
    wf.owner.clone_from(&args.owner);
    wf.only.clone_from(&args.vpns);

    let selected: Vec<String> = wf.selected().map(|v| wf.vpn_name(v)).collect();
    if selected.is_empty() {
        return Err(CliError::NotFound {
            entity: format!("VPNs matching the selection in {}", args.site.display()),
        });
    }
    info!(environment = cluster.name(), vpns = ?selected, "provisioning site");

    util::apply(cluster, &wf, args.shutdown, global, false).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn unreadable_site_names_the_file() {
        let err = read_site(Path::new("/nonexistent/site.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/site.yaml"));
    }

    #[test]
    fn site_yaml_is_parsed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "vpns:\n  - name: '%s_testvpn'\n    password: secret\n    queue:\n      - name: testqueue1\n"
        )
        .unwrap();
        let site = read_site(file.path()).unwrap();
        assert_eq!(site.vpns.len(), 1);
        assert_eq!(site.vpns[0].queue[0].name, "testqueue1");
    }
}
