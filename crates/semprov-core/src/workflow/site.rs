// ── Site provisioning ──
//
// Provision every VPN of a site definition into one environment: client
// profile, VPN, ACL profile, client usernames (the VPN's own user first),
// then queues.

use secrecy::SecretString;
use tracing::info;

use super::{
    AclProfileWorkflow, Planner, QueueWorkflow, UserSpec, UserWorkflow, VpnWorkflow, Workflow, client_profile_for,
};
use crate::error::CoreError;
use crate::model::{SiteDefinition, VpnDefinition};
use crate::naming::NamingStandard;

#[derive(Debug, Clone)]
pub struct SiteWorkflow {
    pub site: SiteDefinition,
    pub environment: String,
    pub naming: NamingStandard,
    /// Only VPNs owned by this owner.
    pub owner: Option<String>,
    /// Only these VPNs, by resolved name.
    pub only: Vec<String>,
}

impl SiteWorkflow {
    pub fn new(site: SiteDefinition, environment: impl Into<String>, naming: NamingStandard) -> Self {
        Self {
            site,
            environment: environment.into(),
            naming,
            owner: None,
            only: Vec::new(),
        }
    }

    pub fn vpn_name(&self, vpn: &VpnDefinition) -> String {
        self.naming.solve(&vpn.name, &self.environment)
    }

    /// VPN definitions this run covers.
    pub fn selected(&self) -> impl Iterator<Item = &VpnDefinition> {
        self.site
            .vpns_owned_by(self.owner.as_deref())
            .filter(|v| self.only.is_empty() || self.only.contains(&self.vpn_name(v)))
    }

    fn users_for(&self, vpn: &VpnDefinition, name: &str) -> Vec<UserSpec> {
        let profile = self.site.client_profile();
        let mut users = vec![
            UserSpec::new(name, SecretString::from(vpn.password.clone())).client_profile(profile),
        ];
        for user in &vpn.users {
            let mut spec = UserSpec::new(
                self.naming.solve(&user.username, &self.environment),
                SecretString::from(user.password.clone()),
            )
            .client_profile(user.client_profile.as_deref().unwrap_or(profile));
            if let Some(acl) = &user.acl_profile {
                spec = spec.acl_profile(self.naming.solve(acl, &self.environment));
            }
            users.push(spec);
        }
        users
    }

    fn queues_for(&self, vpn: &VpnDefinition, name: &str) -> QueueWorkflow {
        vpn.queue.iter().fold(QueueWorkflow::new(name), |wf, q| {
            let mut config = q.config_for(&self.environment, name);
            config.owner = self.naming.solve(&config.owner, &self.environment);
            wf.with_queue(self.naming.solve(&q.name, &self.environment), config)
        })
    }
}

impl Workflow for SiteWorkflow {
    fn label(&self) -> String {
        format!("site provisioning for {}", self.environment)
    }

    async fn plan_into(&self, planner: &mut Planner<'_>) -> Result<(), CoreError> {
        let version = planner.cluster().version().clone();
        for vpn in self.selected() {
            let name = self.vpn_name(vpn);
            info!(vpn = %name, environment = %self.environment, "provisioning vpn");

            client_profile_for(&version, self.site.client_profile(), &name)
                .plan_into(planner)
                .await?;
            VpnWorkflow::new(&name, vpn.settings_for(&self.environment))
                .plan_into(planner)
                .await?;
            AclProfileWorkflow::new(&name, &name).plan_into(planner).await?;
            UserWorkflow::new(&name, self.users_for(vpn, &name))
                .plan_into(planner)
                .await?;
            self.queues_for(vpn, &name).plan_into(planner).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SITE: &str = r#"
vpns:
  - name: "%s_testvpn"
    owner: SolaceTest
    password: d0nt_u5se_thIs
    queue:
      - name: testqueue1
        env:
          - name: pt1
            queue_config:
              owner: "%s_marcom"
    users:
      - username: "%s_marcom"
        password: secret
  - name: "%s_other"
    owner: Someone
    password: x
"#;

    fn workflow(env: &str) -> SiteWorkflow {
        SiteWorkflow::new(SiteDefinition::from_yaml(SITE).unwrap(), env, NamingStandard::Zoinks)
    }

    #[test]
    fn owner_user_comes_first() {
        let wf = workflow("dev");
        let vpn = &wf.site.vpns[0];
        let users = wf.users_for(vpn, "dev_testvpn");
        let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["dev_testvpn", "dev_marcom"]);
        assert_eq!(users[0].client_profile, "glassfish");
    }

    #[test]
    fn selection_by_owner_and_name() {
        let mut wf = workflow("dev");
        assert_eq!(wf.selected().count(), 2);
        wf.owner = Some("SolaceTest".into());
        assert_eq!(wf.selected().count(), 1);
        wf.owner = None;
        wf.only = vec!["dev_other".into()];
        let names: Vec<String> = wf.selected().map(|v| wf.vpn_name(v)).collect();
        assert_eq!(names, ["dev_other"]);
    }

    #[test]
    fn queues_take_environment_config() {
        let wf = workflow("pt1");
        let queues = wf.queues_for(&wf.site.vpns[0], "pt1_testvpn");
        let (name, config) = &queues.queues[0];
        assert_eq!(name, "testqueue1");
        assert_eq!(config.owner, "pt1_marcom");
        assert_eq!(config.queue_size, 1024);
    }
}
