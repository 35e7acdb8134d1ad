// ── ACL profile provisioning ──

use super::{Planner, Workflow};
use crate::entity::{EntityKey, EntityKind};
use crate::error::CoreError;
use crate::guard::ExistenceQuery;
use crate::routing::Target;

const ACL_PROFILE_PATH: &str = "rpc-reply.rpc.show.acl-profile.acl-profiles.acl-profile";

/// An ACL profile that allows publishing, subscribing and connecting by
/// default.
#[derive(Debug, Clone)]
pub struct AclProfileWorkflow {
    pub name: String,
    pub vpn: String,
}

impl AclProfileWorkflow {
    pub fn new(name: impl Into<String>, vpn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vpn: vpn.into(),
        }
    }

    pub fn entity(&self) -> EntityKey {
        EntityKey::new(EntityKind::AclProfile, &self.name, Some(self.vpn.as_str()))
    }
}

impl Workflow for AclProfileWorkflow {
    fn label(&self) -> String {
        format!("acl profile {} in vpn {}", self.name, self.vpn)
    }

    async fn plan_into(&self, planner: &mut Planner<'_>) -> Result<(), CoreError> {
        let (name, vpn) = (self.name.as_str(), self.vpn.as_str());
        let entity = self.entity();
        let target = Target::Both;

        let mut show = planner.document(format!("Querying acl profile {name}"));
        show.set("show.acl_profile.name", name)
            .set("show.acl_profile.vpn_name", vpn);
        let lookup = ExistenceQuery::new(&show, ACL_PROFILE_PATH, target)?;

        let mut doc = planner.document(format!("VPN {vpn} Creating ACL Profile {name}"));
        doc.set("create.acl_profile.name", name)
            .set("create.acl_profile.vpn_name", vpn);
        planner.create(&doc, target, &entity, &lookup).await?;

        for (what, section) in [
            ("publish", "publish_topic"),
            ("subscribe", "subscribe_topic"),
            ("client connect", "client_connect"),
        ] {
            let mut doc = planner.document(format!("VPN {vpn} Allowing ACL Profile {name} to {what} by default"));
            doc.set("acl_profile.name", name)
                .set("acl_profile.vpn_name", vpn)
                .flag(&format!("acl_profile.{section}.default_action.allow"));
            planner.configure(&doc, target, &entity, &lookup, false).await?;
        }
        Ok(())
    }
}
