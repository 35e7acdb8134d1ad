// ── Message VPN provisioning ──

use super::{Planner, Workflow};
use crate::document::ConfigDocument;
use crate::entity::EntityKey;
use crate::error::CoreError;
use crate::guard::ExistenceQuery;
use crate::model::VpnSettings;
use crate::routing::Target;

const VPN_PATH: &str = "rpc-reply.rpc.show.message-vpn.vpn";

/// Create a message VPN with internal authentication, a spool quota and a
/// log tag, then enable it.
#[derive(Debug, Clone)]
pub struct VpnWorkflow {
    pub name: String,
    pub settings: VpnSettings,
}

impl VpnWorkflow {
    pub fn new(name: impl Into<String>, settings: VpnSettings) -> Self {
        Self {
            name: name.into(),
            settings,
        }
    }

    fn vpn_doc(&self, planner: &Planner<'_>, description: String) -> ConfigDocument {
        let mut doc = planner.document(description);
        doc.set("message_vpn.vpn_name", &self.name);
        doc
    }
}

impl Workflow for VpnWorkflow {
    fn label(&self) -> String {
        format!("vpn {}", self.name)
    }

    async fn plan_into(&self, planner: &mut Planner<'_>) -> Result<(), CoreError> {
        let vpn = self.name.as_str();
        let entity = EntityKey::vpn(vpn);
        let target = Target::Both;
        let spool_size = self.settings.spool_size();
        let threshold = self.settings.large_message_threshold();

        let mut show = planner.document(format!("Querying vpn {vpn}"));
        show.set("show.message_vpn.vpn_name", vpn);
        let lookup = ExistenceQuery::new(&show, VPN_PATH, target)?;

        let mut doc = planner.document(format!("VPN Create new VPN {vpn}"));
        doc.set("create.message_vpn.vpn_name", vpn);
        planner.create(&doc, target, &entity, &lookup).await?;

        let mut doc = self.vpn_doc(planner, format!("VPN {vpn} Clearing Radius"));
        doc.flag("message_vpn.authentication.user_class.client")
            .flag("message_vpn.authentication.user_class.radius_domain.radius_domain");
        planner.configure(&doc, target, &entity, &lookup, false).await?;

        let mut doc = self.vpn_doc(planner, format!("VPN {vpn} Enable Internal Auth"));
        doc.flag("message_vpn.authentication.user_class.client")
            .flag("message_vpn.authentication.user_class.auth_type.internal");
        planner.configure(&doc, target, &entity, &lookup, false).await?;

        let mut doc = planner.document(format!("VPN {vpn} Set spool size to {spool_size}"));
        doc.set("message_spool.vpn_name", vpn)
            .set("message_spool.max_spool_usage.size", spool_size);
        planner.configure(&doc, target, &entity, &lookup, false).await?;

        let mut doc = self.vpn_doc(
            planner,
            format!("VPN {vpn} Setting large message threshold event to {threshold}"),
        );
        doc.set("message_vpn.event.large_message_threshold.size", threshold);
        planner.configure(&doc, target, &entity, &lookup, false).await?;

        let mut doc = self.vpn_doc(planner, format!("VPN {vpn} Setting logging tag to {vpn}"));
        doc.set("message_vpn.event.log_tag.tag_string", vpn);
        planner.configure(&doc, target, &entity, &lookup, false).await?;

        let mut doc = self.vpn_doc(planner, format!("VPN {vpn} Enabling the vpn"));
        doc.flag("message_vpn.no.shutdown");
        planner.configure(&doc, target, &entity, &lookup, false).await?;
        Ok(())
    }
}
