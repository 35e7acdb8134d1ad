// ── Client profile provisioning ──
//
// Client profiles are global on 6.0 appliances and scoped to a VPN from
// 6.2 on. `client_profile_for` picks the scope from the protocol version.

use super::{Planner, Workflow};
use crate::document::ConfigDocument;
use crate::entity::{EntityKey, EntityKind};
use crate::error::CoreError;
use crate::guard::ExistenceQuery;
use crate::routing::Target;
use crate::version::SempVersion;

const PROFILE_PATH: &str = "rpc-reply.rpc.show.client-profile.profiles.profile";

/// Default `max-connections-per-client-username` when a limit is requested.
pub const DEFAULT_MAX_CLIENTS: u32 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileScope {
    Global,
    Vpn(String),
}

impl ProfileScope {
    pub fn vpn(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Vpn(vpn) => Some(vpn),
        }
    }
}

pub(crate) fn profile_key(name: &str, vpn: Option<&str>) -> EntityKey {
    EntityKey::new(EntityKind::ClientProfile, name, vpn)
}

/// Set the profile's key elements (`name`, and `vpn-name` when scoped)
/// under `prefix`.
pub(crate) fn set_profile_keys(doc: &mut ConfigDocument, prefix: &str, name: &str, scope: &ProfileScope) {
    doc.set(&format!("{prefix}.name"), name);
    if let Some(vpn) = scope.vpn() {
        doc.set(&format!("{prefix}.vpn_name"), vpn);
    }
}

#[derive(Debug, Clone)]
pub struct ClientProfileWorkflow {
    pub name: String,
    pub scope: ProfileScope,
    pub max_connections: Option<u32>,
    pub allow_bridging: bool,
}

/// The client profile workflow for a protocol version.
pub fn client_profile_for(version: &SempVersion, name: impl Into<String>, vpn: &str) -> ClientProfileWorkflow {
    let scope = if version.vpn_scoped_client_profiles() {
        ProfileScope::Vpn(vpn.to_owned())
    } else {
        ProfileScope::Global
    };
    ClientProfileWorkflow {
        name: name.into(),
        scope,
        max_connections: None,
        allow_bridging: false,
    }
}

impl ClientProfileWorkflow {
    #[must_use]
    pub fn max_connections(mut self, value: u32) -> Self {
        self.max_connections = Some(value);
        self
    }

    #[must_use]
    pub fn allow_bridging(mut self, allow: bool) -> Self {
        self.allow_bridging = allow;
        self
    }

    pub fn entity(&self) -> EntityKey {
        profile_key(&self.name, self.scope.vpn())
    }

    fn profile_doc(&self, planner: &Planner<'_>, description: &str) -> ConfigDocument {
        let mut doc = planner.document(description);
        set_profile_keys(&mut doc, "client_profile", &self.name, &self.scope);
        doc
    }
}

impl Workflow for ClientProfileWorkflow {
    fn label(&self) -> String {
        format!("client profile {}", self.name)
    }

    async fn plan_into(&self, planner: &mut Planner<'_>) -> Result<(), CoreError> {
        let entity = self.entity();
        let target = Target::Both;

        let mut show = planner.document(format!("Querying client profile {}", self.name));
        set_profile_keys(&mut show, "show.client_profile", &self.name, &self.scope);
        let lookup = ExistenceQuery::new(&show, PROFILE_PATH, target)?;

        let mut doc = planner.document(format!("Creating client profile {}", self.name));
        set_profile_keys(&mut doc, "create.client_profile", &self.name, &self.scope);
        planner.create(&doc, target, &entity, &lookup).await?;

        for (description, flag) in [
            ("Allow profile consume", "allow_guaranteed_message_receive"),
            ("Allow profile send", "allow_guaranteed_message_send"),
            ("Allow profile endpoint create", "allow_guaranteed_endpoint_create"),
            ("Allow profile transacted sessions", "allow_transacted_sessions"),
        ] {
            let mut doc = self.profile_doc(planner, description);
            doc.flag(&format!("client_profile.message_spool.{flag}"));
            planner.configure(&doc, target, &entity, &lookup, false).await?;
        }

        if let Some(max) = self.max_connections {
            let mut doc = self.profile_doc(planner, "Setting max clients");
            doc.set("client_profile.max_connections_per_client_username.value", max);
            planner.configure(&doc, target, &entity, &lookup, false).await?;
        }

        if self.allow_bridging {
            let mut doc = self.profile_doc(planner, "Setting bridging");
            doc.flag("client_profile.allow_bridge_connections");
            planner.configure(&doc, target, &entity, &lookup, false).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_follows_version() {
        let global = client_profile_for(&SempVersion::new("soltr/6_0"), "glassfish", "dev_testvpn");
        assert_eq!(global.scope, ProfileScope::Global);
        assert_eq!(global.entity().vpn, None);

        let scoped = client_profile_for(&SempVersion::new("soltr/7_1_1"), "glassfish", "dev_testvpn");
        assert_eq!(scoped.scope, ProfileScope::Vpn("dev_testvpn".into()));
    }

    #[test]
    fn scoped_keys_include_vpn_name() {
        let mut doc = ConfigDocument::new("x", &SempVersion::new("soltr/6_2"));
        set_profile_keys(
            &mut doc,
            "create.client_profile",
            "glassfish",
            &ProfileScope::Vpn("dev_testvpn".into()),
        );
        assert!(doc.prepare(Target::Both).is_ok());
        assert!(doc.to_xml().contains("<vpn-name>dev_testvpn</vpn-name>"));

        let mut global = ConfigDocument::new("x", &SempVersion::new("soltr/6_0"));
        set_profile_keys(&mut global, "create.client_profile", "glassfish", &ProfileScope::Vpn("v".into()));
        assert!(global.prepare(Target::Both).is_err());
    }
}
