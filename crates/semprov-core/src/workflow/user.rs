// ── Client username provisioning ──

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use super::client_profile::profile_key;
use super::{Planner, Workflow};
use crate::document::ConfigDocument;
use crate::entity::{EntityKey, EntityKind};
use crate::error::CoreError;
use crate::guard::{ExistenceFlag, ExistenceQuery, GuardOutcome};
use crate::model::DEFAULT_CLIENT_PROFILE;
use crate::routing::Target;

const USER_PATH: &str = "rpc-reply.rpc.show.client-username.client-usernames.client-username";
const CLIENT_PROFILE_PATH: &str = "rpc-reply.rpc.show.client-profile.profiles.profile";
const ACL_PROFILE_PATH: &str = "rpc-reply.rpc.show.acl-profile.acl-profiles.acl-profile";

/// One client username to provision.
#[derive(Debug, Clone)]
pub struct UserSpec {
    pub username: String,
    pub password: SecretString,
    pub client_profile: String,
    /// Defaults to the VPN name.
    pub acl_profile: Option<String>,
}

impl UserSpec {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
            client_profile: DEFAULT_CLIENT_PROFILE.to_owned(),
            acl_profile: None,
        }
    }

    #[must_use]
    pub fn client_profile(mut self, profile: impl Into<String>) -> Self {
        self.client_profile = profile.into();
        self
    }

    #[must_use]
    pub fn acl_profile(mut self, profile: impl Into<String>) -> Self {
        self.acl_profile = Some(profile.into());
        self
    }
}

/// Create or reconfigure client usernames in one VPN, on both appliances.
#[derive(Debug, Clone)]
pub struct UserWorkflow {
    pub vpn: String,
    pub users: Vec<UserSpec>,
}

impl UserWorkflow {
    pub fn new(vpn: impl Into<String>, users: Vec<UserSpec>) -> Self {
        Self {
            vpn: vpn.into(),
            users,
        }
    }

    fn user_doc(&self, planner: &Planner<'_>, username: &str, description: String) -> ConfigDocument {
        let mut doc = planner.document(description);
        doc.set("client_username.username", username)
            .set("client_username.vpn_name", &self.vpn);
        doc
    }

    /// Confirm a referenced profile exists before a dry run relies on it.
    /// Profiles planned earlier in the same run count as present.
    async fn require_profile(
        &self,
        planner: &mut Planner<'_>,
        entity: EntityKey,
        show: &ConfigDocument,
        path: &str,
    ) -> Result<(), CoreError> {
        if planner.guard().created(&entity) || planner.guard().flag(&entity) == ExistenceFlag::Exists {
            return Ok(());
        }
        let query = show.prepare(Target::Both)?;
        let replies = planner.cluster().rpc(&query, true).await?;
        if !replies.is_empty() && replies.iter().all(|r| r.reply.contains(path)) {
            planner.guard_mut().set_flag(entity, ExistenceFlag::Exists);
            return Ok(());
        }
        Err(CoreError::NotFound {
            entity: entity.to_string(),
        })
    }

    async fn check_profiles(&self, planner: &mut Planner<'_>, user: &UserSpec, acl: &str) -> Result<(), CoreError> {
        let scoped = planner.cluster().version().vpn_scoped_client_profiles();
        let mut show = planner.document(format!("Checking client profile {}", user.client_profile));
        show.set("show.client_profile.name", &user.client_profile);
        if scoped {
            show.set("show.client_profile.vpn_name", &self.vpn);
        }
        let entity = profile_key(&user.client_profile, scoped.then_some(self.vpn.as_str()));
        self.require_profile(planner, entity, &show, CLIENT_PROFILE_PATH).await?;

        let mut show = planner.document(format!("Checking acl profile {acl}"));
        show.set("show.acl_profile.name", acl)
            .set("show.acl_profile.vpn_name", &self.vpn);
        let entity = EntityKey::new(EntityKind::AclProfile, acl, Some(self.vpn.as_str()));
        self.require_profile(planner, entity, &show, ACL_PROFILE_PATH).await
    }

    async fn plan_user(&self, planner: &mut Planner<'_>, user: &UserSpec) -> Result<(), CoreError> {
        let name = user.username.as_str();
        let vpn = self.vpn.as_str();
        let acl = user.acl_profile.as_deref().unwrap_or(vpn);
        let entity = EntityKey::user(name, vpn);
        let target = Target::Both;

        if planner.cluster().read_only() {
            info!(username = name, "read-only mode, checking referenced profiles");
            self.check_profiles(planner, user, acl).await?;
        }

        let mut show = planner.document(format!("Querying client username {name}"));
        show.set("show.client_username.name", name)
            .set("show.client_username.vpn_name", vpn);
        let lookup = ExistenceQuery::new(&show, USER_PATH, target)?;

        let mut doc = planner.document(format!("Creating client username {name}"));
        doc.set("create.client_username.username", name)
            .set("create.client_username.vpn_name", vpn);
        planner.create(&doc, target, &entity, &lookup).await?;

        let mut doc = self.user_doc(planner, name, format!("Shutting down client username {name}"));
        doc.flag("client_username.shutdown");
        let guard = planner.guard();
        let live = !guard.created(&entity);
        let permitted = guard.force() || guard.shutdown_mode().covers(EntityKind::ClientUsername);
        if live {
            if permitted {
                planner.configure(&doc, target, &entity, &lookup, false).await?;
            } else {
                warn!(username = name, "client username is live and user shutdown is not enabled");
                planner.skip(&doc, GuardOutcome::SkippedNotShutdown);
            }
        }

        let mut doc = self.user_doc(
            planner,
            name,
            format!("Setting client profile of {name} to {}", user.client_profile),
        );
        doc.set("client_username.client_profile.name", &user.client_profile);
        planner.configure(&doc, target, &entity, &lookup, true).await?;

        let mut doc = self.user_doc(planner, name, format!("Setting acl profile of {name} to {acl}"));
        doc.set("client_username.acl_profile.name", acl);
        planner.configure(&doc, target, &entity, &lookup, true).await?;

        let mut doc = self.user_doc(
            planner,
            name,
            format!("Disabling guaranteed endpoint permission override for {name}"),
        );
        doc.flag("client_username.no.guaranteed_endpoint_permission_override");
        planner.configure(&doc, target, &entity, &lookup, true).await?;

        let mut doc = self.user_doc(planner, name, format!("Disabling subscription manager for {name}"));
        doc.flag("client_username.no.subscription_manager");
        planner.configure(&doc, target, &entity, &lookup, true).await?;

        let mut doc = self.user_doc(planner, name, format!("Setting password for {name}"));
        doc.set("client_username.password.password", user.password.expose_secret());
        planner.configure(&doc, target, &entity, &lookup, false).await?;

        let mut doc = self.user_doc(planner, name, format!("Enabling client username {name}"));
        doc.flag("client_username.no.shutdown");
        planner.configure(&doc, target, &entity, &lookup, false).await?;

        Ok(())
    }
}

impl Workflow for UserWorkflow {
    fn label(&self) -> String {
        format!("client usernames in vpn {}", self.vpn)
    }

    async fn plan_into(&self, planner: &mut Planner<'_>) -> Result<(), CoreError> {
        for user in &self.users {
            self.plan_user(planner, user).await?;
        }
        Ok(())
    }
}
