use super::{ExternalDeployment, ExternalKind, ScenarioKind};
use crate::settings::{
    Credentials, ExternalDatabaseSettings, GitSettings, JmsSettings, LdapSettings, SsoSettings,
};
use crate::Image;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shown in place of passwords and secrets by [`ScenarioRecipe::redacted`].
pub const REDACTED: &str = "******";

/// The settings bundles attached to a recipe.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SettingsBundles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ldap: Option<LdapSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso: Option<SsoSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jms: Option<JmsSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_database: Option<ExternalDatabaseSettings>,
}

/// An immutable description of a scenario, produced by
/// [`ScenarioBuilder::build`](super::ScenarioBuilder::build). Two recipes that compare equal
/// deploy the same topology.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScenarioRecipe {
    pub kind: ScenarioKind,
    /// Template parameters set by the builder.
    pub env: BTreeMap<String, String>,
    /// External deployments, in the order they are provisioned.
    pub externals: Vec<ExternalDeployment>,
    pub settings: SettingsBundles,
}

impl ScenarioRecipe {
    pub(crate) fn new(kind: ScenarioKind) -> Self {
        Self {
            kind,
            env: BTreeMap::new(),
            externals: Vec::new(),
            settings: SettingsBundles::default(),
        }
    }

    pub fn images(&self) -> &'static [Image] {
        self.kind.images()
    }

    pub fn external(&self, kind: &ExternalKind) -> Option<&ExternalDeployment> {
        self.externals
            .iter()
            .find(|external| external.kind.same_slot(kind))
    }

    /// Add an external deployment, or replace the one occupying the same slot without changing
    /// its position.
    pub(crate) fn set_external(&mut self, external: ExternalDeployment) {
        match self
            .externals
            .iter_mut()
            .find(|existing| existing.kind.same_slot(&external.kind))
        {
            Some(existing) => *existing = external,
            None => self.externals.push(external),
        }
    }

    pub(crate) fn remove_external(&mut self, kind: &ExternalKind) {
        self.externals
            .retain(|existing| !existing.kind.same_slot(kind));
    }

    /// A copy of the recipe with every password and secret of the settings bundles masked, for
    /// printing.
    pub fn redacted(&self) -> Self {
        let mut recipe = self.clone();
        let settings = &mut recipe.settings;
        if let Some(git) = &mut settings.git {
            git.credentials.iter_mut().for_each(mask_password);
        }
        if let Some(ldap) = &mut settings.ldap {
            ldap.bind_credential = REDACTED.to_string();
        }
        if let Some(sso) = &mut settings.sso {
            sso.secret = REDACTED.to_string();
            mask_password(&mut sso.admin);
        }
        if let Some(database) = &mut settings.external_database {
            mask_password(&mut database.credentials);
        }
        recipe
    }

    /// The template parameters contributed by the recipe itself: the builder env plus the
    /// parameters of attached bundles that do not depend on the cluster.
    pub fn parameters(&self) -> BTreeMap<String, String> {
        let mut params = self.env.clone();
        if let Some(ldap) = &self.settings.ldap {
            params.extend(ldap.template_parameters());
        }
        params
    }
}

fn mask_password(credentials: &mut Credentials) {
    credentials.password = REDACTED.to_string();
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::settings::{DatabaseFlavor, GitProvider};

    #[test]
    fn repeated_external_keeps_position() {
        let mut recipe = ScenarioRecipe::new(ScenarioKind::WorkbenchKieServer);
        recipe.set_external(ExternalDeployment::new(ExternalKind::MavenRepository, false));
        recipe.set_external(ExternalDeployment::new(ExternalKind::Sso, true));
        recipe.set_external(ExternalDeployment::new(ExternalKind::MavenRepository, true));
        assert_eq!(2, recipe.externals.len());
        assert_eq!(ExternalKind::MavenRepository, recipe.externals[0].kind);
        assert!(recipe.externals[0].wait_for_running);
        assert!(recipe.external(&ExternalKind::Sso).is_some());
        assert!(recipe.external(&ExternalKind::Ldap).is_none());
    }

    #[test]
    fn redacted_masks_secrets() {
        let mut recipe = ScenarioRecipe::new(ScenarioKind::WorkbenchKieServer);
        recipe.settings.ldap = Some(
            LdapSettings::new("ldap://ldap:389", "cn=admin", "bind-secret", "dc=example").unwrap(),
        );
        recipe.settings.sso = Some(SsoSettings::new("demo", "kie", "client-secret").unwrap());
        recipe.settings.git = Some(
            GitSettings::new(GitProvider::External, "https://git.example/kjars.git")
                .unwrap()
                .with_credentials(Credentials::new("git", "git-password").unwrap())
                .unwrap(),
        );
        recipe.settings.external_database =
            Some(ExternalDatabaseSettings::default_for(DatabaseFlavor::Mysql));

        let redacted = recipe.redacted();
        let json = serde_json::to_string(&redacted).unwrap();
        for secret in ["bind-secret", "client-secret", "git-password"] {
            assert!(!json.contains(secret), "{} leaked in {}", secret, json);
        }
        let settings = &redacted.settings;
        assert_eq!(REDACTED, settings.ldap.as_ref().unwrap().bind_credential);
        assert_eq!("cn=admin", settings.ldap.as_ref().unwrap().bind_dn);
        assert_eq!(REDACTED, settings.sso.as_ref().unwrap().admin.password);
        assert_eq!("admin", settings.sso.as_ref().unwrap().admin.username);
        let database = &settings.external_database.as_ref().unwrap().credentials;
        assert_eq!("rhpam", database.username);
        assert_eq!(REDACTED, database.password);
        // The original keeps its values for deployment.
        assert_eq!(
            "bind-secret",
            recipe.settings.ldap.as_ref().unwrap().bind_credential
        );
    }
}
