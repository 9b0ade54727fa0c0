use super::{ExternalDeployment, ExternalKind, ScenarioKind, ScenarioOption, ScenarioRecipe, Verb};
use crate::constants::{
    APPLICATION_NAME, ARTIFACT_DIR, BUSINESS_CENTRAL_HTTPS_SECRET, BUSINESS_CENTRAL_K8S_FS_ENABLED,
    CONTEXT_DIR, CREDENTIALS_SECRET, DROOLS_SERVER_FILTER_CLASSES, KIE_SERVER_CONTAINER_DEPLOYMENT,
    KIE_SERVER_HOSTNAME_HTTP, KIE_SERVER_HOSTNAME_HTTPS, KIE_SERVER_HTTPS_SECRET, KIE_SERVER_ID,
    KIE_SERVER_JMS_ENABLE_SIGNAL, KIE_SERVER_JMS_QUEUE_SIGNAL, KIE_SERVER_MODE,
    SOURCE_REPOSITORY_REF, SOURCE_REPOSITORY_URL,
};
use crate::error::{self, Result};
use crate::settings::{
    ExternalDatabaseSettings, GitProvider, GitSettings, JmsSettings, LdapSettings, SsoSettings,
};
use crate::HarnessConfig;
use lazy_static::lazy_static;
use log::trace;
use regex::Regex;
use snafu::{ensure, OptionExt};

/// A kie container deployment: `containerId[(alias)]=groupId:artifactId:version`, with further
/// deployments separated by `|`.
const CONTAINER_DEPLOYMENT_REGEX: &str = r"^[A-Za-z0-9_.-]+(\([A-Za-z0-9_.-]+\))?=[^\s:|=]+:[^\s:|=]+:[^\s:|=]+(\|[A-Za-z0-9_.-]+(\([A-Za-z0-9_.-]+\))?=[^\s:|=]+:[^\s:|=]+:[^\s:|=]+)*$";
const DNS_LABEL_REGEX: &str = r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$";
const DNS_NAME_MAX_LEN: usize = 253;

lazy_static! {
    static ref CONTAINER_DEPLOYMENT: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(CONTAINER_DEPLOYMENT_REGEX).unwrap()
    };
    static ref DNS_LABEL: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(DNS_LABEL_REGEX).unwrap()
    };
}

/// Whether `name` is an RFC 1123 DNS name.
fn is_dns_hostname(name: &str) -> bool {
    name.len() <= DNS_NAME_MAX_LEN && name.split('.').all(|label| DNS_LABEL.is_match(label))
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct SourceLocation {
    reference: String,
    context_dir: String,
    artifact_dirs: Option<String>,
}

/// Configures a scenario of one [`ScenarioKind`]. Each verb is only accepted by the kinds that
/// list it in [`ScenarioKind::verbs`]; any other verb fails with `OperationNotSupported` and
/// leaves the builder untouched. Calling a verb twice keeps the last value.
///
/// Settings bundles are validated when they are attached. Plain arguments are checked by
/// [`ScenarioBuilder::build`], which also checks that every image of the scenario has a tag
/// unless image streams come from a manifest.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioBuilder {
    config: HarnessConfig,
    recipe: ScenarioRecipe,
    source_location: Option<SourceLocation>,
}

impl ScenarioBuilder {
    pub fn new(kind: ScenarioKind, config: &HarnessConfig) -> Self {
        let mut recipe = ScenarioRecipe::new(kind);
        recipe.env.insert(
            APPLICATION_NAME.to_string(),
            config.application_name.clone(),
        );
        recipe.env.insert(
            CREDENTIALS_SECRET.to_string(),
            config.credentials_secret.clone(),
        );
        recipe
            .env
            .insert(KIE_SERVER_HTTPS_SECRET.to_string(), config.tls_secret.clone());
        if kind.has_workbench() {
            recipe.env.insert(
                BUSINESS_CENTRAL_HTTPS_SECRET.to_string(),
                config.tls_secret.clone(),
            );
        }
        match kind {
            ScenarioKind::KieServerWithExternalDatabase => {
                let flavor = config.external_database_flavor;
                recipe
                    .env
                    .insert(KIE_SERVER_MODE.to_string(), "DEVELOPMENT".to_string());
                recipe.set_external(ExternalDeployment::new(
                    ExternalKind::Database { flavor },
                    true,
                ));
                recipe.settings.external_database =
                    Some(ExternalDatabaseSettings::default_for(flavor));
            }
            ScenarioKind::ImmutableKieServerAmq => {
                recipe.set_external(ExternalDeployment::new(ExternalKind::AmqBroker, true));
            }
            _ => {}
        }
        Self {
            config: config.clone(),
            recipe,
            source_location: None,
        }
    }

    pub fn kind(&self) -> ScenarioKind {
        self.recipe.kind
    }

    /// The recipe as configured so far, before the checks of [`ScenarioBuilder::build`].
    pub fn recipe(&self) -> &ScenarioRecipe {
        &self.recipe
    }

    fn ensure_supported(&self, verb: Verb) -> Result<()> {
        ensure!(
            self.recipe.kind.supports(verb),
            error::OperationNotSupportedSnafu {
                verb: verb.to_string(),
                kind: self.recipe.kind.to_string(),
            }
        );
        trace!("{}: applying '{}'", self.recipe.kind, verb);
        Ok(())
    }

    fn set_env<S: Into<String>>(&mut self, key: &str, value: S) {
        self.recipe.env.insert(key.to_string(), value.into());
    }

    /// Deploy a Maven repository next to the scenario for kjar artifacts.
    pub fn with_internal_maven_repo(&mut self, wait_for_running: bool) -> Result<&mut Self> {
        self.ensure_supported(Verb::WithInternalMavenRepo)?;
        self.recipe.set_external(ExternalDeployment::new(
            ExternalKind::MavenRepository,
            wait_for_running,
        ));
        Ok(self)
    }

    pub fn with_kie_server_id<S: Into<String>>(&mut self, id: S) -> Result<&mut Self> {
        self.ensure_supported(Verb::WithKieServerId)?;
        self.set_env(KIE_SERVER_ID, id);
        Ok(self)
    }

    /// Containers to deploy into the immutable kie-server, e.g.
    /// `orders=org.example:orders:1.0.0|billing=org.example:billing:1.0.0`.
    pub fn with_container_deployment<S: Into<String>>(&mut self, spec: S) -> Result<&mut Self> {
        self.ensure_supported(Verb::WithContainerDeployment)?;
        self.set_env(KIE_SERVER_CONTAINER_DEPLOYMENT, spec);
        Ok(self)
    }

    /// Build the kie-server image from `reference` of the Git repository. The repository URL
    /// comes from the attached Git settings, or from the configured default repository.
    pub fn with_source_location<S1, S2>(
        &mut self,
        reference: S1,
        context_dir: S2,
        artifact_dirs: Option<String>,
    ) -> Result<&mut Self>
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        self.ensure_supported(Verb::WithSourceLocation)?;
        self.source_location = Some(SourceLocation {
            reference: reference.into(),
            context_dir: context_dir.into(),
            artifact_dirs,
        });
        Ok(self)
    }

    pub fn deploy_sso(&mut self) -> Result<&mut Self> {
        self.ensure_supported(Verb::DeploySso)?;
        self.recipe
            .set_external(ExternalDeployment::new(ExternalKind::Sso, true));
        if self.recipe.settings.sso.is_none() {
            self.recipe.settings.sso = Some(SsoSettings::default());
        }
        Ok(self)
    }

    pub fn with_http_kie_server_hostname<S: Into<String>>(
        &mut self,
        hostname: S,
    ) -> Result<&mut Self> {
        self.ensure_supported(Verb::WithHttpKieServerHostname)?;
        self.set_env(KIE_SERVER_HOSTNAME_HTTP, hostname);
        Ok(self)
    }

    pub fn with_https_kie_server_hostname<S: Into<String>>(
        &mut self,
        hostname: S,
    ) -> Result<&mut Self> {
        self.ensure_supported(Verb::WithHttpsKieServerHostname)?;
        self.set_env(KIE_SERVER_HOSTNAME_HTTPS, hostname);
        Ok(self)
    }

    pub fn with_drools_server_filter_classes(&mut self, filter: bool) -> Result<&mut Self> {
        self.ensure_supported(Verb::WithDroolsServerFilterClasses)?;
        self.set_env(DROOLS_SERVER_FILTER_CLASSES, filter.to_string());
        Ok(self)
    }

    /// Deploy an LDAP server and authenticate the product against it with `settings`.
    pub fn with_ldap(&mut self, settings: LdapSettings) -> Result<&mut Self> {
        self.ensure_supported(Verb::WithLdap)?;
        settings.validate()?;
        self.recipe
            .set_external(ExternalDeployment::new(ExternalKind::Ldap, true));
        self.recipe.settings.ldap = Some(settings);
        Ok(self)
    }

    /// Signal process instances through a queue of the external AMQ broker.
    pub fn enable_external_jms_signal_queue<S: Into<String>>(
        &mut self,
        queue_jndi_name: S,
    ) -> Result<&mut Self> {
        self.ensure_supported(Verb::EnableExternalJmsSignalQueue)?;
        let jms = JmsSettings {
            queue_jndi_name: queue_jndi_name.into(),
        };
        self.set_env(KIE_SERVER_JMS_ENABLE_SIGNAL, "true");
        self.set_env(KIE_SERVER_JMS_QUEUE_SIGNAL, jms.queue_jndi_name.clone());
        self.recipe.settings.jms = Some(jms);
        Ok(self)
    }

    /// Attach Git settings. The internal provider also deploys a Git server into the scenario;
    /// switching to an external provider drops that server again.
    pub fn with_git_settings(&mut self, settings: GitSettings) -> Result<&mut Self> {
        self.ensure_supported(Verb::WithGitSettings)?;
        settings.validate()?;
        match settings.provider {
            GitProvider::Internal => self
                .recipe
                .set_external(ExternalDeployment::new(ExternalKind::GitServer, true)),
            GitProvider::External => self.recipe.remove_external(&ExternalKind::GitServer),
        }
        self.recipe.settings.git = Some(settings);
        Ok(self)
    }

    pub fn with_monitoring_k8s_file_system(&mut self, enabled: bool) -> Result<&mut Self> {
        self.ensure_supported(Verb::WithMonitoringK8sFileSystem)?;
        self.set_env(BUSINESS_CENTRAL_K8S_FS_ENABLED, enabled.to_string());
        Ok(self)
    }

    /// Apply the verb described by `option`.
    pub fn apply(&mut self, option: &ScenarioOption) -> Result<&mut Self> {
        match option.clone() {
            ScenarioOption::WithInternalMavenRepo { wait_for_running } => {
                self.with_internal_maven_repo(wait_for_running)
            }
            ScenarioOption::WithKieServerId(id) => self.with_kie_server_id(id),
            ScenarioOption::WithContainerDeployment(spec) => self.with_container_deployment(spec),
            ScenarioOption::WithSourceLocation {
                reference,
                context_dir,
                artifact_dirs,
            } => self.with_source_location(reference, context_dir, artifact_dirs),
            ScenarioOption::DeploySso => self.deploy_sso(),
            ScenarioOption::WithHttpKieServerHostname(hostname) => {
                self.with_http_kie_server_hostname(hostname)
            }
            ScenarioOption::WithHttpsKieServerHostname(hostname) => {
                self.with_https_kie_server_hostname(hostname)
            }
            ScenarioOption::WithDroolsServerFilterClasses(filter) => {
                self.with_drools_server_filter_classes(filter)
            }
            ScenarioOption::WithLdap(settings) => self.with_ldap(settings),
            ScenarioOption::EnableExternalJmsSignalQueue(name) => {
                self.enable_external_jms_signal_queue(name)
            }
            ScenarioOption::WithGitSettings(settings) => self.with_git_settings(settings),
            ScenarioOption::WithMonitoringK8sFileSystem(enabled) => {
                self.with_monitoring_k8s_file_system(enabled)
            }
        }
    }

    /// Check the configured arguments and produce the recipe. Building has no side effects; equal
    /// verb sequences build equal recipes.
    pub fn build(&self) -> Result<ScenarioRecipe> {
        let mut recipe = self.recipe.clone();
        if let Some(id) = recipe.env.get(KIE_SERVER_ID) {
            ensure!(
                !id.trim().is_empty(),
                error::InvalidScenarioConfigurationSnafu {
                    reason: "the kie-server id must not be empty",
                }
            );
        }
        for key in [KIE_SERVER_HOSTNAME_HTTP, KIE_SERVER_HOSTNAME_HTTPS] {
            if let Some(hostname) = recipe.env.get(key) {
                ensure!(
                    is_dns_hostname(hostname),
                    error::InvalidScenarioConfigurationSnafu {
                        reason: format!("'{}' is not a valid DNS name for {}", hostname, key),
                    }
                );
            }
        }
        if let Some(spec) = recipe.env.get(KIE_SERVER_CONTAINER_DEPLOYMENT) {
            ensure!(
                CONTAINER_DEPLOYMENT.is_match(spec.trim()),
                error::InvalidScenarioConfigurationSnafu {
                    reason: format!(
                        "'{}' is not a container deployment of the form \
                         'containerId=groupId:artifactId:version'",
                        spec
                    ),
                }
            );
        }
        if let Some(jms) = &recipe.settings.jms {
            ensure!(
                !jms.queue_jndi_name.trim().is_empty(),
                error::InvalidScenarioConfigurationSnafu {
                    reason: "the JMS signal queue JNDI name must not be empty",
                }
            );
        }
        match &self.source_location {
            Some(location) => self.resolve_source_location(location, &mut recipe)?,
            None => ensure!(
                !recipe.kind.is_immutable(),
                error::InvalidScenarioConfigurationSnafu {
                    reason: format!(
                        "scenario '{}' builds its kie-server from source and needs a source \
                         location",
                        recipe.kind
                    ),
                }
            ),
        }
        if self.config.image_streams_manifest().is_none() {
            for image in recipe.images() {
                if image.resolve_tag(&self.config).is_none() {
                    return error::ConfigMissingSnafu {
                        key: image.tag_override_key(),
                    }
                    .fail();
                }
            }
        }
        Ok(recipe)
    }

    fn resolve_source_location(
        &self,
        location: &SourceLocation,
        recipe: &mut ScenarioRecipe,
    ) -> Result<()> {
        ensure!(
            !location.reference.trim().is_empty() && !location.context_dir.trim().is_empty(),
            error::InvalidScenarioConfigurationSnafu {
                reason: "the source reference and context directory must not be empty",
            }
        );
        let repository_url = recipe
            .settings
            .git
            .as_ref()
            .map(|git| git.repository_url.as_str())
            .or_else(|| self.config.source_repository_url())
            .context(error::InvalidScenarioConfigurationSnafu {
                reason: "a source location needs Git settings or a default source repository",
            })?
            .to_string();
        recipe
            .env
            .insert(SOURCE_REPOSITORY_URL.to_string(), repository_url);
        recipe.env.insert(
            SOURCE_REPOSITORY_REF.to_string(),
            location.reference.clone(),
        );
        recipe
            .env
            .insert(CONTEXT_DIR.to_string(), location.context_dir.clone());
        if let Some(dirs) = location
            .artifact_dirs
            .as_ref()
            .filter(|dirs| !dirs.trim().is_empty())
        {
            recipe.env.insert(ARTIFACT_DIR.to_string(), dirs.clone());
        }
        Ok(())
    }
}
