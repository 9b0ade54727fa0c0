use crate::constants::{
    DEFAULT_BOOT_TIMEOUT_SECS, DEFAULT_IMAGE_STREAM_TIMEOUT_SECS, DEFAULT_POLL_STEP_MILLIS,
    DEFAULT_SCALE_TIMEOUT_SECS,
};
use crate::error::{self, Result};
use crate::settings::DatabaseFlavor;
use crate::Image;
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::time::Duration;

/// The prefix shared by every configuration environment variable.
pub const ENV_PREFIX: &str = "KIE_CLOUD_";

/// Selects which images are mandatory when image streams are generated from tags rather than
/// loaded from a manifest.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductProfile {
    Drools,
    Jbpm,
}

derive_display_from_serialize!(ProductProfile);
derive_fromstr_from_deserialize!(ProductProfile);

impl ProductProfile {
    /// The images for which an image stream must be generated under this profile.
    pub fn required_images(&self) -> &'static [Image] {
        match self {
            ProductProfile::Drools => &[
                Image::Workbench,
                Image::KieServer,
                Image::Controller,
                Image::WorkbenchIndexing,
            ],
            ProductProfile::Jbpm => &[
                Image::Amq,
                Image::Console,
                Image::Controller,
                Image::KieServer,
                Image::Mysql,
                Image::Postgresql,
                Image::SmartRouter,
                Image::Workbench,
                Image::WorkbenchIndexing,
            ],
        }
    }
}

/// Process-wide settings of the harness. Resolve it once with [`HarnessConfig::from_env`] and pass
/// it to the scenario builders and the [`ScenarioManager`](crate::scenario_manager::ScenarioManager).
///
/// Every field is read from an environment variable named after the field with the `KIE_CLOUD_`
/// prefix, e.g.
///
/// ```text
/// KIE_CLOUD_IMAGE_STREAMS=https://example.com/rhpam-image-streams.yaml
/// KIE_CLOUD_PRODUCT_PROFILE=JBPM
/// KIE_CLOUD_IMAGE_TAG_KIE_SERVER=registry.example/kieserver:custom
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HarnessConfig {
    /// Location of a manifest containing image streams.
    #[serde(default)]
    pub image_streams: Option<String>,
    #[serde(default)]
    pub product_profile: Option<ProductProfile>,
    #[serde(default = "default_credentials_secret")]
    pub credentials_secret: String,
    #[serde(default = "default_tls_secret")]
    pub tls_secret: String,
    #[serde(default = "default_application_name")]
    pub application_name: String,
    /// A directory or base URL holding the scenario templates.
    #[serde(default = "default_templates")]
    pub templates: String,
    #[serde(default)]
    pub source_repository_url: Option<String>,
    #[serde(default = "default_boot_timeout_secs")]
    pub boot_timeout_secs: u64,
    #[serde(default = "default_scale_timeout_secs")]
    pub scale_timeout_secs: u64,
    #[serde(default = "default_image_stream_timeout_secs")]
    pub image_stream_timeout_secs: u64,
    #[serde(default = "default_poll_step_millis")]
    pub poll_step_millis: u64,
    #[serde(default = "default_app_username")]
    pub app_username: String,
    #[serde(default = "default_app_password")]
    pub app_password: String,
    #[serde(default = "default_maven_image")]
    pub maven_image: String,
    #[serde(default = "default_git_image")]
    pub git_image: String,
    #[serde(default = "default_ldap_image")]
    pub ldap_image: String,
    #[serde(default = "default_sso_image")]
    pub sso_image: String,
    #[serde(default = "default_mysql_image")]
    pub mysql_image: String,
    #[serde(default = "default_postgresql_image")]
    pub postgresql_image: String,
    #[serde(default = "default_amq_image")]
    pub amq_image: String,
    #[serde(default = "default_external_database_flavor")]
    pub external_database_flavor: DatabaseFlavor,
    /// Per-image tag overrides, read from `KIE_CLOUD_IMAGE_TAG_<IMAGE>`.
    #[serde(skip)]
    image_tags: BTreeMap<Image, String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            image_streams: None,
            product_profile: None,
            credentials_secret: default_credentials_secret(),
            tls_secret: default_tls_secret(),
            application_name: default_application_name(),
            templates: default_templates(),
            source_repository_url: None,
            boot_timeout_secs: default_boot_timeout_secs(),
            scale_timeout_secs: default_scale_timeout_secs(),
            image_stream_timeout_secs: default_image_stream_timeout_secs(),
            poll_step_millis: default_poll_step_millis(),
            app_username: default_app_username(),
            app_password: default_app_password(),
            maven_image: default_maven_image(),
            git_image: default_git_image(),
            ldap_image: default_ldap_image(),
            sso_image: default_sso_image(),
            mysql_image: default_mysql_image(),
            postgresql_image: default_postgresql_image(),
            amq_image: default_amq_image(),
            external_database_flavor: default_external_database_flavor(),
            image_tags: BTreeMap::new(),
        }
    }
}

impl HarnessConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Read the configuration from an iterator of `(key, value)` pairs shaped like environment
    /// variables. Keys without the `KIE_CLOUD_` prefix are ignored.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        let mut config: HarnessConfig = envy::prefixed(ENV_PREFIX)
            .from_iter(vars.iter().cloned())
            .context(error::ConfigParseSnafu)?;
        for image in Image::ALL {
            let key = image.tag_override_key();
            if let Some((_, value)) = vars.iter().find(|(k, _)| *k == key) {
                config.set_image_tag(image, value);
            }
        }
        Ok(config)
    }

    /// The configured image stream manifest, if it is present and not empty.
    pub fn image_streams_manifest(&self) -> Option<&str> {
        self.image_streams
            .as_deref()
            .map(str::trim)
            .filter(|location| !location.is_empty())
    }

    /// The tag override for `image`, if set.
    pub fn image_tag(&self, image: Image) -> Option<&str> {
        self.image_tags.get(&image).map(String::as_str)
    }

    /// Override the tag of `image`. An empty `tag` removes the override.
    pub fn set_image_tag<S: Into<String>>(&mut self, image: Image, tag: S) {
        let tag = tag.into();
        if tag.trim().is_empty() {
            self.image_tags.remove(&image);
        } else {
            self.image_tags.insert(image, tag.trim().to_string());
        }
    }

    pub fn source_repository_url(&self) -> Option<&str> {
        self.source_repository_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }

    pub fn boot_timeout(&self) -> Duration {
        Duration::from_secs(self.boot_timeout_secs)
    }

    pub fn scale_timeout(&self) -> Duration {
        Duration::from_secs(self.scale_timeout_secs)
    }

    pub fn image_stream_timeout(&self) -> Duration {
        Duration::from_secs(self.image_stream_timeout_secs)
    }

    pub fn poll_step(&self) -> Duration {
        Duration::from_millis(self.poll_step_millis)
    }
}

fn default_credentials_secret() -> String {
    String::from("kie-credentials-secret")
}

fn default_tls_secret() -> String {
    String::from("kie-app-secret")
}

fn default_application_name() -> String {
    String::from("myapp")
}

fn default_templates() -> String {
    String::from("templates")
}

fn default_boot_timeout_secs() -> u64 {
    DEFAULT_BOOT_TIMEOUT_SECS
}

fn default_scale_timeout_secs() -> u64 {
    DEFAULT_SCALE_TIMEOUT_SECS
}

fn default_image_stream_timeout_secs() -> u64 {
    DEFAULT_IMAGE_STREAM_TIMEOUT_SECS
}

fn default_poll_step_millis() -> u64 {
    DEFAULT_POLL_STEP_MILLIS
}

fn default_app_username() -> String {
    String::from("adminUser")
}

fn default_app_password() -> String {
    String::from("admin1!")
}

fn default_maven_image() -> String {
    String::from("docker.io/sonatype/nexus3:3.38.1")
}

fn default_git_image() -> String {
    String::from("docker.io/gogs/gogs:0.12")
}

fn default_ldap_image() -> String {
    String::from("docker.io/osixia/openldap:1.5.0")
}

fn default_sso_image() -> String {
    String::from("quay.io/keycloak/keycloak:15.0.2")
}

fn default_mysql_image() -> String {
    String::from("docker.io/library/mysql:8.0")
}

fn default_postgresql_image() -> String {
    String::from("docker.io/library/postgres:13")
}

fn default_amq_image() -> String {
    String::from("quay.io/artemiscloud/activemq-artemis-broker:1.0.10")
}

fn default_external_database_flavor() -> DatabaseFlavor {
    DatabaseFlavor::Mysql
}
