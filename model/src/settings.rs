/*!

Validated settings bundles that builders attach to a scenario. Each bundle is a plain record with
a `validate` function; builders refuse a bundle that does not validate.

!*/

use crate::constants::{
    AUTH_LDAP_BASE_CTX_DN, AUTH_LDAP_BASE_FILTER, AUTH_LDAP_BIND_CREDENTIAL, AUTH_LDAP_BIND_DN,
    AUTH_LDAP_ROLES_CTX_DN, AUTH_LDAP_ROLE_ATTRIBUTE_ID, AUTH_LDAP_ROLE_FILTER, AUTH_LDAP_URL,
    BUSINESS_CENTRAL_SSO_CLIENT, BUSINESS_CENTRAL_SSO_SECRET, KIE_SERVER_SSO_CLIENT,
    KIE_SERVER_SSO_SECRET, SSO_PASSWORD, SSO_REALM, SSO_USERNAME,
};
use crate::error::{self, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};
use snafu::ensure;
use std::collections::BTreeMap;

const URL_PATTERN_REGEX: &str = r"^[a-zA-Z][a-zA-Z0-9+.-]*://[^\s/]+.*$";
const LDAP_URL_PATTERN_REGEX: &str = r"^ldaps?://[^\s/]+.*$";

lazy_static! {
    static ref URL_REGEX: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(URL_PATTERN_REGEX).unwrap()
    };
    static ref LDAP_URL_REGEX: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(LDAP_URL_PATTERN_REGEX).unwrap()
    };
}

fn ensure_not_empty(what: &str, field: &str, value: &str) -> Result<()> {
    ensure!(
        !value.trim().is_empty(),
        error::InvalidSettingsSnafu {
            what,
            reason: format!("'{}' must not be empty", field),
        }
    );
    Ok(())
}

/// A user name and password pair.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new<S1, S2>(username: S1, password: S2) -> Result<Self>
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let credentials = Self {
            username: username.into(),
            password: password.into(),
        };
        credentials.validate()?;
        Ok(credentials)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_not_empty("credentials", "username", &self.username)?;
        ensure_not_empty("credentials", "password", &self.password)
    }
}

/// Where the Git repository of a [`GitSettings`] is hosted.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GitProvider {
    /// A Git server deployed into the scenario namespace.
    Internal,
    /// A Git server outside of the cluster, e.g. GitHub or GitLab.
    External,
}

impl Default for GitProvider {
    fn default() -> Self {
        GitProvider::External
    }
}

/// Settings of the Git repository used as a build source or a workbench remote.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitSettings {
    #[serde(default)]
    pub provider: GitProvider,
    pub repository_url: String,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default = "default_git_reference")]
    pub reference: String,
    #[serde(default)]
    pub context_dir: Option<String>,
    /// Directories containing built kjars, separated by commas.
    #[serde(default)]
    pub artifact_dirs: Option<String>,
}

fn default_git_reference() -> String {
    String::from("master")
}

impl GitSettings {
    pub fn new<S: Into<String>>(provider: GitProvider, repository_url: S) -> Result<Self> {
        let settings = Self {
            provider,
            repository_url: repository_url.into(),
            credentials: None,
            reference: default_git_reference(),
            context_dir: None,
            artifact_dirs: None,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Result<Self> {
        credentials.validate()?;
        self.credentials = Some(credentials);
        Ok(self)
    }

    pub fn with_reference<S: Into<String>>(mut self, reference: S) -> Result<Self> {
        self.reference = reference.into();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_not_empty("git", "repository-url", &self.repository_url)?;
        ensure!(
            URL_REGEX.is_match(self.repository_url.trim()),
            error::InvalidSettingsSnafu {
                what: "git",
                reason: format!("'{}' is not a repository URL", self.repository_url),
            }
        );
        ensure_not_empty("git", "reference", &self.reference)?;
        if let Some(dir) = &self.context_dir {
            ensure_not_empty("git", "context-dir", dir)?;
        }
        if let Some(dirs) = &self.artifact_dirs {
            ensure_not_empty("git", "artifact-dirs", dirs)?;
        }
        if let Some(credentials) = &self.credentials {
            credentials.validate()?;
        }
        Ok(())
    }
}

/// LDAP authentication settings for the workbench and kie-servers.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LdapSettings {
    pub url: String,
    pub bind_dn: String,
    pub bind_credential: String,
    pub base_ctx_dn: String,
    #[serde(default = "default_ldap_base_filter")]
    pub base_filter: String,
    #[serde(default)]
    pub roles_ctx_dn: Option<String>,
    #[serde(default)]
    pub role_filter: Option<String>,
    #[serde(default)]
    pub role_attribute_id: Option<String>,
}

fn default_ldap_base_filter() -> String {
    String::from("(uid={0})")
}

impl LdapSettings {
    pub fn new<S1, S2, S3, S4>(
        url: S1,
        bind_dn: S2,
        bind_credential: S3,
        base_ctx_dn: S4,
    ) -> Result<Self>
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
        S4: Into<String>,
    {
        let settings = Self {
            url: url.into(),
            bind_dn: bind_dn.into(),
            bind_credential: bind_credential.into(),
            base_ctx_dn: base_ctx_dn.into(),
            base_filter: default_ldap_base_filter(),
            roles_ctx_dn: None,
            role_filter: None,
            role_attribute_id: None,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Configure role lookup.
    pub fn with_roles<S1, S2, S3>(
        mut self,
        roles_ctx_dn: S1,
        role_filter: S2,
        role_attribute_id: S3,
    ) -> Result<Self>
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        self.roles_ctx_dn = Some(roles_ctx_dn.into());
        self.role_filter = Some(role_filter.into());
        self.role_attribute_id = Some(role_attribute_id.into());
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            LDAP_URL_REGEX.is_match(self.url.trim()),
            error::InvalidSettingsSnafu {
                what: "ldap",
                reason: format!("'{}' is not an ldap:// or ldaps:// URL", self.url),
            }
        );
        ensure_not_empty("ldap", "bind-dn", &self.bind_dn)?;
        ensure_not_empty("ldap", "bind-credential", &self.bind_credential)?;
        ensure_not_empty("ldap", "base-ctx-dn", &self.base_ctx_dn)?;
        ensure_not_empty("ldap", "base-filter", &self.base_filter)?;
        for (field, value) in [
            ("roles-ctx-dn", &self.roles_ctx_dn),
            ("role-filter", &self.role_filter),
            ("role-attribute-id", &self.role_attribute_id),
        ] {
            if let Some(value) = value {
                ensure_not_empty("ldap", field, value)?;
            }
        }
        Ok(())
    }

    /// The template parameters that configure LDAP authentication.
    pub fn template_parameters(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert(AUTH_LDAP_URL.to_string(), self.url.clone());
        params.insert(AUTH_LDAP_BIND_DN.to_string(), self.bind_dn.clone());
        params.insert(
            AUTH_LDAP_BIND_CREDENTIAL.to_string(),
            self.bind_credential.clone(),
        );
        params.insert(AUTH_LDAP_BASE_CTX_DN.to_string(), self.base_ctx_dn.clone());
        params.insert(AUTH_LDAP_BASE_FILTER.to_string(), self.base_filter.clone());
        if let Some(value) = &self.roles_ctx_dn {
            params.insert(AUTH_LDAP_ROLES_CTX_DN.to_string(), value.clone());
        }
        if let Some(value) = &self.role_filter {
            params.insert(AUTH_LDAP_ROLE_FILTER.to_string(), value.clone());
        }
        if let Some(value) = &self.role_attribute_id {
            params.insert(AUTH_LDAP_ROLE_ATTRIBUTE_ID.to_string(), value.clone());
        }
        params
    }
}

/// Settings of the SSO realm that the workbench and kie-servers authenticate against.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SsoSettings {
    pub realm: String,
    /// The client id prefix; the workbench and kie-server clients are derived from it.
    pub client: String,
    pub secret: String,
    pub admin: Credentials,
}

impl Default for SsoSettings {
    fn default() -> Self {
        Self {
            realm: String::from("demo"),
            client: String::from("kie"),
            secret: String::from("kie-secret"),
            admin: Credentials {
                username: String::from("admin"),
                password: String::from("admin"),
            },
        }
    }
}

impl SsoSettings {
    pub fn new<S1, S2, S3>(realm: S1, client: S2, secret: S3) -> Result<Self>
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        let settings = Self {
            realm: realm.into(),
            client: client.into(),
            secret: secret.into(),
            ..Self::default()
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_not_empty("sso", "realm", &self.realm)?;
        ensure_not_empty("sso", "client", &self.client)?;
        ensure_not_empty("sso", "secret", &self.secret)?;
        self.admin.validate()
    }

    /// The template parameters that configure SSO for a server at `sso_url`.
    pub fn template_parameters(&self, sso_url: &str) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert(crate::constants::SSO_URL.to_string(), sso_url.to_string());
        params.insert(SSO_REALM.to_string(), self.realm.clone());
        params.insert(SSO_USERNAME.to_string(), self.admin.username.clone());
        params.insert(SSO_PASSWORD.to_string(), self.admin.password.clone());
        params.insert(
            BUSINESS_CENTRAL_SSO_CLIENT.to_string(),
            format!("{}-workbench", self.client),
        );
        params.insert(BUSINESS_CENTRAL_SSO_SECRET.to_string(), self.secret.clone());
        params.insert(
            KIE_SERVER_SSO_CLIENT.to_string(),
            format!("{}-kieserver", self.client),
        );
        params.insert(KIE_SERVER_SSO_SECRET.to_string(), self.secret.clone());
        params
    }
}

/// Settings of a JMS queue on an external broker.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct JmsSettings {
    pub queue_jndi_name: String,
}

impl JmsSettings {
    pub fn new<S: Into<String>>(queue_jndi_name: S) -> Result<Self> {
        let settings = Self {
            queue_jndi_name: queue_jndi_name.into(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_not_empty("jms", "queue-jndi-name", &self.queue_jndi_name)
    }
}

/// The database products that scenarios can be deployed with.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatabaseFlavor {
    Mysql,
    Postgresql,
}

derive_display_from_serialize!(DatabaseFlavor);
derive_fromstr_from_deserialize!(DatabaseFlavor);

impl DatabaseFlavor {
    pub fn port(&self) -> u16 {
        match self {
            DatabaseFlavor::Mysql => 3306,
            DatabaseFlavor::Postgresql => 5432,
        }
    }

    pub fn driver(&self) -> &'static str {
        match self {
            DatabaseFlavor::Mysql => "mysql",
            DatabaseFlavor::Postgresql => "postgresql",
        }
    }

    pub fn dialect(&self) -> &'static str {
        match self {
            DatabaseFlavor::Mysql => "org.hibernate.dialect.MySQL8Dialect",
            DatabaseFlavor::Postgresql => "org.hibernate.dialect.PostgreSQLDialect",
        }
    }

    /// Lower case name used for service names and JDBC URLs.
    pub fn service_suffix(&self) -> &'static str {
        match self {
            DatabaseFlavor::Mysql => "mysql",
            DatabaseFlavor::Postgresql => "postgresql",
        }
    }
}

/// Settings of a database that is deployed next to, but outside of, the scenario template.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExternalDatabaseSettings {
    pub flavor: DatabaseFlavor,
    pub database: String,
    pub credentials: Credentials,
}

impl ExternalDatabaseSettings {
    pub fn new<S: Into<String>>(
        flavor: DatabaseFlavor,
        database: S,
        credentials: Credentials,
    ) -> Result<Self> {
        let settings = Self {
            flavor,
            database: database.into(),
            credentials,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Settings with the default database name and credentials for `flavor`.
    pub fn default_for(flavor: DatabaseFlavor) -> Self {
        Self {
            flavor,
            database: String::from("rhpam7"),
            credentials: Credentials {
                username: String::from("rhpam"),
                password: String::from("rhpam"),
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_not_empty("external database", "database", &self.database)?;
        self.credentials.validate()
    }
}
