use super::Role;
use crate::settings::DatabaseFlavor;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// An ancillary service that is provisioned next to the scenario template.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExternalKind {
    MavenRepository,
    GitServer,
    Ldap,
    Sso,
    Database { flavor: DatabaseFlavor },
    AmqBroker,
}

impl ExternalKind {
    pub fn role(&self) -> Role {
        match self {
            ExternalKind::MavenRepository => Role::Maven,
            ExternalKind::GitServer => Role::GitServer,
            ExternalKind::Ldap => Role::Ldap,
            ExternalKind::Sso => Role::Sso,
            ExternalKind::Database { .. } => Role::ExternalDatabase,
            ExternalKind::AmqBroker => Role::ExternalAmq,
        }
    }

    /// The name of the deployment and service created for this external deployment.
    pub fn service_name(&self) -> String {
        match self {
            ExternalKind::MavenRepository => "maven-repository".to_string(),
            ExternalKind::GitServer => "git-server".to_string(),
            ExternalKind::Ldap => "ldap".to_string(),
            ExternalKind::Sso => "sso".to_string(),
            ExternalKind::Database { flavor } => format!("external-{}", flavor.service_suffix()),
            ExternalKind::AmqBroker => "external-amq".to_string(),
        }
    }

    /// Two external deployments occupy the same slot if they would deploy the same service.
    pub(crate) fn same_slot(&self, other: &ExternalKind) -> bool {
        self.role() == other.role()
    }
}

impl Display for ExternalKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ExternalKind::Database { flavor } => {
                write!(f, "{} ({})", self.role(), flavor.service_suffix())
            }
            _ => write!(f, "{}", self.role()),
        }
    }
}

/// An external deployment requested by a recipe. When `wait_for_running` is set, orchestration
/// does not apply the scenario template until this deployment is ready.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExternalDeployment {
    pub kind: ExternalKind,
    pub wait_for_running: bool,
}

impl ExternalDeployment {
    pub fn new(kind: ExternalKind, wait_for_running: bool) -> Self {
        Self {
            kind,
            wait_for_running,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn database_slots() {
        let mysql = ExternalKind::Database {
            flavor: DatabaseFlavor::Mysql,
        };
        let postgresql = ExternalKind::Database {
            flavor: DatabaseFlavor::Postgresql,
        };
        assert!(mysql.same_slot(&postgresql));
        assert!(!mysql.same_slot(&ExternalKind::AmqBroker));
        assert_eq!("external-postgresql", postgresql.service_name());
        assert_eq!("external-database (mysql)", mysql.to_string());
    }

    #[test]
    fn serde_shape() {
        let external = ExternalDeployment::new(ExternalKind::MavenRepository, true);
        let yaml = serde_yaml::to_string(&external).unwrap();
        assert!(yaml.contains("type: maven-repository"));
        assert!(yaml.contains("wait-for-running: true"));
    }
}
