/*!

The scenario catalog and the builder protocol. A [`ScenarioBuilder`] accepts the verbs of its
[`ScenarioKind`] and produces an immutable [`ScenarioRecipe`] that the
[`ScenarioManager`](crate::scenario_manager::ScenarioManager) turns into a live topology.

!*/

mod builder;
mod external;
mod kind;
mod option;
mod recipe;

pub use builder::ScenarioBuilder;
pub use external::{ExternalDeployment, ExternalKind};
pub use kind::ScenarioKind;
pub use option::{ScenarioFile, ScenarioOption};
pub use recipe::{ScenarioRecipe, SettingsBundles, REDACTED};

use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};

/// The part a deployment plays within a scenario. Scenario instances hold at most one deployment
/// handle per role.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Workbench,
    KieServer,
    SecondKieServer,
    SmartRouter,
    Database,
    SecondDatabase,
    Amq,
    // Roles of external deployments.
    Maven,
    GitServer,
    Ldap,
    Sso,
    ExternalDatabase,
    ExternalAmq,
}

derive_display_from_serialize!(Role);
derive_fromstr_from_deserialize!(Role);

impl Role {
    /// Whether the role belongs to an external deployment rather than the scenario template.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Role::Maven
                | Role::GitServer
                | Role::Ldap
                | Role::Sso
                | Role::ExternalDatabase
                | Role::ExternalAmq
        )
    }
}

/// The closed vocabulary of builder verbs.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verb {
    WithInternalMavenRepo,
    WithKieServerId,
    WithContainerDeployment,
    WithSourceLocation,
    DeploySso,
    WithHttpKieServerHostname,
    WithHttpsKieServerHostname,
    WithDroolsServerFilterClasses,
    WithLdap,
    EnableExternalJmsSignalQueue,
    WithGitSettings,
    WithMonitoringK8sFileSystem,
}

derive_display_from_serialize!(Verb);
derive_fromstr_from_deserialize!(Verb);

impl Verb {
    pub const ALL: [Verb; 12] = [
        Verb::WithInternalMavenRepo,
        Verb::WithKieServerId,
        Verb::WithContainerDeployment,
        Verb::WithSourceLocation,
        Verb::DeploySso,
        Verb::WithHttpKieServerHostname,
        Verb::WithHttpsKieServerHostname,
        Verb::WithDroolsServerFilterClasses,
        Verb::WithLdap,
        Verb::EnableExternalJmsSignalQueue,
        Verb::WithGitSettings,
        Verb::WithMonitoringK8sFileSystem,
    ];
}

#[test]
fn role_names() {
    assert_eq!("maven", Role::Maven.to_string());
    assert_eq!("second-kie-server", Role::SecondKieServer.to_string());
    assert!(Role::ExternalAmq.is_external());
    assert!(!Role::Amq.is_external());
    assert_eq!(Verb::DeploySso, "deploy-sso".parse().unwrap());
}
