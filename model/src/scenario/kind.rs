use super::{Role, Verb};
use crate::settings::DatabaseFlavor;
use crate::Image;
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};

/// The closed catalog of topologies the harness knows how to deploy.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    WorkbenchKieServer,
    WorkbenchKieServerPersistent,
    KieServerWithExternalDatabase,
    KieServerWithMysql,
    KieServerWithPostgresql,
    WorkbenchRuntimeSmartRouterTwoKieServersTwoDatabases,
    ClusteredWorkbenchKieServerDatabasePersistent,
    ImmutableKieServer,
    ImmutableKieServerAmq,
    WorkbenchRuntimeSmartRouterImmutableKieServerAmqWithDatabase,
}

derive_display_from_serialize!(ScenarioKind);
derive_fromstr_from_deserialize!(ScenarioKind);

use Verb::*;

const WORKBENCH_KIE_SERVER_VERBS: &[Verb] = &[
    WithInternalMavenRepo,
    WithKieServerId,
    DeploySso,
    WithHttpKieServerHostname,
    WithHttpsKieServerHostname,
    WithDroolsServerFilterClasses,
    WithLdap,
    WithGitSettings,
];

const EXTERNAL_DATABASE_VERBS: &[Verb] = &[WithInternalMavenRepo, WithKieServerId];

const KIE_SERVER_DATABASE_VERBS: &[Verb] = &[
    WithInternalMavenRepo,
    WithKieServerId,
    DeploySso,
    WithHttpKieServerHostname,
    WithHttpsKieServerHostname,
    WithDroolsServerFilterClasses,
    WithLdap,
];

const MONITORING_TWO_KIE_SERVERS_VERBS: &[Verb] = &[
    WithInternalMavenRepo,
    WithKieServerId,
    DeploySso,
    WithLdap,
    WithGitSettings,
    WithMonitoringK8sFileSystem,
    WithHttpKieServerHostname,
    WithHttpsKieServerHostname,
];

const CLUSTERED_VERBS: &[Verb] = &[
    WithInternalMavenRepo,
    WithKieServerId,
    DeploySso,
    WithLdap,
    WithGitSettings,
    WithHttpKieServerHostname,
    WithHttpsKieServerHostname,
    WithDroolsServerFilterClasses,
];

const IMMUTABLE_VERBS: &[Verb] = &[
    WithInternalMavenRepo,
    WithKieServerId,
    WithContainerDeployment,
    WithSourceLocation,
    DeploySso,
    WithHttpKieServerHostname,
    WithHttpsKieServerHostname,
    WithDroolsServerFilterClasses,
    WithLdap,
];

const IMMUTABLE_AMQ_VERBS: &[Verb] = &[
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
];

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 10] = [
        ScenarioKind::WorkbenchKieServer,
        ScenarioKind::WorkbenchKieServerPersistent,
        ScenarioKind::KieServerWithExternalDatabase,
        ScenarioKind::KieServerWithMysql,
        ScenarioKind::KieServerWithPostgresql,
        ScenarioKind::WorkbenchRuntimeSmartRouterTwoKieServersTwoDatabases,
        ScenarioKind::ClusteredWorkbenchKieServerDatabasePersistent,
        ScenarioKind::ImmutableKieServer,
        ScenarioKind::ImmutableKieServerAmq,
        ScenarioKind::WorkbenchRuntimeSmartRouterImmutableKieServerAmqWithDatabase,
    ];

    /// The template file, relative to the configured template location.
    pub fn template_file(&self) -> &'static str {
        match self {
            ScenarioKind::WorkbenchKieServer => "rhpam-authoring.yaml",
            ScenarioKind::WorkbenchKieServerPersistent => "rhpam-authoring-persistent.yaml",
            ScenarioKind::KieServerWithExternalDatabase => "rhpam-kieserver-externaldb.yaml",
            ScenarioKind::KieServerWithMysql => "rhpam-kieserver-mysql.yaml",
            ScenarioKind::KieServerWithPostgresql => "rhpam-kieserver-postgresql.yaml",
            ScenarioKind::WorkbenchRuntimeSmartRouterTwoKieServersTwoDatabases => {
                "rhpam-production.yaml"
            }
            ScenarioKind::ClusteredWorkbenchKieServerDatabasePersistent => {
                "rhpam-authoring-ha.yaml"
            }
            ScenarioKind::ImmutableKieServer => "rhpam-prod-immutable-kieserver.yaml",
            ScenarioKind::ImmutableKieServerAmq => "rhpam-prod-immutable-kieserver-amq.yaml",
            ScenarioKind::WorkbenchRuntimeSmartRouterImmutableKieServerAmqWithDatabase => {
                "rhpam-prod-immutable-monitor-amq.yaml"
            }
        }
    }

    /// The roles deployed by the template of this scenario, in readiness order.
    pub fn roles(&self) -> &'static [Role] {
        match self {
            ScenarioKind::WorkbenchKieServer | ScenarioKind::WorkbenchKieServerPersistent => {
                &[Role::Workbench, Role::KieServer]
            }
            ScenarioKind::KieServerWithExternalDatabase
            | ScenarioKind::ImmutableKieServer
            | ScenarioKind::ImmutableKieServerAmq => &[Role::KieServer],
            ScenarioKind::KieServerWithMysql | ScenarioKind::KieServerWithPostgresql => {
                &[Role::Database, Role::KieServer]
            }
            ScenarioKind::WorkbenchRuntimeSmartRouterTwoKieServersTwoDatabases => &[
                Role::Database,
                Role::SecondDatabase,
                Role::Workbench,
                Role::SmartRouter,
                Role::KieServer,
                Role::SecondKieServer,
            ],
            ScenarioKind::ClusteredWorkbenchKieServerDatabasePersistent => {
                &[Role::Database, Role::Workbench, Role::KieServer]
            }
            ScenarioKind::WorkbenchRuntimeSmartRouterImmutableKieServerAmqWithDatabase => &[
                Role::Database,
                Role::Amq,
                Role::Workbench,
                Role::SmartRouter,
                Role::KieServer,
            ],
        }
    }

    /// The product images the template of this scenario pulls from image streams.
    pub fn images(&self) -> &'static [Image] {
        match self {
            ScenarioKind::WorkbenchKieServer | ScenarioKind::WorkbenchKieServerPersistent => {
                &[Image::Workbench, Image::KieServer]
            }
            ScenarioKind::KieServerWithExternalDatabase
            | ScenarioKind::ImmutableKieServer
            | ScenarioKind::ImmutableKieServerAmq => &[Image::KieServer],
            ScenarioKind::KieServerWithMysql => &[Image::KieServer, Image::Mysql],
            ScenarioKind::KieServerWithPostgresql => &[Image::KieServer, Image::Postgresql],
            ScenarioKind::WorkbenchRuntimeSmartRouterTwoKieServersTwoDatabases => &[
                Image::Console,
                Image::SmartRouter,
                Image::KieServer,
                Image::Mysql,
            ],
            ScenarioKind::ClusteredWorkbenchKieServerDatabasePersistent => {
                &[Image::Workbench, Image::KieServer, Image::Mysql]
            }
            ScenarioKind::WorkbenchRuntimeSmartRouterImmutableKieServerAmqWithDatabase => &[
                Image::Console,
                Image::SmartRouter,
                Image::KieServer,
                Image::Amq,
                Image::Mysql,
            ],
        }
    }

    /// The builder verbs this scenario accepts.
    pub fn verbs(&self) -> &'static [Verb] {
        match self {
            ScenarioKind::WorkbenchKieServer | ScenarioKind::WorkbenchKieServerPersistent => {
                WORKBENCH_KIE_SERVER_VERBS
            }
            ScenarioKind::KieServerWithExternalDatabase => EXTERNAL_DATABASE_VERBS,
            ScenarioKind::KieServerWithMysql | ScenarioKind::KieServerWithPostgresql => {
                KIE_SERVER_DATABASE_VERBS
            }
            ScenarioKind::WorkbenchRuntimeSmartRouterTwoKieServersTwoDatabases => {
                MONITORING_TWO_KIE_SERVERS_VERBS
            }
            ScenarioKind::ClusteredWorkbenchKieServerDatabasePersistent => CLUSTERED_VERBS,
            ScenarioKind::ImmutableKieServer => IMMUTABLE_VERBS,
            ScenarioKind::ImmutableKieServerAmq => IMMUTABLE_AMQ_VERBS,
            ScenarioKind::WorkbenchRuntimeSmartRouterImmutableKieServerAmqWithDatabase => {
                &Verb::ALL
            }
        }
    }

    pub fn supports(&self, verb: Verb) -> bool {
        self.verbs().contains(&verb)
    }

    /// Whether the kie-server image is built from source (S2I) rather than deployed from a
    /// template with containers added at runtime.
    pub fn is_immutable(&self) -> bool {
        matches!(
            self,
            ScenarioKind::ImmutableKieServer
                | ScenarioKind::ImmutableKieServerAmq
                | ScenarioKind::WorkbenchRuntimeSmartRouterImmutableKieServerAmqWithDatabase
        )
    }

    /// Whether the kie-server of this scenario is wired to an AMQ broker.
    pub fn is_amq_bearing(&self) -> bool {
        matches!(
            self,
            ScenarioKind::ImmutableKieServerAmq
                | ScenarioKind::WorkbenchRuntimeSmartRouterImmutableKieServerAmqWithDatabase
        )
    }

    /// Whether the workbench of this scenario is the monitoring console.
    pub fn has_monitoring(&self) -> bool {
        matches!(
            self,
            ScenarioKind::WorkbenchRuntimeSmartRouterTwoKieServersTwoDatabases
                | ScenarioKind::WorkbenchRuntimeSmartRouterImmutableKieServerAmqWithDatabase
        )
    }

    pub fn has_workbench(&self) -> bool {
        self.roles().contains(&Role::Workbench)
    }

    /// The flavor of the database deployed by the template, if any.
    pub fn database_flavor(&self) -> Option<DatabaseFlavor> {
        if !self.roles().contains(&Role::Database) {
            return None;
        }
        match self {
            ScenarioKind::KieServerWithPostgresql => Some(DatabaseFlavor::Postgresql),
            _ => Some(DatabaseFlavor::Mysql),
        }
    }

    /// The name of the service that the template creates for `role`, or `None` if this scenario
    /// does not deploy the role.
    pub fn service_name(&self, role: Role, application_name: &str) -> Option<String> {
        if !self.roles().contains(&role) {
            return None;
        }
        let suffix = match role {
            Role::Workbench if self.has_monitoring() => "rhpamcentrmon".to_string(),
            Role::Workbench => "rhpamcentr".to_string(),
            Role::KieServer => "kieserver".to_string(),
            Role::SecondKieServer => "kieserver-2".to_string(),
            Role::SmartRouter => "smartrouter".to_string(),
            Role::Amq => "amq-tcp".to_string(),
            Role::Database => self.database_flavor()?.service_suffix().to_string(),
            Role::SecondDatabase => {
                format!("kieserver-2-{}", self.database_flavor()?.service_suffix())
            }
            _ => return None,
        };
        Some(format!("{}-{}", application_name, suffix))
    }
}
