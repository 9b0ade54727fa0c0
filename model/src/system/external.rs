use crate::constants::{
    AMQ_BROKER_URL, AMQ_PASSWORD, AMQ_USERNAME, APP_MANAGED_BY, APP_NAME, APP_PART_OF,
    AUTH_LDAP_URL, FIELD_MANAGER, GIT_SERVER_URL, KIECLOUD, KIE_SERVER_EXTERNALDB_DB,
    KIE_SERVER_EXTERNALDB_DIALECT, KIE_SERVER_EXTERNALDB_DRIVER, KIE_SERVER_EXTERNALDB_PWD,
    KIE_SERVER_EXTERNALDB_SERVICE_HOST, KIE_SERVER_EXTERNALDB_SERVICE_PORT,
    KIE_SERVER_EXTERNALDB_URL, KIE_SERVER_EXTERNALDB_USER, LABEL_EXTERNAL, MAVEN_REPO_ID,
    MAVEN_REPO_PASSWORD, MAVEN_REPO_URL, MAVEN_REPO_USERNAME,
};
use crate::error::{self, Result};
use crate::scenario::{ExternalKind, ScenarioRecipe};
use crate::settings::{DatabaseFlavor, ExternalDatabaseSettings, SsoSettings};
use crate::HarnessConfig;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, Probe, Service, ServicePort,
    ServiceSpec, TCPSocketAction,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use maplit::btreemap;
use snafu::ResultExt;
use std::collections::BTreeMap;

const MAVEN_REPOSITORY_PATH: &str = "repository/maven-releases/";
const MAVEN_REPOSITORY_ID: &str = "repo-custom";
const SSO_CONTEXT_PATH: &str = "auth";
const LDAP_DOMAIN: &str = "example.com";

/// How an external deployment is run: image, port and container environment.
struct ExternalContainer {
    image: String,
    port: i32,
    env: BTreeMap<String, String>,
}

fn container(kind: &ExternalKind, recipe: &ScenarioRecipe, config: &HarnessConfig) -> ExternalContainer {
    match kind {
        ExternalKind::MavenRepository => ExternalContainer {
            image: config.maven_image.clone(),
            port: 8081,
            env: BTreeMap::new(),
        },
        ExternalKind::GitServer => ExternalContainer {
            image: config.git_image.clone(),
            port: 3000,
            env: BTreeMap::new(),
        },
        ExternalKind::Ldap => ExternalContainer {
            image: config.ldap_image.clone(),
            port: 389,
            env: btreemap! {
                "LDAP_DOMAIN".to_string() => LDAP_DOMAIN.to_string(),
                "LDAP_ADMIN_PASSWORD".to_string() => config.app_password.clone(),
            },
        },
        ExternalKind::Sso => {
            let sso = sso_settings(recipe);
            ExternalContainer {
                image: config.sso_image.clone(),
                port: 8080,
                env: btreemap! {
                    "KEYCLOAK_USER".to_string() => sso.admin.username,
                    "KEYCLOAK_PASSWORD".to_string() => sso.admin.password,
                },
            }
        }
        ExternalKind::Database { flavor } => {
            let database = database_settings(*flavor, recipe);
            let (image, env) = match flavor {
                DatabaseFlavor::Mysql => (
                    config.mysql_image.clone(),
                    btreemap! {
                        "MYSQL_DATABASE".to_string() => database.database,
                        "MYSQL_USER".to_string() => database.credentials.username,
                        "MYSQL_PASSWORD".to_string() => database.credentials.password.clone(),
                        "MYSQL_ROOT_PASSWORD".to_string() => database.credentials.password,
                    },
                ),
                DatabaseFlavor::Postgresql => (
                    config.postgresql_image.clone(),
                    btreemap! {
                        "POSTGRES_DB".to_string() => database.database,
                        "POSTGRES_USER".to_string() => database.credentials.username,
                        "POSTGRES_PASSWORD".to_string() => database.credentials.password,
                    },
                ),
            };
            ExternalContainer {
                image,
                port: i32::from(flavor.port()),
                env,
            }
        }
        ExternalKind::AmqBroker => ExternalContainer {
            image: config.amq_image.clone(),
            port: 61616,
            env: btreemap! {
                "AMQ_USER".to_string() => config.app_username.clone(),
                "AMQ_PASSWORD".to_string() => config.app_password.clone(),
            },
        },
    }
}

fn sso_settings(recipe: &ScenarioRecipe) -> SsoSettings {
    recipe.settings.sso.clone().unwrap_or_default()
}

fn database_settings(flavor: DatabaseFlavor, recipe: &ScenarioRecipe) -> ExternalDatabaseSettings {
    recipe
        .settings
        .external_database
        .clone()
        .filter(|settings| settings.flavor == flavor)
        .unwrap_or_else(|| ExternalDatabaseSettings::default_for(flavor))
}

fn labels(kind: &ExternalKind) -> BTreeMap<String, String> {
    btreemap! {
        APP_NAME.to_string() => kind.service_name(),
        APP_PART_OF.to_string() => KIECLOUD.to_string(),
        APP_MANAGED_BY.to_string() => FIELD_MANAGER.to_string(),
        LABEL_EXTERNAL.to_string() => kind.role().to_string(),
    }
}

fn selector(kind: &ExternalKind) -> BTreeMap<String, String> {
    btreemap! {
        APP_NAME.to_string() => kind.service_name(),
        LABEL_EXTERNAL.to_string() => kind.role().to_string(),
    }
}

/// Defines the deployment of an external service.
pub fn external_deployment(
    kind: &ExternalKind,
    recipe: &ScenarioRecipe,
    config: &HarnessConfig,
) -> Deployment {
    let container = container(kind, recipe, config);
    let port = IntOrString::Int(container.port);
    Deployment {
        metadata: ObjectMeta {
            name: Some(kind.service_name()),
            labels: Some(labels(kind)),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selector(kind)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels(kind)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: kind.service_name(),
                        image: Some(container.image),
                        env: Some(
                            container
                                .env
                                .into_iter()
                                .map(|(name, value)| EnvVar {
                                    name,
                                    value: Some(value),
                                    ..Default::default()
                                })
                                .collect(),
                        ),
                        ports: Some(vec![ContainerPort {
                            container_port: container.port,
                            ..Default::default()
                        }]),
                        readiness_probe: Some(Probe {
                            tcp_socket: Some(TCPSocketAction {
                                port,
                                ..Default::default()
                            }),
                            period_seconds: Some(5),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Defines the service in front of an external deployment.
pub fn external_service(
    kind: &ExternalKind,
    recipe: &ScenarioRecipe,
    config: &HarnessConfig,
) -> Service {
    let port = container(kind, recipe, config).port;
    Service {
        metadata: ObjectMeta {
            name: Some(kind.service_name()),
            labels: Some(labels(kind)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector(kind)),
            ports: Some(vec![ServicePort {
                name: Some("tcp".to_string()),
                port,
                target_port: Some(IntOrString::Int(port)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// The external deployment and its service as a YAML stream, ready to be applied.
pub fn external_manifest(
    kind: &ExternalKind,
    recipe: &ScenarioRecipe,
    config: &HarnessConfig,
) -> Result<String> {
    let what = format!("external deployment '{}'", kind.service_name());
    let objects = vec![
        serde_yaml::to_value(external_deployment(kind, recipe, config))
            .context(error::ManifestParseSnafu { what: &what })?,
        serde_yaml::to_value(external_service(kind, recipe, config))
            .context(error::ManifestParseSnafu { what: &what })?,
    ];
    crate::manifest::to_yaml(&objects, &what)
}

/// The template parameters through which the scenario reaches an external deployment in
/// `namespace`.
pub fn contributed_parameters(
    kind: &ExternalKind,
    namespace: &str,
    recipe: &ScenarioRecipe,
    config: &HarnessConfig,
) -> BTreeMap<String, String> {
    let port = container(kind, recipe, config).port;
    let host = format!("{}.{}.svc", kind.service_name(), namespace);
    match kind {
        ExternalKind::MavenRepository => btreemap! {
            MAVEN_REPO_ID.to_string() => MAVEN_REPOSITORY_ID.to_string(),
            MAVEN_REPO_URL.to_string() =>
                format!("http://{}:{}/{}", host, port, MAVEN_REPOSITORY_PATH),
            MAVEN_REPO_USERNAME.to_string() => config.app_username.clone(),
            MAVEN_REPO_PASSWORD.to_string() => config.app_password.clone(),
        },
        ExternalKind::GitServer => btreemap! {
            GIT_SERVER_URL.to_string() => format!("http://{}:{}", host, port),
        },
        ExternalKind::Ldap => btreemap! {
            AUTH_LDAP_URL.to_string() => format!("ldap://{}:{}", host, port),
        },
        ExternalKind::Sso => sso_settings(recipe)
            .template_parameters(&format!("http://{}:{}/{}", host, port, SSO_CONTEXT_PATH)),
        ExternalKind::Database { flavor } => {
            let database = database_settings(*flavor, recipe);
            btreemap! {
                KIE_SERVER_EXTERNALDB_DRIVER.to_string() => flavor.driver().to_string(),
                KIE_SERVER_EXTERNALDB_DIALECT.to_string() => flavor.dialect().to_string(),
                KIE_SERVER_EXTERNALDB_SERVICE_HOST.to_string() => host.clone(),
                KIE_SERVER_EXTERNALDB_SERVICE_PORT.to_string() => port.to_string(),
                KIE_SERVER_EXTERNALDB_URL.to_string() => format!(
                    "jdbc:{}://{}:{}/{}",
                    flavor.service_suffix(),
                    host,
                    port,
                    database.database
                ),
                KIE_SERVER_EXTERNALDB_DB.to_string() => database.database,
                KIE_SERVER_EXTERNALDB_USER.to_string() => database.credentials.username,
                KIE_SERVER_EXTERNALDB_PWD.to_string() => database.credentials.password,
            }
        }
        ExternalKind::AmqBroker => btreemap! {
            AMQ_BROKER_URL.to_string() => format!("tcp://{}:{}", host, port),
            AMQ_USERNAME.to_string() => config.app_username.clone(),
            AMQ_PASSWORD.to_string() => config.app_password.clone(),
        },
    }
}
