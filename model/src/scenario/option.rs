use super::{ScenarioBuilder, ScenarioKind, ScenarioRecipe, Verb};
use crate::error::{self, Result};
use crate::settings::{GitSettings, LdapSettings};
use crate::HarnessConfig;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

/// One builder verb and its arguments, in a form that can be written to a scenario file.
/// Applying an option to a builder calls the corresponding builder method.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioOption {
    #[serde(rename_all = "kebab-case")]
    WithInternalMavenRepo {
        #[serde(default = "default_wait_for_running")]
        wait_for_running: bool,
    },
    WithKieServerId(String),
    WithContainerDeployment(String),
    #[serde(rename_all = "kebab-case")]
    WithSourceLocation {
        reference: String,
        context_dir: String,
        #[serde(default)]
        artifact_dirs: Option<String>,
    },
    DeploySso,
    WithHttpKieServerHostname(String),
    WithHttpsKieServerHostname(String),
    WithDroolsServerFilterClasses(bool),
    WithLdap(LdapSettings),
    EnableExternalJmsSignalQueue(String),
    WithGitSettings(GitSettings),
    WithMonitoringK8sFileSystem(bool),
}

fn default_wait_for_running() -> bool {
    true
}

impl ScenarioOption {
    pub fn verb(&self) -> Verb {
        match self {
            ScenarioOption::WithInternalMavenRepo { .. } => Verb::WithInternalMavenRepo,
            ScenarioOption::WithKieServerId(_) => Verb::WithKieServerId,
            ScenarioOption::WithContainerDeployment(_) => Verb::WithContainerDeployment,
            ScenarioOption::WithSourceLocation { .. } => Verb::WithSourceLocation,
            ScenarioOption::DeploySso => Verb::DeploySso,
            ScenarioOption::WithHttpKieServerHostname(_) => Verb::WithHttpKieServerHostname,
            ScenarioOption::WithHttpsKieServerHostname(_) => Verb::WithHttpsKieServerHostname,
            ScenarioOption::WithDroolsServerFilterClasses(_) => {
                Verb::WithDroolsServerFilterClasses
            }
            ScenarioOption::WithLdap(_) => Verb::WithLdap,
            ScenarioOption::EnableExternalJmsSignalQueue(_) => Verb::EnableExternalJmsSignalQueue,
            ScenarioOption::WithGitSettings(_) => Verb::WithGitSettings,
            ScenarioOption::WithMonitoringK8sFileSystem(_) => Verb::WithMonitoringK8sFileSystem,
        }
    }
}

/// A scenario described in YAML:
///
/// ```yaml
/// kind: workbench-kie-server
/// options:
///   - with-internal-maven-repo:
///       wait-for-running: true
///   - with-kie-server-id: my-kie-server
///   - deploy-sso
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScenarioFile {
    pub kind: ScenarioKind,
    #[serde(default)]
    pub options: Vec<ScenarioOption>,
}

impl ScenarioFile {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context(error::ManifestParseSnafu {
            what: "scenario file",
        })
    }

    /// Replay the options, in order, on a fresh builder.
    pub fn builder(&self, config: &HarnessConfig) -> Result<ScenarioBuilder> {
        let mut builder = ScenarioBuilder::new(self.kind, config);
        for option in &self.options {
            builder.apply(option)?;
        }
        Ok(builder)
    }

    pub fn build(&self, config: &HarnessConfig) -> Result<ScenarioRecipe> {
        self.builder(config)?.build()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Image;

    fn config() -> HarnessConfig {
        let mut config = HarnessConfig::default();
        for image in Image::ALL {
            config.set_image_tag(image, format!("registry.example/{}:1", image.logical_name()));
        }
        config
    }

    #[test]
    fn parses_scenario_file() {
        let file = ScenarioFile::from_yaml(
            r#"
kind: workbench-kie-server
options:
  - with-internal-maven-repo:
      wait-for-running: false
  - with-kie-server-id: my-kie-server
  - deploy-sso
  - with-drools-server-filter-classes: true
"#,
        )
        .unwrap();
        assert_eq!(ScenarioKind::WorkbenchKieServer, file.kind);
        assert_eq!(
            vec![
                Verb::WithInternalMavenRepo,
                Verb::WithKieServerId,
                Verb::DeploySso,
                Verb::WithDroolsServerFilterClasses
            ],
            file.options
                .iter()
                .map(ScenarioOption::verb)
                .collect::<Vec<_>>()
        );
        let recipe = file.build(&config()).unwrap();
        assert_eq!(
            "my-kie-server",
            recipe.env[crate::constants::KIE_SERVER_ID].as_str()
        );
        assert!(!recipe.externals[0].wait_for_running);
    }

    #[test]
    fn maven_waits_by_default() {
        let file = ScenarioFile::from_yaml(
            "kind: kie-server-with-mysql\noptions:\n  - with-internal-maven-repo: {}\n",
        )
        .unwrap();
        assert_eq!(
            ScenarioOption::WithInternalMavenRepo {
                wait_for_running: true
            },
            file.options[0]
        );
    }

    #[test]
    fn unsupported_option_fails_replay() {
        let file = ScenarioFile {
            kind: ScenarioKind::WorkbenchKieServer,
            options: vec![ScenarioOption::WithContainerDeployment(
                "c=org.kie:kjar:1.0".to_string(),
            )],
        };
        let err = file.builder(&config()).unwrap_err();
        assert!(matches!(err, error::Error::OperationNotSupported { .. }));
    }

    #[test]
    fn unknown_kind_is_a_parse_error() {
        let err = ScenarioFile::from_yaml("kind: not-a-scenario\n").unwrap_err();
        assert!(matches!(err, error::Error::ManifestParse { .. }));
    }
}
