/*!

This library deploys KIE (business automation) scenarios onto OpenShift for tests. A test picks a
[`ScenarioKind`], configures it through a [`ScenarioBuilder`], and hands the resulting
[`ScenarioRecipe`] to a [`ScenarioManager`], which resolves image streams, provisions external
dependencies, applies the scenario template and returns a live [`Scenario`].

```no_run
# async fn run() -> kiecloud_model::Result<()> {
use kiecloud_model::clients::KubeClusterClient;
use kiecloud_model::{HarnessConfig, Role, ScenarioBuilder, ScenarioKind, ScenarioManager};
use std::sync::Arc;

let config = HarnessConfig::from_env()?;
let recipe = ScenarioBuilder::new(ScenarioKind::WorkbenchKieServer, &config)
    .with_internal_maven_repo(true)?
    .with_kie_server_id("my-server")?
    .build()?;
let client = Arc::new(KubeClusterClient::new(&config).await?);
let manager = ScenarioManager::new(client, config);
let scenario = manager.deploy(&recipe, "kie-test-1").await?;
println!("{:?}", scenario.deployment(Role::KieServer).and_then(|d| d.url()));
scenario.teardown().await;
# Ok(())
# }
```

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use configuration::{HarnessConfig, ProductProfile, ENV_PREFIX};
pub use error::{Error, Result};
pub use image_stream::{ImageStream, ImageStreamSpec};
pub use images::Image;
pub use scenario::{
    ExternalDeployment, ExternalKind, Role, ScenarioBuilder, ScenarioFile, ScenarioKind,
    ScenarioOption, ScenarioRecipe, Verb,
};
pub use scenario_manager::{DeploymentHandle, DeploymentState, Scenario, ScenarioManager};

pub mod clients;
mod configuration;
pub mod constants;
mod error;
pub mod image_stream;
pub mod images;
pub mod kie;
pub mod manifest;
pub mod scenario;
pub mod scenario_manager;
pub mod settings;
pub mod system;
pub mod wait;
