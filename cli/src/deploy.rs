use crate::plan::read_recipe;
use anyhow::{Context, Result};
use clap::{value_parser, Parser};
use kiecloud_model::ScenarioManager;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Deploy the scenario file at `path`, print where its deployments are reachable and tear it
/// down again unless `--keep` is given.
#[derive(Debug, Parser)]
pub(crate) struct Deploy {
    /// Path to a scenario YAML file.
    #[clap(value_parser = value_parser!(PathBuf))]
    path: PathBuf,

    /// The namespace to deploy into. It is created if it does not exist. Defaults to
    /// `kiecloud-<kind>`.
    #[clap(long, short = 'n')]
    namespace: Option<String>,

    /// Leave the scenario running instead of tearing it down once it is ready.
    #[clap(long)]
    keep: bool,
}

impl Deploy {
    pub(crate) async fn run(
        self,
        manager: ScenarioManager,
        cancel: CancellationToken,
    ) -> Result<()> {
        let recipe = read_recipe(&self.path, manager.config()).await?;
        let namespace = self
            .namespace
            .unwrap_or_else(|| format!("kiecloud-{}", recipe.kind));
        let scenario = manager
            .deploy_with_cancel(&recipe, &namespace, &cancel)
            .await
            .context(format!(
                "Unable to deploy '{}' into '{}'",
                recipe.kind, namespace
            ))?;
        for deployment in scenario.deployments() {
            println!(
                "{}\t{}\t{}",
                deployment.role(),
                deployment.service_name(),
                deployment.url().unwrap_or("-")
            );
        }
        if self.keep {
            println!("Scenario '{}' is ready in '{}'.", recipe.kind, namespace);
        } else {
            scenario.teardown().await;
            println!("Scenario in '{}' was torn down.", namespace);
        }
        Ok(())
    }
}
