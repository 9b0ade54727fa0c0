use anyhow::{Context, Result};
use clap::{value_parser, Parser};
use kiecloud_model::scenario_manager::ImageStreamPlan;
use kiecloud_model::{HarnessConfig, ScenarioFile, ScenarioRecipe};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Build the recipe of the scenario file at `path` and print it, with passwords and secrets
/// masked, along with the image stream plan.
#[derive(Debug, Parser)]
pub(crate) struct Plan {
    /// Path to a scenario YAML file.
    #[clap(value_parser = value_parser!(PathBuf))]
    path: PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct PlanOutput {
    recipe: ScenarioRecipe,
    image_streams: ImageStreamPlan,
}

impl Plan {
    pub(crate) async fn run(self, config: &HarnessConfig) -> Result<()> {
        let recipe = read_recipe(&self.path, config).await?;
        let image_streams = ImageStreamPlan::new(config, recipe.images())
            .context("Unable to plan image streams")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&PlanOutput {
                recipe: recipe.redacted(),
                image_streams
            })
            .context("Could not serialize the plan")?
        );
        Ok(())
    }
}

/// Read a scenario file and build its recipe.
pub(crate) async fn read_recipe(path: &Path, config: &HarnessConfig) -> Result<ScenarioRecipe> {
    let yaml = tokio::fs::read_to_string(path)
        .await
        .context(format!("Unable to read scenario file '{}'", path.display()))?;
    ScenarioFile::from_yaml(&yaml)
        .context(format!("Unable to parse scenario file '{}'", path.display()))?
        .build(config)
        .context("Invalid scenario")
}
