use anyhow::Result;
use clap::Parser;
use kiecloud_model::ScenarioManager;

/// Delete a namespace left behind by a scenario and wait for it to disappear.
#[derive(Debug, Parser)]
pub(crate) struct Teardown {
    /// The namespace to delete.
    namespace: String,
}

impl Teardown {
    pub(crate) async fn run(self, manager: ScenarioManager) -> Result<()> {
        manager.teardown_namespace(&self.namespace).await;
        println!("Teardown of namespace '{}' finished.", self.namespace);
        Ok(())
    }
}
