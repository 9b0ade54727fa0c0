use super::{delete_namespace_and_wait, DeploymentHandle, NamespaceLease};
use crate::clients::ClusterClient;
use crate::constants::KIE_SERVER_ID;
use crate::scenario::{Role, ScenarioRecipe};
use log::info;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

/// A deployed scenario. The scenario owns its namespace for as long as it lives; call
/// [`Scenario::teardown`] to remove everything it created.
pub struct Scenario {
    namespace: String,
    application_name: String,
    recipe: ScenarioRecipe,
    deployments: BTreeMap<Role, DeploymentHandle>,
    client: Arc<dyn ClusterClient>,
    poll_step: Duration,
    _lease: NamespaceLease,
}

impl Debug for Scenario {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("namespace", &self.namespace)
            .field("kind", &self.recipe.kind)
            .field("deployments", &self.deployments)
            .finish()
    }
}

impl Scenario {
    pub(crate) fn new(
        namespace: &str,
        application_name: String,
        recipe: ScenarioRecipe,
        deployments: BTreeMap<Role, DeploymentHandle>,
        client: Arc<dyn ClusterClient>,
        poll_step: Duration,
        lease: NamespaceLease,
    ) -> Self {
        Self {
            namespace: namespace.to_string(),
            application_name,
            recipe,
            deployments,
            client,
            poll_step,
            _lease: lease,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn recipe(&self) -> &ScenarioRecipe {
        &self.recipe
    }

    /// The handle of the deployment playing `role`, if the scenario has one.
    pub fn deployment(&self, role: Role) -> Option<&DeploymentHandle> {
        self.deployments.get(&role)
    }

    pub fn deployment_mut(&mut self, role: Role) -> Option<&mut DeploymentHandle> {
        self.deployments.get_mut(&role)
    }

    pub fn deployments(&self) -> impl Iterator<Item = &DeploymentHandle> {
        self.deployments.values()
    }

    pub fn roles(&self) -> Vec<Role> {
        self.deployments.keys().copied().collect()
    }

    /// The id under which the first KIE server registers with its controller.
    pub fn kie_server_id(&self) -> String {
        self.recipe
            .env
            .get(KIE_SERVER_ID)
            .cloned()
            .unwrap_or_else(|| format!("{}-kieserver", self.application_name))
    }

    /// Delete the namespace of the scenario and wait for it to disappear. Failures are logged,
    /// never returned, so teardown can always run at the end of a test.
    pub async fn teardown(mut self) {
        info!("Tearing down scenario in '{}'", self.namespace);
        for handle in self.deployments.values_mut() {
            handle.terminate();
        }
        delete_namespace_and_wait(self.client.as_ref(), &self.namespace, self.poll_step).await;
    }
}
