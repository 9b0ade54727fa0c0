/*!

The scenario manager turns a [`ScenarioRecipe`] into a running [`Scenario`] in a namespace:
image streams, the credentials secret, external deployments and finally the scenario template.
Any failure after the namespace has been created tears the namespace down again before the
original error is returned.

!*/

mod deployment;
mod resolver;
mod scenario;

pub use deployment::{DeploymentHandle, DeploymentState};
pub use resolver::{ImageStreamPlan, ImageStreamResolver, PlannedStream, StreamState};
pub use scenario::Scenario;

use crate::clients::ClusterClient;
use crate::constants::{APPLICATION_NAME, IMAGE_STREAM_NAMESPACE, NAMESPACE_DELETION_TIMEOUT_SECS};
use crate::error::{self, Result};
use crate::scenario::{Role, ScenarioRecipe};
use crate::system::{contributed_parameters, credentials_secret_manifest, external_manifest};
use crate::wait::wait_for;
use crate::{manifest, HarnessConfig, Image};
use deployment::HandleTiming;
use lazy_static::lazy_static;
use log::{error, info, warn};
use snafu::ensure;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

lazy_static! {
    /// Namespaces currently owned by an orchestration or a live scenario in this process.
    static ref LEASED_NAMESPACES: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
}

/// Exclusive ownership of a namespace within the process. Released on drop.
#[derive(Debug)]
pub(crate) struct NamespaceLease {
    namespace: String,
}

impl NamespaceLease {
    fn acquire(namespace: &str) -> Result<Self> {
        let mut leased = LEASED_NAMESPACES
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        ensure!(
            leased.insert(namespace.to_string()),
            error::ResourceConflictSnafu {
                what: format!("namespace '{}' is in use by another scenario", namespace),
            }
        );
        Ok(Self {
            namespace: namespace.to_string(),
        })
    }
}

impl Drop for NamespaceLease {
    fn drop(&mut self) {
        LEASED_NAMESPACES
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.namespace);
    }
}

/// Run one orchestration step unless `cancel` has been (or becomes) triggered first.
pub(crate) async fn run_step<T, F>(cancel: &CancellationToken, step: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    ensure!(!cancel.is_cancelled(), error::CancelledSnafu);
    tokio::select! {
        biased;
        _ = cancel.cancelled() => error::CancelledSnafu.fail(),
        result = step => result,
    }
}

/// Request deletion of `namespace` and wait a bounded time for it to disappear. Errors are logged.
pub(crate) async fn delete_namespace_and_wait(
    client: &dyn ClusterClient,
    namespace: &str,
    poll_step: Duration,
) {
    if let Err(e) = client.delete_namespace(namespace).await {
        error!("Unable to delete namespace '{}': {}", namespace, e);
        return;
    }
    let gone = wait_for(
        move || async move { matches!(client.namespace_exists(namespace).await, Ok(false)) },
        poll_step,
        Duration::from_secs(NAMESPACE_DELETION_TIMEOUT_SECS),
    )
    .await;
    if gone {
        info!("Namespace '{}' deleted", namespace);
    } else {
        warn!(
            "Namespace '{}' still exists after {} seconds",
            namespace, NAMESPACE_DELETION_TIMEOUT_SECS
        );
    }
}

/// # Scenario Manager
///
/// Deploys scenario recipes through a [`ClusterClient`]. A deployment runs these steps in order:
///
/// 1. Create the namespace.
/// 2. Resolve image streams.
/// 3. Apply the credentials secret.
/// 4. Provision the external deployments, waiting for those that ask for it.
/// 5. Apply the rendered scenario template.
/// 6. Wait for every deployment to become ready.
///
/// Configuration problems (missing image tags or template parameters) are reported before the
/// namespace is touched.
pub struct ScenarioManager {
    client: Arc<dyn ClusterClient>,
    config: HarnessConfig,
}

impl ScenarioManager {
    pub fn new(client: Arc<dyn ClusterClient>, config: HarnessConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> Arc<dyn ClusterClient> {
        Arc::clone(&self.client)
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Deploy `recipe` into `namespace`.
    pub async fn deploy(&self, recipe: &ScenarioRecipe, namespace: &str) -> Result<Scenario> {
        self.deploy_with_cancel(recipe, namespace, &CancellationToken::new())
            .await
    }

    /// Deploy `recipe` into `namespace`, giving up with `Cancelled` as soon as `cancel` is
    /// triggered.
    pub async fn deploy_with_cancel(
        &self,
        recipe: &ScenarioRecipe,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<Scenario> {
        let plan = ImageStreamPlan::new(&self.config, recipe.images())?;
        let template = self.render_template(recipe, namespace).await?;
        let lease = NamespaceLease::acquire(namespace)?;
        info!("Deploying scenario '{}' into '{}'", recipe.kind, namespace);
        run_step(cancel, self.client.ensure_namespace(namespace)).await?;
        match self
            .provision(recipe, namespace, &plan, &template, cancel)
            .await
        {
            Ok(deployments) => {
                info!("Scenario '{}' is ready in '{}'", recipe.kind, namespace);
                Ok(Scenario::new(
                    namespace,
                    self.application_name(recipe),
                    recipe.clone(),
                    deployments,
                    self.client(),
                    self.config.poll_step(),
                    lease,
                ))
            }
            Err(e) => {
                error!(
                    "Deploying scenario '{}' into '{}' failed: {}",
                    recipe.kind, namespace, e
                );
                delete_namespace_and_wait(self.client.as_ref(), namespace, self.config.poll_step())
                    .await;
                Err(e)
            }
        }
    }

    /// Create `namespace` if needed and resolve the image streams of the product profile in it.
    pub async fn resolve_image_streams(
        &self,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<Image, StreamState>> {
        let plan = ImageStreamPlan::new(&self.config, &[])?;
        run_step(cancel, self.client.ensure_namespace(namespace)).await?;
        ImageStreamResolver::new(self.client.as_ref(), &self.config)
            .resolve(namespace, &plan, cancel)
            .await
    }

    /// Delete a namespace left behind by an earlier run. Errors are logged, not returned.
    pub async fn teardown_namespace(&self, namespace: &str) {
        delete_namespace_and_wait(self.client.as_ref(), namespace, self.config.poll_step()).await
    }

    /// The parameters the scenario template of `recipe` is rendered with in `namespace`.
    pub fn template_parameters(
        &self,
        recipe: &ScenarioRecipe,
        namespace: &str,
    ) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        for external in &recipe.externals {
            params.extend(contributed_parameters(
                &external.kind,
                namespace,
                recipe,
                &self.config,
            ));
        }
        params.extend(recipe.parameters());
        params.insert(IMAGE_STREAM_NAMESPACE.to_string(), namespace.to_string());
        params
    }

    /// Load the scenario template of `recipe` and render it for `namespace`.
    pub async fn render_template(&self, recipe: &ScenarioRecipe, namespace: &str) -> Result<String> {
        let file = recipe.kind.template_file();
        let location = manifest::join_location(&self.config.templates, file);
        let source = manifest::load(&location).await?;
        let objects = manifest::render(
            &source,
            file,
            &self.template_parameters(recipe, namespace),
        )?;
        manifest::to_yaml(&objects, file)
    }

    fn application_name(&self, recipe: &ScenarioRecipe) -> String {
        recipe
            .env
            .get(APPLICATION_NAME)
            .cloned()
            .unwrap_or_else(|| self.config.application_name.clone())
    }

    fn handle(&self, role: Role, service: String, namespace: &str) -> DeploymentHandle {
        DeploymentHandle::new(
            role,
            service,
            namespace,
            self.client(),
            HandleTiming {
                poll_step: self.config.poll_step(),
                boot_timeout: self.config.boot_timeout(),
                scale_timeout: self.config.scale_timeout(),
            },
        )
    }

    async fn provision(
        &self,
        recipe: &ScenarioRecipe,
        namespace: &str,
        plan: &ImageStreamPlan,
        template: &str,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<Role, DeploymentHandle>> {
        ImageStreamResolver::new(self.client.as_ref(), &self.config)
            .resolve(namespace, plan, cancel)
            .await?;

        let secret = credentials_secret_manifest(&self.config)?;
        run_step(cancel, self.client.apply_manifest(namespace, &secret)).await?;

        let mut deployments = BTreeMap::new();
        for external in &recipe.externals {
            info!("Provisioning external {} in '{}'", external.kind, namespace);
            let objects = external_manifest(&external.kind, recipe, &self.config)?;
            run_step(cancel, self.client.apply_manifest(namespace, &objects)).await?;
            let role = external.kind.role();
            let mut handle = self.handle(role, external.kind.service_name(), namespace);
            if external.wait_for_running {
                handle.wait_for_ready(cancel).await?;
            }
            deployments.insert(role, handle);
        }

        info!(
            "Applying template '{}' to '{}'",
            recipe.kind.template_file(),
            namespace
        );
        run_step(cancel, self.client.apply_manifest(namespace, template)).await?;

        let application_name = self.application_name(recipe);
        for role in recipe.kind.roles() {
            if let Some(service) = recipe.kind.service_name(*role, &application_name) {
                deployments.insert(*role, self.handle(*role, service, namespace));
            }
        }
        for handle in deployments.values_mut() {
            if handle.state() == DeploymentState::Provisioning {
                handle.wait_for_ready(cancel).await?;
            }
        }
        Ok(deployments)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn namespace_lease_is_exclusive() {
        let lease = NamespaceLease::acquire("lease-test").unwrap();
        assert!(matches!(
            NamespaceLease::acquire("lease-test"),
            Err(crate::Error::ResourceConflict { .. })
        ));
        let other = NamespaceLease::acquire("lease-test-other").unwrap();
        drop(lease);
        let again = NamespaceLease::acquire("lease-test").unwrap();
        drop(again);
        drop(other);
    }

    #[tokio::test]
    async fn run_step_observes_cancellation() {
        let cancel = CancellationToken::new();
        assert_eq!(7, run_step(&cancel, async { Ok(7) }).await.unwrap());
        cancel.cancel();
        assert!(matches!(
            run_step(&cancel, async { Ok(7) }).await,
            Err(crate::Error::Cancelled)
        ));
    }
}
