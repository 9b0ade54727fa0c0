use super::run_step;
use crate::clients::{ClusterClient, Instance};
use crate::constants::POD_DELETE_GRACE_SECS;
use crate::error::{self, Error, Result};
use crate::scenario::Role;
use crate::wait::{wait_until, WaitOutcome};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_plain::derive_display_from_serialize;
use snafu::ensure;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The lifecycle of a [`DeploymentHandle`].
///
/// ```text
/// Provisioning -> Ready <-> Scaling
///                 Ready <-> Draining
///                 any   ->  Terminated
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentState {
    Provisioning,
    Ready,
    Scaling,
    Draining,
    Terminated,
}

derive_display_from_serialize!(DeploymentState);

/// Timing used by a handle when it waits on the cluster.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct HandleTiming {
    pub(crate) poll_step: Duration,
    pub(crate) boot_timeout: Duration,
    pub(crate) scale_timeout: Duration,
}

/// A live deployment of a scenario role. Handles are owned by their
/// [`Scenario`](super::Scenario) and reach the cluster through the shared [`ClusterClient`].
pub struct DeploymentHandle {
    role: Role,
    service: String,
    namespace: String,
    state: DeploymentState,
    url: Option<String>,
    client: Arc<dyn ClusterClient>,
    timing: HandleTiming,
}

impl Debug for DeploymentHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentHandle")
            .field("role", &self.role)
            .field("service", &self.service)
            .field("namespace", &self.namespace)
            .field("state", &self.state)
            .field("url", &self.url)
            .finish()
    }
}

impl DeploymentHandle {
    pub(crate) fn new(
        role: Role,
        service: String,
        namespace: &str,
        client: Arc<dyn ClusterClient>,
        timing: HandleTiming,
    ) -> Self {
        Self {
            role,
            service,
            namespace: namespace.to_string(),
            state: DeploymentState::Provisioning,
            url: None,
            client,
            timing,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn service_name(&self) -> &str {
        &self.service
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn state(&self) -> DeploymentState {
        self.state
    }

    /// The URL of the deployment. Only available while the deployment is `Ready` or `Scaling`.
    pub fn url(&self) -> Option<&str> {
        match self.state {
            DeploymentState::Ready | DeploymentState::Scaling => self.url.as_deref(),
            _ => None,
        }
    }

    /// The current instances of the deployment.
    pub async fn instances(&self) -> Result<Vec<Instance>> {
        self.client
            .list_instances(&self.namespace, &self.service)
            .await
    }

    /// Wait until the deployment has at least one instance and all of its instances are ready.
    pub async fn wait_for_ready(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.ensure_live()?;
        self.wait_for_instances(self.timing.boot_timeout, cancel, |instances| {
            !instances.is_empty() && instances.iter().all(|instance| instance.ready)
        })
        .await?;
        self.mark_ready(cancel).await
    }

    /// Set the replica count and block until the deployment reports that many ready instances.
    /// The handle stays `Scaling` if the instances are not observed in time.
    pub async fn scale(&mut self, replicas: u32) -> Result<()> {
        self.ensure_live()?;
        info!(
            "Scaling '{}' in '{}' to {} replica(s)",
            self.service, self.namespace, replicas
        );
        self.state = DeploymentState::Scaling;
        let role = self.role;
        self.client
            .scale_deployment(&self.namespace, &self.service, replicas)
            .await
            .map_err(|e| match e {
                Error::ReadinessTimeout { .. } => Error::ReadinessTimeout {
                    role: role.to_string(),
                },
                e => e,
            })?;
        self.state = DeploymentState::Ready;
        Ok(())
    }

    /// Delete the given instances without a grace period and block until the deployment has
    /// replaced them with as many ready instances as it had before.
    pub async fn delete_instances(&mut self, instances: &[Instance]) -> Result<()> {
        self.ensure_live()?;
        let expected = self.instances().await?.len();
        self.state = DeploymentState::Draining;
        for instance in instances {
            info!(
                "Deleting instance '{}' of '{}'",
                instance.name, self.service
            );
            self.client
                .delete_pod(&self.namespace, &instance.name, POD_DELETE_GRACE_SECS)
                .await?;
        }
        let deleted: Vec<&str> = instances.iter().map(|i| i.name.as_str()).collect();
        let cancel = CancellationToken::new();
        self.wait_for_instances(self.timing.scale_timeout, &cancel, |current| {
            current.len() >= expected
                && current.iter().all(|instance| instance.ready)
                && current
                    .iter()
                    .all(|instance| !deleted.contains(&instance.name.as_str()))
        })
        .await?;
        self.state = DeploymentState::Ready;
        Ok(())
    }

    pub(crate) fn terminate(&mut self) {
        self.state = DeploymentState::Terminated;
        self.url = None;
    }

    fn ensure_live(&self) -> Result<()> {
        ensure!(
            self.state != DeploymentState::Terminated,
            error::InvalidScenarioConfigurationSnafu {
                reason: format!("deployment '{}' has been terminated", self.service),
            }
        );
        Ok(())
    }

    async fn mark_ready(&mut self, cancel: &CancellationToken) -> Result<()> {
        let url = run_step(
            cancel,
            self.client.service_url(&self.namespace, &self.service),
        )
        .await?;
        debug!("'{}' is ready at {:?}", self.service, url);
        self.url = url;
        self.state = DeploymentState::Ready;
        Ok(())
    }

    async fn wait_for_instances<P>(
        &self,
        total: Duration,
        cancel: &CancellationToken,
        accept: P,
    ) -> Result<()>
    where
        P: Fn(&[Instance]) -> bool,
    {
        let client = &self.client;
        let namespace = self.namespace.as_str();
        let service = self.service.as_str();
        let accept = &accept;
        let outcome = wait_until(
            move || async move {
                match client.list_instances(namespace, service).await {
                    Ok(instances) => accept(&instances),
                    Err(e) => {
                        debug!("Unable to list instances of '{}': {}", service, e);
                        false
                    }
                }
            },
            self.timing.poll_step,
            total,
            cancel,
        )
        .await;
        match outcome {
            WaitOutcome::Satisfied => Ok(()),
            WaitOutcome::TimedOut => error::ReadinessTimeoutSnafu {
                role: self.role.to_string(),
            }
            .fail(),
            WaitOutcome::Cancelled => error::CancelledSnafu.fail(),
        }
    }
}
