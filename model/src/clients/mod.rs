/*!

The cluster client facade: the small set of cluster operations the harness needs. Everything
above this layer talks to the cluster only through [`ClusterClient`], so orchestration can be
exercised against an in-memory implementation.

!*/

mod kube_client;

pub use kube_client::KubeClusterClient;

use crate::error::Result;
use crate::image_stream::ImageStream;
use serde::{Deserialize, Serialize};

/// One running (or starting) instance of a deployment.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Instance {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    pub ready: bool,
}

/// Cluster operations used by the harness. Each operation either succeeds or fails with
/// `ClusterUnreachable` or `ResourceConflict`; `scale_deployment` may also fail with
/// `ReadinessTimeout`. Implementations are shared between orchestrations and must not hold
/// per-scenario state.
#[async_trait::async_trait]
pub trait ClusterClient: Send + Sync {
    /// Create the namespace if it does not exist.
    async fn ensure_namespace(&self, namespace: &str) -> Result<()>;

    async fn namespace_exists(&self, namespace: &str) -> Result<bool>;

    /// Request deletion of the namespace. Deleting a missing namespace is not an error.
    async fn delete_namespace(&self, namespace: &str) -> Result<()>;

    /// Create or update every object of the (already rendered) YAML stream in `namespace`.
    async fn apply_manifest(&self, namespace: &str, yaml: &str) -> Result<()>;

    async fn get_image_stream(&self, namespace: &str, name: &str) -> Result<Option<ImageStream>>;

    async fn create_image_stream(&self, namespace: &str, stream: &ImageStream) -> Result<()>;

    /// Point the image stream tag `target_ref` (`stream:tag`) at the registry reference
    /// `source_ref`.
    async fn raw_tag(
        &self,
        namespace: &str,
        source_ref: &str,
        target_ref: &str,
        insecure: bool,
    ) -> Result<()>;

    /// Set the replica count of the deployment behind `service` and block until `replicas` ready
    /// instances are observed.
    async fn scale_deployment(&self, namespace: &str, service: &str, replicas: u32) -> Result<()>;

    /// The pods selected by `service`.
    async fn list_instances(&self, namespace: &str, service: &str) -> Result<Vec<Instance>>;

    async fn delete_pod(&self, namespace: &str, pod: &str, grace_seconds: u32) -> Result<()>;

    /// The URL under which `service` is reachable, if the service exists.
    async fn service_url(&self, namespace: &str, service: &str) -> Result<Option<String>>;
}

/// Split an image stream tag reference `stream:tag` into its parts.
pub(crate) fn split_tag_reference(target_ref: &str) -> Option<(&str, &str)> {
    let (stream, tag) = target_ref.rsplit_once(':')?;
    if stream.is_empty() || tag.is_empty() {
        None
    } else {
        Some((stream, tag))
    }
}

#[test]
fn tag_references() {
    assert_eq!(
        Some(("rhpam-kieserver-rhel8", "7.11.0")),
        split_tag_reference("rhpam-kieserver-rhel8:7.11.0")
    );
    assert_eq!(None, split_tag_reference("rhpam-kieserver-rhel8"));
    assert_eq!(None, split_tag_reference(":7.11.0"));
}
