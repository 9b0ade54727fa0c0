use super::{split_tag_reference, ClusterClient, Instance};
use crate::constants::{APP_MANAGED_BY, FIELD_MANAGER};
use crate::error::{self, KubeResultExt, Result};
use crate::image_stream::ImageStream;
use crate::wait::wait_for;
use crate::{manifest, HarnessConfig};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Pod, Service};
use kube::api::{DeleteParams, ListParams, ObjectMeta, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{DynamicObject, GroupVersionKind};
use kube::discovery::{self, ApiResource, Scope};
use kube::{Api, ResourceExt};
use log::{debug, trace};
use maplit::btreemap;
use serde_json::json;
use snafu::{OptionExt, ResultExt};
use std::path::Path;
use std::time::Duration;

const DEPLOYMENT_CONFIG_GROUP: &str = "apps.openshift.io";
const ROUTE_GROUP: &str = "route.openshift.io";

/// Returns `true` if `error` is an API response with the HTTP status `code`.
fn is_status(error: &kube::Error, code: u16) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == code)
}

/// The `ClusterClient` backed by a Kubernetes (or OpenShift) API server.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: kube::Client,
    scale_timeout: Duration,
    poll_step: Duration,
}

impl KubeClusterClient {
    /// Create a client from the default kubeconfig or in-cluster configuration.
    pub async fn new(config: &HarnessConfig) -> Result<Self> {
        let client = kube::Client::try_default()
            .await
            .kube_context("initialize the k8s client")?;
        Ok(Self::new_from_k8s_client(client, config))
    }

    /// Create a client from the kubeconfig file at `kubeconfig_path`.
    pub async fn new_from_kubeconfig_path(
        kubeconfig_path: &Path,
        config: &HarnessConfig,
    ) -> Result<Self> {
        let kubeconfig =
            Kubeconfig::read_from(kubeconfig_path).context(error::KubeconfigReadSnafu)?;
        let k8s_config =
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context(error::KubeconfigReadSnafu)?;
        let client = kube::Client::try_from(k8s_config)
            .kube_context("create client from kubeconfig")?;
        Ok(Self::new_from_k8s_client(client, config))
    }

    pub fn new_from_k8s_client(client: kube::Client, config: &HarnessConfig) -> Self {
        Self {
            client,
            scale_timeout: config.scale_timeout(),
            poll_step: config.poll_step(),
        }
    }

    pub fn k8s_client(&self) -> kube::Client {
        self.client.clone()
    }

    fn image_streams(&self, namespace: &str) -> Api<ImageStream> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn deployment_configs(&self, namespace: &str) -> Api<DynamicObject> {
        let resource = ApiResource::from_gvk(&GroupVersionKind::gvk(
            DEPLOYMENT_CONFIG_GROUP,
            "v1",
            "DeploymentConfig",
        ));
        Api::namespaced_with(self.client.clone(), namespace, &resource)
    }

    fn routes(&self, namespace: &str) -> Api<DynamicObject> {
        let resource = ApiResource::from_gvk(&GroupVersionKind::gvk(ROUTE_GROUP, "v1", "Route"));
        Api::namespaced_with(self.client.clone(), namespace, &resource)
    }

    async fn apply_object(&self, namespace: &str, mut object: DynamicObject) -> Result<()> {
        let types = object.types.clone().context(error::ManifestObjectSnafu {
            reason: "object is missing 'apiVersion' or 'kind'",
        })?;
        let name = object.metadata.name.clone().context(error::ManifestObjectSnafu {
            reason: format!("{} without 'metadata.name'", types.kind),
        })?;
        let (group, version) = match types.api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", types.api_version.as_str()),
        };
        let gvk = GroupVersionKind::gvk(group, version, &types.kind);
        let (resource, capabilities) = discovery::pinned_kind(&self.client, &gvk)
            .await
            .kube_context(format!("discover the API of '{}'", types.api_version))?;
        let api: Api<DynamicObject> = if capabilities.scope == Scope::Namespaced {
            object.metadata.namespace = Some(namespace.to_string());
            Api::namespaced_with(self.client.clone(), namespace, &resource)
        } else {
            Api::all_with(self.client.clone(), &resource)
        };
        trace!("Applying {} '{}' in '{}'", types.kind, name, namespace);
        api.patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&object),
        )
        .await
        .kube_context(format!("apply {} '{}'", types.kind, name))?;
        Ok(())
    }

    /// Returns `true` once `service` has exactly `replicas` instances and all of them are ready.
    async fn has_ready_replicas(&self, namespace: &str, service: &str, replicas: u32) -> bool {
        match self.list_instances(namespace, service).await {
            Ok(instances) => {
                instances.len() == replicas as usize && instances.iter().all(|pod| pod.ready)
            }
            Err(e) => {
                debug!("Unable to list instances of '{}': {}", service, e);
                false
            }
        }
    }
}

fn instance_from_pod(pod: Pod, namespace: &str) -> Instance {
    let status = pod.status.unwrap_or_default();
    let ready = status
        .conditions
        .unwrap_or_default()
        .iter()
        .any(|condition| condition.type_ == "Ready" && condition.status == "True");
    Instance {
        name: pod.metadata.name.unwrap_or_default(),
        namespace: namespace.to_string(),
        phase: status.phase.unwrap_or_else(|| "Unknown".to_string()),
        ready,
    }
}

#[async_trait::async_trait]
impl ClusterClient for KubeClusterClient {
    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let object = Namespace {
            metadata: ObjectMeta {
                name: Some(namespace.to_string()),
                labels: Some(btreemap! {
                    APP_MANAGED_BY.to_string() => FIELD_MANAGER.to_string(),
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        match api.create(&PostParams::default(), &object).await {
            Ok(_) => {
                debug!("Created namespace '{}'", namespace);
                Ok(())
            }
            Err(e) if is_status(&e, 409) => {
                debug!("Namespace '{}' already exists", namespace);
                Ok(())
            }
            Err(e) => Err(error::Error::from_kube(
                format!("create namespace '{}'", namespace),
                e,
            )),
        }
    }

    async fn namespace_exists(&self, namespace: &str) -> Result<bool> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(api
            .get_opt(namespace)
            .await
            .kube_context(format!("get namespace '{}'", namespace))?
            .is_some())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        match api.delete(namespace, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) if is_status(&e, 404) => Ok(()),
            Err(e) => Err(error::Error::from_kube(
                format!("delete namespace '{}'", namespace),
                e,
            )),
        }
    }

    async fn apply_manifest(&self, namespace: &str, yaml: &str) -> Result<()> {
        for document in manifest::documents(yaml, namespace)? {
            let object: DynamicObject =
                serde_yaml::from_value(document).context(error::ManifestParseSnafu {
                    what: format!("object applied to '{}'", namespace),
                })?;
            self.apply_object(namespace, object).await?;
        }
        Ok(())
    }

    async fn get_image_stream(&self, namespace: &str, name: &str) -> Result<Option<ImageStream>> {
        self.image_streams(namespace)
            .get_opt(name)
            .await
            .kube_context(format!("get image stream '{}'", name))
    }

    async fn create_image_stream(&self, namespace: &str, stream: &ImageStream) -> Result<()> {
        self.image_streams(namespace)
            .create(&PostParams::default(), stream)
            .await
            .kube_context(format!("create image stream '{}'", stream.name_any()))?;
        Ok(())
    }

    async fn raw_tag(
        &self,
        namespace: &str,
        source_ref: &str,
        target_ref: &str,
        insecure: bool,
    ) -> Result<()> {
        let (name, tag) =
            split_tag_reference(target_ref).context(error::ManifestObjectSnafu {
                reason: format!("'{}' is not an image stream tag reference", target_ref),
            })?;
        let api = self.image_streams(namespace);
        let mut stream = api
            .get(name)
            .await
            .kube_context(format!("get image stream '{}'", name))?;
        stream.retag(tag, source_ref, insecure);
        let patch = stream.tags_patch().context(error::SerializeSnafu {
            what: format!("tags of image stream '{}'", name),
        })?;
        api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .kube_context(format!("tag '{}' into '{}'", source_ref, target_ref))?;
        debug!("Tagged '{}' into '{}'", source_ref, target_ref);
        Ok(())
    }

    async fn scale_deployment(&self, namespace: &str, service: &str, replicas: u32) -> Result<()> {
        let patch = json!({ "spec": { "replicas": replicas } });
        let params = PatchParams::default();
        let deployment_configs = self.deployment_configs(namespace);
        // Clusters without OpenShift answer 404 for the whole API group.
        let deployment_config = match deployment_configs.get_opt(service).await {
            Ok(found) => found,
            Err(e) if is_status(&e, 404) => None,
            Err(e) => {
                return Err(error::Error::from_kube(
                    format!("get deployment config '{}'", service),
                    e,
                ))
            }
        };
        if deployment_config.is_some() {
            deployment_configs
                .patch(service, &params, &Patch::Merge(&patch))
                .await
                .kube_context(format!("scale deployment config '{}'", service))?;
        } else {
            let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
            deployments
                .get_opt(service)
                .await
                .kube_context(format!("get deployment '{}'", service))?
                .context(error::DeploymentNotFoundSnafu { namespace, service })?;
            deployments
                .patch(service, &params, &Patch::Merge(&patch))
                .await
                .kube_context(format!("scale deployment '{}'", service))?;
        }
        debug!("Scaling '{}' to {} replica(s)", service, replicas);
        let scaled = wait_for(
            move || self.has_ready_replicas(namespace, service, replicas),
            self.poll_step,
            self.scale_timeout,
        )
        .await;
        snafu::ensure!(scaled, error::ReadinessTimeoutSnafu { role: service });
        Ok(())
    }

    async fn list_instances(&self, namespace: &str, service: &str) -> Result<Vec<Instance>> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let selector = match services
            .get_opt(service)
            .await
            .kube_context(format!("get service '{}'", service))?
            .and_then(|service| service.spec)
            .and_then(|spec| spec.selector)
            .filter(|selector| !selector.is_empty())
        {
            Some(selector) => selector,
            None => return Ok(Vec::new()),
        };
        let selector = selector
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(",");
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&ListParams::default().labels(&selector))
            .await
            .kube_context(format!("list pods of '{}'", service))?;
        Ok(list
            .items
            .into_iter()
            .filter(|pod| pod.metadata.deletion_timestamp.is_none())
            .map(|pod| instance_from_pod(pod, namespace))
            .collect())
    }

    async fn delete_pod(&self, namespace: &str, pod: &str, grace_seconds: u32) -> Result<()> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = DeleteParams {
            grace_period_seconds: Some(grace_seconds),
            ..Default::default()
        };
        match pods.delete(pod, &params).await {
            Ok(_) => Ok(()),
            Err(e) if is_status(&e, 404) => Ok(()),
            Err(e) => Err(error::Error::from_kube(format!("delete pod '{}'", pod), e)),
        }
    }

    async fn service_url(&self, namespace: &str, service: &str) -> Result<Option<String>> {
        // Routes only exist on OpenShift; any failure to list them falls back to the service.
        if let Ok(routes) = self.routes(namespace).list(&ListParams::default()).await {
            let route = routes
                .items
                .into_iter()
                .find(|route| route.data["spec"]["to"]["name"].as_str() == Some(service));
            if let Some(route) = route {
                if let Some(host) = route.data["spec"]["host"].as_str() {
                    let scheme = if route.data["spec"]["tls"].is_object() {
                        "https"
                    } else {
                        "http"
                    };
                    return Ok(Some(format!("{}://{}", scheme, host)));
                }
            }
        }
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let found = services
            .get_opt(service)
            .await
            .kube_context(format!("get service '{}'", service))?;
        Ok(found.map(|found| {
            let port = found
                .spec
                .and_then(|spec| spec.ports)
                .and_then(|ports| ports.into_iter().next());
            service_address(service, namespace, port.map(|port| (port.port, port.name)))
        }))
    }
}

/// The in-cluster URL of a service, given its first port and the port's name.
fn service_address(service: &str, namespace: &str, port: Option<(i32, Option<String>)>) -> String {
    match port {
        Some((number, name)) => {
            let scheme = match name.as_deref() {
                Some(name) if name.contains("https") => "https",
                _ => "http",
            };
            format!("{}://{}.{}.svc:{}", scheme, service, namespace, number)
        }
        None => format!("http://{}.{}.svc", service, namespace),
    }
}


#[cfg(test)]
#[cfg(feature = "integ")]
mod integ {
    use super::*;
    use crate::image_stream::new_image_stream;
    use crate::system::credentials_secret_manifest;
    use crate::Image;
    use selftest::Cluster;

    const CLUSTER_NAME: &str = "kube-cluster-client";
    const NAMESPACE: &str = "kiecloud-integ";

    #[tokio::test]
    async fn image_streams_and_namespaces() {
        let cluster = Cluster::new(CLUSTER_NAME).unwrap();
        cluster
            .install_crd::<ImageStream>(Duration::from_secs(30))
            .await
            .unwrap();
        let config = HarnessConfig::default();
        let client =
            KubeClusterClient::new_from_kubeconfig_path(&cluster.kubeconfig(), &config)
                .await
                .unwrap();

        client.ensure_namespace(NAMESPACE).await.unwrap();
        client.ensure_namespace(NAMESPACE).await.unwrap();
        assert!(client.namespace_exists(NAMESPACE).await.unwrap());

        let stream_name = Image::KieServer.image_stream_name();
        assert!(client
            .get_image_stream(NAMESPACE, &stream_name)
            .await
            .unwrap()
            .is_none());
        let stream = new_image_stream(Image::KieServer, "registry.example/kieserver:1");
        client.create_image_stream(NAMESPACE, &stream).await.unwrap();
        assert!(matches!(
            client.create_image_stream(NAMESPACE, &stream).await,
            Err(crate::Error::ResourceConflict { .. })
        ));
        client
            .raw_tag(
                NAMESPACE,
                "registry.example/kieserver:2",
                &format!("{}:{}", stream_name, Image::KieServer.image_version()),
                true,
            )
            .await
            .unwrap();
        let tagged = client
            .get_image_stream(NAMESPACE, &stream_name)
            .await
            .unwrap()
            .unwrap();
        assert!(tagged.has_tag_from("registry.example/kieserver:2"));

        let secret = credentials_secret_manifest(&config).unwrap();
        client.apply_manifest(NAMESPACE, &secret).await.unwrap();
        // Applying the same objects again is an update, not a conflict.
        client.apply_manifest(NAMESPACE, &secret).await.unwrap();

        assert!(matches!(
            client.scale_deployment(NAMESPACE, "missing", 1).await,
            Err(crate::Error::DeploymentNotFound { .. })
        ));
        assert_eq!(
            None,
            client.service_url(NAMESPACE, "missing").await.unwrap()
        );

        client.delete_namespace(NAMESPACE).await.unwrap();
        client.delete_namespace("never-created").await.unwrap();
    }
}
