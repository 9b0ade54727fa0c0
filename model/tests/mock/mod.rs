/*!

An in-memory [`ClusterClient`] that lets the scenario manager be tested without a cluster.

Every `Service` object applied through `apply_manifest` becomes a deployment with one ready
instance, image streams are stored as they are created or tagged, and deleting a namespace drops
everything in it. Every call is recorded so tests can assert on the order of operations.

!*/

use kiecloud_model::clients::{ClusterClient, Instance};
use kiecloud_model::{Error, ImageStream, Result};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct ClusterState {
    pub namespaces: BTreeSet<String>,
    /// `(namespace, kind, name)` of every applied object.
    pub objects: Vec<(String, String, String)>,
    pub image_streams: BTreeMap<(String, String), ImageStream>,
    /// Instances keyed by `(namespace, service)`.
    pub deployments: BTreeMap<(String, String), Vec<Instance>>,
    pub calls: Vec<String>,
    next_instance: u32,
}

impl ClusterState {
    fn new_instance(&mut self, namespace: &str, service: &str, ready: bool) -> Instance {
        self.next_instance += 1;
        Instance {
            name: format!("{}-{}", service, self.next_instance),
            namespace: namespace.to_string(),
            phase: if ready { "Running" } else { "Pending" }.to_string(),
            ready,
        }
    }
}

/// See the module documentation.
#[derive(Debug, Default)]
pub struct MockCluster {
    pub state: Mutex<ClusterState>,
    /// Services whose instances never become ready.
    pub stuck_services: HashSet<String>,
    /// When set, `raw_tag` succeeds without changing the stream.
    pub ignore_tags: bool,
    /// When set, `ensure_namespace` fails as if the API server could not be reached.
    pub unreachable: bool,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stuck_service<S: Into<String>>(mut self, service: S) -> Self {
        self.stuck_services.insert(service.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.state.lock().unwrap().namespaces.contains(namespace)
    }

    pub fn applied_kinds(&self, namespace: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .objects
            .iter()
            .filter(|(ns, _, _)| ns == namespace)
            .map(|(_, kind, name)| format!("{}/{}", kind, name))
            .collect()
    }

    pub fn image_stream(&self, namespace: &str, name: &str) -> Option<ImageStream> {
        self.state
            .lock()
            .unwrap()
            .image_streams
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn insert_image_stream(&self, namespace: &str, stream: ImageStream) {
        let mut state = self.state.lock().unwrap();
        state.namespaces.insert(namespace.to_string());
        let name = stream.metadata.name.clone().unwrap();
        state
            .image_streams
            .insert((namespace.to_string(), name), stream);
    }

    pub fn instances(&self, namespace: &str, service: &str) -> Vec<Instance> {
        self.state
            .lock()
            .unwrap()
            .deployments
            .get(&(namespace.to_string(), service.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn unreachable_error(action: &str) -> Error {
    Error::ClusterUnreachable {
        action: action.to_string(),
        source: kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "connection refused".to_string(),
            reason: "ServiceUnavailable".to_string(),
            code: 503,
        }),
    }
}

#[async_trait::async_trait]
impl ClusterClient for MockCluster {
    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        self.record(format!("ensure_namespace {}", namespace));
        if self.unreachable {
            return Err(unreachable_error("create namespace"));
        }
        self.state
            .lock()
            .unwrap()
            .namespaces
            .insert(namespace.to_string());
        Ok(())
    }

    async fn namespace_exists(&self, namespace: &str) -> Result<bool> {
        Ok(self.has_namespace(namespace))
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        self.record(format!("delete_namespace {}", namespace));
        let mut state = self.state.lock().unwrap();
        state.namespaces.remove(namespace);
        state.objects.retain(|(ns, _, _)| ns != namespace);
        state.image_streams.retain(|(ns, _), _| ns != namespace);
        state.deployments.retain(|(ns, _), _| ns != namespace);
        Ok(())
    }

    async fn apply_manifest(&self, namespace: &str, yaml: &str) -> Result<()> {
        let objects = kiecloud_model::manifest::documents(yaml, "mock manifest")?;
        let mut names = Vec::new();
        for object in objects {
            let kind = object["kind"].as_str().unwrap_or_default().to_string();
            let name = object["metadata"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            names.push(format!("{}/{}", kind, name));
            let mut state = self.state.lock().unwrap();
            match kind.as_str() {
                "ImageStream" => {
                    let mut stream: ImageStream = serde_yaml::from_value(object.clone()).unwrap();
                    stream.metadata.namespace = Some(namespace.to_string());
                    state
                        .image_streams
                        .insert((namespace.to_string(), name.clone()), stream);
                }
                "Service" => {
                    let key = (namespace.to_string(), name.clone());
                    if !state.deployments.contains_key(&key) {
                        let ready = !self.stuck_services.contains(&name);
                        let instance = state.new_instance(namespace, &name, ready);
                        state.deployments.insert(key, vec![instance]);
                    }
                }
                _ => {}
            }
            state.objects.push((namespace.to_string(), kind, name));
        }
        self.record(format!("apply {} {}", namespace, names.join(",")));
        Ok(())
    }

    async fn get_image_stream(&self, namespace: &str, name: &str) -> Result<Option<ImageStream>> {
        Ok(self.image_stream(namespace, name))
    }

    async fn create_image_stream(&self, namespace: &str, stream: &ImageStream) -> Result<()> {
        let name = stream.metadata.name.clone().unwrap_or_default();
        self.record(format!("create_image_stream {} {}", namespace, name));
        let mut state = self.state.lock().unwrap();
        let key = (namespace.to_string(), name.clone());
        if state.image_streams.contains_key(&key) {
            return Err(Error::ResourceConflict {
                what: format!("image stream '{}' already exists", name),
            });
        }
        state.image_streams.insert(key, stream.clone());
        Ok(())
    }

    async fn raw_tag(
        &self,
        namespace: &str,
        source_ref: &str,
        target_ref: &str,
        insecure: bool,
    ) -> Result<()> {
        self.record(format!("raw_tag {} {} {}", namespace, source_ref, target_ref));
        if self.ignore_tags {
            return Ok(());
        }
        let (stream, tag) = target_ref.rsplit_once(':').unwrap();
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state
            .image_streams
            .get_mut(&(namespace.to_string(), stream.to_string()))
        {
            existing.retag(tag, source_ref, insecure);
        }
        Ok(())
    }

    async fn scale_deployment(&self, namespace: &str, service: &str, replicas: u32) -> Result<()> {
        self.record(format!("scale {} {} {}", namespace, service, replicas));
        let mut state = self.state.lock().unwrap();
        let key = (namespace.to_string(), service.to_string());
        if !state.deployments.contains_key(&key) {
            return Err(Error::DeploymentNotFound {
                namespace: namespace.to_string(),
                service: service.to_string(),
            });
        }
        if self.stuck_services.contains(service) {
            return Err(Error::ReadinessTimeout {
                role: service.to_string(),
            });
        }
        let mut instances = state.deployments.get(&key).cloned().unwrap_or_default();
        instances.truncate(replicas as usize);
        while instances.len() < replicas as usize {
            let instance = state.new_instance(namespace, service, true);
            instances.push(instance);
        }
        state.deployments.insert(key, instances);
        Ok(())
    }

    async fn list_instances(&self, namespace: &str, service: &str) -> Result<Vec<Instance>> {
        Ok(self.instances(namespace, service))
    }

    async fn delete_pod(&self, namespace: &str, pod: &str, grace_seconds: u32) -> Result<()> {
        self.record(format!("delete_pod {} {} {}", namespace, pod, grace_seconds));
        let mut state = self.state.lock().unwrap();
        let owner = state
            .deployments
            .iter()
            .find(|((ns, _), instances)| {
                ns == namespace && instances.iter().any(|instance| instance.name == pod)
            })
            .map(|(key, _)| key.clone());
        if let Some(key) = owner {
            let replacement = state.new_instance(namespace, &key.1, true);
            let instances = state.deployments.entry(key).or_default();
            instances.retain(|instance| instance.name != pod);
            instances.push(replacement);
        }
        Ok(())
    }

    async fn service_url(&self, namespace: &str, service: &str) -> Result<Option<String>> {
        let known = self
            .state
            .lock()
            .unwrap()
            .deployments
            .contains_key(&(namespace.to_string(), service.to_string()));
        Ok(known.then(|| format!("http://{}.{}.svc:8080", service, namespace)))
    }
}

/// A scenario template that creates a service for each of `services`. Every service name is
/// prefixed with the `APPLICATION_NAME` parameter.
pub fn template(services: &[&str]) -> String {
    let mut objects = Vec::new();
    for service in services {
        objects.push(format!(
            r#"
- kind: Service
  apiVersion: v1
  metadata:
    name: "${{APPLICATION_NAME}}-{}"
    labels:
      maven: "${{MAVEN_REPO_URL}}"
      namespace: "${{IMAGE_STREAM_NAMESPACE}}"
  spec:
    selector:
      deploymentConfig: "${{APPLICATION_NAME}}-{}""#,
            service, service
        ));
    }
    format!(
        r#"kind: Template
apiVersion: template.openshift.io/v1
metadata:
  name: test-template
parameters:
- name: APPLICATION_NAME
  value: myapp
  required: true
- name: IMAGE_STREAM_NAMESPACE
  required: true
- name: MAVEN_REPO_URL
- name: KIE_SERVER_ID
objects:{}
"#,
        objects.join("")
    )
}

/// Find a value in the first object of a rendered YAML stream, for assertions on substitutions.
pub fn first_object(yaml: &str) -> Value {
    kiecloud_model::manifest::documents(yaml, "rendered")
        .unwrap()
        .into_iter()
        .next()
        .unwrap()
}
