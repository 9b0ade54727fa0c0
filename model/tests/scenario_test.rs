/*!

Deploys scenarios against the in-memory cluster from the `mock` module. Time is paused in these
tests, so the multi-second waits of the harness complete instantly.

!*/

mod mock;

use kiecloud_model::scenario_manager::StreamState;
use kiecloud_model::{
    DeploymentState, Error, HarnessConfig, Image, ProductProfile, Role, ScenarioBuilder,
    ScenarioKind, ScenarioManager, ScenarioRecipe,
};
use mock::MockCluster;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn config(templates: &TempDir) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.templates = templates.path().display().to_string();
    config.product_profile = Some(ProductProfile::Drools);
    config.boot_timeout_secs = 60;
    config.scale_timeout_secs = 30;
    for image in Image::ALL {
        config.set_image_tag(
            image,
            format!("registry.example/{}:test", image.image_stream_name()),
        );
    }
    config
}

fn write_template(dir: &TempDir, kind: ScenarioKind, services: &[&str]) {
    std::fs::write(
        dir.path().join(kind.template_file()),
        mock::template(services),
    )
    .unwrap();
}

fn workbench_with_maven(config: &HarnessConfig) -> ScenarioRecipe {
    ScenarioBuilder::new(ScenarioKind::WorkbenchKieServer, config)
        .with_internal_maven_repo(true)
        .unwrap()
        .build()
        .unwrap()
}

fn manager(cluster: &Arc<MockCluster>, config: HarnessConfig) -> ScenarioManager {
    ScenarioManager::new(cluster.clone(), config)
}

fn position(calls: &[String], prefix: &str) -> usize {
    calls
        .iter()
        .position(|call| call.starts_with(prefix))
        .unwrap_or_else(|| panic!("no call starting with '{}' in {:#?}", prefix, calls))
}

#[tokio::test(start_paused = true)]
async fn workbench_with_waited_maven_repository() {
    let templates = TempDir::new().unwrap();
    write_template(
        &templates,
        ScenarioKind::WorkbenchKieServer,
        &["rhpamcentr", "kieserver"],
    );
    let config = config(&templates);
    let cluster = Arc::new(MockCluster::new());
    let manager = manager(&cluster, config.clone());
    let recipe = workbench_with_maven(&config);

    let scenario = manager.deploy(&recipe, "deploy-s1").await.unwrap();

    let calls = cluster.calls();
    let namespace = position(&calls, "ensure_namespace deploy-s1");
    let stream = position(&calls, "create_image_stream deploy-s1 rhpam-kieserver-rhel8");
    let secret = position(&calls, "apply deploy-s1 Secret/kie-credentials-secret");
    let maven = position(
        &calls,
        "apply deploy-s1 Deployment/maven-repository,Service/maven-repository",
    );
    let template = position(
        &calls,
        "apply deploy-s1 Service/myapp-rhpamcentr,Service/myapp-kieserver",
    );
    assert!(namespace < stream && stream < secret && secret < maven && maven < template);

    assert_eq!(
        vec![Role::Workbench, Role::KieServer, Role::Maven],
        scenario.roles()
    );
    for handle in scenario.deployments() {
        assert_eq!(DeploymentState::Ready, handle.state());
    }
    assert_eq!(
        Some("http://myapp-kieserver.deploy-s1.svc:8080"),
        scenario.deployment(Role::KieServer).unwrap().url()
    );
    assert!(scenario.deployment(Role::SmartRouter).is_none());
    assert!(cluster
        .image_stream("deploy-s1", "rhpam-kieserver-rhel8")
        .unwrap()
        .has_tag_from("registry.example/rhpam-kieserver-rhel8:test"));
    assert_eq!("myapp-kieserver", scenario.kie_server_id());

    scenario.teardown().await;
}

#[tokio::test]
async fn missing_profile_tag_fails_before_the_cluster_is_touched() {
    let templates = TempDir::new().unwrap();
    let mut config = config(&templates);
    config.product_profile = Some(ProductProfile::Jbpm);
    config.set_image_tag(Image::Amq, "");
    let cluster = Arc::new(MockCluster::new());
    let manager = manager(&cluster, config.clone());
    let recipe = ScenarioBuilder::new(ScenarioKind::WorkbenchKieServer, &config)
        .build()
        .unwrap();

    match manager.deploy(&recipe, "deploy-s2").await {
        Err(Error::ConfigMissing { key }) => assert_eq!("KIE_CLOUD_IMAGE_TAG_AMQ", key),
        other => panic!("unexpected result {:?}", other),
    }
    assert!(cluster.calls().is_empty());
    assert!(!cluster.has_namespace("deploy-s2"));
}

#[tokio::test]
async fn missing_required_template_parameter() {
    let templates = TempDir::new().unwrap();
    std::fs::write(
        templates
            .path()
            .join(ScenarioKind::WorkbenchKieServer.template_file()),
        r#"kind: Template
apiVersion: template.openshift.io/v1
parameters:
- name: LICENSE_KEY
  required: true
objects: []
"#,
    )
    .unwrap();
    let config = config(&templates);
    let cluster = Arc::new(MockCluster::new());
    let manager = manager(&cluster, config.clone());

    match manager
        .deploy(&workbench_with_maven(&config), "deploy-params")
        .await
    {
        Err(Error::ConfigMissing { key }) => assert_eq!("LICENSE_KEY", key),
        other => panic!("unexpected result {:?}", other),
    }
    assert!(cluster.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn existing_stream_is_retagged() {
    let templates = TempDir::new().unwrap();
    let streams = templates.path().join("image-streams.yaml");
    std::fs::write(
        &streams,
        r#"apiVersion: image.openshift.io/v1
kind: ImageStream
metadata:
  name: rhpam-kieserver-rhel8
spec:
  tags:
  - name: "7.11.0"
    from:
      kind: DockerImage
      name: registry.redhat.io/rhpam-7/rhpam-kieserver-rhel8:7.11.0
---
apiVersion: image.openshift.io/v1
kind: ImageStream
metadata:
  name: rhpam-businesscentral-rhel8
spec:
  tags:
  - name: "7.11.0"
    from:
      kind: DockerImage
      name: registry.redhat.io/rhpam-7/rhpam-businesscentral-rhel8:7.11.0
"#,
    )
    .unwrap();
    let mut config = HarnessConfig::default();
    config.image_streams = Some(streams.display().to_string());
    config.set_image_tag(Image::KieServer, "registry.example/kieserver:custom");
    let cluster = Arc::new(MockCluster::new());
    let manager = manager(&cluster, config);

    let states = manager
        .resolve_image_streams("streams-s3", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(1, states.len());
    assert_eq!(Some(&StreamState::Observed), states.get(&Image::KieServer));
    let stream = cluster
        .image_stream("streams-s3", "rhpam-kieserver-rhel8")
        .unwrap();
    assert!(stream.has_tag_from("registry.example/kieserver:custom"));
    assert_eq!(Some("7.11.0"), stream.first_tag_name());
    // Streams without an override are left as the manifest defined them.
    assert!(cluster
        .image_stream("streams-s3", "rhpam-businesscentral-rhel8")
        .unwrap()
        .has_tag_from("registry.redhat.io/rhpam-7/rhpam-businesscentral-rhel8:7.11.0"));
    let calls = cluster.calls();
    position(
        &calls,
        "raw_tag streams-s3 registry.example/kieserver:custom rhpam-kieserver-rhel8:7.11.0",
    );
}

#[tokio::test(start_paused = true)]
async fn retag_that_never_lands_times_out() {
    let templates = TempDir::new().unwrap();
    let config = config(&templates);
    let cluster = MockCluster {
        ignore_tags: true,
        ..Default::default()
    };
    let stale = kiecloud_model::image_stream::new_image_stream(
        Image::Workbench,
        "registry.example/old:1",
    );
    cluster.insert_image_stream("streams-stale", stale);
    let cluster = Arc::new(cluster);
    let manager = manager(&cluster, config);

    let start = tokio::time::Instant::now();
    match manager
        .resolve_image_streams("streams-stale", &CancellationToken::new())
        .await
    {
        Err(Error::ImageStreamNotObserved { stream, tag }) => {
            assert_eq!("rhpam-businesscentral-rhel8", stream);
            assert_eq!("7.11.0", tag);
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert!(start.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn external_readiness_timeout_tears_down() {
    let templates = TempDir::new().unwrap();
    write_template(
        &templates,
        ScenarioKind::WorkbenchKieServer,
        &["rhpamcentr", "kieserver"],
    );
    let config = config(&templates);
    let cluster = Arc::new(MockCluster::new().with_stuck_service("maven-repository"));
    let manager = manager(&cluster, config.clone());

    match manager
        .deploy(&workbench_with_maven(&config), "deploy-s5")
        .await
    {
        Err(Error::ReadinessTimeout { role }) => assert_eq!("maven", role),
        other => panic!("unexpected result {:?}", other),
    }
    let calls = cluster.calls();
    assert_eq!(Some(&"delete_namespace deploy-s5".to_string()), calls.last());
    assert!(!cluster.has_namespace("deploy-s5"));
    // The template is never applied once an external deployment fails.
    assert!(!calls.iter().any(|call| call.contains("myapp-kieserver")));
}

#[tokio::test(start_paused = true)]
async fn unwaited_external_is_ready_before_return() {
    let templates = TempDir::new().unwrap();
    write_template(
        &templates,
        ScenarioKind::WorkbenchKieServer,
        &["rhpamcentr", "kieserver"],
    );
    let config = config(&templates);
    let cluster = Arc::new(MockCluster::new());
    let manager = manager(&cluster, config.clone());
    let recipe = ScenarioBuilder::new(ScenarioKind::WorkbenchKieServer, &config)
        .with_internal_maven_repo(false)
        .unwrap()
        .build()
        .unwrap();

    let scenario = manager.deploy(&recipe, "deploy-nowait").await.unwrap();
    let maven = scenario.deployment(Role::Maven).unwrap();
    assert_eq!(DeploymentState::Ready, maven.state());
    assert_eq!("maven-repository", maven.service_name());
    scenario.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn external_database_scenario() {
    let templates = TempDir::new().unwrap();
    write_template(
        &templates,
        ScenarioKind::KieServerWithExternalDatabase,
        &["kieserver"],
    );
    let config = config(&templates);
    let cluster = Arc::new(MockCluster::new());
    let manager = manager(&cluster, config.clone());
    let recipe = ScenarioBuilder::new(ScenarioKind::KieServerWithExternalDatabase, &config)
        .build()
        .unwrap();

    let scenario = manager.deploy(&recipe, "deploy-extdb").await.unwrap();
    assert_eq!(
        vec![Role::KieServer, Role::ExternalDatabase],
        scenario.roles()
    );
    assert!(cluster
        .applied_kinds("deploy-extdb")
        .contains(&"Deployment/external-mysql".to_string()));
    scenario.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn scaling_and_instance_replacement() {
    let templates = TempDir::new().unwrap();
    write_template(
        &templates,
        ScenarioKind::WorkbenchKieServer,
        &["rhpamcentr", "kieserver"],
    );
    let config = config(&templates);
    let cluster = Arc::new(MockCluster::new());
    let manager = manager(&cluster, config.clone());
    let mut scenario = manager
        .deploy(&workbench_with_maven(&config), "deploy-scale")
        .await
        .unwrap();

    let kie_server = scenario.deployment_mut(Role::KieServer).unwrap();
    kie_server.scale(3).await.unwrap();
    assert_eq!(DeploymentState::Ready, kie_server.state());
    let instances = kie_server.instances().await.unwrap();
    assert_eq!(3, instances.len());

    let victim = instances[0].clone();
    kie_server
        .delete_instances(std::slice::from_ref(&victim))
        .await
        .unwrap();
    let replaced = kie_server.instances().await.unwrap();
    assert_eq!(3, replaced.len());
    assert!(replaced.iter().all(|instance| instance.ready));
    assert!(!replaced.iter().any(|instance| instance.name == victim.name));
    position(
        &cluster.calls(),
        &format!("delete_pod deploy-scale {} 0", victim.name),
    );

    kie_server.scale(0).await.unwrap();
    assert!(kie_server.instances().await.unwrap().is_empty());

    scenario.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn scaling_missing_deployment() {
    let templates = TempDir::new().unwrap();
    write_template(
        &templates,
        ScenarioKind::WorkbenchKieServer,
        &["rhpamcentr", "kieserver"],
    );
    let config = config(&templates);
    let cluster = Arc::new(MockCluster::new());
    let manager = manager(&cluster, config.clone());
    let mut scenario = manager
        .deploy(&workbench_with_maven(&config), "deploy-gone")
        .await
        .unwrap();
    cluster
        .state
        .lock()
        .unwrap()
        .deployments
        .retain(|(_, service), _| service != "myapp-kieserver");

    let kie_server = scenario.deployment_mut(Role::KieServer).unwrap();
    assert!(matches!(
        kie_server.scale(2).await,
        Err(Error::DeploymentNotFound { .. })
    ));
    assert_eq!(DeploymentState::Scaling, kie_server.state());
    scenario.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn teardown_removes_everything_and_releases_the_namespace() {
    let templates = TempDir::new().unwrap();
    write_template(
        &templates,
        ScenarioKind::WorkbenchKieServer,
        &["rhpamcentr", "kieserver"],
    );
    let config = config(&templates);
    let cluster = Arc::new(MockCluster::new());
    let manager = manager(&cluster, config.clone());
    let recipe = workbench_with_maven(&config);

    let scenario = manager.deploy(&recipe, "deploy-teardown").await.unwrap();
    scenario.teardown().await;

    assert!(!cluster.has_namespace("deploy-teardown"));
    assert!(cluster.applied_kinds("deploy-teardown").is_empty());
    assert!(cluster
        .image_stream("deploy-teardown", "rhpam-kieserver-rhel8")
        .is_none());
    assert!(cluster
        .instances("deploy-teardown", "myapp-kieserver")
        .is_empty());

    let again = manager.deploy(&recipe, "deploy-teardown").await.unwrap();
    again.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn namespace_in_use_is_a_conflict() {
    let templates = TempDir::new().unwrap();
    write_template(
        &templates,
        ScenarioKind::WorkbenchKieServer,
        &["rhpamcentr", "kieserver"],
    );
    let config = config(&templates);
    let cluster = Arc::new(MockCluster::new());
    let manager = manager(&cluster, config.clone());
    let recipe = workbench_with_maven(&config);

    let scenario = manager.deploy(&recipe, "deploy-busy").await.unwrap();
    assert!(matches!(
        manager.deploy(&recipe, "deploy-busy").await,
        Err(Error::ResourceConflict { .. })
    ));
    // The live scenario is untouched.
    assert!(cluster.has_namespace("deploy-busy"));
    scenario.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn cancellation_tears_down() {
    let templates = TempDir::new().unwrap();
    write_template(
        &templates,
        ScenarioKind::WorkbenchKieServer,
        &["rhpamcentr", "kieserver"],
    );
    let config = config(&templates);
    let cluster = Arc::new(MockCluster::new().with_stuck_service("myapp-kieserver"));
    let manager = manager(&cluster, config.clone());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        trigger.cancel();
    });

    let start = tokio::time::Instant::now();
    assert!(matches!(
        manager
            .deploy_with_cancel(&workbench_with_maven(&config), "deploy-cancel", &cancel)
            .await,
        Err(Error::Cancelled)
    ));
    assert!(start.elapsed() < Duration::from_secs(60));
    assert!(!cluster.has_namespace("deploy-cancel"));
}

#[tokio::test]
async fn unreachable_cluster() {
    let templates = TempDir::new().unwrap();
    write_template(
        &templates,
        ScenarioKind::WorkbenchKieServer,
        &["rhpamcentr", "kieserver"],
    );
    let config = config(&templates);
    let cluster = Arc::new(MockCluster {
        unreachable: true,
        ..Default::default()
    });
    let manager = manager(&cluster, config.clone());

    let error = manager
        .deploy(&workbench_with_maven(&config), "deploy-unreachable")
        .await
        .unwrap_err();
    assert_eq!("ClusterUnreachable", error.kind());
    assert_eq!(
        vec!["ensure_namespace deploy-unreachable".to_string()],
        cluster.calls()
    );
}

#[tokio::test]
async fn template_parameters_reach_the_rendered_objects() {
    let templates = TempDir::new().unwrap();
    write_template(
        &templates,
        ScenarioKind::WorkbenchKieServer,
        &["rhpamcentr", "kieserver"],
    );
    let config = config(&templates);
    let cluster = Arc::new(MockCluster::new());
    let manager = manager(&cluster, config.clone());
    let recipe = workbench_with_maven(&config);

    let params = manager.template_parameters(&recipe, "render-ns");
    assert_eq!("render-ns", params["IMAGE_STREAM_NAMESPACE"]);
    assert_eq!("myapp", params["APPLICATION_NAME"]);
    assert!(params["MAVEN_REPO_URL"].contains("maven-repository.render-ns.svc"));

    let rendered = manager.render_template(&recipe, "render-ns").await.unwrap();
    let first = mock::first_object(&rendered);
    assert_eq!("myapp-rhpamcentr", first["metadata"]["name"].as_str().unwrap());
    assert_eq!(
        "render-ns",
        first["metadata"]["labels"]["namespace"].as_str().unwrap()
    );
    assert_eq!(
        params["MAVEN_REPO_URL"].as_str(),
        first["metadata"]["labels"]["maven"].as_str().unwrap()
    );
    assert!(cluster.calls().is_empty());
}
