use crate::test_settings::TestSettings;
use anyhow::{format_err, Context, Result};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::PostParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, CustomResourceExt};
use std::convert::TryInto;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

pub const KUBECONFIG_FILENAME: &str = "kubeconfig.yaml";

/// Represents a `kind` cluster. The `Drop` trait is implemented deleting the `kind` cluster when it
/// goes out of scope.
#[derive(Debug)]
pub struct Cluster {
    name: String,
    kubeconfig_dir: TempDir,
}

impl Cluster {
    /// Creates a `Cluster` while initializing a kind cluster. If a cluster named `cluster_name`
    ///  already exists, it will be deleted.
    pub fn new(cluster_name: &str) -> Result<Cluster> {
        let kubeconfig_dir = TempDir::new()?;
        Self::delete_kind_cluster(cluster_name)?;
        Self::create_kind_cluster(
            cluster_name,
            &kubeconfig_dir.path().join(KUBECONFIG_FILENAME),
        )?;
        Ok(Self {
            name: cluster_name.into(),
            kubeconfig_dir,
        })
    }

    /// Returns the path to the kubeconfig file in the `TempDir` created for the cluster.
    pub fn kubeconfig(&self) -> PathBuf {
        self.kubeconfig_dir.path().join(KUBECONFIG_FILENAME)
    }

    /// Create the k8s client for the cluster.
    pub async fn k8s_client(&self) -> Result<Client> {
        let kubeconfig = Kubeconfig::read_from(self.kubeconfig())?;
        let config =
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        Ok(config.try_into()?)
    }

    /// Install the CRD of `K`, so that OpenShift-only kinds can be exercised on a plain cluster,
    /// and wait for the API server to serve it.
    pub async fn install_crd<K: CustomResourceExt>(&self, timeout: Duration) -> Result<()> {
        let client = self.k8s_client().await?;
        let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
        let crd = K::crd();
        let name = crd
            .metadata
            .name
            .clone()
            .ok_or_else(|| format_err!("CRD has no name"))?;
        crds.create(&PostParams::default(), &crd)
            .await
            .with_context(|| format!("unable to create CRD '{}'", name))?;
        let api_resource = K::api_resource();
        let start = std::time::Instant::now();
        loop {
            let discovered = kube::discovery::oneshot::pinned_group(
                &client,
                &kube::core::GroupVersion::gv(&api_resource.group, &api_resource.version),
            )
            .await;
            if let Ok(group) = discovered {
                if group
                    .recommended_resources()
                    .iter()
                    .any(|(resource, _)| resource.kind == api_resource.kind)
                {
                    return Ok(());
                }
            }
            if start.elapsed() > timeout {
                return Err(format_err!("CRD '{}' was not served in time", name));
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    fn create_kind_cluster(name: &str, kubeconfig: &Path) -> Result<()> {
        let output = Command::new(TestSettings::kind_path())
            .arg("--kubeconfig")
            .arg(kubeconfig.to_str().ok_or_else(|| {
                format_err!("non utf-8 path '{}'", kubeconfig.to_string_lossy())
            })?)
            .arg("create")
            .arg("cluster")
            .arg("--name")
            .arg(name)
            .output()?;
        if !output.status.success() {
            return Err(format_err!(
                "'kind create cluster failed' with exit status '{}'\n\n{}\n\n{}",
                output.status.code().unwrap_or(1),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr),
            ));
        }
        Ok(())
    }

    fn delete_kind_cluster(name: &str) -> Result<()> {
        let output = Command::new(TestSettings::kind_path())
            .arg("delete")
            .arg("cluster")
            .arg("--name")
            .arg(name)
            .output()?;
        if !output.status.success() {
            return Err(format_err!(
                "'kind delete cluster' failed with exit status '{}'\n\n{}\n\n{}",
                output.status.code().unwrap_or(1),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr),
            ));
        }
        Ok(())
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        if let Err(e) = Self::delete_kind_cluster(&self.name) {
            eprintln!("unable to delete kind cluster '{}': {}", self.name, e)
        }
    }
}
