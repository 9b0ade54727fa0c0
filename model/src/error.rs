use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned by the harness. Each variant is a distinct failure kind that callers
/// are expected to match on; nothing is retried internally.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Required setting '{}' is not defined", key))]
    ConfigMissing { key: String },

    #[snafu(display("Unable to parse configuration from the environment: {}", source))]
    ConfigParse { source: envy::Error },

    #[snafu(display("Invalid scenario configuration: {}", reason))]
    InvalidScenarioConfiguration { reason: String },

    #[snafu(display("Invalid {} settings: {}", what, reason))]
    InvalidSettings { what: String, reason: String },

    #[snafu(display("'{}' is not supported by scenario '{}'", verb, kind))]
    OperationNotSupported { verb: String, kind: String },

    #[snafu(display("Unable to read kubeconfig: {}", source))]
    KubeconfigRead {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Unable to {}: {}", action, source))]
    ClusterUnreachable { action: String, source: kube::Error },

    #[snafu(display("Conflicting resource: {}", what))]
    ResourceConflict { what: String },

    #[snafu(display(
        "Image stream '{}' did not pick up tag '{}' in time",
        stream,
        tag
    ))]
    ImageStreamNotObserved { stream: String, tag: String },

    #[snafu(display("Deployment '{}' did not become ready in time", role))]
    ReadinessTimeout { role: String },

    #[snafu(display("No deployment backs service '{}' in namespace '{}'", service, namespace))]
    DeploymentNotFound { namespace: String, service: String },

    #[snafu(display("Orchestration was cancelled"))]
    Cancelled,

    #[snafu(display("Unable to read manifest '{}': {}", manifest, source))]
    ManifestRead {
        manifest: String,
        source: std::io::Error,
    },

    #[snafu(display("Unable to fetch manifest '{}': {}", manifest, source))]
    ManifestFetch {
        manifest: String,
        source: reqwest::Error,
    },

    #[snafu(display("Unable to parse manifest '{}': {}", what, source))]
    ManifestParse {
        what: String,
        source: serde_yaml::Error,
    },

    #[snafu(display("Manifest object is malformed: {}", reason))]
    ManifestObject { reason: String },

    #[snafu(display("Unable to serialize {}: {}", what, source))]
    Serialize {
        what: String,
        source: serde_json::Error,
    },
}

impl Error {
    /// Map a `kube::Error` to the harness error kinds. An HTTP 409 from the API server becomes
    /// `ResourceConflict`, everything else is `ClusterUnreachable`.
    pub(crate) fn from_kube<S: Into<String>>(action: S, source: kube::Error) -> Self {
        let action = action.into();
        match &source {
            kube::Error::Api(response) if response.code == 409 => Error::ResourceConflict {
                what: format!("{} ({})", action, response.message),
            },
            _ => Error::ClusterUnreachable { action, source },
        }
    }

    /// The short, stable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ConfigMissing { .. } => "ConfigMissing",
            Error::ConfigParse { .. } => "ConfigParse",
            Error::InvalidScenarioConfiguration { .. } => "InvalidScenarioConfiguration",
            Error::InvalidSettings { .. } => "InvalidSettings",
            Error::OperationNotSupported { .. } => "OperationNotSupported",
            Error::KubeconfigRead { .. } => "KubeconfigRead",
            Error::ClusterUnreachable { .. } => "ClusterUnreachable",
            Error::ResourceConflict { .. } => "ResourceConflict",
            Error::ImageStreamNotObserved { .. } => "ImageStreamNotObserved",
            Error::ReadinessTimeout { .. } => "ReadinessTimeout",
            Error::DeploymentNotFound { .. } => "DeploymentNotFound",
            Error::Cancelled => "Cancelled",
            Error::ManifestRead { .. } => "ManifestRead",
            Error::ManifestFetch { .. } => "ManifestFetch",
            Error::ManifestParse { .. } => "ManifestParse",
            Error::ManifestObject { .. } => "ManifestObject",
            Error::Serialize { .. } => "Serialize",
        }
    }
}

/// Extension for `kube` results so that call sites read like the rest of the `snafu` context
/// chains.
pub(crate) trait KubeResultExt<T> {
    fn kube_context<S: Into<String>>(self, action: S) -> Result<T>;
}

impl<T> KubeResultExt<T> for std::result::Result<T, kube::Error> {
    fn kube_context<S: Into<String>>(self, action: S) -> Result<T> {
        self.map_err(|e| Error::from_kube(action, e))
    }
}
