/// Encapsulates the k8s object definitions the harness creates itself
mod external;
mod secret;

pub use external::{
    contributed_parameters, external_deployment, external_manifest, external_service,
};
pub use secret::{credentials_secret, credentials_secret_manifest};
