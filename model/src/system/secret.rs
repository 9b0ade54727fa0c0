use crate::constants::{APP_MANAGED_BY, FIELD_MANAGER};
use crate::error::{self, Result};
use crate::HarnessConfig;
use k8s_openapi::api::core::v1::Secret;
use kube::api::ObjectMeta;
use maplit::btreemap;
use snafu::ResultExt;

pub const KIE_ADMIN_USER: &str = "KIE_ADMIN_USER";
pub const KIE_ADMIN_PWD: &str = "KIE_ADMIN_PWD";

/// Defines the secret holding the default application credentials, referenced by templates
/// through `CREDENTIALS_SECRET`.
pub fn credentials_secret(config: &HarnessConfig) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(config.credentials_secret.clone()),
            labels: Some(btreemap! {
                APP_MANAGED_BY.to_string() => FIELD_MANAGER.to_string(),
            }),
            ..Default::default()
        },
        string_data: Some(btreemap! {
            KIE_ADMIN_USER.to_string() => config.app_username.clone(),
            KIE_ADMIN_PWD.to_string() => config.app_password.clone(),
        }),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

pub fn credentials_secret_manifest(config: &HarnessConfig) -> Result<String> {
    let what = format!("secret '{}'", config.credentials_secret);
    let value = serde_yaml::to_value(credentials_secret(config))
        .context(error::ManifestParseSnafu { what: &what })?;
    crate::manifest::to_yaml(&[value], &what)
}

#[test]
fn credentials_secret_uses_configured_names() {
    let mut config = HarnessConfig::default();
    config.credentials_secret = "my-secret".to_string();
    let secret = credentials_secret(&config);
    assert_eq!(Some("my-secret".to_string()), secret.metadata.name);
    assert_eq!(
        "adminUser",
        secret.string_data.as_ref().unwrap()[KIE_ADMIN_USER].as_str()
    );
    let yaml = credentials_secret_manifest(&config).unwrap();
    assert!(yaml.contains("kind: Secret"));
}
