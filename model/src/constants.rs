/// Helper macro to avoid retyping the base domain-like name of the harness when creating further
/// string constants from it. When given no parameters, this returns the base domain-like name.
/// When given a string literal parameter it adds `/parameter` to the end.
macro_rules! kiecloud {
    () => {
        "kiecloud.kie.org"
    };
    ($s:literal) => {
        concat!(kiecloud!(), "/", $s)
    };
}

// System identifiers
pub const KIECLOUD: &str = kiecloud!();
pub const FIELD_MANAGER: &str = "kiecloud";

// Label keys
pub const LABEL_EXTERNAL: &str = kiecloud!("external");

// Standard tags https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
pub const APP_NAME: &str = "app.kubernetes.io/name";
pub const APP_PART_OF: &str = "app.kubernetes.io/part-of";
pub const APP_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

// Image stream annotations
pub const ANNOTATION_INSECURE_REPOSITORY: &str = "openshift.io/image.insecureRepository";
pub const ANNOTATION_DISPLAY_NAME: &str = "openshift.io/display-name";
pub const ANNOTATION_PROVIDER_DISPLAY_NAME: &str = "openshift.io/provider-display-name";
pub const PROVIDER_DISPLAY_NAME: &str = "Red Hat, Inc.";
pub const IMAGE_ICON_CLASS: &str = "icon-jboss";
pub const IMAGE_PRODUCT_TAG: &str = "rhpam";

/// Prefix of OSBS build image names that is not part of the image stream name.
pub const IMAGE_STREAM_PREFIX: &str = "rhpam-7-";

// Template parameters
pub const APPLICATION_NAME: &str = "APPLICATION_NAME";
pub const IMAGE_STREAM_NAMESPACE: &str = "IMAGE_STREAM_NAMESPACE";
pub const CREDENTIALS_SECRET: &str = "CREDENTIALS_SECRET";
pub const BUSINESS_CENTRAL_HTTPS_SECRET: &str = "BUSINESS_CENTRAL_HTTPS_SECRET";
pub const KIE_SERVER_HTTPS_SECRET: &str = "KIE_SERVER_HTTPS_SECRET";
pub const KIE_SERVER_MODE: &str = "KIE_SERVER_MODE";
pub const KIE_SERVER_ID: &str = "KIE_SERVER_ID";
pub const KIE_SERVER_CONTAINER_DEPLOYMENT: &str = "KIE_SERVER_CONTAINER_DEPLOYMENT";
pub const SOURCE_REPOSITORY_URL: &str = "SOURCE_REPOSITORY_URL";
pub const SOURCE_REPOSITORY_REF: &str = "SOURCE_REPOSITORY_REF";
pub const CONTEXT_DIR: &str = "CONTEXT_DIR";
pub const ARTIFACT_DIR: &str = "ARTIFACT_DIR";
pub const KIE_SERVER_HOSTNAME_HTTP: &str = "KIE_SERVER_HOSTNAME_HTTP";
pub const KIE_SERVER_HOSTNAME_HTTPS: &str = "KIE_SERVER_HOSTNAME_HTTPS";
pub const DROOLS_SERVER_FILTER_CLASSES: &str = "DROOLS_SERVER_FILTER_CLASSES";
pub const KIE_SERVER_JMS_ENABLE_SIGNAL: &str = "KIE_SERVER_JMS_ENABLE_SIGNAL";
pub const KIE_SERVER_JMS_QUEUE_SIGNAL: &str = "KIE_SERVER_JMS_QUEUE_SIGNAL";
pub const BUSINESS_CENTRAL_K8S_FS_ENABLED: &str = "BUSINESS_CENTRAL_K8S_FS_ENABLED";

pub const AUTH_LDAP_URL: &str = "AUTH_LDAP_URL";
pub const AUTH_LDAP_BIND_DN: &str = "AUTH_LDAP_BIND_DN";
pub const AUTH_LDAP_BIND_CREDENTIAL: &str = "AUTH_LDAP_BIND_CREDENTIAL";
pub const AUTH_LDAP_BASE_CTX_DN: &str = "AUTH_LDAP_BASE_CTX_DN";
pub const AUTH_LDAP_BASE_FILTER: &str = "AUTH_LDAP_BASE_FILTER";
pub const AUTH_LDAP_ROLES_CTX_DN: &str = "AUTH_LDAP_ROLES_CTX_DN";
pub const AUTH_LDAP_ROLE_FILTER: &str = "AUTH_LDAP_ROLE_FILTER";
pub const AUTH_LDAP_ROLE_ATTRIBUTE_ID: &str = "AUTH_LDAP_ROLE_ATTRIBUTE_ID";

pub const MAVEN_REPO_ID: &str = "MAVEN_REPO_ID";
pub const MAVEN_REPO_URL: &str = "MAVEN_REPO_URL";
pub const MAVEN_REPO_USERNAME: &str = "MAVEN_REPO_USERNAME";
pub const MAVEN_REPO_PASSWORD: &str = "MAVEN_REPO_PASSWORD";

pub const SSO_URL: &str = "SSO_URL";
pub const SSO_REALM: &str = "SSO_REALM";
pub const SSO_USERNAME: &str = "SSO_USERNAME";
pub const SSO_PASSWORD: &str = "SSO_PASSWORD";
pub const BUSINESS_CENTRAL_SSO_CLIENT: &str = "BUSINESS_CENTRAL_SSO_CLIENT";
pub const BUSINESS_CENTRAL_SSO_SECRET: &str = "BUSINESS_CENTRAL_SSO_SECRET";
pub const KIE_SERVER_SSO_CLIENT: &str = "KIE_SERVER_SSO_CLIENT";
pub const KIE_SERVER_SSO_SECRET: &str = "KIE_SERVER_SSO_SECRET";

pub const GIT_SERVER_URL: &str = "GIT_SERVER_URL";

pub const KIE_SERVER_EXTERNALDB_DRIVER: &str = "KIE_SERVER_EXTERNALDB_DRIVER";
pub const KIE_SERVER_EXTERNALDB_DIALECT: &str = "KIE_SERVER_EXTERNALDB_DIALECT";
pub const KIE_SERVER_EXTERNALDB_URL: &str = "KIE_SERVER_EXTERNALDB_URL";
pub const KIE_SERVER_EXTERNALDB_SERVICE_HOST: &str = "KIE_SERVER_EXTERNALDB_SERVICE_HOST";
pub const KIE_SERVER_EXTERNALDB_SERVICE_PORT: &str = "KIE_SERVER_EXTERNALDB_SERVICE_PORT";
pub const KIE_SERVER_EXTERNALDB_DB: &str = "KIE_SERVER_EXTERNALDB_DB";
pub const KIE_SERVER_EXTERNALDB_USER: &str = "KIE_SERVER_EXTERNALDB_USER";
pub const KIE_SERVER_EXTERNALDB_PWD: &str = "KIE_SERVER_EXTERNALDB_PWD";

pub const AMQ_BROKER_URL: &str = "AMQ_BROKER_URL";
pub const AMQ_USERNAME: &str = "AMQ_USERNAME";
pub const AMQ_PASSWORD: &str = "AMQ_PASSWORD";

// Timeouts and polling, in the units named by the constant.
pub const DEFAULT_POLL_STEP_MILLIS: u64 = 1000;
pub const DEFAULT_IMAGE_STREAM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BOOT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_SCALE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_TEST_WAIT_SECS: u64 = 15;
pub const NAMESPACE_DELETION_TIMEOUT_SECS: u64 = 120;
pub const POD_DELETE_GRACE_SECS: u32 = 0;

#[test]
fn kiecloud_constants_macro_test() {
    assert_eq!("kiecloud.kie.org", kiecloud!());
    assert_eq!("kiecloud.kie.org/external", LABEL_EXTERNAL);
    assert_eq!("kiecloud.kie.org/foo", kiecloud!("foo"));
}
