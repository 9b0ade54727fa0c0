use crate::constants::IMAGE_STREAM_PREFIX;
use crate::HarnessConfig;
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};

/// The product images that scenarios are built from. The set is closed; every image has a fixed
/// logical name and version, and a configuration key through which its tag can be overridden.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Image {
    Workbench,
    KieServer,
    Controller,
    SmartRouter,
    WorkbenchIndexing,
    Amq,
    Mysql,
    Postgresql,
    Console,
}

derive_display_from_serialize!(Image);
derive_fromstr_from_deserialize!(Image);

/// The prefix of every tag override key.
pub const IMAGE_TAG_KEY_PREFIX: &str = "KIE_CLOUD_IMAGE_TAG_";

impl Image {
    /// Every image in the catalog, in declaration order.
    pub const ALL: [Image; 9] = [
        Image::Workbench,
        Image::KieServer,
        Image::Controller,
        Image::SmartRouter,
        Image::WorkbenchIndexing,
        Image::Amq,
        Image::Mysql,
        Image::Postgresql,
        Image::Console,
    ];

    /// The image name as produced by the product build.
    pub fn logical_name(&self) -> &'static str {
        match self {
            Image::Workbench => "rhpam-7-rhpam-businesscentral-rhel8",
            Image::KieServer => "rhpam-7-rhpam-kieserver-rhel8",
            Image::Controller => "rhpam-7-rhpam-controller-rhel8",
            Image::SmartRouter => "rhpam-7-rhpam-smartrouter-rhel8",
            Image::WorkbenchIndexing => "rhpam-7-rhpam-businesscentral-indexing-rhel8",
            Image::Amq => "amq-broker-7-openshift",
            Image::Mysql => "mysql",
            Image::Postgresql => "postgresql",
            Image::Console => "rhpam-7-rhpam-businesscentral-monitoring-rhel8",
        }
    }

    /// The image version, used as the image stream tag name.
    pub fn image_version(&self) -> &'static str {
        match self {
            Image::Workbench
            | Image::KieServer
            | Image::Controller
            | Image::SmartRouter
            | Image::WorkbenchIndexing
            | Image::Console => "7.11.0",
            Image::Amq => "7.8",
            Image::Mysql => "8.0",
            Image::Postgresql => "10",
        }
    }

    /// The configuration key that overrides the tag of this image, e.g.
    /// `KIE_CLOUD_IMAGE_TAG_WORKBENCH`.
    pub fn tag_override_key(&self) -> String {
        format!("{}{}", IMAGE_TAG_KEY_PREFIX, self)
    }

    /// The image stream name for this image.
    pub fn image_stream_name(&self) -> String {
        image_stream_name(self.logical_name())
    }

    /// The docker reference configured for this image, if any.
    pub fn resolve_tag<'a>(&self, config: &'a HarnessConfig) -> Option<&'a str> {
        config.image_tag(*self)
    }
}

/// Returns `true` if any catalog image resolves to a tag.
pub fn any_override_present(config: &HarnessConfig) -> bool {
    Image::ALL
        .iter()
        .any(|image| image.resolve_tag(config).is_some())
}

/// Derive an image stream name from an image name by stripping the product build prefix, e.g.
/// `rhpam-7-rhpam-kieserver-rhel8` becomes `rhpam-kieserver-rhel8`. Names without the prefix are
/// returned unchanged. A repeated prefix is stripped entirely so that the derivation is
/// idempotent.
pub fn image_stream_name(logical_name: &str) -> String {
    logical_name
        .trim_start_matches(IMAGE_STREAM_PREFIX)
        .to_string()
}
