use crate::constants::{
    ANNOTATION_DISPLAY_NAME, ANNOTATION_INSECURE_REPOSITORY, ANNOTATION_PROVIDER_DISPLAY_NAME,
    IMAGE_ICON_CLASS, IMAGE_PRODUCT_TAG, PROVIDER_DISPLAY_NAME,
};
use crate::Image;
use kube::api::ObjectMeta;
use kube::CustomResource;
use maplit::btreemap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// The `from.kind` of a tag that points directly at a registry reference.
pub const DOCKER_IMAGE: &str = "DockerImage";

/// An OpenShift image stream. The `CustomResource` derive also produces a struct named
/// `ImageStream` which represents the object in the k8s API. Only the fields the harness reads or
/// writes are modelled; everything else in the spec and its tags (`lookupPolicy`,
/// `referencePolicy`, `generation`, ...) is carried through untouched.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    derive = "Default",
    derive = "PartialEq",
    group = "image.openshift.io",
    kind = "ImageStream",
    namespaced,
    plural = "imagestreams",
    singular = "imagestream",
    status = "ImageStreamStatus",
    version = "v1"
)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamSpec {
    #[serde(default)]
    pub tags: Vec<TagReference>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A named tag of an image stream and where its image comes from.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<TagSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_policy: Option<TagImportPolicy>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSource {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagImportPolicy {
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub scheduled: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_image_repository: Option<String>,
}

impl ImageStream {
    /// The name of the first spec tag, if the stream has any tags.
    pub fn first_tag_name(&self) -> Option<&str> {
        self.spec.tags.first().map(|tag| tag.name.as_str())
    }

    /// Whether any spec tag imports its image from `docker_ref`.
    pub fn has_tag_from(&self, docker_ref: &str) -> bool {
        self.spec
            .tags
            .iter()
            .filter_map(|tag| tag.from.as_ref())
            .any(|from| from.name == docker_ref)
    }

    /// Point the tag named `tag_name` at `docker_ref`, adding the tag if it does not exist.
    pub fn retag(&mut self, tag_name: &str, docker_ref: &str, insecure: bool) {
        let from = TagSource {
            kind: DOCKER_IMAGE.to_string(),
            name: docker_ref.to_string(),
            namespace: None,
        };
        let import_policy = TagImportPolicy {
            insecure,
            ..Default::default()
        };
        match self.spec.tags.iter_mut().find(|tag| tag.name == tag_name) {
            Some(tag) => {
                tag.from = Some(from);
                tag.import_policy = Some(import_policy);
            }
            None => self.spec.tags.push(TagReference {
                name: tag_name.to_string(),
                from: Some(from),
                import_policy: Some(import_policy),
                ..Default::default()
            }),
        }
    }

    /// A JSON merge patch that replaces the spec tags of the stream and nothing else. The
    /// resource version, when known, makes the API server reject the patch if the stream changed
    /// since it was read.
    pub fn tags_patch(&self) -> serde_json::Result<serde_json::Value> {
        let mut patch = json!({ "spec": { "tags": serde_json::to_value(&self.spec.tags)? } });
        if let Some(resource_version) = &self.metadata.resource_version {
            patch["metadata"] = json!({ "resourceVersion": resource_version });
        }
        Ok(patch)
    }
}

/// Build a fresh image stream for `image` with a single tag, named after the image version, that
/// imports `docker_ref` with an insecure import policy.
pub fn new_image_stream(image: Image, docker_ref: &str) -> ImageStream {
    let name = image.image_stream_name();
    ImageStream {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            annotations: Some(btreemap! {
                ANNOTATION_INSECURE_REPOSITORY.to_string() => "true".to_string(),
                ANNOTATION_DISPLAY_NAME.to_string() => name,
                ANNOTATION_PROVIDER_DISPLAY_NAME.to_string() => PROVIDER_DISPLAY_NAME.to_string(),
            }),
            ..Default::default()
        },
        spec: ImageStreamSpec {
            tags: vec![TagReference {
                name: image.image_version().to_string(),
                annotations: btreemap! {
                    "description".to_string() => format!("{} image", image.logical_name()),
                    "iconClass".to_string() => IMAGE_ICON_CLASS.to_string(),
                    "tags".to_string() => IMAGE_PRODUCT_TAG.to_string(),
                    "version".to_string() => image.image_version().to_string(),
                },
                from: Some(TagSource {
                    kind: DOCKER_IMAGE.to_string(),
                    name: docker_ref.to_string(),
                    namespace: None,
                }),
                import_policy: Some(TagImportPolicy {
                    insecure: true,
                    ..Default::default()
                }),
                ..Default::default()
            }],
            ..Default::default()
        },
        status: None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use kube::ResourceExt;

    #[test]
    fn fresh_stream_shape() {
        let stream = new_image_stream(Image::KieServer, "registry.example/ks:1");
        assert_eq!("rhpam-kieserver-rhel8", stream.name_any());
        assert_eq!(1, stream.spec.tags.len());
        let tag = &stream.spec.tags[0];
        assert_eq!("7.11.0", tag.name);
        assert_eq!("icon-jboss", tag.annotations["iconClass"]);
        assert_eq!("rhpam", tag.annotations["tags"]);
        assert_eq!("7.11.0", tag.annotations["version"]);
        assert!(tag.import_policy.as_ref().unwrap().insecure);
        let from = tag.from.as_ref().unwrap();
        assert_eq!(DOCKER_IMAGE, from.kind);
        assert!(stream.has_tag_from("registry.example/ks:1"));
        assert_eq!(
            "true",
            stream.annotations()[ANNOTATION_INSECURE_REPOSITORY].as_str()
        );
    }

    #[test]
    fn retag_replaces_source() {
        let mut stream = new_image_stream(Image::Workbench, "registry.example/wb:1");
        stream.retag("7.11.0", "registry.example/wb:custom", true);
        assert_eq!(1, stream.spec.tags.len());
        assert!(stream.has_tag_from("registry.example/wb:custom"));
        assert!(!stream.has_tag_from("registry.example/wb:1"));
        stream.retag("latest", "registry.example/wb:latest", false);
        assert_eq!(2, stream.spec.tags.len());
        assert_eq!(Some("7.11.0"), stream.first_tag_name());
    }

    #[test]
    fn deserializes_openshift_yaml() {
        let yaml = r#"
apiVersion: image.openshift.io/v1
kind: ImageStream
metadata:
  name: rhpam-kieserver-rhel8
spec:
  lookupPolicy:
    local: false
  tags:
  - name: "7.11.0"
    from:
      kind: DockerImage
      name: registry.redhat.io/rhpam-7/rhpam-kieserver-rhel8:7.11.0
    importPolicy:
      insecure: true
    referencePolicy:
      type: Local
"#;
        let stream: ImageStream = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(Some("7.11.0"), stream.first_tag_name());
        assert!(stream.has_tag_from("registry.redhat.io/rhpam-7/rhpam-kieserver-rhel8:7.11.0"));
    }

    #[test]
    fn retag_keeps_unmodelled_fields() {
        let yaml = r#"
apiVersion: image.openshift.io/v1
kind: ImageStream
metadata:
  name: rhpam-businesscentral-rhel8
  resourceVersion: "42"
spec:
  lookupPolicy:
    local: true
  tags:
  - name: "7.11.0"
    from:
      kind: DockerImage
      name: registry.redhat.io/rhpam-7/rhpam-businesscentral-rhel8:7.11.0
    generation: 3
    referencePolicy:
      type: Local
  - name: latest
    from:
      kind: ImageStreamTag
      name: "7.11.0"
    referencePolicy:
      type: Source
"#;
        let mut stream: ImageStream = serde_yaml::from_str(yaml).unwrap();
        stream.retag("7.11.0", "registry.example/wb:custom", true);

        let patch = stream.tags_patch().unwrap();
        assert_eq!("42", patch["metadata"]["resourceVersion"]);
        // A merge patch of the tags leaves the rest of the spec alone.
        assert!(patch["spec"].get("lookupPolicy").is_none());
        let tags = patch["spec"]["tags"].as_array().unwrap();
        assert_eq!(2, tags.len());
        assert_eq!("registry.example/wb:custom", tags[0]["from"]["name"]);
        assert_eq!(true, tags[0]["importPolicy"]["insecure"]);
        assert_eq!("Local", tags[0]["referencePolicy"]["type"]);
        assert_eq!(3, tags[0]["generation"]);
        assert_eq!("ImageStreamTag", tags[1]["from"]["kind"]);
        assert_eq!("Source", tags[1]["referencePolicy"]["type"]);

        let body = serde_json::to_value(&stream).unwrap();
        assert_eq!(true, body["spec"]["lookupPolicy"]["local"]);
    }

    #[test]
    fn tags_patch_of_an_unread_stream() {
        let stream = new_image_stream(Image::KieServer, "registry.example/ks:1");
        let patch = stream.tags_patch().unwrap();
        assert!(patch.get("metadata").is_none());
        assert_eq!(
            "registry.example/ks:1",
            patch["spec"]["tags"][0]["from"]["name"]
        );
    }
}
