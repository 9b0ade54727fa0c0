use super::run_step;
use crate::clients::ClusterClient;
use crate::configuration::ENV_PREFIX;
use crate::error::{self, Result};
use crate::image_stream::{new_image_stream, ImageStream};
use crate::wait::{wait_until, WaitOutcome};
use crate::{manifest, HarnessConfig, Image};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use snafu::OptionExt;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One image stream the resolver reconciles.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlannedStream {
    pub image: Image,
    pub stream: String,
    pub docker_ref: String,
}

/// What the image-stream resolver will do to a namespace, computed from configuration alone.
///
/// With a manifest, the manifest is applied and only the images with a tag override are
/// reconciled. Without one, every image of the product profile (plus any extra images a scenario
/// needs) must have a tag and is reconciled.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ImageStreamPlan {
    pub manifest: Option<String>,
    pub streams: Vec<PlannedStream>,
}

impl ImageStreamPlan {
    pub fn new(config: &HarnessConfig, extra_images: &[Image]) -> Result<Self> {
        let manifest = config.image_streams_manifest().map(str::to_string);
        let mut streams = Vec::new();
        if manifest.is_some() {
            for image in Image::ALL {
                if let Some(docker_ref) = image.resolve_tag(config) {
                    streams.push(planned(image, docker_ref));
                }
            }
        } else {
            let profile = config
                .product_profile
                .context(error::ConfigMissingSnafu {
                    key: format!("{}PRODUCT_PROFILE", ENV_PREFIX),
                })?;
            let mut images: Vec<Image> = profile.required_images().to_vec();
            for image in extra_images {
                if !images.contains(image) {
                    images.push(*image);
                }
            }
            for image in images {
                let docker_ref = image
                    .resolve_tag(config)
                    .context(error::ConfigMissingSnafu {
                        key: image.tag_override_key(),
                    })?;
                streams.push(planned(image, docker_ref));
            }
        }
        Ok(Self { manifest, streams })
    }

    /// Returns `true` if the plan touches nothing.
    pub fn is_empty(&self) -> bool {
        self.manifest.is_none() && self.streams.is_empty()
    }
}

fn planned(image: Image, docker_ref: &str) -> PlannedStream {
    PlannedStream {
        image,
        stream: image.image_stream_name(),
        docker_ref: docker_ref.to_string(),
    }
}

/// Where a planned image stream stands in the namespace.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StreamState {
    /// No stream with the planned name exists.
    Missing,
    /// A stream exists but does not import the planned reference; `tag` is the tag to move.
    ExistingNeedsRetag { tag: String },
    /// The stream imports the planned reference.
    Observed,
}

impl StreamState {
    pub fn inspect(stream: Option<&ImageStream>, planned: &PlannedStream) -> Self {
        match stream {
            None => StreamState::Missing,
            Some(stream) if stream.has_tag_from(&planned.docker_ref) => StreamState::Observed,
            Some(stream) => StreamState::ExistingNeedsRetag {
                tag: stream
                    .first_tag_name()
                    .unwrap_or_else(|| planned.image.image_version())
                    .to_string(),
            },
        }
    }
}

/// Reconciles an [`ImageStreamPlan`] against a namespace.
pub struct ImageStreamResolver<'a> {
    client: &'a dyn ClusterClient,
    poll_step: Duration,
    observe_timeout: Duration,
}

impl<'a> ImageStreamResolver<'a> {
    pub fn new(client: &'a dyn ClusterClient, config: &HarnessConfig) -> Self {
        Self {
            client,
            poll_step: config.poll_step(),
            observe_timeout: config.image_stream_timeout(),
        }
    }

    /// Apply the plan to `namespace` and return the final state of every planned stream.
    pub async fn resolve(
        &self,
        namespace: &str,
        plan: &ImageStreamPlan,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<Image, StreamState>> {
        if let Some(location) = &plan.manifest {
            info!("Applying image streams from '{}' to '{}'", location, namespace);
            let source = run_step(cancel, manifest::load(location)).await?;
            run_step(cancel, self.client.apply_manifest(namespace, &source)).await?;
        }
        let mut states = BTreeMap::new();
        for planned in &plan.streams {
            let state = self.reconcile(namespace, planned, cancel).await?;
            states.insert(planned.image, state);
        }
        Ok(states)
    }

    async fn reconcile(
        &self,
        namespace: &str,
        planned: &PlannedStream,
        cancel: &CancellationToken,
    ) -> Result<StreamState> {
        let existing = run_step(
            cancel,
            self.client.get_image_stream(namespace, &planned.stream),
        )
        .await?;
        match StreamState::inspect(existing.as_ref(), planned) {
            StreamState::Observed => {
                debug!(
                    "Image stream '{}' already imports '{}'",
                    planned.stream, planned.docker_ref
                );
            }
            StreamState::Missing => {
                info!(
                    "Creating image stream '{}' from '{}'",
                    planned.stream, planned.docker_ref
                );
                let stream = new_image_stream(planned.image, &planned.docker_ref);
                run_step(cancel, self.client.create_image_stream(namespace, &stream)).await?;
            }
            StreamState::ExistingNeedsRetag { tag } => {
                let target = format!("{}:{}", planned.stream, tag);
                info!("Tagging '{}' into '{}'", planned.docker_ref, target);
                run_step(
                    cancel,
                    self.client
                        .raw_tag(namespace, &planned.docker_ref, &target, true),
                )
                .await?;
                self.observe(namespace, planned, &tag, cancel).await?;
            }
        }
        Ok(StreamState::Observed)
    }

    async fn observe(
        &self,
        namespace: &str,
        planned: &PlannedStream,
        tag: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let client = self.client;
        let outcome = wait_until(
            move || async move {
                match client.get_image_stream(namespace, &planned.stream).await {
                    Ok(stream) => StreamState::inspect(stream.as_ref(), planned)
                        == StreamState::Observed,
                    Err(e) => {
                        debug!("Unable to read image stream '{}': {}", planned.stream, e);
                        false
                    }
                }
            },
            self.poll_step,
            self.observe_timeout,
            cancel,
        )
        .await;
        match outcome {
            WaitOutcome::Satisfied => Ok(()),
            WaitOutcome::TimedOut => error::ImageStreamNotObservedSnafu {
                stream: &planned.stream,
                tag,
            }
            .fail(),
            WaitOutcome::Cancelled => error::CancelledSnafu.fail(),
        }
    }
}
