use anyhow::{Context, Result};
use clap::Parser;
use kiecloud_model::ScenarioManager;
use tokio_util::sync::CancellationToken;

/// Create or update the image streams of the configured product profile (or manifest) in a
/// namespace.
#[derive(Debug, Parser)]
pub(crate) struct ImageStreams {
    /// The namespace holding the image streams. It is created if it does not exist.
    namespace: String,
}

impl ImageStreams {
    pub(crate) async fn run(
        self,
        manager: ScenarioManager,
        cancel: CancellationToken,
    ) -> Result<()> {
        let states = manager
            .resolve_image_streams(&self.namespace, &cancel)
            .await
            .context(format!(
                "Unable to resolve image streams in '{}'",
                self.namespace
            ))?;
        for image in states.keys() {
            println!("{}\t{}", image, image.image_stream_name());
        }
        println!(
            "{} image stream(s) are up to date in '{}'.",
            states.len(),
            self.namespace
        );
        Ok(())
    }
}
