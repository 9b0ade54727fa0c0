/*!

This is the command line interface for deploying KIE scenarios onto an OpenShift cluster outside of
a test run, e.g. to inspect a scenario by hand or to clean up after an interrupted test.

!*/

mod deploy;
mod image_streams;
mod kinds;
mod plan;
mod teardown;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use kiecloud_model::clients::KubeClusterClient;
use kiecloud_model::{HarnessConfig, ScenarioManager};
use log::LevelFilter;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The command line interface for deploying KIE scenarios.
///
/// Harness settings are read from `KIE_CLOUD_*` environment variables.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// Path to the kubeconfig file. Also can be passed with the KUBECONFIG environment variable.
    #[clap(long = "kubeconfig")]
    kubeconfig: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// List the scenario kinds with their roles and accepted options.
    Kinds(kinds::Kinds),
    /// Show the recipe and image stream plan of a scenario file without touching a cluster.
    Plan(plan::Plan),
    /// Deploy a scenario file into a namespace.
    Deploy(deploy::Deploy),
    /// Resolve the image streams of the product profile in a namespace.
    ImageStreams(image_streams::ImageStreams),
    /// Delete a namespace and everything in it.
    Teardown(teardown::Teardown),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    if let Err(e) = run(args).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = HarnessConfig::from_env().context("Unable to read harness configuration")?;
    match args.command {
        Command::Kinds(kinds) => kinds.run(),
        Command::Plan(plan) => plan.run(&config).await,
        Command::Deploy(deploy) => {
            let manager = manager(args.kubeconfig, config).await?;
            deploy.run(manager, cancel_on_ctrl_c()).await
        }
        Command::ImageStreams(image_streams) => {
            let manager = manager(args.kubeconfig, config).await?;
            image_streams.run(manager, cancel_on_ctrl_c()).await
        }
        Command::Teardown(teardown) => {
            let manager = manager(args.kubeconfig, config).await?;
            teardown.run(manager).await
        }
    }
}

async fn manager(kubeconfig: Option<PathBuf>, config: HarnessConfig) -> Result<ScenarioManager> {
    let client = match kubeconfig {
        Some(path) => KubeClusterClient::new_from_kubeconfig_path(&path, &config)
            .await
            .context(format!(
                "Unable to create cluster client from path '{:?}'",
                path
            ))?,
        None => KubeClusterClient::new(&config)
            .await
            .context("Unable to create default cluster client")?,
    };
    Ok(ScenarioManager::new(Arc::new(client), config))
}

/// A token that is cancelled when the process receives ctrl-c.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cleaning up");
            trigger.cancel();
        }
    });
    cancel
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate and the harness.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .filter(Some("kiecloud_model"), level)
                .init();
        }
    }
}
