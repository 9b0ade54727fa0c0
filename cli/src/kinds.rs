use anyhow::{Context, Result};
use clap::Parser;
use kiecloud_model::{Role, ScenarioKind, Verb};
use serde::Serialize;

/// List every scenario kind.
#[derive(Debug, Parser)]
pub(crate) struct Kinds {
    /// Print the catalog as JSON.
    #[clap(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct KindSummary {
    kind: ScenarioKind,
    template: &'static str,
    roles: &'static [Role],
    verbs: &'static [Verb],
}

impl Kinds {
    pub(crate) fn run(self) -> Result<()> {
        let summaries: Vec<KindSummary> = ScenarioKind::ALL
            .iter()
            .map(|kind| KindSummary {
                kind: *kind,
                template: kind.template_file(),
                roles: kind.roles(),
                verbs: kind.verbs(),
            })
            .collect();
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summaries)
                    .context("Could not serialize the scenario catalog")?
            );
            return Ok(());
        }
        for summary in summaries {
            println!("{} ({})", summary.kind, summary.template);
            println!("  roles: {}", join(summary.roles));
            println!("  verbs: {}", join(summary.verbs));
        }
        Ok(())
    }
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
