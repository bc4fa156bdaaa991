// mash/src/cli/install.rs

use std::time::Duration;

use clap::Args;
use colored::Colorize;
use mash_common::config::Config;
use mash_common::error::Result;
use mash_common::formulary::Formulary;
use mash_common::pipeline::PipelineEvent;
use mash_core::run_formula_pipeline;
use tokio::sync::broadcast;
use tracing::instrument;

#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Formula names (resolved in the formulary) or paths to definition files
    #[arg(required = true)]
    targets: Vec<String>,
}

impl InstallArgs {
    #[instrument(skip(self, config), fields(targets = ?self.targets))]
    pub async fn run(&self, config: &Config) -> Result<()> {
        let formulary = Formulary::new(config.clone());

        // Targets run strictly one after another; a failure stops the
        // remaining ones.
        for target in &self.targets {
            let formula = formulary.load(target)?;
            println!(
                "{}{}",
                "==> ".bold().blue(),
                format!("Installing {} {}", formula.name(), formula.version).bold()
            );

            let (event_tx, event_rx) = broadcast::channel::<PipelineEvent>(64);
            let printer = tokio::spawn(print_events(event_rx));

            let report = run_formula_pipeline(&formula, config, &event_tx).await;
            drop(event_tx);
            let _ = printer.await;

            for timing in &report.timings {
                println!("    {timing}");
            }

            match report.error {
                None => {
                    println!(
                        "{}{}",
                        "==> ".bold().blue(),
                        format!(
                            "Installed {} {} to {}",
                            formula.name(),
                            formula.version,
                            config.bin_dir().display()
                        )
                        .bold()
                    );
                }
                Some(error) => {
                    if let Some(stage) = report.status.failed_stage() {
                        eprintln!(
                            "{} {} failed during {}",
                            "Error:".red().bold(),
                            formula.name(),
                            stage.label()
                        );
                    }
                    return Err(error);
                }
            }
        }
        Ok(())
    }
}

async fn print_events(mut event_rx: broadcast::Receiver<PipelineEvent>) {
    while let Ok(event) = event_rx.recv().await {
        match event {
            PipelineEvent::StageStarted { formula, stage } => {
                println!(
                    "{}{}",
                    "==> ".bold().blue(),
                    format!("{} {formula}", stage.label()).bold()
                );
            }
            PipelineEvent::StageFailed {
                formula,
                stage,
                error,
            } => {
                eprintln!(
                    "{} {} {formula}: {error}",
                    "Error:".red().bold(),
                    stage.label()
                );
            }
            PipelineEvent::DownloadFinished {
                path, size_bytes, ..
            } => {
                println!(
                    "    Downloaded {} ({})",
                    path.display(),
                    format_size(size_bytes)
                );
            }
            PipelineEvent::PipelineFinished {
                formula,
                duration_secs,
                ..
            } => {
                let elapsed = Duration::from_millis((duration_secs * 1000.0) as u64);
                println!(
                    "    {formula} finished in {}",
                    humantime::format_duration(elapsed)
                );
            }
            _ => {}
        }
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_readable_sizes() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
