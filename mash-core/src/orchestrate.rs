// mash-core/src/orchestrate.rs
// Sequences one formula run through its five stages. The orchestrator owns
// no I/O of its own: it is pure sequencing, timing and result assembly.

use std::future::Future;
use std::time::Instant;

use mash_common::config::Config;
use mash_common::error::{MashError, Result};
use mash_common::model::formula::Formula;
use mash_common::pipeline::{InstallReport, InstallStatus, PipelineEvent, Stage, StageTiming};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::build::{self, BuildContext, BuildEnvironment};
use crate::{extract, install, receipt, smoke};

/// Runs the full pipeline for one formula:
/// Fetch → Verify → Build → Install → Test.
///
/// Stages run strictly in order; the first failure short-circuits the run
/// and the report carries that stage's status and error. Progress events
/// are published on `event_tx`; a missing subscriber is not an error.
pub async fn run_formula_pipeline(
    formula: &Formula,
    config: &Config,
    event_tx: &broadcast::Sender<PipelineEvent>,
) -> InstallReport {
    let run_started = Instant::now();
    let _ = event_tx.send(PipelineEvent::PipelineStarted {
        formula: formula.name().to_string(),
    });

    let mut runner = StageRunner {
        formula: formula.name().to_string(),
        event_tx,
        timings: Vec::new(),
    };

    let outcome = run_stages(formula, config, &mut runner).await;
    let (status, error, installed_paths) = match outcome {
        Ok(installed_paths) => (InstallStatus::Done, None, installed_paths),
        Err((stage, error)) => (stage.failure_status(), Some(error), Vec::new()),
    };

    let report = InstallReport {
        formula: formula.name().to_string(),
        status,
        timings: runner.timings,
        error,
        installed_paths,
    };

    let _ = event_tx.send(PipelineEvent::PipelineFinished {
        formula: formula.name().to_string(),
        status,
        duration_secs: run_started.elapsed().as_secs_f64(),
    });
    report
}

type StageResult<T> = std::result::Result<T, (Stage, MashError)>;

async fn run_stages(
    formula: &Formula,
    config: &Config,
    runner: &mut StageRunner<'_>,
) -> StageResult<Vec<std::path::PathBuf>> {
    let event_tx = runner.event_tx;

    // Fetch
    let artifact_path = runner
        .run(Stage::Fetch, async {
            formula.validate()?;
            let _ = event_tx.send(PipelineEvent::DownloadStarted {
                formula: formula.name().to_string(),
                url: formula.source_url().to_string(),
            });
            let path = mash_net::http::fetch_formula_source(formula, config).await?;
            let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            let _ = event_tx.send(PipelineEvent::DownloadFinished {
                formula: formula.name().to_string(),
                path: path.clone(),
                size_bytes,
            });
            Ok(path)
        })
        .await?;

    // Verify. The artifact is re-hashed here even when the fetch reused a
    // cached file: this stage is the hard stop, nothing builds unless it
    // passes.
    runner
        .run(Stage::Verify, async {
            mash_net::validation::verify_checksum(&artifact_path, formula.source_sha256())
        })
        .await?;

    // Build. The temp dir must outlive the install stage, which copies out
    // of the built tree.
    let (_build_dir, build_context) = runner
        .run(Stage::Build, stage_and_build(formula, config, &artifact_path))
        .await?;
    debug!(
        "Build for {} finished with exit code {:?}",
        formula.name(),
        build_context.exit_code
    );

    // Install
    let installed_paths = runner
        .run(Stage::Install, async {
            install::install_mapping(&build_context.build_dir, &formula.install, &config.bin_dir())
        })
        .await?;

    // Test
    runner
        .run(Stage::Test, smoke::run_smoke_test(formula, config))
        .await?;

    // Bookkeeping only; a failed receipt write never fails an accepted run.
    if let Err(e) = receipt::write_receipt(formula, &installed_paths, config) {
        warn!(
            "Failed to write install receipt for {}: {}",
            formula.name(),
            e
        );
    }

    Ok(installed_paths)
}

async fn stage_and_build(
    formula: &Formula,
    config: &Config,
    artifact_path: &std::path::Path,
) -> Result<(tempfile::TempDir, BuildContext)> {
    std::fs::create_dir_all(config.tmp_dir())?;
    let build_dir = tempfile::Builder::new()
        .prefix(&format!("{}-", formula.name()))
        .tempdir_in(config.tmp_dir())
        .map_err(|e| MashError::IoError(format!("Failed to create temp build dir: {e}")))?;

    extract::stage_source(artifact_path, build_dir.path())?;
    let source_root = extract::source_root(build_dir.path())?;

    let build_env = BuildEnvironment::new(formula, config, &source_root);
    let context = build::invoke_build(formula, &source_root, &build_env).await?;
    Ok((build_dir, context))
}

/// Times each stage, publishes its start/finish/failure events and tags
/// errors with the stage they happened in.
struct StageRunner<'a> {
    formula: String,
    event_tx: &'a broadcast::Sender<PipelineEvent>,
    timings: Vec<StageTiming>,
}

impl StageRunner<'_> {
    async fn run<T, F>(&mut self, stage: Stage, fut: F) -> StageResult<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _ = self.event_tx.send(PipelineEvent::StageStarted {
            formula: self.formula.clone(),
            stage,
        });
        let started = Instant::now();
        let result = fut.await;
        let duration = started.elapsed();
        self.timings.push(StageTiming { stage, duration });

        match result {
            Ok(value) => {
                let _ = self.event_tx.send(PipelineEvent::StageFinished {
                    formula: self.formula.clone(),
                    stage,
                    duration_secs: duration.as_secs_f64(),
                });
                Ok(value)
            }
            Err(error) => {
                let _ = self.event_tx.send(PipelineEvent::stage_failed(
                    self.formula.clone(),
                    stage,
                    &error,
                ));
                Err((stage, error))
            }
        }
    }
}
