// mash/src/main.rs
use std::fs;
use std::process;

use clap::Parser;
use colored::Colorize;
use mash_common::config::Config;
use mash_common::error::{MashError, Result as MashResult};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod cli;
use cli::CliArgs;

#[tokio::main]
async fn main() -> MashResult<()> {
    let cli_args = CliArgs::parse();

    let config = Config::load().map_err(|e| {
        MashError::Config(format!("Could not load config: {e}"))
    })?;

    let level_filter = match cli_args.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("MASH_LOG")
        .from_env_lossy();

    if cli_args.verbose > 0 {
        // Verbose runs also keep a rolling log file next to the prefix.
        let log_dir = config.logs_dir();
        if let Err(e) = fs::create_dir_all(&log_dir) {
            eprintln!(
                "{} Failed to create log directory {}: {}",
                "Warning:".yellow(),
                log_dir.display(),
                e
            );
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .without_time()
                .try_init();
        } else {
            let file_appender = tracing_appender::rolling::daily(&log_dir, "mash.log");
            let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(non_blocking_appender)
                .with_ansi(false)
                .try_init();

            Box::leak(Box::new(guard)); // Keep guard alive

            debug!(
                "Verbose logging enabled. Writing logs to: {}/mash.log",
                log_dir.display()
            );
        }
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
    }

    if let Err(e) = cli_args.command.run(&config).await {
        error!("Command failed: {:#}", e);
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        process::exit(exit_code_for(&e));
    }

    debug!("Command completed successfully.");
    Ok(())
}

/// Maps a failure onto the per-stage exit codes so callers can tell which
/// stage of a run went wrong without parsing output.
fn exit_code_for(error: &MashError) -> i32 {
    use mash_common::pipeline::InstallStatus;

    match error {
        MashError::Download { .. } | MashError::Http(_) => InstallStatus::FetchFailed.exit_code(),
        MashError::ChecksumMismatch { .. } => InstallStatus::VerifyFailed.exit_code(),
        MashError::Build { .. } | MashError::BuildEnv(_) => InstallStatus::BuildFailed.exit_code(),
        MashError::Install { .. } => InstallStatus::InstallFailed.exit_code(),
        MashError::SmokeTest { .. } => InstallStatus::TestFailed.exit_code(),
        _ => 1,
    }
}
