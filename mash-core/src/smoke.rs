// mash-core/src/smoke.rs
// Post-install smoke test: the acceptance gate for a formula run.

use mash_common::config::Config;
use mash_common::error::{MashError, Result};
use mash_common::model::formula::Formula;
use tracing::debug;

use crate::process;

const OUTPUT_TAIL_LINES: usize = 25;

const BIN_TOKEN: &str = "#{bin}";
const PREFIX_TOKEN: &str = "#{prefix}";

/// Expands `#{bin}` and `#{prefix}` placeholder tokens in a test argv.
pub fn substitute_tokens(args: &[String], config: &Config) -> Vec<String> {
    let bin = config.bin_dir().to_string_lossy().to_string();
    let prefix = config.mash_root().to_string_lossy().to_string();
    args.iter()
        .map(|arg| arg.replace(BIN_TOKEN, &bin).replace(PREFIX_TOKEN, &prefix))
        .collect()
}

/// Runs the formula's smoke test against the installed artifacts and
/// requires exit code 0. A command that cannot be spawned at all counts as
/// a test failure, not an internal error.
pub async fn run_smoke_test(formula: &Formula, config: &Config) -> Result<()> {
    if formula.test.is_empty() {
        debug!("Formula {} defines no test, skipping", formula.name());
        return Ok(());
    }

    let argv = substitute_tokens(&formula.test, config);
    debug!("Running smoke test for {}: {:?}", formula.name(), argv);

    // Run from a scratch directory so tests never depend on or dirty the
    // caller's working directory.
    let scratch = scratch_dir(config)?;
    let output = match process::run_command_async(
        argv[0].clone(),
        argv[1..].to_vec(),
        Some(scratch.path().to_path_buf()),
        None,
    )
    .await
    {
        Ok(output) => output,
        Err(e) => {
            return Err(MashError::SmokeTest {
                exit_code: None,
                output_tail: e.to_string(),
            })
        }
    };

    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(MashError::SmokeTest {
            exit_code: output.status.code(),
            output_tail: process::output_tail(&combined, OUTPUT_TAIL_LINES),
        });
    }

    debug!("Smoke test passed for {}", formula.name());
    Ok(())
}

fn scratch_dir(config: &Config) -> Result<tempfile::TempDir> {
    std::fs::create_dir_all(config.tmp_dir())?;
    tempfile::Builder::new()
        .prefix("smoke-")
        .tempdir_in(config.tmp_dir())
        .map_err(|e| MashError::IoError(format!("Failed to create test scratch dir: {e}")))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn formula_with_test(test: &[&str]) -> Formula {
        let test_json = serde_json::to_string(test).unwrap();
        serde_json::from_str(&format!(
            r#"{{
                "name": "demo",
                "url": "https://example.com/demo-1.0.tar.gz",
                "sha256": "5555555555555555555555555555555555555555555555555555555555555555",
                "build": ["make"],
                "install": ["bin/demo"],
                "test": {test_json}
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn substitutes_bin_and_prefix_tokens() {
        let config = Config {
            mash_root: PathBuf::from("/opt/mash"),
        };
        let args = vec![
            "#{bin}/yor".to_string(),
            "--help".to_string(),
            "#{prefix}/share".to_string(),
        ];
        assert_eq!(
            substitute_tokens(&args, &config),
            vec!["/opt/mash/bin/yor", "--help", "/opt/mash/share"]
        );
    }

    #[tokio::test]
    async fn passing_test_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            mash_root: dir.path().to_path_buf(),
        };
        let formula = formula_with_test(&["/bin/sh", "-c", "exit 0"]);
        run_smoke_test(&formula, &config).await.unwrap();
    }

    #[tokio::test]
    async fn failing_test_carries_the_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            mash_root: dir.path().to_path_buf(),
        };
        let formula = formula_with_test(&["/bin/sh", "-c", "echo no >&2; exit 127"]);
        let err = run_smoke_test(&formula, &config).await.unwrap_err();
        match err {
            MashError::SmokeTest {
                exit_code,
                output_tail,
            } => {
                assert_eq!(exit_code, Some(127));
                assert!(output_tail.contains("no"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unspawnable_test_command_is_a_test_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            mash_root: dir.path().to_path_buf(),
        };
        let formula = formula_with_test(&["#{bin}/not-installed", "--help"]);
        let err = run_smoke_test(&formula, &config).await.unwrap_err();
        assert!(matches!(err, MashError::SmokeTest { exit_code: None, .. }));
    }

    #[tokio::test]
    async fn empty_test_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            mash_root: dir.path().to_path_buf(),
        };
        let formula = formula_with_test(&[]);
        run_smoke_test(&formula, &config).await.unwrap();
    }
}
