// mash-core/src/build/mod.rs
// Invokes a formula's build command inside the staged source tree.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mash_common::error::{MashError, Result};
use mash_common::model::formula::Formula;
use tracing::{debug, error};

use crate::process;

pub mod env;

pub use env::BuildEnvironment;

const STDERR_TAIL_LINES: usize = 25;

/// Captured state of one build invocation.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub build_dir: PathBuf,
    pub env: HashMap<String, String>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Runs the formula's build command with the source root as working
/// directory under the sanitized build environment. Output is captured in
/// full; a non-zero exit is a build error carrying the exit code and the
/// tail of stderr.
pub async fn invoke_build(
    formula: &Formula,
    source_root: &Path,
    build_env: &BuildEnvironment,
) -> Result<BuildContext> {
    let argv = &formula.build;
    let program = resolve_program(&argv[0], source_root, build_env)?;
    debug!(
        "Invoking build for {}: {} {:?} in {}",
        formula.name(),
        program.display(),
        &argv[1..],
        source_root.display()
    );

    let output = process::run_command_async(
        program.to_string_lossy().to_string(),
        argv[1..].to_vec(),
        Some(source_root.to_path_buf()),
        Some(build_env.vars().clone()),
    )
    .await
    .map_err(|e| MashError::CommandExec(format!("build command '{}': {}", argv[0], e)))?;

    let context = BuildContext {
        build_dir: source_root.to_path_buf(),
        env: build_env.vars().clone(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code(),
    };

    if !output.status.success() {
        error!(
            "Build command failed for {} with status {}",
            formula.name(),
            output.status
        );
        return Err(MashError::Build {
            exit_code: context.exit_code,
            stderr_tail: process::output_tail(&context.stderr, STDERR_TAIL_LINES),
        });
    }

    debug!("Build completed successfully for {}", formula.name());
    Ok(context)
}

/// Resolves the build argv0: absolute paths are used as-is, paths shipped
/// with the source resolve against the source root, bare names go through
/// the build PATH.
fn resolve_program(
    argv0: &str,
    source_root: &Path,
    build_env: &BuildEnvironment,
) -> Result<PathBuf> {
    let as_path = Path::new(argv0);
    if as_path.is_absolute() {
        return Ok(as_path.to_path_buf());
    }

    let in_tree = source_root.join(as_path);
    if in_tree.is_file() {
        return Ok(in_tree);
    }

    which::which_in(argv0, Some(build_env.path_string()), source_root).map_err(|_| {
        MashError::BuildEnv(format!(
            "build command '{argv0}' not found in the source tree or build PATH"
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use mash_common::config::Config;

    use super::*;

    fn formula_with_build(build: &[&str]) -> Formula {
        let build_json = serde_json::to_string(build).unwrap();
        serde_json::from_str(&format!(
            r#"{{
                "name": "demo",
                "url": "https://example.com/demo-1.0.tar.gz",
                "sha256": "4444444444444444444444444444444444444444444444444444444444444444",
                "build": {build_json},
                "install": ["bin/demo"]
            }}"#
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn successful_build_captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            mash_root: dir.path().join("prefix"),
        };
        let formula = formula_with_build(&["/bin/sh", "-c", "echo building"]);
        let build_env = BuildEnvironment::new(&formula, &config, dir.path());

        let context = invoke_build(&formula, dir.path(), &build_env).await.unwrap();
        assert_eq!(context.exit_code, Some(0));
        assert_eq!(context.stdout.trim(), "building");
    }

    #[tokio::test]
    async fn failing_build_carries_exit_code_and_stderr_tail() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            mash_root: dir.path().join("prefix"),
        };
        let formula = formula_with_build(&["/bin/sh", "-c", "echo boom >&2; exit 3"]);
        let build_env = BuildEnvironment::new(&formula, &config, dir.path());

        let err = invoke_build(&formula, dir.path(), &build_env)
            .await
            .unwrap_err();
        match err {
            MashError::Build {
                exit_code,
                stderr_tail,
            } => {
                assert_eq!(exit_code, Some(3));
                assert!(stderr_tail.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn build_script_in_the_source_tree_is_found() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            mash_root: dir.path().join("prefix"),
        };
        let script = dir.path().join("gobuild.sh");
        fs::write(&script, "#!/bin/sh\necho from-script\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let formula = formula_with_build(&["gobuild.sh"]);
        let build_env = BuildEnvironment::new(&formula, &config, dir.path());
        let context = invoke_build(&formula, dir.path(), &build_env).await.unwrap();
        assert_eq!(context.stdout.trim(), "from-script");
    }

    #[test]
    fn unknown_program_is_a_build_env_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            mash_root: dir.path().join("prefix"),
        };
        let formula = formula_with_build(&["no-such-build-tool"]);
        let build_env = BuildEnvironment::new(&formula, &config, dir.path());
        assert!(matches!(
            resolve_program("no-such-build-tool", dir.path(), &build_env),
            Err(MashError::BuildEnv(_))
        ));
    }
}
