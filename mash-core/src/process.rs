// mash-core/src/process.rs
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Output as StdOutput;
use std::process::Stdio;
use std::sync::Arc;

use mash_common::error::{MashError, Result};
use tokio::process::Command;
use tracing::{debug, error};

/// Asynchronously runs an external command and captures its output.
/// When `envs` is given it replaces the inherited environment entirely,
/// so callers control exactly what a build sees.
pub async fn run_command_async(
    command: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    envs: Option<HashMap<String, String>>,
) -> Result<StdOutput> {
    debug!(
        "Running command: {} {:?} (cwd: {:?}, envs: {:?})",
        command,
        args,
        cwd,
        envs.as_ref().map(|e| e.keys().collect::<Vec<_>>()) // Log only keys for envs
    );

    let mut cmd = Command::new(command);
    cmd.args(args);
    cmd.kill_on_drop(true);

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    if let Some(env_map) = envs {
        cmd.env_clear();
        cmd.envs(env_map);
    }

    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(Stdio::null()); // Prevent hanging on stdin

    match cmd.output().await {
        Ok(output) => {
            if !output.status.success() {
                debug!("Command failed with status: {}", output.status);
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stdout.trim().is_empty() {
                    debug!("Stdout:\n{}", stdout.trim());
                }
                if !stderr.trim().is_empty() {
                    debug!("Stderr:\n{}", stderr.trim());
                }
            } else {
                debug!("Command finished successfully.");
            }
            Ok(output) // Return the full output regardless of status
        }
        Err(e) => {
            error!("Failed to execute command: {}", e);
            Err(MashError::Io(Arc::new(e)))
        }
    }
}

/// Keeps the last `lines` lines of captured output for error reporting.
pub fn output_tail(output: &str, lines: usize) -> String {
    let collected: Vec<&str> = output.lines().rev().take(lines).collect();
    collected
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_output_and_exit_status() {
        let output = run_command_async(
            "/bin/sh".to_string(),
            vec!["-c".to_string(), "echo out; echo err >&2; exit 7".to_string()],
            None,
            None,
        )
        .await
        .unwrap();
        assert_eq!(output.status.code(), Some(7));
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out");
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "err");
    }

    #[tokio::test]
    async fn missing_binary_is_an_io_error() {
        let result = run_command_async(
            "/definitely/not/a/binary".to_string(),
            vec![],
            None,
            None,
        )
        .await;
        assert!(matches!(result, Err(MashError::Io(_))));
    }

    #[test]
    fn tail_keeps_only_the_last_lines() {
        let text = "one\ntwo\nthree\nfour";
        assert_eq!(output_tail(text, 2), "three\nfour");
        assert_eq!(output_tail(text, 10), text);
        assert_eq!(output_tail("", 3), "");
    }
}
