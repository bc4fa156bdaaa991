// mash-common/src/pipeline.rs
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MashError;

// --- Shared Enums / Structs ---

/// The five stages of a formula run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Fetch,
    Verify,
    Build,
    Install,
    Test,
}

impl Stage {
    /// Progressive label used in user-facing output.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Fetch => "Fetching",
            Stage::Verify => "Verifying",
            Stage::Build => "Building",
            Stage::Install => "Installing",
            Stage::Test => "Testing",
        }
    }

    /// Status the run terminates with when this stage fails.
    pub fn failure_status(&self) -> InstallStatus {
        match self {
            Stage::Fetch => InstallStatus::FetchFailed,
            Stage::Verify => InstallStatus::VerifyFailed,
            Stage::Build => InstallStatus::BuildFailed,
            Stage::Install => InstallStatus::InstallFailed,
            Stage::Test => InstallStatus::TestFailed,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Terminal status of one formula run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallStatus {
    Done,
    FetchFailed,
    VerifyFailed,
    BuildFailed,
    InstallFailed,
    TestFailed,
}

impl InstallStatus {
    /// Process exit code for this status. Each failing stage gets a
    /// distinct code so callers can tell them apart without parsing output.
    pub fn exit_code(self) -> i32 {
        match self {
            InstallStatus::Done => 0,
            InstallStatus::FetchFailed => 2,
            InstallStatus::VerifyFailed => 3,
            InstallStatus::BuildFailed => 4,
            InstallStatus::InstallFailed => 5,
            InstallStatus::TestFailed => 6,
        }
    }

    pub fn failed_stage(self) -> Option<Stage> {
        match self {
            InstallStatus::Done => None,
            InstallStatus::FetchFailed => Some(Stage::Fetch),
            InstallStatus::VerifyFailed => Some(Stage::Verify),
            InstallStatus::BuildFailed => Some(Stage::Build),
            InstallStatus::InstallFailed => Some(Stage::Install),
            InstallStatus::TestFailed => Some(Stage::Test),
        }
    }
}

/// Wall-clock duration of one completed stage.
#[derive(Debug, Clone)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration: Duration,
}

impl fmt::Display for StageTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Millisecond precision is enough for human eyes.
        let rounded = Duration::from_millis(self.duration.as_millis() as u64);
        write!(f, "{}: {}", self.stage, humantime::format_duration(rounded))
    }
}

/// Terminal record of one formula run, produced exactly once.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub formula: String,
    pub status: InstallStatus,
    pub timings: Vec<StageTiming>,
    pub error: Option<MashError>,
    pub installed_paths: Vec<PathBuf>,
}

impl InstallReport {
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

/// Progress events published over a broadcast channel while a run executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    PipelineStarted {
        formula: String,
    },
    PipelineFinished {
        formula: String,
        status: InstallStatus,
        duration_secs: f64,
    },
    StageStarted {
        formula: String,
        stage: Stage,
    },
    StageFinished {
        formula: String,
        stage: Stage,
        duration_secs: f64,
    },
    StageFailed {
        formula: String,
        stage: Stage,
        error: String, // Keep as String for simplicity in events
    },
    DownloadStarted {
        formula: String,
        url: String,
    },
    DownloadFinished {
        formula: String,
        path: PathBuf,
        size_bytes: u64,
    },
}

impl PipelineEvent {
    // MashError kept for internal use, but events use String for error messages
    pub fn stage_failed(formula: String, stage: Stage, error: &MashError) -> Self {
        PipelineEvent::StageFailed {
            formula,
            stage,
            error: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_stage() {
        let statuses = [
            InstallStatus::Done,
            InstallStatus::FetchFailed,
            InstallStatus::VerifyFailed,
            InstallStatus::BuildFailed,
            InstallStatus::InstallFailed,
            InstallStatus::TestFailed,
        ];
        let codes: Vec<i32> = statuses.iter().map(|s| s.exit_code()).collect();
        let mut deduped = codes.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(codes.len(), deduped.len());
        assert_eq!(InstallStatus::Done.exit_code(), 0);
        assert!(statuses[1..].iter().all(|s| s.exit_code() != 0));
    }

    #[test]
    fn failure_status_round_trips_through_stage() {
        for stage in [
            Stage::Fetch,
            Stage::Verify,
            Stage::Build,
            Stage::Install,
            Stage::Test,
        ] {
            assert_eq!(stage.failure_status().failed_stage(), Some(stage));
        }
        assert_eq!(InstallStatus::Done.failed_stage(), None);
    }
}
