// mash-core/src/receipt.rs
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use mash_common::config::Config;
use mash_common::error::Result;
use mash_common::model::formula::Formula;
use tracing::debug;

/// Writes the install receipt for a completed run into the state
/// directory. The receipt records what was installed and when, and is what
/// `mash list` reads back.
pub fn write_receipt(formula: &Formula, installed: &[PathBuf], config: &Config) -> Result<PathBuf> {
    fs::create_dir_all(config.state_dir())?;
    let receipt_path = config.receipt_path(formula.name());
    let mut receipt_file = File::create(&receipt_path)?;

    let receipt = serde_json::json!({
        "name": formula.name,
        "version": formula.version,
        "time": chrono::Utc::now().to_rfc3339(),
        "source": {
            "url": formula.url,
            "sha256": formula.sha256,
        },
        "license": formula.license,
        "installed_files": installed,
        "built_on": {
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }
    });

    let receipt_json = serde_json::to_string_pretty(&receipt)?;
    receipt_file.write_all(receipt_json.as_bytes())?;
    debug!("Wrote install receipt: {}", receipt_path.display());

    Ok(receipt_path)
}

/// Reads back the receipts in the state directory, one per installed
/// formula, skipping entries that fail to parse.
pub fn read_receipts(config: &Config) -> Result<Vec<serde_json::Value>> {
    let state_dir = config.state_dir();
    if !state_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut receipts = Vec::new();
    for entry in fs::read_dir(&state_dir)?.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match read_receipt_file(&path) {
            Ok(value) => receipts.push(value),
            Err(e) => debug!("Skipping unreadable receipt {}: {}", path.display(), e),
        }
    }
    receipts.sort_by_key(|r| {
        r.get("name")
            .and_then(|n| n.as_str())
            .unwrap_or_default()
            .to_string()
    });
    Ok(receipts)
}

fn read_receipt_file(path: &Path) -> Result<serde_json::Value> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
