// mash/src/cli/list.rs

use clap::Args;
use colored::Colorize;
use mash_common::config::Config;
use mash_common::error::Result;
use mash_core::receipt;

#[derive(Debug, Args)]
pub struct ListArgs {}

impl ListArgs {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let receipts = receipt::read_receipts(config)?;
        if receipts.is_empty() {
            println!("No formulae installed under {}", config.mash_root().display());
            return Ok(());
        }

        for entry in receipts {
            let name = entry
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("<unknown>");
            let version = entry.get("version").and_then(|v| v.as_str()).unwrap_or("");
            let time = entry.get("time").and_then(|v| v.as_str()).unwrap_or("");
            println!("{} {} {}", name.bold(), version, time.dimmed());
        }
        Ok(())
    }
}
