// mash/src/cli/fetch.rs

use clap::Args;
use colored::Colorize;
use mash_common::config::Config;
use mash_common::error::Result;
use mash_common::formulary::Formulary;
use tracing::instrument;

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Formula names or paths to definition files
    #[arg(required = true)]
    targets: Vec<String>,
}

impl FetchArgs {
    #[instrument(skip(self, config), fields(targets = ?self.targets))]
    pub async fn run(&self, config: &Config) -> Result<()> {
        let formulary = Formulary::new(config.clone());

        for target in &self.targets {
            let formula = formulary.load(target)?;
            println!(
                "{}{}",
                "==> ".bold().blue(),
                format!("Fetching {}", formula.name()).bold()
            );

            let path = mash_net::fetch_formula_source(&formula, config).await?;
            mash_net::verify_checksum(&path, formula.source_sha256())?;
            println!(
                "    Downloaded and verified: {}",
                path.display().to_string().green()
            );
        }
        Ok(())
    }
}
