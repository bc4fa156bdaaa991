// mash/src/cli/info.rs

use clap::Args;
use colored::Colorize;
use mash_common::config::Config;
use mash_common::error::Result;
use mash_common::formulary::Formulary;

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Formula name or path to a definition file
    target: String,
}

impl InfoArgs {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let formulary = Formulary::new(config.clone());
        let formula = formulary.load(&self.target)?;

        println!(
            "{}{}",
            "==> ".bold().blue(),
            format!("{} {}", formula.name(), formula.version).bold()
        );
        if let Some(desc) = &formula.desc {
            println!("{desc}");
        }
        if let Some(homepage) = &formula.homepage {
            println!("{}", homepage.underline());
        }
        if let Some(license) = &formula.license {
            println!("License: {license}");
        }
        println!("Source: {}", formula.source_url());
        println!("SHA256: {}", formula.source_sha256());
        if !formula.mirrors.is_empty() {
            println!("Mirrors: {}", formula.mirrors.join(", "));
        }
        if !formula.dependencies.is_empty() {
            println!("Build dependencies: {}", formula.dependencies.join(", "));
        }
        println!("Build: {}", formula.build.join(" "));
        for entry in &formula.install {
            println!("Installs: {} -> {}", entry.source.display(), entry.dest);
        }
        if !formula.test.is_empty() {
            println!("Test: {}", formula.test.join(" "));
        }
        Ok(())
    }
}
