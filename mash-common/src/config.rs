// mash-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use directories::UserDirs;
use tracing::debug;

use super::error::Result;

// Fallback when MASH_PREFIX is not set or is empty.
const DEFAULT_FALLBACK_MASH_ROOT: &str = "/opt/mash";

#[derive(Debug, Clone)]
pub struct Config {
    pub mash_root: PathBuf, // Public for direct construction in tests and init paths
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading mash configuration");

        let mash_root_str = env::var("MASH_PREFIX")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                debug!(
                    "MASH_PREFIX environment variable not set or empty, falling back to default: {}",
                    DEFAULT_FALLBACK_MASH_ROOT
                );
                DEFAULT_FALLBACK_MASH_ROOT.to_string()
            });

        let mash_root = PathBuf::from(&mash_root_str);
        debug!("Effective MASH_PREFIX set to: {}", mash_root.display());

        Ok(Self { mash_root })
    }

    pub fn mash_root(&self) -> &Path {
        &self.mash_root
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.mash_root.join("bin")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.mash_root.join("cache")
    }

    pub fn formulary_dir(&self) -> PathBuf {
        self.mash_root.join("formulary")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.mash_root.join("logs")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.mash_root.join("tmp")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.mash_root.join("state")
    }

    pub fn formula_path(&self, formula_name: &str) -> PathBuf {
        self.formulary_dir().join(format!("{formula_name}.json"))
    }

    pub fn receipt_path(&self, formula_name: &str) -> PathBuf {
        self.state_dir().join(format!("{formula_name}.json"))
    }

    pub fn home_dir(&self) -> PathBuf {
        UserDirs::new().map_or_else(|| PathBuf::from("/"), |ud| ud.home_dir().to_path_buf())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::load().expect("Failed to load default configuration")
    }
}

pub fn load_config() -> Result<Config> {
    Config::load()
}
