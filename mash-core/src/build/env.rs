// mash-core/src/build/env.rs
// Sanitized build environment: builds run with a controlled variable set
// and a rebuilt PATH instead of whatever the invoking shell carries.

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use mash_common::config::Config;
use mash_common::model::formula::Formula;

// Environment variables passed through from the user's environment.
// PATH is intentionally not kept; it is rebuilt entirely.
const ENV_VARS_TO_KEEP: &[&str] = &[
    "USER", "LOGNAME", "HOME", "TERM", "SHELL", "LANG", "LC_ALL", "LC_CTYPE", "TZ",
];

const SYSTEM_PATH_DIRS: &[&str] = &["/usr/bin", "/bin", "/usr/sbin", "/sbin"];

#[derive(Debug, Clone)]
pub struct BuildEnvironment {
    /// The final map of environment variables used for build commands.
    vars: HashMap<String, String>,
    /// The ordered list of directories constituting the final PATH.
    path_dirs: Vec<PathBuf>,
}

impl BuildEnvironment {
    pub fn new(formula: &Formula, config: &Config, build_dir: &Path) -> Self {
        let mut vars = HashMap::new();
        for key in ENV_VARS_TO_KEEP {
            if let Ok(value) = env::var(key) {
                vars.insert((*key).to_string(), value);
            }
        }

        // Prefix bin first so already-installed formulae are picked up,
        // then the source tree itself (build scripts shipped with the
        // source, e.g. gobuild.sh), then the system directories.
        let mut path_dirs = vec![config.bin_dir(), build_dir.to_path_buf()];
        path_dirs.extend(SYSTEM_PATH_DIRS.iter().map(PathBuf::from));

        vars.insert("PATH".to_string(), join_paths(&path_dirs));
        vars.insert(
            "MASH_PREFIX".to_string(),
            config.mash_root().to_string_lossy().to_string(),
        );
        vars.insert(
            "MASH_BUILD_DIR".to_string(),
            build_dir.to_string_lossy().to_string(),
        );
        vars.insert("MASH_FORMULA".to_string(), formula.name().to_string());
        vars.insert(
            "TMPDIR".to_string(),
            config.tmp_dir().to_string_lossy().to_string(),
        );

        Self { vars, path_dirs }
    }

    pub fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }

    pub fn path_string(&self) -> OsString {
        OsString::from(join_paths(&self.path_dirs))
    }
}

fn join_paths(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_formula() -> Formula {
        serde_json::from_str(
            r#"{
                "name": "demo",
                "url": "https://example.com/demo-1.0.tar.gz",
                "sha256": "3333333333333333333333333333333333333333333333333333333333333333",
                "build": ["make"],
                "install": ["bin/demo"]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn sets_controlled_vars_and_rebuilds_path() {
        let config = Config {
            mash_root: PathBuf::from("/tmp/mash-env-test"),
        };
        let build_dir = PathBuf::from("/tmp/mash-env-test/tmp/demo-build");
        let env = BuildEnvironment::new(&demo_formula(), &config, &build_dir);

        let path = env.vars().get("PATH").unwrap();
        assert!(path.starts_with("/tmp/mash-env-test/bin:/tmp/mash-env-test/tmp/demo-build"));
        assert!(path.contains("/usr/bin"));
        assert_eq!(
            env.vars().get("MASH_PREFIX").map(String::as_str),
            Some("/tmp/mash-env-test")
        );
        assert_eq!(
            env.vars().get("MASH_FORMULA").map(String::as_str),
            Some("demo")
        );
        // Interfering toolchain vars from the outer environment never leak in.
        assert!(!env.vars().contains_key("CFLAGS"));
        assert!(!env.vars().contains_key("GOPATH"));
    }
}
