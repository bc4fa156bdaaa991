use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::config::Config;
use super::error::{MashError, Result};
use super::model::formula::Formula;

/// Resolves install targets to formula definitions. A target is either an
/// explicit path to a `.json` definition or a bare name looked up in the
/// formulary directory under the prefix.
pub struct Formulary {
    config: Config,
    parsed_cache: Mutex<HashMap<String, Arc<Formula>>>,
}

impl Formulary {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            parsed_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn load(&self, target: &str) -> Result<Formula> {
        let mut parsed_cache_guard = self.parsed_cache.lock().unwrap();
        if let Some(formula_arc) = parsed_cache_guard.get(target) {
            debug!("Loaded formula '{}' from parsed cache.", target);
            return Ok(formula_arc.as_ref().clone());
        }
        drop(parsed_cache_guard);

        let path = self.resolve_path(target)?;
        let formula = load_formula_file(&path)?;
        debug!(
            "Loaded formula '{}' version '{}' from {}",
            formula.name,
            formula.version,
            path.display()
        );

        parsed_cache_guard = self.parsed_cache.lock().unwrap();
        parsed_cache_guard
            .entry(target.to_string())
            .or_insert_with(|| Arc::new(formula.clone()));
        Ok(formula)
    }

    fn resolve_path(&self, target: &str) -> Result<PathBuf> {
        let as_path = Path::new(target);
        if target.ends_with(".json") || target.contains('/') {
            if as_path.is_file() {
                return Ok(as_path.to_path_buf());
            }
            return Err(MashError::NotFound(format!(
                "Formula file '{target}' does not exist"
            )));
        }

        let formulary_path = self.config.formula_path(target);
        if formulary_path.is_file() {
            return Ok(formulary_path);
        }
        Err(MashError::NotFound(format!(
            "Formula '{}' not found in {}",
            target,
            self.config.formulary_dir().display()
        )))
    }
}

/// Parses and validates a single formula definition file.
pub fn load_formula_file(path: &Path) -> Result<Formula> {
    let raw = fs::read_to_string(path).map_err(|e| {
        MashError::IoError(format!(
            "Failed to read formula file {}: {}",
            path.display(),
            e
        ))
    })?;
    let formula: Formula = serde_json::from_str(&raw)
        .map_err(|e| MashError::Parse("formula definition", e.to_string()))?;
    formula.validate()?;
    Ok(formula)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_formula(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(format!("{name}.json"));
        let json = format!(
            r#"{{
                "name": "{name}",
                "url": "https://example.com/{name}-1.0.tar.gz",
                "sha256": "1111111111111111111111111111111111111111111111111111111111111111",
                "build": ["make"],
                "install": ["bin/{name}"]
            }}"#
        );
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn loads_from_an_explicit_path() {
        let dir = std::env::temp_dir().join("mash-formulary-test-path");
        fs::create_dir_all(&dir).unwrap();
        let path = write_formula(&dir, "pathy");

        let formulary = Formulary::new(Config {
            mash_root: dir.clone(),
        });
        let formula = formulary.load(path.to_str().unwrap()).unwrap();
        assert_eq!(formula.name, "pathy");
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn loads_by_name_from_the_formulary_dir() {
        let root = std::env::temp_dir().join("mash-formulary-test-name");
        let config = Config {
            mash_root: root.clone(),
        };
        fs::create_dir_all(config.formulary_dir()).unwrap();
        write_formula(&config.formulary_dir(), "named");

        let formulary = Formulary::new(config);
        let formula = formulary.load("named").unwrap();
        assert_eq!(formula.name, "named");
        // Second load hits the parse cache.
        assert_eq!(formulary.load("named").unwrap().name, "named");
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn unknown_name_is_not_found() {
        let root = std::env::temp_dir().join("mash-formulary-test-missing");
        let formulary = Formulary::new(Config { mash_root: root });
        assert!(matches!(
            formulary.load("no-such-formula"),
            Err(MashError::NotFound(_))
        ));
    }
}
