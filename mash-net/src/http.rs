use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mash_common::config::Config;
use mash_common::error::{MashError, Result};
use mash_common::model::formula::Formula;
use reqwest::header::{HeaderMap, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use tokio::fs::File as TokioFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};
use url::Url;

use crate::validation::{validate_url, verify_checksum};

const DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = "mash build orchestrator (Rust; +https://github.com/mash-pm/mash)";

/// Fetches the source artifact for a formula into the cache directory and
/// returns its local path.
///
/// A cached artifact is reused only if its checksum still matches; a stale
/// entry is deleted and re-downloaded. Mirrors are tried in order when the
/// primary URL fails at the transport or HTTP level. The artifact returned
/// here is NOT yet trusted: the orchestrator runs its own verification
/// stage on it before anything is built.
pub async fn fetch_formula_source(formula: &Formula, config: &Config) -> Result<PathBuf> {
    let url = formula.source_url();
    let filename = url
        .split('/')
        .next_back()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("{}-download", formula.name()));
    let cache_path = config.cache_dir().join(&filename);

    debug!(
        "Preparing to fetch source for '{}' from URL: {}",
        formula.name(),
        url
    );
    debug!("Target cache path: {}", cache_path.display());

    if cache_path.is_file() {
        match verify_checksum(&cache_path, formula.source_sha256()) {
            Ok(_) => {
                debug!("Using valid cached file: {}", cache_path.display());
                return Ok(cache_path);
            }
            Err(e) => {
                debug!(
                    "Cached file checksum mismatch ({}): {}. Redownloading.",
                    cache_path.display(),
                    e
                );
                if let Err(remove_err) = fs::remove_file(&cache_path) {
                    debug!(
                        "Failed to remove stale cached file {}: {}",
                        cache_path.display(),
                        remove_err
                    );
                }
            }
        }
    } else {
        debug!("File not found in cache.");
    }

    fs::create_dir_all(config.cache_dir()).map_err(|e| {
        MashError::IoError(format!(
            "Failed to create cache directory {}: {}",
            config.cache_dir().display(),
            e
        ))
    })?;
    validate_url(url)?;

    let client = build_http_client()?;

    let urls_to_try = std::iter::once(url).chain(formula.mirrors.iter().map(|s| s.as_str()));
    let mut last_error: Option<MashError> = None;

    for current_url in urls_to_try {
        validate_url(current_url)?;
        debug!("Attempting download from: {}", current_url);
        match download_to(&client, current_url, &cache_path).await {
            Ok(path) => {
                debug!("Successfully downloaded: {}", path.display());
                return Ok(path);
            }
            Err(e) => {
                error!("Download attempt failed from {}: {}", current_url, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| MashError::Download {
        name: formula.name().to_string(),
        url: url.to_string(),
        cause: "All download attempts failed.".to_string(),
    }))
}

fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, USER_AGENT_STRING.parse().unwrap());
    headers.insert(ACCEPT, "*/*".parse().unwrap());
    Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| MashError::Generic(format!("Failed to build HTTP client: {e}")))
}

/// Downloads `url` to `final_path` through a sibling temp file that is
/// renamed into place once fully written, so a partial download never
/// occupies the cache path.
async fn download_to(client: &Client, url: &str, final_path: &Path) -> Result<PathBuf> {
    let temp_filename = format!(
        ".{}.download",
        final_path.file_name().unwrap_or_default().to_string_lossy()
    );
    let temp_path = final_path.with_file_name(temp_filename);
    debug!("Downloading to temporary path: {}", temp_path.display());
    if temp_path.exists() {
        if let Err(e) = fs::remove_file(&temp_path) {
            warn!(
                "Could not remove existing temporary file {}: {}",
                temp_path.display(),
                e
            );
        }
    }

    let parsed = Url::parse(url)
        .map_err(|e| MashError::Generic(format!("Failed to parse URL '{url}': {e}")))?;
    if parsed.scheme() == "file" {
        copy_local_source(&parsed, &temp_path)?;
    } else {
        download_remote(client, url, &temp_path).await?;
    }

    fs::rename(&temp_path, final_path).map_err(|e| {
        MashError::IoError(format!(
            "Failed to move temp file {} to {}: {}",
            temp_path.display(),
            final_path.display(),
            e
        ))
    })?;
    debug!("Moved downloaded file to: {}", final_path.display());
    Ok(final_path.to_path_buf())
}

fn copy_local_source(url: &Url, temp_path: &Path) -> Result<()> {
    let source = url
        .to_file_path()
        .map_err(|_| MashError::Generic(format!("Invalid file URL: {url}")))?;
    if !source.is_file() {
        return Err(MashError::Download {
            name: source
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            url: url.to_string(),
            cause: "Local source file does not exist".to_string(),
        });
    }
    fs::copy(&source, temp_path).map_err(|e| {
        MashError::IoError(format!(
            "Failed to copy local source {} to {}: {}",
            source.display(),
            temp_path.display(),
            e
        ))
    })?;
    Ok(())
}

async fn download_remote(client: &Client, url: &str, temp_path: &Path) -> Result<()> {
    let response = client.get(url).send().await.map_err(|e| {
        debug!("HTTP request failed for {url}: {e}");
        MashError::Generic(format!("HTTP request failed for {url}: {e}"))
    })?;
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);

    if !status.is_success() {
        let name = temp_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        return Err(match status {
            StatusCode::NOT_FOUND => MashError::Download {
                name,
                url: url.to_string(),
                cause: "Resource not found (404)".to_string(),
            },
            StatusCode::FORBIDDEN => MashError::Download {
                name,
                url: url.to_string(),
                cause: "Access forbidden (403)".to_string(),
            },
            _ => MashError::Download {
                name,
                url: url.to_string(),
                cause: format!("HTTP error {status}"),
            },
        });
    }

    let mut temp_file = TokioFile::create(temp_path).await.map_err(|e| {
        MashError::IoError(format!(
            "Failed to create temp file {}: {}",
            temp_path.display(),
            e
        ))
    })?;
    let content = response
        .bytes()
        .await
        .map_err(|e| MashError::Generic(format!("Failed to read response body bytes: {e}")))?;
    temp_file.write_all(&content).await.map_err(|e| {
        MashError::IoError(format!(
            "Failed to write download stream to {}: {}",
            temp_path.display(),
            e
        ))
    })?;
    temp_file.flush().await.map_err(|e| {
        MashError::IoError(format!(
            "Failed to flush download stream to {}: {}",
            temp_path.display(),
            e
        ))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn local_formula(source: &Path, sha256: &str) -> Formula {
        let json = format!(
            r#"{{
                "name": "local",
                "url": "file://{}",
                "sha256": "{}",
                "build": ["true"],
                "install": ["bin/local"]
            }}"#,
            source.display(),
            sha256
        );
        serde_json::from_str(&json).unwrap()
    }

    #[tokio::test]
    async fn fetches_a_file_url_into_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("local-1.0.tar.gz");
        fs::write(&source, b"not really a tarball").unwrap();
        let digest = crate::validation::compute_sha256(&source).unwrap();

        let config = Config {
            mash_root: dir.path().join("prefix"),
        };
        let formula = local_formula(&source, &digest);

        let cached = fetch_formula_source(&formula, &config).await.unwrap();
        assert_eq!(cached, config.cache_dir().join("local-1.0.tar.gz"));
        assert_eq!(fs::read(&cached).unwrap(), b"not really a tarball");
    }

    #[tokio::test]
    async fn reuses_a_valid_cached_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("local-1.0.tar.gz");
        fs::write(&source, b"cached bytes").unwrap();
        let digest = crate::validation::compute_sha256(&source).unwrap();

        let config = Config {
            mash_root: dir.path().join("prefix"),
        };
        let formula = local_formula(&source, &digest);

        let first = fetch_formula_source(&formula, &config).await.unwrap();
        // Remove the origin; a second fetch must succeed from cache alone.
        fs::remove_file(&source).unwrap();
        let second = fetch_formula_source(&formula, &config).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_local_source_is_a_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("gone-1.0.tar.gz");
        let config = Config {
            mash_root: dir.path().join("prefix"),
        };
        let formula = local_formula(
            &source,
            "2222222222222222222222222222222222222222222222222222222222222222",
        );

        let err = fetch_formula_source(&formula, &config).await.unwrap_err();
        assert!(matches!(err, MashError::Download { .. }), "got {err}");
    }
}
