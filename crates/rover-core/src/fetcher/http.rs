//! HTTP GET fetcher on libcurl.
//!
//! Streams the response body into `<file>.part`, verifies the hash of the
//! completed temp file and only then renames it over the final name, so a
//! failed or corrupt transfer never leaves a file under the registry name.

use super::{file_url, ContentFetcher, FetchError, FetchOutcome};
use crate::checksum::{ContentHasher, Sha2Hasher};
use crate::config::RoverConfig;
use crate::registry::RegistryEntry;
use crate::retry::{run_with_retry, RetryPolicy};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `a.bin` → `a.bin.part`).
pub fn part_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

#[derive(Debug, Clone)]
pub struct CurlFetcher {
    hasher: Sha2Hasher,
    retry: RetryPolicy,
    connect_timeout: Duration,
    timeout: Duration,
}

impl CurlFetcher {
    pub fn new(cfg: &RoverConfig) -> Self {
        Self {
            hasher: Sha2Hasher,
            retry: cfg.retry_policy(),
            connect_timeout: cfg.connect_timeout(),
            timeout: cfg.timeout(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// One GET of `url` into `part`, truncating any previous attempt.
    /// Returns the number of bytes written.
    fn download(&self, url: &str, part: &Path) -> Result<u64, FetchError> {
        let io_err = |source| FetchError::Io {
            path: part.to_path_buf(),
            source,
        };
        let curl_err = |source| FetchError::Curl {
            url: url.to_string(),
            source,
        };

        let mut file = File::create(part).map_err(io_err)?;
        let mut written = 0u64;
        let mut write_failure = None;

        let mut easy = curl::easy::Easy::new();
        easy.url(url).map_err(curl_err)?;
        easy.follow_location(true).map_err(curl_err)?;
        easy.max_redirections(10).map_err(curl_err)?;
        easy.connect_timeout(self.connect_timeout).map_err(curl_err)?;
        easy.low_speed_limit(1024).map_err(curl_err)?;
        easy.low_speed_time(Duration::from_secs(60)).map_err(curl_err)?;
        easy.timeout(self.timeout).map_err(curl_err)?;

        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| match file.write_all(data) {
                    Ok(()) => {
                        written += data.len() as u64;
                        Ok(data.len())
                    }
                    Err(e) => {
                        write_failure = Some(e);
                        Ok(0) // abort transfer
                    }
                })
                .map_err(curl_err)?;
            transfer.perform()
        };

        if let Some(source) = write_failure {
            return Err(io_err(source));
        }
        performed.map_err(curl_err)?;

        let code = easy.response_code().map_err(curl_err)?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http {
                url: url.to_string(),
                code,
            });
        }
        file.sync_all().map_err(io_err)?;
        Ok(written)
    }
}

impl ContentFetcher for CurlFetcher {
    fn fetch(
        &self,
        target_dir: &Path,
        base_url: &str,
        entry: &RegistryEntry,
    ) -> Result<FetchOutcome, FetchError> {
        let path = target_dir.join(&entry.filename);
        let expected = self.hasher.canonicalize(&entry.hash)?;

        let existed = path.is_file();
        if existed {
            let actual = self.hasher.hash_file(&path, &entry.hash)?;
            if actual == expected {
                tracing::debug!(path = %path.display(), "already cached");
                return Ok(FetchOutcome::Cached);
            }
            tracing::info!(path = %path.display(), "local copy outdated; updating");
        }

        let url = file_url(base_url, &entry.filename)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| FetchError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let part = part_path(&path);
        tracing::info!(url = %url, path = %path.display(), "downloading");
        let written = match run_with_retry(&self.retry, || self.download(url.as_str(), &part)) {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&part);
                return Err(e);
            }
        };

        let actual = match self.hasher.hash_file(&part, &entry.hash) {
            Ok(actual) => actual,
            Err(e) => {
                let _ = fs::remove_file(&part);
                return Err(e.into());
            }
        };
        if actual != expected {
            let _ = fs::remove_file(&part);
            return Err(FetchError::HashMismatch {
                file: entry.filename.clone(),
                expected: entry.hash.clone(),
                actual,
            });
        }

        fs::rename(&part, &path).map_err(|source| FetchError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), bytes = written, "fetched and verified");

        Ok(if existed {
            FetchOutcome::Updated
        } else {
            FetchOutcome::Downloaded
        })
    }
}
