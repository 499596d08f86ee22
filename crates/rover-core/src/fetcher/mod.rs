//! Content-addressed fetching of registry files from a base URL.
//!
//! A fetcher downloads one registered file into the repository directory
//! and verifies it against its registry hash as part of the fetch itself.

mod http;

pub use http::{part_path, CurlFetcher};

use crate::checksum::HashError;
use crate::registry::RegistryEntry;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// What a fetch did for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Local copy already matched; nothing was downloaded.
    Cached,
    /// File was absent and has been downloaded.
    Downloaded,
    /// A non-matching local copy was replaced.
    Updated,
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchOutcome::Cached => "cached",
            FetchOutcome::Downloaded => "downloaded",
            FetchOutcome::Updated => "updated",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid URL for {file} under {base}")]
    InvalidUrl {
        base: String,
        file: String,
        #[source]
        source: url::ParseError,
    },

    #[error("GET {url} failed")]
    Curl {
        url: String,
        #[source]
        source: ::curl::Error,
    },

    #[error("GET {url} returned HTTP {code}")]
    Http { url: String, code: u32 },

    #[error("downloaded {file} has hash {actual}, expected {expected}")]
    HashMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error("{}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Downloads one registered file into `target_dir`.
pub trait ContentFetcher {
    fn fetch(
        &self,
        target_dir: &Path,
        base_url: &str,
        entry: &RegistryEntry,
    ) -> Result<FetchOutcome, FetchError>;
}

/// URL of `filename` under `base_url`; the base is treated as a directory
/// whether or not it ends with `/`. Each `/`-separated part of `filename` is
/// appended as one percent-encoded path segment, so it can never change the
/// scheme, host, query or fragment.
pub fn file_url(base_url: &str, filename: &str) -> Result<Url, FetchError> {
    let invalid = |source| FetchError::InvalidUrl {
        base: base_url.to_string(),
        file: filename.to_string(),
        source,
    };
    let mut url = Url::parse(base_url).map_err(invalid)?;
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(filename.split('/'));
    Ok(url)
}
