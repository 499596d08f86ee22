//! Error taxonomy for registry parsing, cache reconciliation and fetching.
//!
//! Every variant is fatal to the current invocation; nothing here is
//! recovered internally.

use crate::checksum::HashError;
use crate::fetcher::FetchError;
use std::io;
use std::path::PathBuf;

/// A cached file whose computed hash disagrees with its registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Registry filename of the cached copy.
    pub file: String,
    /// Hash recorded in the registry.
    pub expected: String,
    /// Hash computed from the local bytes.
    pub actual: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RoverError {
    /// A `--file` argument is not exactly one `FILENAME=HASH` pair.
    #[error("{entry} is not a FILENAME=HASH pair")]
    MalformedEntry { entry: String },

    /// Validate mode found a cached file that no longer matches its hash.
    #[error(
        "{file} has a different hash than its known hash (expected {expected}, found {actual}); \
         rerun with --no-cache to delete and re-download it"
    )]
    HashMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    /// Collect-all validation found one or more mismatching cached files.
    #[error(
        "{} cached file(s) differ from their known hashes: {}; \
         rerun with --no-cache to delete and re-download them",
        .0.len(),
        mismatch_names(.0)
    )]
    HashMismatches(Vec<Mismatch>),

    /// Force-refresh could not delete a cached copy.
    #[error("could not evict cached file {}", .path.display())]
    CacheEvictionFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Required environment configuration is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid repository name {name:?}: expected a single directory name")]
    InvalidRepoName { name: String },

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error("{}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Download failures are carried through from the fetcher unchanged.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

fn mismatch_names(mismatches: &[Mismatch]) -> String {
    mismatches
        .iter()
        .map(|m| m.file.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
