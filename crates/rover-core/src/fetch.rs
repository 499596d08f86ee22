//! One `rover fetch` run: parse the registry, reconcile the cache, lay out
//! the cache area, then hand every registered file to the fetcher.
//!
//! Every step is fail-fast; the first error ends the run.

use crate::cache::{self, CacheFs, CacheLayout, CacheMode, MismatchPolicy, ReconcileReport};
use crate::checksum::ContentHasher;
use crate::config::MountLocation;
use crate::error::RoverError;
use crate::fetcher::{ContentFetcher, FetchOutcome};
use crate::registry;
use std::path::PathBuf;

/// Arguments of a fetch run as given on the command line.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Repository name; the directory under the mount location.
    pub repo: String,
    /// Base URL the files are fetched from.
    pub url: String,
    /// `FILENAME=HASH` entries.
    pub files: Vec<String>,
    /// Discard cached copies before fetching.
    pub no_cache: bool,
}

#[derive(Debug, Clone)]
pub struct FetchSummary {
    pub repo_dir: PathBuf,
    pub reconcile: ReconcileReport,
    /// Per-file outcome in registry order.
    pub outcomes: Vec<(String, FetchOutcome)>,
}

pub fn run_fetch<F, H, C>(
    request: &FetchRequest,
    mount: &MountLocation,
    policy: MismatchPolicy,
    fs: &F,
    hasher: &H,
    fetcher: &C,
) -> Result<FetchSummary, RoverError>
where
    F: CacheFs + ?Sized,
    H: ContentHasher + ?Sized,
    C: ContentFetcher + ?Sized,
{
    tracing::info!(repo = %request.repo, url = %request.url, "retrieving samples");

    let registry = registry::parse_entries(&request.files)?;
    let layout = CacheLayout::new(mount, &request.repo)?;
    let repo_dir = layout.repo_dir();

    let mode = CacheMode::from_flags(request.no_cache, policy);
    let report = cache::reconcile(&registry, &repo_dir, mode, fs, hasher)?;

    layout.ensure()?;

    let mut outcomes = Vec::with_capacity(registry.len());
    for entry in &registry {
        let outcome = fetcher.fetch(&repo_dir, &request.url, entry)?;
        tracing::debug!(file = %entry.filename, %outcome, "fetch finished");
        outcomes.push((entry.filename.clone(), outcome));
    }

    tracing::info!(repo = %request.repo, files = outcomes.len(), "returned all samples");
    Ok(FetchSummary {
        repo_dir,
        reconcile: report,
        outcomes,
    })
}
