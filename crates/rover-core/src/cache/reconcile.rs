//! Decides, per registered file, whether the local copy is valid, stale or
//! absent, and enforces that decision before anything is downloaded.

use super::CacheFs;
use crate::checksum::ContentHasher;
use crate::error::{Mismatch, RoverError};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// What validate mode does when a cached file does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MismatchPolicy {
    /// Stop at the first mismatch; later files are not hashed.
    #[default]
    FailFast,
    /// Hash every present file and report all mismatches together.
    CollectAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Delete every registered file that exists locally.
    ForceRefresh,
    /// Hash every registered file that exists locally against the registry.
    Validate(MismatchPolicy),
}

impl CacheMode {
    /// `--no-cache` selects force-refresh; otherwise validate with `policy`.
    pub fn from_flags(no_cache: bool, policy: MismatchPolicy) -> Self {
        if no_cache {
            CacheMode::ForceRefresh
        } else {
            CacheMode::Validate(policy)
        }
    }
}

/// Per-file decisions from one reconciliation pass, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Deleted in force-refresh mode.
    pub evicted: Vec<String>,
    /// Hash matched in validate mode.
    pub verified: Vec<String>,
    /// Not present locally.
    pub skipped: Vec<String>,
}

/// Reconciles the cached copies under `target_dir` with `registry`.
///
/// A missing `target_dir` is a no-op in both modes. On success every
/// registered file under `target_dir` is either absent or verified.
pub fn reconcile<F, H>(
    registry: &Registry,
    target_dir: &Path,
    mode: CacheMode,
    fs: &F,
    hasher: &H,
) -> Result<ReconcileReport, RoverError>
where
    F: CacheFs + ?Sized,
    H: ContentHasher + ?Sized,
{
    let mut report = ReconcileReport::default();
    if !fs.is_dir(target_dir) {
        tracing::debug!(dir = %target_dir.display(), "repository directory absent; nothing to reconcile");
        report.skipped = registry.filenames().map(str::to_string).collect();
        return Ok(report);
    }

    match mode {
        CacheMode::ForceRefresh => evict(registry, target_dir, fs, &mut report)?,
        CacheMode::Validate(policy) => validate(registry, target_dir, policy, fs, hasher, &mut report)?,
    }

    tracing::info!(
        dir = %target_dir.display(),
        evicted = report.evicted.len(),
        verified = report.verified.len(),
        skipped = report.skipped.len(),
        "cache reconciled"
    );
    Ok(report)
}

fn evict<F>(
    registry: &Registry,
    target_dir: &Path,
    fs: &F,
    report: &mut ReconcileReport,
) -> Result<(), RoverError>
where
    F: CacheFs + ?Sized,
{
    for entry in registry {
        let path = target_dir.join(&entry.filename);
        if !fs.is_file(&path) {
            report.skipped.push(entry.filename.clone());
            continue;
        }
        match fs.remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "evicted cached file");
                report.evicted.push(entry.filename.clone());
            }
            // Gone between the check and the delete.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                report.skipped.push(entry.filename.clone());
            }
            Err(source) => return Err(RoverError::CacheEvictionFailure { path, source }),
        }
    }
    Ok(())
}

fn validate<F, H>(
    registry: &Registry,
    target_dir: &Path,
    policy: MismatchPolicy,
    fs: &F,
    hasher: &H,
    report: &mut ReconcileReport,
) -> Result<(), RoverError>
where
    F: CacheFs + ?Sized,
    H: ContentHasher + ?Sized,
{
    let mut mismatches = Vec::new();
    for entry in registry {
        let path = target_dir.join(&entry.filename);
        if !fs.is_file(&path) {
            tracing::debug!(path = %path.display(), "not fetched yet; skipping");
            report.skipped.push(entry.filename.clone());
            continue;
        }

        let expected = hasher.canonicalize(&entry.hash)?;
        let actual = hasher.hash_file(&path, &entry.hash)?;
        if actual == expected {
            tracing::debug!(path = %path.display(), "cached file verified");
            report.verified.push(entry.filename.clone());
            continue;
        }

        tracing::warn!(path = %path.display(), %expected, %actual, "cached file hash mismatch");
        match policy {
            MismatchPolicy::FailFast => {
                return Err(RoverError::HashMismatch {
                    file: entry.filename.clone(),
                    expected: entry.hash.clone(),
                    actual,
                });
            }
            MismatchPolicy::CollectAll => mismatches.push(Mismatch {
                file: entry.filename.clone(),
                expected: entry.hash.clone(),
                actual,
            }),
        }
    }

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(RoverError::HashMismatches(mismatches))
    }
}
