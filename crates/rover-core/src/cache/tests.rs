//! Reconciler tests against an in-memory filesystem whose "file contents"
//! are the hashes the fake hasher reports for them.

use super::*;
use crate::checksum::{ContentHasher, HashError};
use crate::error::RoverError;
use crate::registry::{parse_entries, Registry};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

const DIR: &str = "/mnt/samples";

#[derive(Default)]
struct FakeCache {
    dirs: HashSet<PathBuf>,
    files: RefCell<HashMap<PathBuf, String>>,
    locked: HashSet<PathBuf>,
    hashed: RefCell<Vec<PathBuf>>,
    removed: RefCell<Vec<PathBuf>>,
}

impl FakeCache {
    fn with_dir() -> Self {
        let mut cache = Self::default();
        cache.dirs.insert(PathBuf::from(DIR));
        cache
    }

    fn file(self, name: &str, hash: &str) -> Self {
        self.files
            .borrow_mut()
            .insert(Path::new(DIR).join(name), hash.to_string());
        self
    }

    fn has(&self, name: &str) -> bool {
        self.files.borrow().contains_key(&Path::new(DIR).join(name))
    }

    fn hashed_names(&self) -> Vec<PathBuf> {
        self.hashed.borrow().clone()
    }
}

impl CacheFs for FakeCache {
    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        if self.locked.contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
        }
        self.removed.borrow_mut().push(path.to_path_buf());
        self.files
            .borrow_mut()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}

impl ContentHasher for FakeCache {
    fn hash_file(&self, path: &Path, _expected: &str) -> Result<String, HashError> {
        self.hashed.borrow_mut().push(path.to_path_buf());
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| HashError::Io {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            })
    }
}

fn registry(entries: &[&str]) -> Registry {
    parse_entries(entries).unwrap()
}

fn validate(cache: &FakeCache, reg: &Registry) -> Result<ReconcileReport, RoverError> {
    reconcile(
        reg,
        Path::new(DIR),
        CacheMode::Validate(MismatchPolicy::FailFast),
        cache,
        cache,
    )
}

fn refresh(cache: &FakeCache, reg: &Registry) -> Result<ReconcileReport, RoverError> {
    reconcile(reg, Path::new(DIR), CacheMode::ForceRefresh, cache, cache)
}

#[test]
fn mode_from_flags() {
    assert_eq!(
        CacheMode::from_flags(true, MismatchPolicy::CollectAll),
        CacheMode::ForceRefresh
    );
    assert_eq!(
        CacheMode::from_flags(false, MismatchPolicy::FailFast),
        CacheMode::Validate(MismatchPolicy::FailFast)
    );
}

#[test]
fn validate_verifies_present_and_skips_missing() {
    let cache = FakeCache::with_dir().file("a.txt", "h1");
    let reg = registry(&["a.txt=h1", "b.txt=h2"]);
    let report = validate(&cache, &reg).unwrap();
    assert_eq!(report.verified, ["a.txt"]);
    assert_eq!(report.skipped, ["b.txt"]);
    assert!(report.evicted.is_empty());
    assert!(cache.has("a.txt"));
}

#[test]
fn validate_mismatch_names_file() {
    let cache = FakeCache::with_dir().file("a.txt", "h9");
    let reg = registry(&["a.txt=h1"]);
    let err = validate(&cache, &reg).unwrap_err();
    match err {
        RoverError::HashMismatch {
            file,
            expected,
            actual,
        } => {
            assert_eq!(file, "a.txt");
            assert_eq!(expected, "h1");
            assert_eq!(actual, "h9");
        }
        other => panic!("expected HashMismatch, got {other:?}"),
    }
    assert!(cache.has("a.txt"), "validate never deletes");
}

#[test]
fn validate_fail_fast_stops_at_first_mismatch() {
    let cache = FakeCache::with_dir()
        .file("a.txt", "bad")
        .file("b.txt", "h2")
        .file("c.txt", "bad");
    let reg = registry(&["a.txt=h1", "b.txt=h2", "c.txt=h3"]);
    let err = validate(&cache, &reg).unwrap_err();
    assert!(matches!(err, RoverError::HashMismatch { ref file, .. } if file == "a.txt"));
    assert_eq!(cache.hashed_names(), [Path::new(DIR).join("a.txt")]);
}

#[test]
fn validate_collect_all_reports_every_mismatch() {
    let cache = FakeCache::with_dir()
        .file("a.txt", "bad")
        .file("b.txt", "h2")
        .file("c.txt", "worse");
    let reg = registry(&["a.txt=h1", "b.txt=h2", "c.txt=h3"]);
    let err = reconcile(
        &reg,
        Path::new(DIR),
        CacheMode::Validate(MismatchPolicy::CollectAll),
        &cache,
        &cache,
    )
    .unwrap_err();
    match err {
        RoverError::HashMismatches(mismatches) => {
            let files: Vec<_> = mismatches.iter().map(|m| m.file.as_str()).collect();
            assert_eq!(files, ["a.txt", "c.txt"]);
        }
        other => panic!("expected HashMismatches, got {other:?}"),
    }
    assert_eq!(cache.hashed_names().len(), 3);
}

#[test]
fn missing_target_dir_is_noop_in_both_modes() {
    let cache = FakeCache::default();
    let reg = registry(&["a.txt=h1", "b.txt=h2"]);
    let report = validate(&cache, &reg).unwrap();
    assert_eq!(report.skipped, ["a.txt", "b.txt"]);
    let report = refresh(&cache, &reg).unwrap();
    assert!(report.evicted.is_empty());
    assert!(cache.hashed_names().is_empty());
    assert!(cache.removed.borrow().is_empty());
}

#[test]
fn force_refresh_deletes_present_files_by_real_path() {
    let cache = FakeCache::with_dir().file("a.txt", "h1");
    let reg = registry(&["a.txt=h1", "b.txt=h2"]);
    let report = refresh(&cache, &reg).unwrap();
    assert_eq!(report.evicted, ["a.txt"]);
    assert_eq!(report.skipped, ["b.txt"]);
    assert!(!cache.has("a.txt"));
    assert_eq!(*cache.removed.borrow(), [Path::new(DIR).join("a.txt")]);
    assert!(cache.hashed_names().is_empty(), "force-refresh never hashes");
}

#[test]
fn force_refresh_deletes_mismatching_files_too() {
    let cache = FakeCache::with_dir().file("a.txt", "h9");
    let reg = registry(&["a.txt=h1"]);
    refresh(&cache, &reg).unwrap();
    assert!(!cache.has("a.txt"));
}

#[test]
fn force_refresh_eviction_failure_names_path() {
    let mut cache = FakeCache::with_dir().file("a.txt", "h1").file("b.txt", "h2");
    cache.locked.insert(Path::new(DIR).join("a.txt"));
    let reg = registry(&["a.txt=h1", "b.txt=h2"]);
    let err = refresh(&cache, &reg).unwrap_err();
    match err {
        RoverError::CacheEvictionFailure { path, source } => {
            assert_eq!(path, Path::new(DIR).join("a.txt"));
            assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
        }
        other => panic!("expected CacheEvictionFailure, got {other:?}"),
    }
    assert!(cache.has("b.txt"), "run aborts before later files");
}

#[test]
fn force_refresh_then_validate_never_fails() {
    let cache = FakeCache::with_dir()
        .file("a.txt", "stale")
        .file("b.txt", "stale");
    let reg = registry(&["a.txt=h1", "b.txt=h2"]);
    refresh(&cache, &reg).unwrap();
    let report = validate(&cache, &reg).unwrap();
    assert_eq!(report.skipped, ["a.txt", "b.txt"]);
}

#[test]
fn reconcile_is_idempotent() {
    let reg = registry(&["a.txt=h1", "b.txt=h2"]);

    let cache = FakeCache::with_dir().file("a.txt", "h1");
    assert_eq!(validate(&cache, &reg).unwrap(), validate(&cache, &reg).unwrap());

    let cache = FakeCache::with_dir().file("a.txt", "h9");
    let first = validate(&cache, &reg).unwrap_err().to_string();
    let second = validate(&cache, &reg).unwrap_err().to_string();
    assert_eq!(first, second);

    let cache = FakeCache::with_dir().file("a.txt", "h1");
    refresh(&cache, &reg).unwrap();
    let again = refresh(&cache, &reg).unwrap();
    assert!(again.evicted.is_empty());
    assert!(!cache.has("a.txt") && !cache.has("b.txt"));
}

#[test]
fn nested_registry_paths_resolve_under_target_dir() {
    let cache = FakeCache::with_dir().file("data/a.txt", "h1");
    let reg = registry(&["data/a.txt=h1"]);
    let report = validate(&cache, &reg).unwrap();
    assert_eq!(report.verified, ["data/a.txt"]);
}

#[test]
fn local_fs_reconcile_with_sha2() {
    use crate::checksum::{hash_bytes, HashAlgorithm, Sha2Hasher};

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
    std::fs::write(dir.path().join("b.txt"), b"tampered").unwrap();
    let good = hash_bytes(HashAlgorithm::Sha256, b"alpha");
    let b_hash = hash_bytes(HashAlgorithm::Sha256, b"beta");
    let a_entry = format!("a.txt={good}");
    let b_entry = format!("b.txt={b_hash}");
    let reg = registry(&[a_entry.as_str(), b_entry.as_str()]);

    let err = reconcile(
        &reg,
        dir.path(),
        CacheMode::Validate(MismatchPolicy::FailFast),
        &LocalFs,
        &Sha2Hasher,
    )
    .unwrap_err();
    assert!(matches!(err, RoverError::HashMismatch { ref file, .. } if file == "b.txt"));

    let report = reconcile(&reg, dir.path(), CacheMode::ForceRefresh, &LocalFs, &Sha2Hasher).unwrap();
    assert_eq!(report.evicted, ["a.txt", "b.txt"]);
    assert!(!dir.path().join("a.txt").exists());
    assert!(!dir.path().join("b.txt").exists());
}
