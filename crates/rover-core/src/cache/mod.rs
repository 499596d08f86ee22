//! Local cache area: the filesystem seam, directory layout and the
//! reconciliation pass that runs before any file is fetched.

mod layout;
mod reconcile;

pub use layout::{CacheLayout, IGNORE_MARKER, IGNORE_MARKER_CONTENTS};
pub use reconcile::{reconcile, CacheMode, MismatchPolicy, ReconcileReport};

use std::io;
use std::path::Path;

/// Filesystem operations the reconciler needs.
pub trait CacheFs {
    fn is_dir(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// [`CacheFs`] over the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl CacheFs for LocalFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests;
