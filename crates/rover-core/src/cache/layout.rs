//! Directory layout under the mount location:
//! `<mount>/<repo>/<files...>` plus `<mount>/.gitignore`.

use crate::config::MountLocation;
use crate::error::RoverError;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Version-control ignore marker placed at the root of the cache area.
pub const IGNORE_MARKER: &str = ".gitignore";

/// Marker contents: ignore everything.
pub const IGNORE_MARKER_CONTENTS: &str = "*\n";

#[derive(Debug, Clone)]
pub struct CacheLayout {
    base: PathBuf,
    repo: String,
}

impl CacheLayout {
    /// Resolves the mount to an absolute path and checks that `repo` is a
    /// single directory name.
    pub fn new(mount: &MountLocation, repo: &str) -> Result<Self, RoverError> {
        if !is_single_component(repo) {
            return Err(RoverError::InvalidRepoName {
                name: repo.to_string(),
            });
        }
        let base = mount.absolute().map_err(|source| RoverError::Io {
            path: mount.path().to_path_buf(),
            source,
        })?;
        Ok(Self {
            base,
            repo: repo.to_string(),
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn repo_dir(&self) -> PathBuf {
        self.base.join(&self.repo)
    }

    pub fn ignore_marker(&self) -> PathBuf {
        self.base.join(IGNORE_MARKER)
    }

    /// Creates the mount and repository directories and the ignore marker
    /// if they are missing. An existing marker is left untouched.
    pub fn ensure(&self) -> Result<(), RoverError> {
        let repo_dir = self.repo_dir();
        fs::create_dir_all(&repo_dir).map_err(|source| RoverError::Io {
            path: repo_dir.clone(),
            source,
        })?;

        let marker = self.ignore_marker();
        let created = write_ignore_marker(&marker).map_err(|source| RoverError::Io {
            path: marker.clone(),
            source,
        })?;
        if created {
            tracing::info!(path = %marker.display(), "created ignore marker");
        }
        Ok(())
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// Returns `Ok(false)` when the marker already exists as a file. Anything else
/// at that path is an error. The file is flushed to disk before returning.
fn write_ignore_marker(path: &Path) -> io::Result<bool> {
    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_file() => return Ok(false),
        Err(e) => return Err(e),
    };
    file.write_all(IGNORE_MARKER_CONTENTS.as_bytes())?;
    file.sync_all()?;
    Ok(true)
}
