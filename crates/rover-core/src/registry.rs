//! Registry of repository files and their known-good hashes.
//!
//! Built fresh on every run from `FILENAME=HASH` arguments; never persisted.
//! Hash values are kept verbatim and only interpreted when a file is hashed.

use crate::error::RoverError;

/// Separator between filename and hash in a registry entry.
pub const SEPARATOR: char = '=';

/// One registered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Path relative to the repository directory.
    pub filename: String,
    /// Known-good content hash.
    pub hash: String,
}

/// Filename to expected-hash mapping, iterated in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the hash for `filename`, keeping its original
    /// position. Returns the previous hash if the filename was already present.
    pub fn insert(&mut self, filename: impl Into<String>, hash: impl Into<String>) -> Option<String> {
        let filename = filename.into();
        let hash = hash.into();
        match self.entries.iter_mut().find(|e| e.filename == filename) {
            Some(existing) => Some(std::mem::replace(&mut existing.hash, hash)),
            None => {
                self.entries.push(RegistryEntry { filename, hash });
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RegistryEntry> {
        self.entries.iter()
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.filename.as_str())
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a RegistryEntry;
    type IntoIter = std::slice::Iter<'a, RegistryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Parses `FILENAME=HASH` strings into a [`Registry`].
///
/// Fails with [`RoverError::MalformedEntry`] on the first entry that does not
/// split into exactly one non-empty filename and one non-empty hash, whose
/// filename contains `:`, or whose filename would escape the repository
/// directory. Later duplicates win.
pub fn parse_entries<I, S>(entries: I) -> Result<Registry, RoverError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut registry = Registry::new();
    for entry in entries {
        let entry = entry.as_ref();
        let (filename, hash) = split_entry(entry).ok_or_else(|| RoverError::MalformedEntry {
            entry: entry.to_string(),
        })?;
        if let Some(previous) = registry.insert(filename, hash) {
            tracing::debug!(filename, previous = %previous, hash, "duplicate registry entry; keeping last");
        }
    }
    Ok(registry)
}

fn split_entry(entry: &str) -> Option<(&str, &str)> {
    let mut parts = entry.split(SEPARATOR);
    let filename = parts.next()?;
    let hash = parts.next()?;
    if parts.next().is_some() || hash.is_empty() || !is_contained_filename(filename) {
        return None;
    }
    Some((filename, hash))
}

/// Relative, `/`-separated, no `:`, no empty, `.` or `..` components.
fn is_contained_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains([':', '\\', '\0'])
        && filename
            .split('/')
            .all(|c| !c.is_empty() && c != "." && c != "..")
}
