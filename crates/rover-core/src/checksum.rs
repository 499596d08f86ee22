//! Content hashes for cached files.
//!
//! Registry values are `ALGORITHM:HEXDIGEST` strings, or a bare hex digest
//! which is taken as SHA-256. Files are hashed in chunks so memory use stays
//! bounded for large payloads.

use sha2::digest::DynDigest;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const BUF_SIZE: usize = 64 * 1024;

/// Digest algorithms accepted in registry hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Lowercase name as written in a registry hash prefix.
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha224" => Some(HashAlgorithm::Sha224),
            "sha256" => Some(HashAlgorithm::Sha256),
            "sha384" => Some(HashAlgorithm::Sha384),
            "sha512" => Some(HashAlgorithm::Sha512),
            _ => None,
        }
    }

    /// Length of the digest in hex characters.
    pub fn hex_len(self) -> usize {
        match self {
            HashAlgorithm::Sha224 => 56,
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Sha384 => 96,
            HashAlgorithm::Sha512 => 128,
        }
    }

    fn hasher(self) -> Box<dyn DynDigest> {
        match self {
            HashAlgorithm::Sha224 => Box::new(Sha224::new()),
            HashAlgorithm::Sha256 => Box::new(Sha256::new()),
            HashAlgorithm::Sha384 => Box::new(Sha384::new()),
            HashAlgorithm::Sha512 => Box::new(Sha512::new()),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("unsupported hash algorithm {algorithm:?} in {hash:?}")]
    UnsupportedAlgorithm { algorithm: String, hash: String },

    #[error("{hash:?} is not a valid {algorithm} hex digest")]
    InvalidDigest {
        algorithm: HashAlgorithm,
        hash: String,
    },

    #[error("could not hash {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A registry hash in canonical form: lowercase algorithm, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHash {
    algorithm: HashAlgorithm,
    digest: String,
}

impl ContentHash {
    /// Parses `ALGORITHM:HEXDIGEST` or a bare SHA-256 hex digest.
    pub fn parse(value: &str) -> Result<Self, HashError> {
        let (algorithm, digest) = match value.split_once(':') {
            Some((name, digest)) => {
                let algorithm =
                    HashAlgorithm::from_name(name).ok_or_else(|| HashError::UnsupportedAlgorithm {
                        algorithm: name.to_string(),
                        hash: value.to_string(),
                    })?;
                (algorithm, digest)
            }
            None => (HashAlgorithm::Sha256, value),
        };

        let digest = digest.to_ascii_lowercase();
        if digest.len() != algorithm.hex_len() || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(HashError::InvalidDigest {
                algorithm,
                hash: value.to_string(),
            });
        }
        Ok(Self { algorithm, digest })
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.digest)
    }
}

/// Computes canonical content hashes for local files.
///
/// The reconciler compares `canonicalize(expected)` with
/// `hash_file(path, expected)` as plain strings, so both must agree on
/// spelling.
pub trait ContentHasher {
    /// Hashes the file at `path` with the algorithm named by `expected`.
    fn hash_file(&self, path: &Path, expected: &str) -> Result<String, HashError>;

    /// Canonical spelling of a registry hash.
    fn canonicalize(&self, expected: &str) -> Result<String, HashError> {
        Ok(expected.to_string())
    }
}

/// [`ContentHasher`] backed by the SHA-2 family.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha2Hasher;

impl ContentHasher for Sha2Hasher {
    fn hash_file(&self, path: &Path, expected: &str) -> Result<String, HashError> {
        let algorithm = ContentHash::parse(expected)?.algorithm();
        let digest = hash_path(path, algorithm).map_err(|source| HashError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(ContentHash { algorithm, digest }.to_string())
    }

    fn canonicalize(&self, expected: &str) -> Result<String, HashError> {
        Ok(ContentHash::parse(expected)?.to_string())
    }
}

/// Hash a file with `algorithm` and return the digest as lowercase hex.
pub fn hash_path(path: &Path, algorithm: HashAlgorithm) -> io::Result<String> {
    let mut f = File::open(path)?;
    let mut hasher = algorithm.hasher();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Hash an in-memory buffer; returns `ALGORITHM:HEXDIGEST`.
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> String {
    let mut hasher = algorithm.hasher();
    hasher.update(bytes);
    let digest = hex::encode(hasher.finalize());
    ContentHash { algorithm, digest }.to_string()
}
