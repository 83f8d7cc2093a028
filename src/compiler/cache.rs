//! Content-addressed bytecode cache.
//!
//! Cache files live at `<output>/cache/<backend-id-hex>/<hash-hex>` and hold
//! the raw bytecode of exactly one stage. The key is a digest of the entry
//! point and the fully preprocessed text, so identical input reached through
//! different file paths maps to the same entry.
//!
//! There is no locking. Two writers of the same key write identical bytes, so
//! whichever finishes last leaves a valid file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Result, ShaderError};

/// 256-bit digest of `entry_point ++ preprocessed_text`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ContentHash([u8; ContentHash::LEN]);

impl ContentHash {
    pub const LEN: usize = 32;

    /// Marks an absent or failed stage.
    pub const ZERO: ContentHash = ContentHash([0; Self::LEN]);

    #[must_use]
    pub fn of(entry_point: &str, text: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(entry_point.as_bytes());
        hasher.update(text.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0; Self::LEN]
    }

    /// Lowercase, 64 characters.
    #[must_use]
    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

/// One backend's cache directory.
#[derive(Debug, Clone)]
pub struct ShaderCache {
    dir: PathBuf,
}

impl ShaderCache {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, hash: &ContentHash) -> PathBuf {
        self.dir.join(hash.to_hex())
    }

    #[must_use]
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.path_for(hash).is_file()
    }

    pub fn load(&self, hash: &ContentHash) -> Result<Vec<u8>> {
        Ok(fs::read(self.path_for(hash))?)
    }

    /// Write bytecode for `hash`, creating the directory as needed.
    pub fn store(&self, hash: &ContentHash, bytecode: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(hash);

        fs::create_dir_all(&self.dir).map_err(|source| ShaderError::CacheWrite {
            path: self.dir.clone(),
            source,
        })?;
        fs::write(&path, bytecode).map_err(|source| ShaderError::CacheWrite {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}
