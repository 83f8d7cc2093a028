//! Multi-stage shader object files.
//!
//! Layout, little-endian and unpadded:
//!
//! ```text
//! offset  size  field
//! 0       4     tag "TSHO"
//! 4       32    vertex hash
//! 36      32    hull hash
//! 68      32    domain hash
//! 100     32    geometry hash
//! 132     32    pixel hash
//! ```
//!
//! A zero hash means the stage is absent or failed to compile. The bytecode
//! itself stays in the cache, addressed by hash.

use std::fs;
use std::path::Path;

use super::cache::ContentHash;
use super::stage::ShaderStage;
use crate::errors::{Result, ShaderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShaderObjectHeader {
    hashes: [ContentHash; ShaderStage::COUNT],
}

impl ShaderObjectHeader {
    pub const TAG: [u8; 4] = *b"TSHO";
    pub const SIZE: usize = Self::TAG.len() + ShaderStage::COUNT * ContentHash::LEN;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn hash(&self, stage: ShaderStage) -> ContentHash {
        self.hashes[stage.index()]
    }

    pub fn set_hash(&mut self, stage: ShaderStage, hash: ContentHash) {
        self.hashes[stage.index()] = hash;
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&Self::TAG);
        for hash in &self.hashes {
            bytes.extend_from_slice(hash.as_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(ShaderError::InvalidObject(format!(
                "expected {} bytes, found {}",
                Self::SIZE,
                bytes.len()
            )));
        }

        let (tag, records) = bytes.split_at(Self::TAG.len());
        if tag != Self::TAG {
            return Err(ShaderError::InvalidObject(format!("bad tag {tag:?}")));
        }

        let mut header = Self::new();
        for (stage, record) in ShaderStage::ALL.into_iter().zip(records.chunks_exact(ContentHash::LEN)) {
            let mut hash = [0u8; ContentHash::LEN];
            hash.copy_from_slice(record);
            header.set_hash(stage, ContentHash::from_bytes(hash));
        }

        Ok(header)
    }

    /// Write the header, creating parent directories as needed.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let write_err = |source| ShaderError::CacheWrite {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, self.to_bytes()).map_err(write_err)
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ShaderError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Self::from_bytes(&fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let mut header = ShaderObjectHeader::new();
        let hash = ContentHash::from_bytes([0xab; 32]);
        header.set_hash(ShaderStage::Geometry, hash);

        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), 164);
        assert_eq!(&bytes[..4], b"TSHO");
        assert!(bytes[4..100].iter().all(|b| *b == 0));
        assert!(bytes[100..132].iter().all(|b| *b == 0xab));
        assert!(bytes[132..].iter().all(|b| *b == 0));

        assert_eq!(ShaderObjectHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn test_rejects_malformed() {
        let mut bytes = ShaderObjectHeader::new().to_bytes();
        assert!(ShaderObjectHeader::from_bytes(&bytes[..10]).is_err());

        bytes[0] = b'X';
        let err = ShaderObjectHeader::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ShaderError::InvalidObject(_)));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("unit.tsh");

        let mut header = ShaderObjectHeader::new();
        header.set_hash(ShaderStage::Vertex, ContentHash::of("VS", "x"));
        header.write_to(&path).unwrap();

        assert_eq!(ShaderObjectHeader::read_from(&path).unwrap(), header);
        assert!(matches!(
            ShaderObjectHeader::read_from(&dir.path().join("missing.tsh")),
            Err(ShaderError::FileNotFound { .. })
        ));
    }
}
