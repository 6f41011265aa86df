//! Asset byte sources
//!
//! A source resolves opaque asset paths to raw bytes. The filesystem
//! implementation mirrors a packaged-asset store; the in-memory one backs
//! tests and headless demos.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::assets::AssetError;

/// Fetch mechanism behind the asset loader
///
/// Implementations must be shareable across loader worker threads.
pub trait AssetSource: Send + Sync {
    /// Read the raw bytes for an opaque asset path
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError>;
}

/// Filesystem-backed asset source rooted at a directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Create a source resolving paths relative to `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirectorySource {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let full_path = self.root.join(path);
        if !full_path.exists() {
            return Err(AssetError::NotFound(path.to_string()));
        }
        Ok(std::fs::read(&full_path)?)
    }
}

/// In-memory asset source for tests and demos
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset at the given path, replacing any previous entry
    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) -> &mut Self {
        self.entries.insert(path.into(), bytes);
        self
    }
}

impl AssetSource for MemorySource {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_read() {
        let mut source = MemorySource::new();
        source.insert("materials/glass.filamat", vec![7, 8, 9]);

        assert_eq!(source.read("materials/glass.filamat").unwrap(), vec![7, 8, 9]);
        assert!(matches!(
            source.read("materials/missing.filamat"),
            Err(AssetError::NotFound(_))
        ));
    }

    #[test]
    fn test_directory_source_missing_file() {
        let source = DirectorySource::new("/definitely/not/a/real/root");
        assert!(matches!(
            source.read("models/cockroach.glb"),
            Err(AssetError::NotFound(_))
        ));
    }
}
