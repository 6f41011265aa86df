//! Asset management system
//!
//! Assets (models, materials, environment maps) are fetched as opaque byte
//! blobs from an [`AssetSource`], validated just enough to classify
//! obviously broken data, and handed to the renderer for binding. Loading
//! is asynchronous: see [`AssetLoader`].

mod loader;
mod source;

pub use loader::{AssetLoader, CancelToken, CompletionFn, LoadContext, LoadTicket};
pub use source::{AssetSource, DirectorySource, MemorySource};

use std::sync::Arc;

use thiserror::Error;

/// Kind of external resource an asset request produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Renderable model (binary glTF)
    Model,

    /// Compiled material package
    Material,

    /// Environment map (KTX1) used for skybox or indirect light
    EnvironmentMap,
}

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset not found at the given path
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Asset bytes do not look like the requested kind
    #[error("Failed to decode asset: {0}")]
    Decode(String),

    /// IO error during asset loading
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A successfully loaded asset: the resource handle consumed by
/// [`crate::render::Renderer::bind`]
///
/// Bytes are shared, so handles clone cheaply.
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    /// Kind requested for this asset
    pub kind: AssetKind,

    /// Opaque source path the asset was fetched from
    pub path: String,

    /// Raw asset bytes
    pub bytes: Arc<Vec<u8>>,
}

impl LoadedAsset {
    /// Wrap raw bytes as a loaded asset
    pub fn new(kind: AssetKind, path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            path: path.into(),
            bytes: Arc::new(bytes),
        }
    }
}

/// KTX version 1 file identifier
const KTX1_IDENTIFIER: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x31, 0x31, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];

/// Binary glTF magic
const GLB_MAGIC: &[u8; 4] = b"glTF";

/// Cheap validation that fetched bytes plausibly match the requested kind
///
/// This is a magic-byte sniff, not a decoder: full format parsing belongs
/// to the renderer backend. It exists so that a truncated download or a
/// mislabeled file surfaces as [`AssetError::Decode`] instead of being
/// bound and failing deep inside the backend.
pub fn validate(kind: AssetKind, path: &str, bytes: &[u8]) -> Result<(), AssetError> {
    match kind {
        AssetKind::Model => {
            if !bytes.starts_with(GLB_MAGIC) {
                return Err(AssetError::Decode(format!(
                    "{path}: missing binary glTF magic"
                )));
            }
        }
        AssetKind::EnvironmentMap => {
            if !bytes.starts_with(&KTX1_IDENTIFIER) {
                return Err(AssetError::Decode(format!("{path}: missing KTX1 identifier")));
            }
        }
        AssetKind::Material => {
            if bytes.is_empty() {
                return Err(AssetError::Decode(format!("{path}: empty material package")));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_model_magic() {
        assert!(validate(AssetKind::Model, "a.glb", b"glTF\x02\x00\x00\x00").is_ok());
        assert!(matches!(
            validate(AssetKind::Model, "a.glb", b"JSON"),
            Err(AssetError::Decode(_))
        ));
        assert!(validate(AssetKind::Model, "a.glb", b"gl").is_err());
    }

    #[test]
    fn test_validate_environment_map_identifier() {
        let mut good = KTX1_IDENTIFIER.to_vec();
        good.extend_from_slice(&[0u8; 16]);
        assert!(validate(AssetKind::EnvironmentMap, "sky.ktx", &good).is_ok());
        assert!(validate(AssetKind::EnvironmentMap, "sky.ktx", b"DDS ").is_err());
    }

    #[test]
    fn test_validate_material_rejects_empty() {
        assert!(validate(AssetKind::Material, "m.filamat", b"\x01").is_ok());
        assert!(validate(AssetKind::Material, "m.filamat", b"").is_err());
    }
}
