// Asset loading functionality

use super::resource::{SoundClip, Sprite};
use super::AssetError;
use std::path::{Path, PathBuf};

/// Supported asset types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetType {
    Sprite,
    Sound,
}

impl AssetType {
    /// Human-readable name used in diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            AssetType::Sprite => "sprite",
            AssetType::Sound => "sound",
        }
    }

    /// File extensions usually carrying this asset type
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            AssetType::Sprite => &["png", "jpg", "jpeg"],
            AssetType::Sound => &["wav", "ogg", "mp3"],
        }
    }
}

/// A decoded asset ready to register
#[derive(Debug)]
pub(crate) enum LoadedAsset {
    Sprite(Sprite),
    Sound(SoundClip),
}

/// Asset loader responsible for finding, reading and decoding asset files
#[derive(Debug, Clone)]
pub struct AssetLoader {
    base_path: PathBuf,
}

impl AssetLoader {
    /// Create a new asset loader with the given base path
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Resolve a markup `src` against the base path. Absolute sources are kept.
    pub fn resolve_path(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// Read asset bytes from disk
    pub async fn load_bytes(&self, source: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.resolve_path(source);
        tokio::fs::read(&path).await.map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound(path.to_string_lossy().to_string())
            } else {
                AssetError::Io {
                    path: path.to_string_lossy().to_string(),
                    error,
                }
            }
        })
    }

    /// Read and decode one asset. Decoding runs on the blocking pool.
    pub(crate) async fn load(
        &self,
        asset_type: AssetType,
        name: String,
        source: String,
    ) -> Result<LoadedAsset, AssetError> {
        let bytes = self.load_bytes(&source).await?;
        log::debug!(
            "Read {} bytes for {} '{}' from {}",
            bytes.len(),
            asset_type.label(),
            name,
            source
        );

        let decoded = tokio::task::spawn_blocking(move || match asset_type {
            AssetType::Sprite => Sprite::from_bytes(&name, &bytes).map(LoadedAsset::Sprite),
            AssetType::Sound => SoundClip::from_bytes(&name, bytes).map(LoadedAsset::Sound),
        })
        .await
        .map_err(|e| AssetError::Task(e.to_string()))?;

        decoded.map_err(|reason| AssetError::Decode {
            source_path: source,
            reason,
        })
    }

    /// Get the base path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new(".")
    }
}
