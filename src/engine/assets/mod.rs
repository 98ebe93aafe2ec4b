// Asset management system
//
// Loads the sprites and sounds a game declares, keyed by name.

mod handle;
mod loader;
mod manager;
mod resource;

pub use handle::{AssetHandle, AssetId, SoundAsset, SoundHandle, SpriteAsset, SpriteHandle};
pub use loader::{AssetLoader, AssetType};
pub use manager::{AssetStats, ResourceRegistry};
pub use resource::{SoundClip, SoundFormat, Sprite};

/// Markup tag declaring a sprite resource
pub const SPRITE_TAG: &str = "SPRITE";

/// Markup tag declaring a sound resource
pub const SOUND_TAG: &str = "SOUND";

/// Asset loading errors
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Failed to decode {source_path}: {reason}")]
    Decode { source_path: String, reason: String },

    #[error("IO error reading {path}: {error}")]
    Io {
        path: String,
        #[source]
        error: std::io::Error,
    },

    #[error("Asset task failed: {0}")]
    Task(String),
}

/// What a batch load does when some of its resources fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    /// Register every success, then fail with the first failure
    #[default]
    AllOrNothing,
    /// Register every success, log failures and carry on
    Tolerant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_error_display() {
        let err = AssetError::NotFound("hero.png".to_string());
        assert_eq!(err.to_string(), "Asset not found: hero.png");
    }

    #[test]
    fn test_default_policy_is_strict() {
        assert_eq!(BatchPolicy::default(), BatchPolicy::AllOrNothing);
    }
}
