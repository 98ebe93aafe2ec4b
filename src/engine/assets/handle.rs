// Type-safe asset handle system

use std::marker::PhantomData;

/// Identifier issued by the registry when a name is first registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId(pub(crate) u64);

impl AssetId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Handle to a registered asset
///
/// The `T` parameter ties a handle to the registry table it was issued from.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct AssetHandle<T> {
    pub(crate) id: AssetId,
    _phantom: PhantomData<T>,
}

impl<T> AssetHandle<T> {
    pub(crate) fn new(id: AssetId) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    pub fn id(&self) -> AssetId {
        self.id
    }
}

impl<T> Clone for AssetHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AssetHandle<T> {}

// Marker types for the two resource tables
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SpriteAsset;
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SoundAsset;

pub type SpriteHandle = AssetHandle<SpriteAsset>;
pub type SoundHandle = AssetHandle<SoundAsset>;
