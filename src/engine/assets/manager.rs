// Central resource registry

use super::loader::LoadedAsset;
use super::{
    AssetError, AssetHandle, AssetId, AssetLoader, AssetType, BatchPolicy, SoundClip,
    SoundHandle, Sprite, SpriteHandle, SOUND_TAG, SPRITE_TAG,
};
use crate::markup::Element;
use std::collections::HashMap;
use std::path::Path;
use tokio::task::JoinSet;

/// Named sprites and sounds available to a game session
///
/// Registering a name twice replaces the earlier resource.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    /// Asset loader
    loader: AssetLoader,

    sprites: HashMap<AssetId, Sprite>,
    sounds: HashMap<AssetId, SoundClip>,

    /// Name to ID mapping; a name keeps its ID when re-registered
    sprite_names: HashMap<String, AssetId>,
    sound_names: HashMap<String, AssetId>,

    next_id: u64,
}

/// One `<sprite>` or `<sound>` element with both attributes present
struct Descriptor {
    asset_type: AssetType,
    name: String,
    source: String,
}

impl ResourceRegistry {
    /// Create a registry resolving sources against `asset_path`
    pub fn new<P: AsRef<Path>>(asset_path: P) -> Self {
        Self {
            loader: AssetLoader::new(asset_path),
            ..Self::default()
        }
    }

    /// Load, decode and register a sprite
    pub async fn load_sprite(&mut self, name: &str, source: &str) -> Result<SpriteHandle, AssetError> {
        match self
            .loader
            .load(AssetType::Sprite, name.to_string(), source.to_string())
            .await
        {
            Ok(LoadedAsset::Sprite(sprite)) => Ok(self.insert_sprite(name, sprite)),
            Ok(LoadedAsset::Sound(_)) => Err(AssetError::Task(format!(
                "loader returned a sound for sprite '{}'",
                name
            ))),
            Err(e) => {
                log::error!("Failed to load sprite: {} ({})", source, e);
                Err(e)
            }
        }
    }

    /// Load, check and register a sound
    pub async fn load_sound(&mut self, name: &str, source: &str) -> Result<SoundHandle, AssetError> {
        match self
            .loader
            .load(AssetType::Sound, name.to_string(), source.to_string())
            .await
        {
            Ok(LoadedAsset::Sound(clip)) => Ok(self.insert_sound(name, clip)),
            Ok(LoadedAsset::Sprite(_)) => Err(AssetError::Task(format!(
                "loader returned a sprite for sound '{}'",
                name
            ))),
            Err(e) => {
                log::error!("Failed to load sound: {} ({})", source, e);
                Err(e)
            }
        }
    }

    /// Load every `<sprite>` and `<sound>` declared under `root`.
    ///
    /// All loads run concurrently. Successes are registered in declaration
    /// order whatever the policy. Returns how many resources were registered.
    pub async fn load_declared(
        &mut self,
        root: &Element,
        policy: BatchPolicy,
    ) -> Result<usize, AssetError> {
        let mut descriptors = Vec::new();
        collect_descriptors(root, &mut descriptors);
        if descriptors.is_empty() {
            return Ok(0);
        }
        log::info!("Loading {} declared resources", descriptors.len());

        let mut tasks = JoinSet::new();
        for (index, descriptor) in descriptors.iter().enumerate() {
            let loader = self.loader.clone();
            let asset_type = descriptor.asset_type;
            let name = descriptor.name.clone();
            let source = descriptor.source.clone();
            tasks.spawn(async move { (index, loader.load(asset_type, name, source).await) });
        }

        let mut results: Vec<Option<Result<LoadedAsset, AssetError>>> =
            descriptors.iter().map(|_| None).collect();
        let mut lost = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => {
                    lost.get_or_insert_with(|| e.to_string());
                }
            }
        }

        let mut registered = 0;
        let mut first_failure = None;
        for (descriptor, result) in descriptors.iter().zip(results) {
            let result = result.unwrap_or_else(|| {
                Err(AssetError::Task(
                    lost.clone().unwrap_or_else(|| "load task vanished".to_string()),
                ))
            });
            match result {
                Ok(LoadedAsset::Sprite(sprite)) => {
                    self.insert_sprite(&descriptor.name, sprite);
                    registered += 1;
                }
                Ok(LoadedAsset::Sound(clip)) => {
                    self.insert_sound(&descriptor.name, clip);
                    registered += 1;
                }
                Err(e) => {
                    log::error!(
                        "Failed to load {}: {} ({})",
                        descriptor.asset_type.label(),
                        descriptor.source,
                        e
                    );
                    first_failure.get_or_insert(e);
                }
            }
        }

        match (first_failure, policy) {
            (Some(e), BatchPolicy::AllOrNothing) => Err(e),
            (Some(_), BatchPolicy::Tolerant) => {
                log::warn!(
                    "Loaded {} of {} resources; continuing without the rest",
                    registered,
                    descriptors.len()
                );
                Ok(registered)
            }
            (None, _) => Ok(registered),
        }
    }

    /// Register an already decoded sprite
    pub fn insert_sprite(&mut self, name: &str, sprite: Sprite) -> SpriteHandle {
        let id = match self.sprite_names.get(name) {
            Some(&id) => id,
            None => {
                let id = self.mint_id();
                self.sprite_names.insert(name.to_string(), id);
                id
            }
        };
        if self.sprites.insert(id, sprite).is_some() {
            log::debug!("Sprite '{}' replaced", name);
        }
        AssetHandle::new(id)
    }

    /// Register an already checked sound
    pub fn insert_sound(&mut self, name: &str, clip: SoundClip) -> SoundHandle {
        let id = match self.sound_names.get(name) {
            Some(&id) => id,
            None => {
                let id = self.mint_id();
                self.sound_names.insert(name.to_string(), id);
                id
            }
        };
        if self.sounds.insert(id, clip).is_some() {
            log::debug!("Sound '{}' replaced", name);
        }
        AssetHandle::new(id)
    }

    fn mint_id(&mut self) -> AssetId {
        self.next_id += 1;
        AssetId(self.next_id)
    }

    pub fn sprite(&self, name: &str) -> Option<&Sprite> {
        self.sprite_names
            .get(name)
            .and_then(|id| self.sprites.get(id))
    }

    pub fn sound(&self, name: &str) -> Option<&SoundClip> {
        self.sound_names.get(name).and_then(|id| self.sounds.get(id))
    }

    pub fn get_sprite(&self, handle: SpriteHandle) -> Option<&Sprite> {
        self.sprites.get(&handle.id())
    }

    pub fn get_sound(&self, handle: SoundHandle) -> Option<&SoundClip> {
        self.sounds.get(&handle.id())
    }

    pub fn has_sprite(&self, name: &str) -> bool {
        self.sprite(name).is_some()
    }

    pub fn has_sound(&self, name: &str) -> bool {
        self.sound(name).is_some()
    }

    /// Registered sprite names, sorted
    pub fn sprite_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sprite_names.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered sound names, sorted
    pub fn sound_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sound_names.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Get statistics about loaded assets
    pub fn stats(&self) -> AssetStats {
        AssetStats {
            sprite_count: self.sprites.len(),
            sound_count: self.sounds.len(),
        }
    }

    /// Get the asset loader
    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }
}

fn collect_descriptors(element: &Element, out: &mut Vec<Descriptor>) {
    for child in element.children() {
        let asset_type = if child.is(SPRITE_TAG) {
            Some(AssetType::Sprite)
        } else if child.is(SOUND_TAG) {
            Some(AssetType::Sound)
        } else {
            None
        };

        if let Some(asset_type) = asset_type {
            match (child.attr("name"), child.attr("src")) {
                (Some(name), Some(source)) if !name.is_empty() && !source.is_empty() => {
                    out.push(Descriptor {
                        asset_type,
                        name: name.to_string(),
                        source: source.to_string(),
                    });
                }
                _ => log::error!(
                    "Skipping <{}> without both name and src",
                    asset_type.label()
                ),
            }
        }

        collect_descriptors(child, out);
    }
}

/// Statistics about loaded assets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetStats {
    pub sprite_count: usize,
    pub sound_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn write_png(dir: &Path, file: &str, color: [u8; 4]) {
        RgbaImage::from_pixel(2, 2, image::Rgba(color))
            .save(dir.join(file))
            .unwrap();
    }

    fn root(children: Vec<Element>) -> Element {
        children
            .into_iter()
            .fold(Element::new("game"), |root, child| root.with_child(child))
    }

    fn sprite(name: &str, src: &str) -> Element {
        Element::new("sprite").with_attr("name", name).with_attr("src", src)
    }

    #[tokio::test]
    async fn test_load_sprite_registers_by_name() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "hero.png", [0, 255, 0, 255]);

        let mut registry = ResourceRegistry::new(dir.path());
        let handle = registry.load_sprite("hero", "hero.png").await.unwrap();

        assert!(registry.has_sprite("hero"));
        assert_eq!(registry.get_sprite(handle).unwrap().width(), 2);
        assert!(!registry.has_sound("hero"));
    }

    #[tokio::test]
    async fn test_failed_load_leaves_registry_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ResourceRegistry::new(dir.path());

        assert!(registry.load_sprite("ghost", "ghost.png").await.is_err());
        assert!(registry.load_sound("boom", "boom.wav").await.is_err());
        assert!(registry.sprite("ghost").is_none());
        assert_eq!(registry.stats(), AssetStats { sprite_count: 0, sound_count: 0 });
    }

    #[tokio::test]
    async fn test_load_sound_checks_signature() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jump.ogg"), b"OggS\0\x02rest").unwrap();
        std::fs::write(dir.path().join("fake.wav"), b"plain text").unwrap();

        let mut registry = ResourceRegistry::new(dir.path());
        registry.load_sound("jump", "jump.ogg").await.unwrap();
        let err = registry.load_sound("fake", "fake.wav").await.unwrap_err();

        assert!(registry.has_sound("jump"));
        assert!(matches!(err, AssetError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_load_declared_batch() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", [255, 0, 0, 255]);
        write_png(dir.path(), "b.png", [0, 0, 255, 255]);
        std::fs::write(dir.path().join("hit.wav"), b"RIFF\0\0\0\0WAVEdata").unwrap();

        let markup = root(vec![
            sprite("a", "a.png"),
            Element::new("level").with_child(sprite("b", "b.png")),
            Element::new("sound").with_attr("name", "hit").with_attr("src", "hit.wav"),
            // Missing src is skipped, not a failure
            Element::new("sprite").with_attr("name", "nosrc"),
        ]);

        let mut registry = ResourceRegistry::new(dir.path());
        let loaded = registry
            .load_declared(&markup, BatchPolicy::AllOrNothing)
            .await
            .unwrap();

        assert_eq!(loaded, 3);
        assert_eq!(registry.sprite_names(), vec!["a", "b"]);
        assert_eq!(registry.sound_names(), vec!["hit"]);
    }

    #[tokio::test]
    async fn test_batch_failure_policies() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "ok.png", [1, 2, 3, 255]);
        let markup = root(vec![sprite("ok", "ok.png"), sprite("bad", "missing.png")]);

        let mut strict = ResourceRegistry::new(dir.path());
        let err = strict
            .load_declared(&markup, BatchPolicy::AllOrNothing)
            .await
            .unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
        // Successes are still registered
        assert!(strict.has_sprite("ok"));

        let mut tolerant = ResourceRegistry::new(dir.path());
        let loaded = tolerant
            .load_declared(&markup, BatchPolicy::Tolerant)
            .await
            .unwrap();
        assert_eq!(loaded, 1);
        assert!(!tolerant.has_sprite("bad"));
    }

    #[tokio::test]
    async fn test_duplicate_names_last_declared_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "red.png", [255, 0, 0, 255]);
        write_png(dir.path(), "blue.png", [0, 0, 255, 255]);
        let markup = root(vec![sprite("tile", "red.png"), sprite("tile", "blue.png")]);

        let mut registry = ResourceRegistry::new(dir.path());
        registry
            .load_declared(&markup, BatchPolicy::AllOrNothing)
            .await
            .unwrap();

        let tile = registry.sprite("tile").unwrap();
        assert_eq!(tile.image().get_pixel(0, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_handles_are_unique_per_name() {
        let mut registry = ResourceRegistry::default();
        let names: Vec<String> = (0..500).map(|i| format!("tile{}", i)).collect();
        let handles: Vec<SpriteHandle> = names
            .iter()
            .map(|name| registry.insert_sprite(name, Sprite::from_color(name, 1, 1, [0, 0, 0, 255])))
            .collect();

        let ids: std::collections::HashSet<_> = handles.iter().map(|h| h.id()).collect();
        assert_eq!(ids.len(), names.len());
        assert_eq!(registry.stats().sprite_count, names.len());
        for (name, handle) in names.iter().zip(&handles) {
            assert_eq!(registry.get_sprite(*handle).unwrap().name(), name);
        }
    }

    #[test]
    fn test_reregistered_name_keeps_its_handle() {
        let mut registry = ResourceRegistry::default();
        let first = registry.insert_sprite("tile", Sprite::from_color("tile", 1, 1, [255, 0, 0, 255]));
        let second = registry.insert_sprite("tile", Sprite::from_color("tile", 2, 2, [0, 0, 255, 255]));

        assert_eq!(first, second);
        assert_eq!(registry.get_sprite(first).unwrap().width(), 2);
        assert_eq!(registry.stats().sprite_count, 1);
    }

    #[tokio::test]
    async fn test_empty_declaration_is_noop() {
        let mut registry = ResourceRegistry::default();
        let loaded = registry
            .load_declared(&Element::new("game"), BatchPolicy::AllOrNothing)
            .await
            .unwrap();
        assert_eq!(loaded, 0);
    }
}
