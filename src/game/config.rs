// Session configuration

use crate::engine::assets::BatchPolicy;
use crate::engine::game_loop::DEFAULT_MAX_DELTA;
use crate::engine::renderer::Color;
use crate::script::ScriptLimits;
use std::path::{Path, PathBuf};

/// Surface id used when none is configured
pub const DEFAULT_SURFACE_ID: &str = "game-canvas";

/// Surface size used when the `<game>` root declares none
pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;

/// Sky blue fill used when the `<game>` root declares no background
pub const DEFAULT_BACKGROUND: Color = Color::rgb(0x7c, 0xb7, 0xd9);

/// Configuration for one game session
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Directory that relative resource sources are resolved against
    asset_base: PathBuf,

    /// Surface size when the root has no usable `w` / `h`
    default_width: u32,
    default_height: u32,

    /// Upper bound for a frame's delta time, in milliseconds
    max_delta: f64,

    /// How declared resources that fail to load are treated
    batch_policy: BatchPolicy,

    /// Id the surface is attached to the host under
    surface_id: String,

    /// Color the surface is cleared to each frame
    background: Color,

    /// Budgets for method logic
    script_limits: ScriptLimits,
}

impl GameConfig {
    pub fn new() -> Self {
        Self {
            asset_base: PathBuf::from("."),
            default_width: DEFAULT_WIDTH,
            default_height: DEFAULT_HEIGHT,
            max_delta: DEFAULT_MAX_DELTA,
            batch_policy: BatchPolicy::AllOrNothing,
            surface_id: DEFAULT_SURFACE_ID.to_string(),
            background: DEFAULT_BACKGROUND,
            script_limits: ScriptLimits::default(),
        }
    }

    pub fn with_asset_base<P: AsRef<Path>>(mut self, base: P) -> Self {
        self.asset_base = base.as_ref().to_path_buf();
        self
    }

    pub fn with_default_size(mut self, width: u32, height: u32) -> Self {
        self.default_width = width;
        self.default_height = height;
        self
    }

    pub fn with_max_delta(mut self, max_delta: f64) -> Self {
        self.max_delta = max_delta;
        self
    }

    pub fn with_batch_policy(mut self, policy: BatchPolicy) -> Self {
        self.batch_policy = policy;
        self
    }

    pub fn with_surface_id(mut self, id: &str) -> Self {
        self.surface_id = id.to_string();
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn with_script_limits(mut self, limits: ScriptLimits) -> Self {
        self.script_limits = limits;
        self
    }

    pub fn asset_base(&self) -> &Path {
        &self.asset_base
    }

    pub fn default_size(&self) -> (u32, u32) {
        (self.default_width, self.default_height)
    }

    pub fn max_delta(&self) -> f64 {
        self.max_delta
    }

    pub fn batch_policy(&self) -> BatchPolicy {
        self.batch_policy
    }

    pub fn surface_id(&self) -> &str {
        &self.surface_id
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn script_limits(&self) -> ScriptLimits {
        self.script_limits
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}
