// Input events delivered by the host

use glam::DVec2;
use serde::Serialize;

pub const KEY_DOWN: &str = "keydown";
pub const KEY_UP: &str = "keyup";
pub const POINTER_DOWN: &str = "pointerdown";
pub const POINTER_UP: &str = "pointerup";
pub const POINTER_MOVE: &str = "pointermove";

/// An input event, named the way browsers name them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    kind: String,
    key: Option<String>,
    position: Option<(f64, f64)>,
}

impl Event {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            key: None,
            position: None,
        }
    }

    pub fn key_down(key: &str) -> Self {
        Self::new(KEY_DOWN).with_key(key)
    }

    pub fn key_up(key: &str) -> Self {
        Self::new(KEY_UP).with_key(key)
    }

    /// Pointer event at surface coordinates
    pub fn pointer(kind: &str, x: f64, y: f64) -> Self {
        Self::new(kind).with_position(x, y)
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some((x, y));
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn position(&self) -> Option<DVec2> {
        self.position.map(|(x, y)| DVec2::new(x, y))
    }

    pub fn is_key(&self) -> bool {
        self.kind == KEY_DOWN || self.kind == KEY_UP
    }
}
