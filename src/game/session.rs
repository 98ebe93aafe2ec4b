// Session state and its serializable summary

use crate::engine::assets::ResourceRegistry;
use crate::engine::game_loop::LoopController;
use crate::engine::renderer::Surface;
use crate::markup::GAME_TAG;
use crate::object::GameObject;
use serde::Serialize;

/// Everything one running game owns
#[derive(Debug)]
pub struct SessionState {
    pub(crate) objects: Vec<GameObject>,
    pub(crate) globals: GameObject,
    pub(crate) surface: Option<Surface>,
    pub(crate) loop_ctl: LoopController,
    pub(crate) resources: ResourceRegistry,
}

impl SessionState {
    pub(crate) fn new(resources: ResourceRegistry, loop_ctl: LoopController) -> Self {
        Self {
            objects: Vec::new(),
            globals: GameObject::new(GAME_TAG),
            surface: None,
            loop_ctl,
            resources,
        }
    }

    /// Object registry, in markup document order followed by added objects
    pub fn objects(&self) -> &[GameObject] {
        &self.objects
    }

    /// Record built from the `<game>` root
    pub fn globals(&self) -> &GameObject {
        &self.globals
    }

    /// The drawing surface, once the session is initialized
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn loop_controller(&self) -> &LoopController {
        &self.loop_ctl
    }

    pub fn is_running(&self) -> bool {
        self.loop_ctl.is_running()
    }

    /// Delta of the most recent frame, in milliseconds
    pub fn delta_time(&self) -> f64 {
        self.loop_ctl.delta_time()
    }
}

/// Point-in-time summary of a session, for logging and export
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub running: bool,
    pub frame_count: u64,
    pub delta_time: f64,
    pub fps: f64,
    pub surface: Option<SurfaceInfo>,
    pub globals: &'a GameObject,
    pub objects: &'a [GameObject],
    pub sprites: Vec<&'a str>,
    pub sounds: Vec<&'a str>,
    pub listeners: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurfaceInfo {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

impl<'a> Snapshot<'a> {
    pub(crate) fn capture(state: &'a SessionState, listeners: usize) -> Self {
        Self {
            running: state.loop_ctl.is_running(),
            frame_count: state.loop_ctl.frame_count(),
            delta_time: state.loop_ctl.delta_time(),
            fps: state.loop_ctl.fps(),
            surface: state.surface.as_ref().map(|s| SurfaceInfo {
                id: s.id().to_string(),
                width: s.width(),
                height: s.height(),
            }),
            globals: &state.globals,
            objects: &state.objects,
            sprites: state.resources.sprite_names(),
            sounds: state.resources.sound_names(),
            listeners,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
