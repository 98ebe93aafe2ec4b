// The environment a session is presented in

use crate::engine::input::ListenerId;
use crate::engine::renderer::Surface;
use std::cell::RefCell;
use std::rc::Rc;

/// Presentation and event plumbing supplied by the embedding environment
pub trait Host {
    /// Place the session's surface in the presentation tree
    fn attach_surface(&mut self, surface: &Surface);

    /// Start routing events of `kind` to the session for listener `id`
    fn add_listener(&mut self, kind: &str, id: ListenerId);

    /// Stop routing events of `kind` for listener `id`
    fn remove_listener(&mut self, kind: &str, id: ListenerId);

    /// Called after every rendered frame
    fn present(&mut self, _surface: &Surface) {}
}

#[derive(Debug, Default)]
struct HeadlessState {
    attached: Option<(String, u32, u32)>,
    listeners: Vec<(String, ListenerId)>,
    frames_presented: u64,
}

/// Host without a display; records what it was asked to do
///
/// Clones share the same record, so a caller can keep one to inspect a
/// host it handed to a session.
#[derive(Debug, Clone, Default)]
pub struct HeadlessHost {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id and size of the attached surface
    pub fn attached(&self) -> Option<(String, u32, u32)> {
        self.state.borrow().attached.clone()
    }

    /// Routed listeners, in registration order
    pub fn listeners(&self) -> Vec<(String, ListenerId)> {
        self.state.borrow().listeners.clone()
    }

    pub fn frames_presented(&self) -> u64 {
        self.state.borrow().frames_presented
    }
}

impl Host for HeadlessHost {
    fn attach_surface(&mut self, surface: &Surface) {
        log::info!(
            "Attached surface '{}' ({}x{})",
            surface.id(),
            surface.width(),
            surface.height()
        );
        self.state.borrow_mut().attached =
            Some((surface.id().to_string(), surface.width(), surface.height()));
    }

    fn add_listener(&mut self, kind: &str, id: ListenerId) {
        self.state
            .borrow_mut()
            .listeners
            .push((kind.to_string(), id));
    }

    fn remove_listener(&mut self, kind: &str, id: ListenerId) {
        self.state
            .borrow_mut()
            .listeners
            .retain(|(k, l)| !(k == kind && *l == id));
    }

    fn present(&mut self, _surface: &Surface) {
        self.state.borrow_mut().frames_presented += 1;
    }
}
