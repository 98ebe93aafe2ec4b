// The Game facade: session lifecycle, queries, strategies and listeners

use super::config::GameConfig;
use super::hooks::{ObjectMut, Render, RenderTarget, Update};
use super::host::{HeadlessHost, Host};
use super::session::{SessionState, Snapshot};
use super::GameError;
use crate::engine::assets::{ResourceRegistry, SoundClip, SoundHandle, Sprite, SpriteHandle, SOUND_TAG, SPRITE_TAG};
use crate::engine::game_loop::{LoopController, LoopToken};
use crate::engine::input::{Event, ListenerId, ListenerRegistry};
use crate::engine::physics::{overlaps, resolve};
use crate::engine::renderer::{Color, Surface};
use crate::markup::{Document, Element};
use crate::object::{build_object, GameObject, Value, METHOD_TAG};
use crate::script::{self, ObjRef, Scope};
use std::cell::RefCell;
use std::rc::Rc;

/// Event handler bound to the session it was registered on
pub type Handler = dyn FnMut(&mut Game, &Event) -> anyhow::Result<()>;

/// A game session built from one markup document
pub struct Game {
    document: Document,
    config: GameConfig,
    host: Box<dyn Host>,
    state: SessionState,
    update: Option<Box<dyn Update>>,
    render: Option<Box<dyn Render>>,
    listeners: ListenerRegistry<Handler>,
    initialized: bool,
}

impl Game {
    /// Create a session presented through a [`HeadlessHost`].
    ///
    /// Fails with [`GameError::MissingRoot`] if the document has no `<game>`
    /// element.
    pub fn new(document: Document, config: GameConfig) -> Result<Self, GameError> {
        Self::with_host(document, config, Box::new(HeadlessHost::new()))
    }

    /// Create a session presented through a custom host
    pub fn with_host(
        document: Document,
        config: GameConfig,
        host: Box<dyn Host>,
    ) -> Result<Self, GameError> {
        if document.game_root().is_none() {
            return Err(GameError::MissingRoot);
        }

        let resources = ResourceRegistry::new(config.asset_base());
        let loop_ctl = LoopController::new(config.max_delta());
        Ok(Self {
            document,
            state: SessionState::new(resources, loop_ctl),
            config,
            host,
            update: None,
            render: None,
            listeners: ListenerRegistry::new(),
            initialized: false,
        })
    }

    /// Parse markup text and create a session from it
    pub fn from_markup(text: &str, config: GameConfig) -> Result<Self, GameError> {
        Self::new(Document::parse(text)?, config)
    }

    /// Load declared resources, build objects and globals, and attach the surface
    pub async fn init(&mut self) -> Result<&mut Self, GameError> {
        let root = self.document.game_root().ok_or(GameError::MissingRoot)?;
        self.state
            .resources
            .load_declared(root, self.config.batch_policy())
            .await?;

        self.rebuild()?;

        let (width, height) = self.surface_size();
        let mut surface = Surface::new(self.config.surface_id(), width, height);
        surface.set_smoothing(false);
        surface.set_background(self.background());
        surface.clear();
        self.host.attach_surface(&surface);
        self.state.surface = Some(surface);
        self.initialized = true;

        log::info!(
            "Game initialized: {} objects, {}x{} surface",
            self.state.objects.len(),
            width,
            height
        );
        Ok(self)
    }

    /// Stop the loop and rebuild objects and globals from the current markup.
    ///
    /// Resources, listeners and the surface survive; the surface is resized
    /// to the rebuilt globals and cleared.
    pub fn reset(&mut self) -> Result<(), GameError> {
        if !self.initialized {
            return Err(GameError::NotInitialized);
        }

        self.state.loop_ctl.reset();
        self.state.objects.clear();
        self.rebuild()?;

        let (width, height) = self.surface_size();
        let background = self.background();
        if let Some(surface) = self.state.surface.as_mut() {
            surface.set_background(background);
            surface.resize(width, height);
            surface.clear();
        }

        log::info!("Game reset: {} objects", self.state.objects.len());
        Ok(())
    }

    /// Start the frame loop. Starting while running is a warned no-op.
    pub fn start(&mut self) -> Result<(), GameError> {
        if !self.initialized {
            return Err(GameError::NotInitialized);
        }
        self.state.loop_ctl.start();
        Ok(())
    }

    /// Stop the frame loop. Safe to call at any time.
    pub fn stop(&mut self) {
        self.state.loop_ctl.stop();
    }

    /// Stop the loop and unregister every listener
    pub fn shutdown(&mut self) {
        self.stop();
        self.remove_listeners(None);
        log::info!("Game shut down");
    }

    /// Fire the next pending frame request at `timestamp` (milliseconds).
    ///
    /// Returns whether a frame ran.
    pub fn tick(&mut self, timestamp: f64) -> Result<bool, GameError> {
        match self.state.loop_ctl.take_request() {
            Some(token) => self.on_frame(token, timestamp),
            None => Ok(false),
        }
    }

    /// Run one frame for the loop identified by `token`.
    ///
    /// Frames from a stopped or superseded loop are ignored. A failing
    /// strategy aborts the rest of the frame and no further frame is
    /// requested.
    pub fn on_frame(&mut self, token: LoopToken, timestamp: f64) -> Result<bool, GameError> {
        let Some(dt) = self.state.loop_ctl.begin_frame(token, timestamp) else {
            return Ok(false);
        };

        let solid_at_start: Vec<bool> = self.state.objects.iter().map(GameObject::is_solid).collect();
        let solids: Vec<usize> = (0..solid_at_start.len())
            .filter(|&i| solid_at_start[i])
            .collect();
        let limits = self.config.script_limits();

        // Objects added during the frame are updated in the same pass
        let mut index = 0;
        while index < self.state.objects.len() {
            let solid = match solid_at_start.get(index) {
                Some(&solid) => solid,
                None => self.state.objects[index].is_solid(),
            };
            if solid {
                index += 1;
                continue;
            }

            if let Some(update) = self.update.as_mut() {
                let scope = Scope {
                    objects: &mut self.state.objects,
                    globals: &mut self.state.globals,
                    resources: &self.state.resources,
                    delta_time: dt,
                    limits,
                };
                let mut object = ObjectMut::new(scope, index);
                update
                    .update(&mut object, dt)
                    .map_err(GameError::Callback)?;
            }

            self.resolve_against(index, &solids);
            index += 1;
        }

        if let Some(surface) = self.state.surface.as_mut() {
            surface.clear();
            if let Some(render) = self.render.as_mut() {
                for object in &self.state.objects {
                    let mut target =
                        RenderTarget::new(surface, &self.state.resources, &self.state.globals);
                    render
                        .render(object, &mut target)
                        .map_err(GameError::Callback)?;
                }
            }
            self.host.present(surface);
        }

        self.state.loop_ctl.schedule_next();
        Ok(true)
    }

    /// Push object `index` out of every solid it overlaps
    fn resolve_against(&mut self, index: usize, solids: &[usize]) {
        for &solid in solids {
            let Some(fixed) = self.state.objects.get(solid).and_then(GameObject::bounds) else {
                continue;
            };
            let Some(object) = self.state.objects.get_mut(index) else {
                return;
            };
            let Some(mut moving) = object.bounds() else {
                return;
            };
            if overlaps(&moving, &fixed) && resolve(&mut moving, &fixed).is_some() {
                object.set_position(moving.left(), moving.top());
            }
        }
    }

    pub fn set_update(&mut self, strategy: impl Update + 'static) {
        self.update = Some(Box::new(strategy));
    }

    /// Closure form of [`Game::set_update`]
    pub fn on_update<F>(&mut self, f: F)
    where
        F: FnMut(&mut ObjectMut<'_>, f64) -> anyhow::Result<()> + 'static,
    {
        self.set_update(f);
    }

    pub fn set_render(&mut self, strategy: impl Render + 'static) {
        self.render = Some(Box::new(strategy));
    }

    /// Closure form of [`Game::set_render`]
    pub fn on_render<F>(&mut self, f: F)
    where
        F: FnMut(&GameObject, &mut RenderTarget<'_>) -> anyhow::Result<()> + 'static,
    {
        self.set_render(f);
    }

    /// First object of `kind`, in registry order
    pub fn get(&self, kind: &str) -> Option<&GameObject> {
        self.state.objects.iter().find(|o| o.kind() == kind)
    }

    /// Every object of `kind`, in registry order
    pub fn get_all(&self, kind: &str) -> Vec<&GameObject> {
        self.state
            .objects
            .iter()
            .filter(|o| o.kind() == kind)
            .collect()
    }

    pub fn index_of(&self, kind: &str) -> Option<usize> {
        self.state.objects.iter().position(|o| o.kind() == kind)
    }

    pub fn object(&self, index: usize) -> Option<&GameObject> {
        self.state.objects.get(index)
    }

    pub fn object_mut(&mut self, index: usize) -> Option<&mut GameObject> {
        self.state.objects.get_mut(index)
    }

    pub fn objects(&self) -> &[GameObject] {
        &self.state.objects
    }

    /// Stamp `kind` onto `object` and append it. Returns its index.
    pub fn add_object(&mut self, kind: &str, mut object: GameObject) -> Result<usize, GameError> {
        if kind.trim().is_empty() {
            return Err(GameError::InvalidObjectType(kind.to_string()));
        }
        object.set_kind(kind);
        self.state.objects.push(object);
        Ok(self.state.objects.len() - 1)
    }

    /// Invoke a markup method on the object at `index`
    pub fn call_method(&mut self, index: usize, name: &str, args: &[Value]) -> Result<Value, GameError> {
        self.invoke(ObjRef::Object(index), name, args)
    }

    /// Invoke a markup method declared on the `<game>` root
    pub fn call_global(&mut self, name: &str, args: &[Value]) -> Result<Value, GameError> {
        self.invoke(ObjRef::Globals, name, args)
    }

    fn invoke(&mut self, this: ObjRef, name: &str, args: &[Value]) -> Result<Value, GameError> {
        let mut scope = Scope {
            objects: &mut self.state.objects,
            globals: &mut self.state.globals,
            resources: &self.state.resources,
            delta_time: self.state.loop_ctl.delta_time(),
            limits: self.config.script_limits(),
        };
        Ok(script::invoke(&mut scope, this, name, args)?)
    }

    /// Load and register a sprite outside the markup declarations
    pub async fn load_sprite(&mut self, name: &str, source: &str) -> Result<SpriteHandle, GameError> {
        Ok(self.state.resources.load_sprite(name, source).await?)
    }

    /// Load and register a sound outside the markup declarations
    pub async fn load_sound(&mut self, name: &str, source: &str) -> Result<SoundHandle, GameError> {
        Ok(self.state.resources.load_sound(name, source).await?)
    }

    pub fn sprite(&self, name: &str) -> Option<&Sprite> {
        self.state.resources.sprite(name)
    }

    pub fn sound(&self, name: &str) -> Option<&SoundClip> {
        self.state.resources.sound(name)
    }

    /// Register `handler` for events of `kind`
    pub fn listen<F>(&mut self, kind: &str, handler: F) -> ListenerId
    where
        F: FnMut(&mut Game, &Event) -> anyhow::Result<()> + 'static,
    {
        let handler: Rc<RefCell<Handler>> = Rc::new(RefCell::new(handler));
        let id = self.listeners.add(kind, handler);
        self.host.add_listener(kind, id);
        id
    }

    /// Unregister one listener. Returns false if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        match self.listeners.remove(id) {
            Some(kind) => {
                self.host.remove_listener(&kind, id);
                true
            }
            None => false,
        }
    }

    /// Unregister every listener of `kind`, or every listener for `None`
    pub fn remove_listeners(&mut self, kind: Option<&str>) -> usize {
        let removed = self.listeners.remove_kind(kind);
        for (id, kind) in &removed {
            self.host.remove_listener(kind, *id);
        }
        removed.len()
    }

    /// Deliver a host event to its listeners, in registration order.
    ///
    /// Returns how many handlers ran. A listener removed by an earlier
    /// handler in the same dispatch is skipped.
    pub fn dispatch(&mut self, event: &Event) -> Result<usize, GameError> {
        let mut delivered = 0;
        for (id, handler) in self.listeners.matching(event.kind()) {
            if !self.listeners.contains(id) {
                continue;
            }
            let Ok(mut handler) = handler.try_borrow_mut() else {
                log::warn!("Listener {} is already running; skipping nested dispatch", id.as_u64());
                continue;
            };
            (&mut *handler)(self, event).map_err(GameError::Callback)?;
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Strict overlap test between two objects' boxes.
    ///
    /// Objects without all of `x`, `y`, `w` and `h` never collide.
    pub fn collides(a: &GameObject, b: &GameObject) -> bool {
        match (a.bounds(), b.bounds()) {
            (Some(a), Some(b)) => overlaps(&a, &b),
            _ => false,
        }
    }

    /// Read access to the session
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot::capture(&self.state, self.listeners.len())
    }

    pub fn globals(&self) -> &GameObject {
        &self.state.globals
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.state.surface.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.state.loop_ctl.is_running()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Edit the markup; the changes take effect on the next [`Game::reset`]
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Rebuild objects and globals from the `<game>` root
    fn rebuild(&mut self) -> Result<(), GameError> {
        let root = self.document.game_root().ok_or(GameError::MissingRoot)?;
        self.state.objects = root
            .children()
            .iter()
            .filter(|child| is_object_element(child))
            .map(build_object)
            .collect();
        self.state.globals = build_object(root);
        Ok(())
    }

    fn surface_size(&self) -> (u32, u32) {
        let (default_w, default_h) = self.config.default_size();
        let dimension = |name: &str, default: u32| match self.state.globals.number(name) {
            Some(n) if n.is_finite() && n >= 1.0 && n <= u32::MAX as f64 => n.round() as u32,
            Some(n) => {
                log::warn!("Ignoring game {}={}; using {}", name, n, default);
                default
            }
            None => default,
        };
        (dimension("w", default_w), dimension("h", default_h))
    }

    /// Background from the root's `background` attribute, else the configured one
    fn background(&self) -> Color {
        match self.state.globals.field("background").and_then(Value::as_str) {
            Some(text) => text.parse::<Color>().unwrap_or_else(|e| {
                log::warn!("{}; using the configured background", e);
                self.config.background()
            }),
            None => self.config.background(),
        }
    }
}

/// Root children that become objects: everything but resource and method descriptors
fn is_object_element(element: &Element) -> bool {
    !(element.is(SPRITE_TAG) || element.is(SOUND_TAG) || element.is(METHOD_TAG))
}
