// Update and render strategies, and the views they receive

use crate::engine::assets::ResourceRegistry;
use crate::engine::renderer::{Color, Surface};
use crate::object::{GameObject, Value};
use crate::script::{self, ObjRef, Scope, ScriptError};
use anyhow::Result;
use std::ops::{Deref, DerefMut};

/// Per-object update step, called once per frame for every non-solid object
pub trait Update {
    fn update(&mut self, object: &mut ObjectMut<'_>, dt: f64) -> Result<()>;
}

impl<F> Update for F
where
    F: FnMut(&mut ObjectMut<'_>, f64) -> Result<()>,
{
    fn update(&mut self, object: &mut ObjectMut<'_>, dt: f64) -> Result<()> {
        self(object, dt)
    }
}

/// Per-object draw step, called once per frame for every object
pub trait Render {
    fn render(&mut self, object: &GameObject, target: &mut RenderTarget<'_>) -> Result<()>;
}

impl<F> Render for F
where
    F: FnMut(&GameObject, &mut RenderTarget<'_>) -> Result<()>,
{
    fn render(&mut self, object: &GameObject, target: &mut RenderTarget<'_>) -> Result<()> {
        self(object, target)
    }
}

/// Mutable view of one registry object during an update.
///
/// Derefs to the object; `call` runs the object's markup methods with full
/// access to the session.
pub struct ObjectMut<'a> {
    scope: Scope<'a>,
    index: usize,
}

impl<'a> ObjectMut<'a> {
    /// `index` must be a valid index into `scope.objects`
    pub(crate) fn new(scope: Scope<'a>, index: usize) -> Self {
        Self { scope, index }
    }

    /// Position of the object in the registry
    pub fn index(&self) -> usize {
        self.index
    }

    /// Invoke one of the object's markup methods
    pub fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, ScriptError> {
        script::invoke(&mut self.scope, ObjRef::Object(self.index), method, args)
    }

    pub fn globals(&self) -> &GameObject {
        &*self.scope.globals
    }

    pub fn resources(&self) -> &ResourceRegistry {
        self.scope.resources
    }

    /// Delta of the current frame, in milliseconds
    pub fn delta_time(&self) -> f64 {
        self.scope.delta_time
    }
}

impl Deref for ObjectMut<'_> {
    type Target = GameObject;

    fn deref(&self) -> &GameObject {
        &self.scope.objects[self.index]
    }
}

impl DerefMut for ObjectMut<'_> {
    fn deref_mut(&mut self) -> &mut GameObject {
        &mut self.scope.objects[self.index]
    }
}

/// What a render strategy draws onto
pub struct RenderTarget<'a> {
    surface: &'a mut Surface,
    resources: &'a ResourceRegistry,
    globals: &'a GameObject,
}

impl<'a> RenderTarget<'a> {
    pub(crate) fn new(
        surface: &'a mut Surface,
        resources: &'a ResourceRegistry,
        globals: &'a GameObject,
    ) -> Self {
        Self {
            surface,
            resources,
            globals,
        }
    }

    pub fn surface(&mut self) -> &mut Surface {
        &mut *self.surface
    }

    pub fn resources(&self) -> &ResourceRegistry {
        self.resources
    }

    pub fn globals(&self) -> &GameObject {
        self.globals
    }

    /// Draw a registered sprite. Returns false when no sprite has that name.
    pub fn draw_sprite(&mut self, name: &str, x: f64, y: f64, w: f64, h: f64) -> bool {
        match self.resources.sprite(name) {
            Some(sprite) => {
                self.surface.draw_sprite(sprite, x, y, w, h);
                true
            }
            None => false,
        }
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Color) {
        self.surface.fill_rect(x, y, w, h, color);
    }
}

/// Update that runs each object's `update` method, if it has one, with `dt`
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptedUpdate;

impl Update for ScriptedUpdate {
    fn update(&mut self, object: &mut ObjectMut<'_>, dt: f64) -> Result<()> {
        if object.has_method("update") {
            object.call("update", &[Value::Number(dt)])?;
        }
        Ok(())
    }
}

/// Render driven by object attributes.
///
/// Objects with a `sprite` naming a registered sprite draw it over their
/// box; otherwise a `color` attribute fills the box. Anything else is not
/// drawn.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeRender;

impl Render for AttributeRender {
    fn render(&mut self, object: &GameObject, target: &mut RenderTarget<'_>) -> Result<()> {
        let Some(bounds) = object.bounds() else {
            return Ok(());
        };
        let size = bounds.size();

        if let Some(name) = object.field("sprite").and_then(Value::as_str) {
            if target.draw_sprite(name, bounds.left(), bounds.top(), size.x, size.y) {
                return Ok(());
            }
        }

        if let Some(text) = object.field("color").and_then(Value::as_str) {
            match text.parse::<Color>() {
                Ok(color) => target.fill_rect(bounds.left(), bounds.top(), size.x, size.y, color),
                Err(e) => log::debug!("<{}> not drawn: {}", object.kind(), e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::Sprite;
    use crate::object::Method;
    use crate::script::ScriptLimits;

    fn block(color: &str) -> GameObject {
        GameObject::new("BLOCK")
            .with("x", 1.0)
            .with("y", 1.0)
            .with("w", 2.0)
            .with("h", 2.0)
            .with("color", color)
    }

    #[test]
    fn test_object_mut_derefs_and_calls() {
        let mut player = GameObject::new("PLAYER").with("x", 0.0);
        player.attach_method(Method::new("update", vec!["dt".into()], "this.x += dt;"));
        let mut objects = vec![player];
        let mut globals = GameObject::new("GAME");
        let resources = ResourceRegistry::default();

        let scope = Scope {
            objects: &mut objects,
            globals: &mut globals,
            resources: &resources,
            delta_time: 10.0,
            limits: ScriptLimits::default(),
        };
        let mut view = ObjectMut::new(scope, 0);
        ScriptedUpdate.update(&mut view, 10.0).unwrap();
        view.translate(0.0, 5.0);

        assert_eq!(view.kind(), "PLAYER");
        assert_eq!(view.x(), 10.0);
        assert_eq!(view.y(), 5.0);
        assert_eq!(view.delta_time(), 10.0);
    }

    #[test]
    fn test_attribute_render_fills_color() {
        let mut surface = Surface::new("s", 4, 4);
        let resources = ResourceRegistry::default();
        let globals = GameObject::new("GAME");
        let mut target = RenderTarget::new(&mut surface, &resources, &globals);

        AttributeRender.render(&block("white"), &mut target).unwrap();
        AttributeRender.render(&block("not-a-color"), &mut target).unwrap();

        assert_eq!(surface.pixel(1, 1), Some(Color::WHITE));
        assert_eq!(surface.pixel(2, 2), Some(Color::WHITE));
        assert_eq!(surface.pixel(3, 3), Some(Color::BLACK));
    }

    #[test]
    fn test_attribute_render_prefers_sprite() {
        let mut surface = Surface::new("s", 4, 4);
        let mut resources = ResourceRegistry::default();
        resources.insert_sprite("red", Sprite::from_color("red", 1, 1, [255, 0, 0, 255]));
        let globals = GameObject::new("GAME");
        let mut target = RenderTarget::new(&mut surface, &resources, &globals);

        let object = block("white").with("sprite", "red");
        AttributeRender.render(&object, &mut target).unwrap();
        assert_eq!(surface.pixel(1, 1), Some(Color::rgb(255, 0, 0)));

        // Unknown sprite falls back to the color
        let object = block("white").with("sprite", "missing");
        let mut target = RenderTarget::new(&mut surface, &resources, &globals);
        AttributeRender.render(&object, &mut target).unwrap();
        assert_eq!(surface.pixel(1, 1), Some(Color::WHITE));
    }

    fn as_render<F: FnMut(&GameObject, &mut RenderTarget<'_>) -> Result<()>>(f: F) -> F {
        f
    }

    #[test]
    fn test_closures_are_strategies() {
        let mut calls = 0;
        let mut render = as_render(|_, _| {
            calls += 1;
            Ok(())
        });
        let mut surface = Surface::new("s", 1, 1);
        let resources = ResourceRegistry::default();
        let globals = GameObject::new("GAME");
        let mut target = RenderTarget::new(&mut surface, &resources, &globals);

        Render::render(&mut render, &GameObject::new("A"), &mut target).unwrap();
        Render::render(&mut render, &GameObject::new("B"), &mut target).unwrap();
        assert_eq!(calls, 2);
    }
}
