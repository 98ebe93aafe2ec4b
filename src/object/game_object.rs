// Game object record

use super::method::Method;
use super::value::{parse_number, Value};
use crate::engine::physics::Aabb;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::rc::Rc;

/// Field names with typed storage on every object
pub const RESERVED_FIELDS: [&str; 6] = ["type", "x", "y", "w", "h", "solid"];

/// Errors from writing a field with the wrong type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("field '{field}' expects a number, got {actual}")]
    ExpectsNumber { field: String, actual: &'static str },

    #[error("field 'type' expects a non-empty string, got {0}")]
    InvalidType(String),
}

/// A game object built from a markup element or added at runtime.
///
/// `x`, `y`, `w`, `h` and `solid` are typed; every other attribute lives in an
/// ordered extension map. Methods declared in markup are attached by name.
#[derive(Debug, Clone, Default)]
pub struct GameObject {
    kind: String,
    x: Option<f64>,
    y: Option<f64>,
    w: Option<f64>,
    h: Option<f64>,
    solid: bool,
    fields: Vec<(String, Value)>,
    methods: HashMap<String, Rc<Method>>,
}

impl GameObject {
    /// Create an empty object of the given type
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    /// Builder-style field setter; ill-typed values are logged and dropped
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        if let Err(e) = self.set(name, value.into()) {
            log::warn!("{} on {}", e, self.kind);
        }
        self
    }

    /// The object's type tag
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: &str) {
        self.kind = kind.to_string();
    }

    pub fn x(&self) -> f64 {
        self.x.unwrap_or(0.0)
    }

    pub fn y(&self) -> f64 {
        self.y.unwrap_or(0.0)
    }

    pub fn w(&self) -> f64 {
        self.w.unwrap_or(0.0)
    }

    pub fn h(&self) -> f64 {
        self.h.unwrap_or(0.0)
    }

    pub fn set_x(&mut self, x: f64) {
        self.x = Some(x);
    }

    pub fn set_y(&mut self, y: f64) {
        self.y = Some(y);
    }

    pub fn set_size(&mut self, w: f64, h: f64) {
        self.w = Some(w);
        self.h = Some(h);
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = Some(x);
        self.y = Some(y);
    }

    /// Move by an offset; an unset coordinate counts as zero
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.set_position(self.x() + dx, self.y() + dy);
    }

    pub fn is_solid(&self) -> bool {
        self.solid
    }

    pub fn set_solid(&mut self, solid: bool) {
        self.solid = solid;
    }

    /// Bounding box, if all of `x`, `y`, `w` and `h` are set
    pub fn bounds(&self) -> Option<Aabb> {
        Some(Aabb::new(self.x?, self.y?, self.w?, self.h?))
    }

    /// Read a field; missing fields read as `Null`
    pub fn get(&self, name: &str) -> Value {
        match name {
            "type" => Value::Str(self.kind.clone()),
            "x" => self.x.map_or(Value::Null, Value::Number),
            "y" => self.y.map_or(Value::Null, Value::Number),
            "w" => self.w.map_or(Value::Null, Value::Number),
            "h" => self.h.map_or(Value::Null, Value::Number),
            "solid" => Value::Bool(self.solid),
            _ => self.field(name).cloned().unwrap_or_default(),
        }
    }

    /// Extension field lookup (reserved fields are not stored here)
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Numeric extension field, if present and numeric
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).as_number()
    }

    /// Write a field. Reserved geometry fields only accept numbers (or `Null`
    /// to unset them); `solid` accepts anything and stores its truthiness.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), FieldError> {
        let slot = match name {
            "x" => &mut self.x,
            "y" => &mut self.y,
            "w" => &mut self.w,
            "h" => &mut self.h,
            "type" => {
                return match value {
                    Value::Str(s) if !s.trim().is_empty() => {
                        self.kind = s;
                        Ok(())
                    }
                    other => Err(FieldError::InvalidType(other.to_string())),
                };
            }
            "solid" => {
                self.solid = solid_flag(&value);
                return Ok(());
            }
            _ => {
                self.set_field(name, value);
                return Ok(());
            }
        };

        match value {
            Value::Number(n) => *slot = Some(n),
            Value::Null => *slot = None,
            other => {
                return Err(FieldError::ExpectsNumber {
                    field: name.to_string(),
                    actual: other.type_name(),
                })
            }
        }
        Ok(())
    }

    /// Write an extension field directly, bypassing reserved-name handling
    pub(crate) fn set_field(&mut self, name: &str, value: Value) {
        match self.fields.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Extension fields in insertion order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Attach a method, replacing any method with the same name
    pub fn attach_method(&mut self, method: Method) {
        self.methods.insert(method.name().to_string(), Rc::new(method));
    }

    pub fn method(&self, name: &str) -> Option<&Rc<Method>> {
        self.methods.get(name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Names of attached methods, sorted
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// How `solid` reads a value. `"false"`, `"0"` and `"NaN"` are false and a
/// bare attribute (empty string) is true; anything else goes by truthiness.
pub(crate) fn solid_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::Str(s) => {
            let s = s.trim();
            s.is_empty()
                || !(s.eq_ignore_ascii_case("false")
                    || s.eq_ignore_ascii_case("nan")
                    || parse_number(s) == Some(0.0))
        }
        Value::Null => false,
    }
}

impl Serialize for GameObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", &self.kind)?;
        for (name, value) in [("x", self.x), ("y", self.y), ("w", self.w), ("h", self.h)] {
            if let Some(value) = value {
                map.serialize_entry(name, &value)?;
            }
        }
        map.serialize_entry("solid", &self.solid)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        if !self.methods.is_empty() {
            map.serialize_entry("methods", &self.method_names())?;
        }
        map.end()
    }
}
