// What a running method can reach

use super::{ScriptError, ScriptLimits};
use crate::engine::assets::ResourceRegistry;
use crate::object::GameObject;

/// Reference to an object a script can read and write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjRef {
    /// Index into the object registry
    Object(usize),
    /// The globals record built from the `<game>` root
    Globals,
}

/// Session state lent to a script for the duration of one call
pub struct Scope<'a> {
    pub objects: &'a mut Vec<GameObject>,
    pub globals: &'a mut GameObject,
    pub resources: &'a ResourceRegistry,
    pub delta_time: f64,
    pub limits: ScriptLimits,
}

impl<'a> Scope<'a> {
    pub fn object(&self, target: ObjRef) -> Result<&GameObject, ScriptError> {
        match target {
            ObjRef::Object(index) => self
                .objects
                .get(index)
                .ok_or(ScriptError::StaleReference(index)),
            ObjRef::Globals => Ok(&*self.globals),
        }
    }

    pub fn object_mut(&mut self, target: ObjRef) -> Result<&mut GameObject, ScriptError> {
        match target {
            ObjRef::Object(index) => self
                .objects
                .get_mut(index)
                .ok_or(ScriptError::StaleReference(index)),
            ObjRef::Globals => Ok(&mut *self.globals),
        }
    }

    /// Reborrow with a shorter lifetime
    pub fn reborrow(&mut self) -> Scope<'_> {
        Scope {
            objects: &mut *self.objects,
            globals: &mut *self.globals,
            resources: self.resources,
            delta_time: self.delta_time,
            limits: self.limits,
        }
    }
}
