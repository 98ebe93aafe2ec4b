// Markup-declared methods

use crate::script::{self, Program, ScriptError};
use std::rc::Rc;

/// A named behavior compiled from markup logic text.
///
/// The logic is compiled once when the object is built. A method whose
/// logic fails to compile is still attached; every call reports the
/// compile error.
#[derive(Debug, Clone)]
pub struct Method {
    name: String,
    params: Vec<String>,
    source: String,
    program: Result<Rc<Program>, ScriptError>,
}

impl Method {
    pub fn new(name: &str, params: Vec<String>, source: &str) -> Self {
        let program = script::compile(source).map(Rc::new);
        if let Err(e) = &program {
            log::error!("Method '{}' failed to compile: {}", name, e);
        }

        Self {
            name: name.to_string(),
            params,
            source: source.to_string(),
            program,
        }
    }

    /// Body used when a method descriptor has no `action`
    pub fn default_body(name: &str) -> String {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("console.log(\"Method {} executed\");", escaped)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter names, in call order
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// The logic text the method was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn program(&self) -> Result<&Program, ScriptError> {
        self.program.as_deref().map_err(Clone::clone)
    }
}
