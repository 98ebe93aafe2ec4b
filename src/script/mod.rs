// Sandboxed method logic
//
// Method bodies are written in a small statement language:
//
//   let / const declarations, assignment (= += -= *= /= %=), ++ and --,
//   if / else, while, for, return, blocks, the usual arithmetic,
//   comparison and logical operators, the ternary operator, string
//   concatenation with +, member access and method calls.
//
// A running method can only reach what its Scope lends it: `this`, its
// declared parameters, the `game` session handle, `console` and `Math`.
// There is no way to reach the host, the filesystem or the process.
// Every call runs under a step budget and a call depth limit.

mod ast;
mod interpreter;
mod lexer;
mod parser;
mod scope;

pub use ast::Program;
pub use interpreter::SESSION_BINDING;
pub use scope::{ObjRef, Scope};

use crate::object::{FieldError, Value};
use interpreter::{Interpreter, Operand};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Assignment to constant: {0}")]
    ConstAssignment(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Object of type '{kind}' has no method '{method}'")]
    UnknownMethod { kind: String, method: String },

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Object #{0} no longer exists")]
    StaleReference(usize),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Step budget of {0} exceeded")]
    BudgetExceeded(usize),

    #[error("Call depth limit of {0} exceeded")]
    DepthExceeded(usize),
}

/// Resource limits applied to every top-level method call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLimits {
    /// Statements and loop iterations allowed per call
    pub max_steps: usize,
    /// Nested method calls allowed per call
    pub max_call_depth: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_steps: 10_000,
            max_call_depth: 16,
        }
    }
}

/// Compile logic text into a program
pub fn compile(source: &str) -> Result<Program, ScriptError> {
    let tokens = lexer::tokenize(source)?;
    parser::parse_program(tokens)
}

/// Invoke `method` on `this` with positional arguments.
///
/// Object references cannot cross back out of the sandbox, so a method
/// returning one fails with a type error.
pub fn invoke(
    scope: &mut Scope<'_>,
    this: ObjRef,
    method: &str,
    args: &[Value],
) -> Result<Value, ScriptError> {
    let args = args.iter().cloned().map(Operand::Value).collect();
    let mut interpreter = Interpreter::new(scope);
    interpreter
        .call_method(this, method, args)?
        .into_value(&format!("the result of '{}'", method))
}

/// Whether `name` can be used as a parameter or variable name
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !lexer::KEYWORDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::ResourceRegistry;
    use crate::object::{GameObject, Method};

    struct Fixture {
        objects: Vec<GameObject>,
        globals: GameObject,
        resources: ResourceRegistry,
        limits: ScriptLimits,
    }

    impl Fixture {
        fn new(objects: Vec<GameObject>) -> Self {
            Self {
                objects,
                globals: GameObject::new("GAME"),
                resources: ResourceRegistry::default(),
                limits: ScriptLimits::default(),
            }
        }

        fn call(&mut self, index: usize, method: &str, args: &[Value]) -> Result<Value, ScriptError> {
            let mut scope = Scope {
                objects: &mut self.objects,
                globals: &mut self.globals,
                resources: &self.resources,
                delta_time: 16.0,
                limits: self.limits,
            };
            invoke(&mut scope, ObjRef::Object(index), method, args)
        }
    }

    fn object_with(methods: &[(&str, &[&str], &str)]) -> GameObject {
        let mut object = GameObject::new("PLAYER").with("x", 0.0).with("y", 0.0);
        for (name, params, body) in methods {
            let params = params.iter().map(|p| p.to_string()).collect();
            object.attach_method(Method::new(name, params, body));
        }
        object
    }

    #[test]
    fn test_move_binds_parameters_by_name() {
        let player = object_with(&[("move", &["dx", "dy"], "this.x += dx; this.y += dy;")]);
        let mut fx = Fixture::new(vec![player]);

        fx.call(0, "move", &[Value::from(1), Value::from(2)]).unwrap();
        assert_eq!(fx.objects[0].x(), 1.0);
        assert_eq!(fx.objects[0].y(), 2.0);
    }

    #[test]
    fn test_missing_args_are_null_and_extras_ignored() {
        let object = object_with(&[("probe", &["a", "b"], "return b == null;")]);
        let mut fx = Fixture::new(vec![object]);
        assert_eq!(fx.call(0, "probe", &[Value::from(1)]).unwrap(), Value::Bool(true));
        assert_eq!(
            fx.call(0, "probe", &[Value::from(1), Value::from(2), Value::from(3)])
                .unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_return_value_and_control_flow() {
        let object = object_with(&[
            (
                "evens",
                &["n"],
                "let total = 0; for (let i = 1; i <= n; i++) { if (i % 2 == 0) total += i; } return total;",
            ),
            (
                "sum",
                &["n"],
                "let total = 0; let i = 0; while (i < n) { i++; total += i; } return total;",
            ),
        ]);
        let mut fx = Fixture::new(vec![object]);
        assert_eq!(fx.call(0, "evens", &[Value::from(6)]).unwrap(), Value::Number(12.0));
        assert_eq!(fx.call(0, "sum", &[Value::from(4)]).unwrap(), Value::Number(10.0));
    }

    #[test]
    fn test_methods_call_each_other() {
        let object = object_with(&[
            ("step", &[], "this.move(game.dt, 0); return this.x;"),
            ("move", &["dx", "dy"], "this.x += dx; this.y += dy;"),
        ]);
        let mut fx = Fixture::new(vec![object]);
        assert_eq!(fx.call(0, "step", &[]).unwrap(), Value::Number(16.0));
    }

    #[test]
    fn test_session_handle() {
        let spawner = object_with(&[(
            "spawn",
            &[],
            "let e = game.add('ENEMY'); e.x = 5; e.hp = 3; game.globals.score = game.count('ENEMY'); return game.get('ENEMY').hp;",
        )]);
        let mut fx = Fixture::new(vec![spawner]);

        assert_eq!(fx.call(0, "spawn", &[]).unwrap(), Value::Number(3.0));
        assert_eq!(fx.objects.len(), 2);
        assert_eq!(fx.objects[1].kind(), "ENEMY");
        assert_eq!(fx.objects[1].x(), 5.0);
        assert_eq!(fx.globals.get("score"), Value::Number(1.0));
    }

    #[test]
    fn test_game_binding_shadows_parameter() {
        let object = object_with(&[("peek", &["game"], "return game.dt;")]);
        let mut fx = Fixture::new(vec![object]);
        assert_eq!(
            fx.call(0, "peek", &[Value::from("ignored")]).unwrap(),
            Value::Number(16.0)
        );
    }

    #[test]
    fn test_object_reference_cannot_escape() {
        let object = object_with(&[("me", &[], "return this;")]);
        let mut fx = Fixture::new(vec![object]);
        assert!(matches!(fx.call(0, "me", &[]), Err(ScriptError::Type(_))));
    }

    #[test]
    fn test_operators() {
        let object = object_with(&[(
            "calc",
            &[],
            "return 'n=' + (2 + 3 * 4) + (1 == '1' ? ' loose' : ' strict') + (!0 && 'yes');",
        )]);
        let mut fx = Fixture::new(vec![object]);
        assert_eq!(
            fx.call(0, "calc", &[]).unwrap(),
            Value::from("n=14 strictyes")
        );
    }

    #[test]
    fn test_math_builtins() {
        let object = object_with(&[(
            "calc",
            &[],
            "return Math.max(1, Math.abs(-7), Math.floor(2.9)) + Math.min() * 0 + Math.round(-0.5);",
        )]);
        let mut fx = Fixture::new(vec![object]);
        // Math.min() is Infinity and Infinity * 0 is NaN
        let result = fx.call(0, "calc", &[]).unwrap().as_number().unwrap();
        assert!(result.is_nan());

        let object = object_with(&[("calc", &[], "return Math.sqrt(16) + Math.pow(2, 3) + Math.round(2.5);")]);
        let mut fx = Fixture::new(vec![object]);
        assert_eq!(fx.call(0, "calc", &[]).unwrap(), Value::Number(15.0));
    }

    #[test]
    fn test_const_cannot_be_reassigned() {
        let object = object_with(&[("bad", &[], "const a = 1; a = 2;")]);
        let mut fx = Fixture::new(vec![object]);
        assert_eq!(
            fx.call(0, "bad", &[]),
            Err(ScriptError::ConstAssignment("a".into()))
        );
    }

    #[test]
    fn test_block_scoping() {
        let object = object_with(&[("scoped", &[], "let a = 1; { let a = 2; } return a;")]);
        let mut fx = Fixture::new(vec![object]);
        assert_eq!(fx.call(0, "scoped", &[]).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_typed_fields_reject_text() {
        let object = object_with(&[("bad", &[], "this.x = 'left';")]);
        let mut fx = Fixture::new(vec![object]);
        assert!(matches!(fx.call(0, "bad", &[]), Err(ScriptError::Field(_))));
        assert_eq!(fx.objects[0].x(), 0.0);
    }

    #[test]
    fn test_step_budget() {
        let object = object_with(&[("spin", &[], "while (true) {}")]);
        let mut fx = Fixture::new(vec![object]);
        fx.limits.max_steps = 500;
        assert_eq!(fx.call(0, "spin", &[]), Err(ScriptError::BudgetExceeded(500)));
    }

    #[test]
    fn test_depth_limit() {
        let object = object_with(&[("recurse", &[], "this.recurse();")]);
        let mut fx = Fixture::new(vec![object]);
        assert_eq!(fx.call(0, "recurse", &[]), Err(ScriptError::DepthExceeded(16)));
    }

    #[test]
    fn test_unknown_method_and_identifier() {
        let object = object_with(&[("run", &[], "this.fly();"), ("leak", &[], "return window;")]);
        let mut fx = Fixture::new(vec![object]);
        assert!(matches!(
            fx.call(0, "run", &[]),
            Err(ScriptError::UnknownMethod { method, .. }) if method == "fly"
        ));
        assert_eq!(
            fx.call(0, "leak", &[]),
            Err(ScriptError::UnknownIdentifier("window".into()))
        );
        assert!(matches!(fx.call(0, "missing", &[]), Err(ScriptError::UnknownMethod { .. })));
    }

    #[test]
    fn test_compile_error_reported_on_call() {
        let object = object_with(&[("broken", &[], "this.x += ;")]);
        let mut fx = Fixture::new(vec![object]);
        assert!(matches!(fx.call(0, "broken", &[]), Err(ScriptError::Syntax { .. })));
    }

    #[test]
    fn test_stale_reference() {
        let mut fx = Fixture::new(Vec::new());
        assert_eq!(fx.call(3, "anything", &[]), Err(ScriptError::StaleReference(3)));
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("dx"));
        assert!(is_identifier("_private$"));
        assert!(!is_identifier("2d"));
        assert!(!is_identifier("return"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
    }
}
