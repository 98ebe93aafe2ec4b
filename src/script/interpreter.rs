// Tree-walking evaluator for method logic

use super::ast::{BinaryOp, Expr, Stmt, UnaryOp};
use super::scope::{ObjRef, Scope};
use super::ScriptError;
use crate::core::math::round_half_up;
use crate::object::{GameObject, Value};
use std::collections::HashMap;

/// Name under which a method sees the session handle
pub const SESSION_BINDING: &str = "game";

/// Anything an expression can evaluate to
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Value(Value),
    Object(ObjRef),
    Session,
    Console,
    Math,
}

impl Operand {
    fn truthy(&self) -> bool {
        match self {
            Operand::Value(value) => value.truthy(),
            _ => true,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Operand::Value(value) => value.type_name(),
            Operand::Object(_) => "object",
            Operand::Session => "game",
            Operand::Console => "console",
            Operand::Math => "Math",
        }
    }

    pub(super) fn into_value(self, context: &str) -> Result<Value, ScriptError> {
        match self {
            Operand::Value(value) => Ok(value),
            other => Err(ScriptError::Type(format!(
                "{} cannot be used as a plain value in {}",
                other.describe(),
                context
            ))),
        }
    }

    fn number(&self, context: &str) -> Result<f64, ScriptError> {
        match self {
            Operand::Value(Value::Number(n)) => Ok(*n),
            other => Err(ScriptError::Type(format!(
                "{} expects a number, got {}",
                context,
                other.describe()
            ))),
        }
    }
}

struct Binding {
    value: Operand,
    constant: bool,
}

/// Variables visible to one method call
struct Env {
    this: ObjRef,
    scopes: Vec<HashMap<String, Binding>>,
}

impl Env {
    fn new(this: ObjRef) -> Self {
        Self {
            this,
            scopes: vec![HashMap::new()],
        }
    }

    fn declare(&mut self, name: &str, value: Operand, constant: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Binding { value, constant });
        }
    }

    fn lookup(&self, name: &str) -> Option<&Operand> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .map(|binding| &binding.value)
    }

    fn assign(&mut self, name: &str, value: Operand) -> Result<(), ScriptError> {
        let binding = self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
            .ok_or_else(|| ScriptError::UnknownIdentifier(name.to_string()))?;
        if binding.constant {
            return Err(ScriptError::ConstAssignment(name.to_string()));
        }
        binding.value = value;
        Ok(())
    }
}

enum Flow {
    Normal,
    Return(Operand),
}

/// Runs method bodies against a borrowed session scope
pub(crate) struct Interpreter<'s, 'a> {
    scope: &'s mut Scope<'a>,
    steps: usize,
    depth: usize,
}

impl<'s, 'a> Interpreter<'s, 'a> {
    pub(crate) fn new(scope: &'s mut Scope<'a>) -> Self {
        Self {
            scope,
            steps: 0,
            depth: 0,
        }
    }

    /// Call the named method on `this`, binding declared parameters to `args`
    pub(crate) fn call_method(
        &mut self,
        this: ObjRef,
        name: &str,
        args: Vec<Operand>,
    ) -> Result<Operand, ScriptError> {
        let owner = self.scope.object(this)?;
        let method = owner
            .method(name)
            .cloned()
            .ok_or_else(|| ScriptError::UnknownMethod {
                kind: owner.kind().to_string(),
                method: name.to_string(),
            })?;

        if self.depth >= self.scope.limits.max_call_depth {
            return Err(ScriptError::DepthExceeded(self.scope.limits.max_call_depth));
        }
        let program = method.program()?;

        let mut env = Env::new(this);
        let mut args = args.into_iter();
        for param in method.params() {
            let value = args.next().unwrap_or(Operand::Value(Value::Null));
            env.declare(param, value, false);
        }
        env.declare(SESSION_BINDING, Operand::Session, true);
        env.declare("console", Operand::Console, true);
        env.declare("Math", Operand::Math, true);

        self.depth += 1;
        let flow = self.exec_all(&program.body, &mut env);
        self.depth -= 1;

        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Operand::Value(Value::Null)),
        }
    }

    fn tick(&mut self) -> Result<(), ScriptError> {
        self.steps += 1;
        if self.steps > self.scope.limits.max_steps {
            return Err(ScriptError::BudgetExceeded(self.scope.limits.max_steps));
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    fn exec_all(&mut self, stmts: &[Stmt], env: &mut Env) -> Result<Flow, ScriptError> {
        for stmt in stmts {
            if let Flow::Return(value) = self.exec(stmt, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_scoped(&mut self, stmts: &[Stmt], env: &mut Env) -> Result<Flow, ScriptError> {
        env.scopes.push(HashMap::new());
        let flow = self.exec_all(stmts, env);
        env.scopes.pop();
        flow
    }

    fn exec(&mut self, stmt: &Stmt, env: &mut Env) -> Result<Flow, ScriptError> {
        self.tick()?;
        match stmt {
            Stmt::Empty => Ok(Flow::Normal),
            Stmt::Expr(expr) => {
                self.eval(expr, env)?;
                Ok(Flow::Normal)
            }
            Stmt::Let {
                name,
                init,
                constant,
            } => {
                let value = match init {
                    Some(expr) => self.eval(expr, env)?,
                    None => Operand::Value(Value::Null),
                };
                env.declare(name, value, *constant);
                Ok(Flow::Normal)
            }
            Stmt::Block(stmts) => self.exec_scoped(stmts, env),
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond, env)?.truthy() {
                    self.exec(then, env)
                } else if let Some(otherwise) = otherwise {
                    self.exec(otherwise, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { cond, body } => {
                while self.eval(cond, env)?.truthy() {
                    self.tick()?;
                    if let Flow::Return(value) = self.exec(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                env.scopes.push(HashMap::new());
                let flow = self.exec_for(init.as_deref(), cond.as_ref(), step.as_ref(), body, env);
                env.scopes.pop();
                flow
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr, env)?,
                    None => Operand::Value(Value::Null),
                };
                Ok(Flow::Return(value))
            }
        }
    }

    fn exec_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        step: Option<&Expr>,
        body: &Stmt,
        env: &mut Env,
    ) -> Result<Flow, ScriptError> {
        if let Some(init) = init {
            self.exec(init, env)?;
        }
        loop {
            if let Some(cond) = cond {
                if !self.eval(cond, env)?.truthy() {
                    return Ok(Flow::Normal);
                }
            }
            self.tick()?;
            if let Flow::Return(value) = self.exec(body, env)? {
                return Ok(Flow::Return(value));
            }
            if let Some(step) = step {
                self.eval(step, env)?;
            }
        }
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    fn eval(&mut self, expr: &Expr, env: &mut Env) -> Result<Operand, ScriptError> {
        match expr {
            Expr::Literal(value) => Ok(Operand::Value(value.clone())),
            Expr::This => Ok(Operand::Object(env.this)),
            Expr::Ident(name) => env
                .lookup(name)
                .cloned()
                .ok_or_else(|| ScriptError::UnknownIdentifier(name.clone())),
            Expr::Member { object, property } => {
                let base = self.eval(object, env)?;
                self.read_member(&base, property)
            }
            Expr::Call { callee, args } => {
                let Expr::Member { object, property } = callee.as_ref() else {
                    return Err(ScriptError::Type(format!(
                        "only methods can be called, not {}",
                        describe_expr(callee)
                    )));
                };
                let base = self.eval(object, env)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, env)?);
                }
                self.call(&base, property, values)
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, env)?;
                match op {
                    UnaryOp::Not => Ok(Operand::Value(Value::Bool(!value.truthy()))),
                    UnaryOp::Neg => Ok(num(-value.number("unary '-'")?)),
                    UnaryOp::Plus => match value {
                        Operand::Value(Value::Str(s)) => Ok(num(
                            Value::from_attribute(&s).as_number().unwrap_or(f64::NAN),
                        )),
                        other => Ok(num(other.number("unary '+'")?)),
                    },
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                binary(*op, left, right)
            }
            Expr::Logical { and, left, right } => {
                let left = self.eval(left, env)?;
                if left.truthy() == *and {
                    self.eval(right, env)
                } else {
                    Ok(left)
                }
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond, env)?.truthy() {
                    self.eval(then, env)
                } else {
                    self.eval(otherwise, env)
                }
            }
            Expr::Assign { target, op, value } => {
                let value = self.eval(value, env)?;
                let value = match op {
                    Some(op) => {
                        let current = self.eval(target, env)?;
                        binary(*op, current, value)?
                    }
                    None => value,
                };
                self.store(target, value.clone(), env)?;
                Ok(value)
            }
            Expr::Update {
                target,
                delta,
                prefix,
            } => {
                let current = self.eval(target, env)?.number("increment")?;
                let updated = current + delta;
                self.store(target, num(updated), env)?;
                Ok(num(if *prefix { updated } else { current }))
            }
        }
    }

    fn store(&mut self, target: &Expr, value: Operand, env: &mut Env) -> Result<(), ScriptError> {
        match target {
            Expr::Ident(name) => env.assign(name, value),
            Expr::Member { object, property } => {
                let base = self.eval(object, env)?;
                let Operand::Object(target) = base else {
                    return Err(ScriptError::Type(format!(
                        "cannot set property '{}' on {}",
                        property,
                        base.describe()
                    )));
                };
                let value = value.into_value(&format!("assignment to '{}'", property))?;
                self.scope.object_mut(target)?.set(property, value)?;
                Ok(())
            }
            _ => Err(ScriptError::Type("invalid assignment target".to_string())),
        }
    }

    fn read_member(&self, base: &Operand, property: &str) -> Result<Operand, ScriptError> {
        match base {
            Operand::Object(target) => Ok(Operand::Value(self.scope.object(*target)?.get(property))),
            Operand::Session => match property {
                "dt" => Ok(num(self.scope.delta_time)),
                "globals" => Ok(Operand::Object(ObjRef::Globals)),
                _ => Err(ScriptError::UnknownProperty(format!("game.{}", property))),
            },
            Operand::Math => match property {
                "PI" => Ok(num(std::f64::consts::PI)),
                "E" => Ok(num(std::f64::consts::E)),
                _ => Err(ScriptError::UnknownProperty(format!("Math.{}", property))),
            },
            Operand::Value(Value::Str(s)) if property == "length" => {
                Ok(num(s.chars().count() as f64))
            }
            other => Err(ScriptError::Type(format!(
                "cannot read property '{}' of {}",
                property,
                other.describe()
            ))),
        }
    }

    fn call(&mut self, base: &Operand, name: &str, args: Vec<Operand>) -> Result<Operand, ScriptError> {
        match base {
            Operand::Object(target) => self.call_method(*target, name, args),
            Operand::Session => self.call_session(name, args),
            Operand::Console => {
                let line = join_args(&args);
                match name {
                    "log" | "info" => log::info!("{}", line),
                    "warn" => log::warn!("{}", line),
                    "error" => log::error!("{}", line),
                    "debug" => log::debug!("{}", line),
                    _ => return Err(ScriptError::UnknownProperty(format!("console.{}", name))),
                }
                Ok(Operand::Value(Value::Null))
            }
            Operand::Math => call_math(name, &args),
            other => Err(ScriptError::Type(format!(
                "cannot call '{}' on {}",
                name,
                other.describe()
            ))),
        }
    }

    fn call_session(&mut self, name: &str, args: Vec<Operand>) -> Result<Operand, ScriptError> {
        let text_arg = |args: &[Operand]| -> Result<String, ScriptError> {
            match args.first() {
                Some(Operand::Value(Value::Str(s))) => Ok(s.clone()),
                other => Err(ScriptError::Type(format!(
                    "game.{} expects a string, got {}",
                    name,
                    other.map_or("nothing", Operand::describe)
                ))),
            }
        };

        match name {
            "get" => {
                let kind = text_arg(&args)?;
                Ok(self
                    .scope
                    .objects
                    .iter()
                    .position(|o| o.kind() == kind)
                    .map_or(Operand::Value(Value::Null), |i| Operand::Object(ObjRef::Object(i))))
            }
            "count" => {
                let kind = text_arg(&args)?;
                let count = self.scope.objects.iter().filter(|o| o.kind() == kind).count();
                Ok(num(count as f64))
            }
            "add" => {
                let kind = text_arg(&args)?;
                if kind.trim().is_empty() {
                    return Err(ScriptError::Type("game.add expects a non-empty type".to_string()));
                }
                self.scope.objects.push(GameObject::new(&kind));
                Ok(Operand::Object(ObjRef::Object(self.scope.objects.len() - 1)))
            }
            "hasSprite" => {
                let name = text_arg(&args)?;
                Ok(Operand::Value(Value::Bool(self.scope.resources.sprite(&name).is_some())))
            }
            "hasSound" => {
                let name = text_arg(&args)?;
                Ok(Operand::Value(Value::Bool(self.scope.resources.sound(&name).is_some())))
            }
            "log" => {
                log::info!("{}", join_args(&args));
                Ok(Operand::Value(Value::Null))
            }
            _ => Err(ScriptError::UnknownProperty(format!("game.{}", name))),
        }
    }
}

fn num(n: f64) -> Operand {
    Operand::Value(Value::Number(n))
}

fn join_args(args: &[Operand]) -> String {
    args.iter()
        .map(|arg| match arg {
            Operand::Value(value) => value.to_string(),
            other => format!("[{}]", other.describe()),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn describe_expr(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => format!("'{}'", name),
        _ => "an expression".to_string(),
    }
}

fn binary(op: BinaryOp, left: Operand, right: Operand) -> Result<Operand, ScriptError> {
    match op {
        BinaryOp::Eq => return Ok(Operand::Value(Value::Bool(left == right))),
        BinaryOp::Ne => return Ok(Operand::Value(Value::Bool(left != right))),
        _ => {}
    }

    let (left, right) = match (left, right) {
        (Operand::Value(l), Operand::Value(r)) => (l, r),
        (l, r) => {
            return Err(ScriptError::Type(format!(
                "operator '{}' cannot combine {} and {}",
                op.symbol(),
                l.describe(),
                r.describe()
            )))
        }
    };

    let result = match (op, &left, &right) {
        (BinaryOp::Add, Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        (BinaryOp::Add, Value::Str(_), _) | (BinaryOp::Add, _, Value::Str(_)) => {
            Value::Str(format!("{}{}", left, right))
        }
        (BinaryOp::Sub, Value::Number(a), Value::Number(b)) => Value::Number(a - b),
        (BinaryOp::Mul, Value::Number(a), Value::Number(b)) => Value::Number(a * b),
        (BinaryOp::Div, Value::Number(a), Value::Number(b)) => Value::Number(a / b),
        (BinaryOp::Rem, Value::Number(a), Value::Number(b)) => Value::Number(a % b),
        (BinaryOp::Lt, Value::Number(a), Value::Number(b)) => Value::Bool(a < b),
        (BinaryOp::Le, Value::Number(a), Value::Number(b)) => Value::Bool(a <= b),
        (BinaryOp::Gt, Value::Number(a), Value::Number(b)) => Value::Bool(a > b),
        (BinaryOp::Ge, Value::Number(a), Value::Number(b)) => Value::Bool(a >= b),
        (BinaryOp::Lt, Value::Str(a), Value::Str(b)) => Value::Bool(a < b),
        (BinaryOp::Le, Value::Str(a), Value::Str(b)) => Value::Bool(a <= b),
        (BinaryOp::Gt, Value::Str(a), Value::Str(b)) => Value::Bool(a > b),
        (BinaryOp::Ge, Value::Str(a), Value::Str(b)) => Value::Bool(a >= b),
        _ => {
            return Err(ScriptError::Type(format!(
                "operator '{}' cannot combine {} and {}",
                op.symbol(),
                left.type_name(),
                right.type_name()
            )))
        }
    };
    Ok(Operand::Value(result))
}

fn call_math(name: &str, args: &[Operand]) -> Result<Operand, ScriptError> {
    let numbers = args
        .iter()
        .map(|arg| arg.number(&format!("Math.{}", name)))
        .collect::<Result<Vec<f64>, _>>()?;
    let arg = |i: usize| numbers.get(i).copied().unwrap_or(f64::NAN);

    let result = match name {
        "abs" => arg(0).abs(),
        "floor" => arg(0).floor(),
        "ceil" => arg(0).ceil(),
        "round" => round_half_up(arg(0)),
        "trunc" => arg(0).trunc(),
        "sign" => {
            let x = arg(0);
            if x == 0.0 || x.is_nan() {
                x
            } else {
                x.signum()
            }
        }
        "sqrt" => arg(0).sqrt(),
        "pow" => arg(0).powf(arg(1)),
        "sin" => arg(0).sin(),
        "cos" => arg(0).cos(),
        "atan2" => arg(0).atan2(arg(1)),
        "hypot" => numbers.iter().map(|n| n * n).sum::<f64>().sqrt(),
        "min" => numbers.iter().copied().fold(f64::INFINITY, f64::min),
        "max" => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        _ => return Err(ScriptError::UnknownProperty(format!("Math.{}", name))),
    };
    Ok(num(result))
}
