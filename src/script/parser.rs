// Recursive-descent parser for method logic

use super::ast::{BinaryOp, Expr, Program, Stmt, UnaryOp};
use super::lexer::{Spanned, Token, KEYWORDS};
use super::ScriptError;
use crate::object::Value;

/// Deepest nesting of statements and expressions a method body may use
pub(crate) const MAX_NESTING: usize = 128;

pub(crate) fn parse_program(tokens: Vec<Spanned>) -> Result<Program, ScriptError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let mut body = Vec::new();
    while !parser.at_eof() {
        body.push(parser.statement()?);
    }
    Ok(Program { body })
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn check(&self, punct: &str) -> bool {
        matches!(self.peek(), Token::Punct(p) if *p == punct)
    }

    fn check_word(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Ident(w) if w == word)
    }

    fn eat(&mut self, punct: &str) -> bool {
        if self.check(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.check_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), ScriptError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", punct)))
        }
    }

    fn error(&self, message: String) -> ScriptError {
        let spanned = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        let found = match &spanned.token {
            Token::Number(n) => format!("number {}", n),
            Token::Str(s) => format!("string {:?}", s),
            Token::Ident(name) => format!("'{}'", name),
            Token::Punct(p) => format!("'{}'", p),
            Token::Eof => "end of input".to_string(),
        };
        ScriptError::Syntax {
            line: spanned.line,
            column: spanned.column,
            message: format!("{}, found {}", message, found),
        }
    }

    /// Enter one nesting level. Callers restore `depth` once the level is built.
    fn nest(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("nesting too deep".to_string()));
        }
        Ok(())
    }

    fn nested<T>(&mut self, f: fn(&mut Self) -> Result<T, ScriptError>) -> Result<T, ScriptError> {
        self.nest()?;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn binding_name(&mut self) -> Result<String, ScriptError> {
        match self.peek() {
            Token::Ident(name) if !KEYWORDS.contains(&name.as_str()) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("expected a variable name".to_string())),
        }
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        self.nested(Self::statement_body)
    }

    fn statement_body(&mut self) -> Result<Stmt, ScriptError> {
        if self.eat(";") {
            return Ok(Stmt::Empty);
        }
        if self.eat("{") {
            return self.block();
        }
        if self.eat_word("if") {
            self.expect("(")?;
            let cond = self.expression()?;
            self.expect(")")?;
            let then = Box::new(self.statement()?);
            let otherwise = if self.eat_word("else") {
                Some(Box::new(self.statement()?))
            } else {
                None
            };
            return Ok(Stmt::If {
                cond,
                then,
                otherwise,
            });
        }
        if self.eat_word("while") {
            self.expect("(")?;
            let cond = self.expression()?;
            self.expect(")")?;
            let body = Box::new(self.statement()?);
            return Ok(Stmt::While { cond, body });
        }
        if self.eat_word("for") {
            return self.for_statement();
        }
        if self.eat_word("return") {
            let value = if self.check(";") || self.check("}") || self.at_eof() {
                None
            } else {
                Some(self.expression()?)
            };
            self.eat(";");
            return Ok(Stmt::Return(value));
        }
        if self.check_word("let") || self.check_word("var") || self.check_word("const") {
            let stmt = self.declaration()?;
            self.eat(";");
            return Ok(stmt);
        }

        let expr = self.expression()?;
        self.eat(";");
        Ok(Stmt::Expr(expr))
    }

    fn block(&mut self) -> Result<Stmt, ScriptError> {
        let mut body = Vec::new();
        while !self.check("}") {
            if self.at_eof() {
                return Err(self.error("expected '}'".to_string()));
            }
            body.push(self.statement()?);
        }
        self.advance();
        Ok(Stmt::Block(body))
    }

    fn declaration(&mut self) -> Result<Stmt, ScriptError> {
        let constant = self.check_word("const");
        self.advance();
        let name = self.binding_name()?;
        let init = if self.eat("=") {
            Some(self.expression()?)
        } else if constant {
            return Err(self.error(format!("missing initializer for const '{}'", name)));
        } else {
            None
        };
        Ok(Stmt::Let {
            name,
            init,
            constant,
        })
    }

    fn for_statement(&mut self) -> Result<Stmt, ScriptError> {
        self.expect("(")?;
        let init = if self.eat(";") {
            None
        } else {
            let stmt = if self.check_word("let") || self.check_word("var") || self.check_word("const") {
                self.declaration()?
            } else {
                Stmt::Expr(self.expression()?)
            };
            self.expect(";")?;
            Some(Box::new(stmt))
        };
        let cond = if self.check(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(";")?;
        let step = if self.check(")") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(")")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
        })
    }

    // ---------------------------------------------------------------
    // Expressions, lowest precedence first
    // ---------------------------------------------------------------

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.nested(Self::assignment)
    }

    fn assignment(&mut self) -> Result<Expr, ScriptError> {
        let target = self.conditional()?;

        let op = match self.peek() {
            Token::Punct("=") => None,
            Token::Punct("+=") => Some(BinaryOp::Add),
            Token::Punct("-=") => Some(BinaryOp::Sub),
            Token::Punct("*=") => Some(BinaryOp::Mul),
            Token::Punct("/=") => Some(BinaryOp::Div),
            Token::Punct("%=") => Some(BinaryOp::Rem),
            _ => return Ok(target),
        };
        if !is_assignable(&target) {
            return Err(self.error("invalid assignment target".to_string()));
        }
        self.advance();
        let value = self.expression()?;
        Ok(Expr::Assign {
            target: Box::new(target),
            op,
            value: Box::new(value),
        })
    }

    fn conditional(&mut self) -> Result<Expr, ScriptError> {
        let cond = self.logical_or()?;
        if !self.eat("?") {
            return Ok(cond);
        }
        let then = self.expression()?;
        self.expect(":")?;
        let otherwise = self.expression()?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn logical_or(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.logical_and()?;
        let outer = self.depth;
        while self.eat("||") {
            self.nest()?;
            let right = self.logical_and()?;
            left = Expr::Logical {
                and: false,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = outer;
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.equality()?;
        let outer = self.depth;
        while self.eat("&&") {
            self.nest()?;
            let right = self.equality()?;
            left = Expr::Logical {
                and: true,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = outer;
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(
            &[
                ("===", BinaryOp::Eq),
                ("!==", BinaryOp::Ne),
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::Ne),
            ],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(
            &[
                ("<=", BinaryOp::Le),
                (">=", BinaryOp::Ge),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(
            &[
                ("*", BinaryOp::Mul),
                ("/", BinaryOp::Div),
                ("%", BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn binary_level(
        &mut self,
        ops: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, ScriptError>,
    ) -> Result<Expr, ScriptError> {
        let mut left = next(self)?;
        let outer = self.depth;
        'outer: loop {
            for (punct, op) in ops {
                if self.eat(punct) {
                    self.nest()?;
                    let right = next(self)?;
                    left = Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            self.depth = outer;
            return Ok(left);
        }
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        let op = if self.eat("!") {
            UnaryOp::Not
        } else if self.eat("-") {
            UnaryOp::Neg
        } else if self.eat("+") {
            UnaryOp::Plus
        } else if self.check("++") || self.check("--") {
            let delta = if self.eat("++") { 1.0 } else { self.advance(); -1.0 };
            let target = self.nested(Self::unary)?;
            if !is_assignable(&target) {
                return Err(self.error("invalid increment target".to_string()));
            }
            return Ok(Expr::Update {
                target: Box::new(target),
                delta,
                prefix: true,
            });
        } else {
            return self.postfix();
        };

        let operand = self.nested(Self::unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let expr = self.call_or_member()?;
        let delta = if self.check("++") {
            1.0
        } else if self.check("--") {
            -1.0
        } else {
            return Ok(expr);
        };
        if !is_assignable(&expr) {
            return Err(self.error("invalid increment target".to_string()));
        }
        self.advance();
        Ok(Expr::Update {
            target: Box::new(expr),
            delta,
            prefix: false,
        })
    }

    fn call_or_member(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.primary()?;
        let outer = self.depth;
        loop {
            if self.check(".") || self.check("(") {
                self.nest()?;
            }
            if self.eat(".") {
                let property = match self.peek() {
                    Token::Ident(name) => name.clone(),
                    _ => return Err(self.error("expected a property name after '.'".to_string())),
                };
                self.advance();
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat("(") {
                let mut args = Vec::new();
                if !self.check(")") {
                    loop {
                        args.push(self.expression()?);
                        if !self.eat(",") {
                            break;
                        }
                    }
                }
                self.expect(")")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                self.depth = outer;
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Value::Number(n)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::Str(s)))
            }
            Token::Ident(word) => {
                let expr = match word.as_str() {
                    "true" => Expr::Literal(Value::Bool(true)),
                    "false" => Expr::Literal(Value::Bool(false)),
                    "null" => Expr::Literal(Value::Null),
                    "this" => Expr::This,
                    w if KEYWORDS.contains(&w) => {
                        return Err(self.error("unexpected keyword".to_string()))
                    }
                    _ => Expr::Ident(word),
                };
                self.advance();
                Ok(expr)
            }
            Token::Punct("(") => {
                self.advance();
                let expr = self.expression()?;
                self.expect(")")?;
                Ok(expr)
            }
            _ => Err(self.error("expected an expression".to_string())),
        }
    }
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(expr, Expr::Ident(_) | Expr::Member { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::lexer::tokenize;

    fn parse(src: &str) -> Result<Program, ScriptError> {
        parse_program(tokenize(src)?)
    }

    fn single_expr(src: &str) -> Expr {
        match parse(src).unwrap().body.into_iter().next() {
            Some(Stmt::Expr(expr)) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = single_expr("1 + 2 * 3");
        let Expr::Binary { op, right, .. } = expr else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_compound_assignment_on_member() {
        let expr = single_expr("this.x += dx");
        let Expr::Assign { target, op, .. } = expr else {
            panic!("expected assignment");
        };
        assert_eq!(op, Some(BinaryOp::Add));
        assert!(matches!(*target, Expr::Member { ref property, .. } if property == "x"));
    }

    #[test]
    fn test_statements() {
        let program = parse(
            "let speed = 2; const g = 9.8;
             if (this.x > 10) { this.x = 10; } else this.x++;
             for (let i = 0; i < 3; i++) { speed += i }
             while (false) ;
             return speed",
        )
        .unwrap();
        assert_eq!(program.body.len(), 6);
        assert!(matches!(program.body[2], Stmt::If { otherwise: Some(_), .. }));
        assert!(matches!(program.body[3], Stmt::For { .. }));
        assert!(matches!(program.body[5], Stmt::Return(Some(_))));
    }

    #[test]
    fn test_method_call_chain() {
        let expr = single_expr("game.get('PLAYER').move(1, 2)");
        let Expr::Call { callee, args } = expr else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 2);
        assert!(matches!(*callee, Expr::Member { ref property, .. } if property == "move"));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse("this.x += ;"), Err(ScriptError::Syntax { .. })));
        assert!(matches!(parse("1 = 2"), Err(ScriptError::Syntax { .. })));
        assert!(matches!(parse("let if = 1"), Err(ScriptError::Syntax { .. })));
        assert!(matches!(parse("const c;"), Err(ScriptError::Syntax { .. })));
        assert!(matches!(parse("{ x = 1"), Err(ScriptError::Syntax { .. })));
        assert!(matches!(parse("f(1, 2"), Err(ScriptError::Syntax { .. })));
    }

    #[test]
    fn test_error_reports_found_token() {
        let err = parse("x = ;").unwrap_err();
        assert_eq!(
            err,
            ScriptError::Syntax {
                line: 1,
                column: 5,
                message: "expected an expression, found ';'".into()
            }
        );
    }

    fn assert_too_deep(src: &str) {
        match parse(src) {
            Err(ScriptError::Syntax { message, .. }) => {
                assert!(message.contains("nesting too deep"), "{}", message)
            }
            other => panic!("expected a nesting error, got {:?}", other),
        }
    }

    #[test]
    fn test_deep_nesting_is_a_syntax_error() {
        let n = 50_000;
        assert_too_deep(&format!("this.x = {}1{};", "(".repeat(n), ")".repeat(n)));
        assert_too_deep(&format!("let a = {}true;", "!".repeat(n)));
        assert_too_deep(&format!("let a = {}1;", "- ".repeat(n)));
        assert_too_deep(&format!("{}{}", "{".repeat(n), "}".repeat(n)));
        assert_too_deep(&format!("let a = 1{};", " + 1".repeat(n)));
        assert_too_deep(&format!("let a = b{};", ".c".repeat(n)));
        assert_too_deep(&format!("a{};", " = a".repeat(n)));
    }

    #[test]
    fn test_ordinary_nesting_is_accepted() {
        let depth = 20;
        let src = format!(
            "if (true) {{ this.x = {}1{} + a.b.c(2); }}",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        assert!(parse(&src).is_ok());
        assert!(parse(&format!("let a = 1{};", " + 1".repeat(60))).is_ok());
    }
}
