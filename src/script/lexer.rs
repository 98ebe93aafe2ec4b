// Tokenizer for method logic text

use super::ScriptError;

/// Words that cannot be used as variable or parameter names
pub(crate) const KEYWORDS: &[&str] = &[
    "let", "var", "const", "if", "else", "while", "for", "return", "true", "false", "null", "this",
];

/// Punctuators, longest first so greedy matching works
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=",
    "+", "-", "*", "/", "%", "<", ">", "=", "!", "?", ":", ".", ",", ";", "(", ")", "{", "}",
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

/// Split logic text into tokens, ending with `Token::Eof`
pub(crate) fn tokenize(src: &str) -> Result<Vec<Spanned>, ScriptError> {
    let mut lexer = Lexer {
        chars: src.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
    };
    let mut tokens = Vec::new();

    loop {
        lexer.skip_trivia()?;
        let (line, column) = (lexer.line, lexer.column);
        let Some(c) = lexer.peek() else {
            tokens.push(Spanned {
                token: Token::Eof,
                line,
                column,
            });
            return Ok(tokens);
        };

        let token = if c.is_ascii_digit() || (c == '.' && lexer.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
            lexer.number()?
        } else if c == '"' || c == '\'' {
            lexer.string(c)?
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            Token::Ident(lexer.identifier())
        } else {
            lexer.punctuator()?
        };

        tokens.push(Spanned {
            token,
            line,
            column,
        });
    }
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Syntax {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn skip_trivia(&mut self) -> Result<(), ScriptError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => return Err(self.error("unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn number(&mut self) -> Result<Token, ScriptError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some('+' | '-')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..=sign {
                    self.bump();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        if self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            return Err(self.error(format!("invalid number literal starting with {:?}", text)));
        }
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| self.error(format!("invalid number literal {:?}", text)))
    }

    fn string(&mut self, quote: char) -> Result<Token, ScriptError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(Token::Str(out)),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some(c) => c,
                        None => return Err(self.error("unterminated string literal")),
                    };
                    out.push(escaped);
                }
                Some('\n') | None => return Err(self.error("unterminated string literal")),
                Some(c) => out.push(c),
            }
        }
    }

    fn identifier(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                out.push(c);
                self.bump();
            } else {
                break;
            }
        }
        out
    }

    fn punctuator(&mut self) -> Result<Token, ScriptError> {
        for &punct in PUNCTUATORS {
            let matches = punct
                .chars()
                .enumerate()
                .all(|(i, c)| self.peek_at(i) == Some(c));
            if matches {
                for _ in 0..punct.len() {
                    self.bump();
                }
                return Ok(Token::Punct(punct));
            }
        }
        let c = self.peek().unwrap_or_default();
        Err(self.error(format!("unexpected character {:?}", c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_tokenize_statement() {
        assert_eq!(
            tokens("this.x += dx;"),
            vec![
                Token::Ident("this".into()),
                Token::Punct("."),
                Token::Ident("x".into()),
                Token::Punct("+="),
                Token::Ident("dx".into()),
                Token::Punct(";"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("1 2.5 .5 1e3 2E-2"),
            vec![
                Token::Number(1.0),
                Token::Number(2.5),
                Token::Number(0.5),
                Token::Number(1000.0),
                Token::Number(0.02),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            tokens(r#"'it\'s' "a\"b\n""#),
            vec![
                Token::Str("it's".into()),
                Token::Str("a\"b\n".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_longest_punctuator_wins() {
        assert_eq!(
            tokens("a === b !== c"),
            vec![
                Token::Ident("a".into()),
                Token::Punct("==="),
                Token::Ident("b".into()),
                Token::Punct("!=="),
                Token::Ident("c".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            tokens("a // line\n /* block\n */ b"),
            vec![Token::Ident("a".into()), Token::Ident("b".into()), Token::Eof]
        );
    }

    #[test]
    fn test_errors_carry_position() {
        let err = tokenize("x = 1;\ny = @;").unwrap_err();
        assert_eq!(
            err,
            ScriptError::Syntax {
                line: 2,
                column: 5,
                message: "unexpected character '@'".into()
            }
        );
        assert!(tokenize("'open").is_err());
        assert!(tokenize("/* open").is_err());
        assert!(tokenize("12abc").is_err());
    }
}
