//! Recursive-descent parser for guard expressions
//!
//! ```text
//! expr    := and ('||' and)*
//! and     := unary ('&&' unary)*
//! unary   := '!' unary | primary
//! primary := '(' expr ')' | $ph ['instanceof' Type['[]']] | name ['(' args ')']
//! ```
//!
//! Parsing is a pure function: the cursor lives on the stack of a single
//! [`parse_guard`] call.

use thiserror::Error;

use super::expr::GuardExpression;

/// Guard syntax errors. Positions are 0-based character offsets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("guard expression is empty")]
    Empty,

    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedChar { position: usize, found: char },

    #[error("unexpected trailing input '{found}' at position {position}")]
    TrailingInput { position: usize, found: char },

    #[error("unexpected end of input at position {position}")]
    UnexpectedEnd { position: usize },

    #[error("expected '{expected}' at position {position}")]
    Expected { position: usize, expected: char },

    #[error("unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },
}

impl SyntaxError {
    pub fn position(&self) -> Option<usize> {
        match self {
            SyntaxError::Empty => None,
            SyntaxError::UnexpectedChar { position, .. }
            | SyntaxError::TrailingInput { position, .. }
            | SyntaxError::UnexpectedEnd { position }
            | SyntaxError::Expected { position, .. }
            | SyntaxError::UnterminatedString { position } => Some(*position),
        }
    }
}

/// Parse guard text. The whole input must be consumed.
pub fn parse_guard(text: &str) -> Result<GuardExpression, SyntaxError> {
    if text.trim().is_empty() {
        return Err(SyntaxError::Empty);
    }
    let mut cursor = Cursor {
        chars: text.chars().collect(),
        pos: 0,
    };
    let expr = cursor.parse_or()?;
    cursor.skip_whitespace();
    match cursor.peek() {
        None => Ok(expr),
        Some(found) => Err(SyntaxError::TrailingInput {
            position: cursor.pos,
            found,
        }),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        let len = token.chars().count();
        let matches = self
            .chars
            .get(self.pos..self.pos + len)
            .is_some_and(|window| window.iter().copied().eq(token.chars()));
        if matches {
            self.pos += len;
        }
        matches
    }

    /// Keyword that is not the prefix of a longer identifier
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let start = self.pos;
        if !self.eat(keyword) {
            return false;
        }
        if self.peek().is_some_and(|c| is_ident_part(c) || c == '$') {
            self.pos = start;
            return false;
        }
        true
    }

    fn expect(&mut self, expected: char) -> Result<(), SyntaxError> {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(SyntaxError::Expected {
                position: self.pos,
                expected,
            })
        }
    }

    fn unexpected(&self) -> SyntaxError {
        match self.peek() {
            Some(found) => SyntaxError::UnexpectedChar {
                position: self.pos,
                found,
            },
            None => SyntaxError::UnexpectedEnd { position: self.pos },
        }
    }

    fn parse_or(&mut self) -> Result<GuardExpression, SyntaxError> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_whitespace();
            if !self.eat("||") {
                return Ok(left);
            }
            let right = self.parse_and()?;
            left = GuardExpression::or(left, right);
        }
    }

    fn parse_and(&mut self) -> Result<GuardExpression, SyntaxError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            if !self.eat("&&") {
                return Ok(left);
            }
            let right = self.parse_unary()?;
            left = GuardExpression::and(left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<GuardExpression, SyntaxError> {
        self.skip_whitespace();
        if self.peek() == Some('!') {
            self.pos += 1;
            let operand = self.parse_unary()?;
            return Ok(GuardExpression::not(operand));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<GuardExpression, SyntaxError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(SyntaxError::UnexpectedEnd { position: self.pos }),
            Some('(') => {
                self.pos += 1;
                let inner = self.parse_or()?;
                self.expect(')')?;
                Ok(inner)
            }
            Some('$') => self.parse_placeholder_form(),
            Some(c) if is_ident_start(c) => self.parse_call(),
            Some(_) => Err(self.unexpected()),
        }
    }

    fn parse_placeholder_form(&mut self) -> Result<GuardExpression, SyntaxError> {
        let placeholder = self.read_placeholder()?;
        let before_keyword = self.pos;
        self.skip_whitespace();
        if !self.eat_keyword("instanceof") {
            self.pos = before_keyword;
            return Ok(GuardExpression::call("matchesAny", [placeholder]));
        }
        self.skip_whitespace();
        let mut type_name = match self.peek() {
            Some(c) if is_ident_start(c) => self.read_qualified_name(),
            _ => return Err(self.unexpected()),
        };
        if self.eat("[]") {
            type_name.push_str("[]");
        }
        Ok(GuardExpression::call("instanceof", [placeholder, type_name]))
    }

    fn parse_call(&mut self) -> Result<GuardExpression, SyntaxError> {
        let name = self.read_qualified_name();
        let after_name = self.pos;
        self.skip_whitespace();
        if self.peek() != Some('(') {
            self.pos = after_name;
            return Ok(GuardExpression::call(name, Vec::<String>::new()));
        }
        self.pos += 1;
        let args = self.parse_args()?;
        self.expect(')')?;
        Ok(GuardExpression::FunctionCall { name, args })
    }

    fn parse_args(&mut self) -> Result<Vec<String>, SyntaxError> {
        let mut args = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(')') {
            return Ok(args);
        }
        loop {
            args.push(self.parse_arg()?);
            self.skip_whitespace();
            if self.peek() == Some(',') {
                self.pos += 1;
            } else {
                return Ok(args);
            }
        }
    }

    fn parse_arg(&mut self) -> Result<String, SyntaxError> {
        self.skip_whitespace();
        match self.peek() {
            Some('"') => self.read_string(),
            Some('$') => self.read_placeholder(),
            Some(c) if c.is_ascii_digit() => Ok(self.read_number()),
            Some(c) if is_ident_start(c) => Ok(self.read_qualified_name()),
            _ => Err(self.unexpected()),
        }
    }

    /// `$name` or `$name$`
    fn read_placeholder(&mut self) -> Result<String, SyntaxError> {
        let start = self.pos;
        self.pos += 1;
        if !self.peek().is_some_and(is_ident_part) {
            return Err(self.unexpected());
        }
        while self.peek().is_some_and(is_ident_part) {
            self.pos += 1;
        }
        if self.peek() == Some('$') {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    /// Identifier, possibly dotted (`java.util.List`)
    fn read_qualified_name(&mut self) -> String {
        let start = self.pos;
        loop {
            while self.peek().is_some_and(is_ident_part) {
                self.pos += 1;
            }
            if self.peek() == Some('.') && self.peek_at(1).is_some_and(is_ident_start) {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn read_number(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Double-quoted literal, quotes kept. Only `\"` is unescaped.
    fn read_string(&mut self) -> Result<String, SyntaxError> {
        let start = self.pos;
        let mut value = String::from('"');
        self.pos += 1;
        loop {
            match self.peek() {
                None => return Err(SyntaxError::UnterminatedString { position: start }),
                Some('"') => {
                    self.pos += 1;
                    value.push('"');
                    return Ok(value);
                }
                Some('\\') => match self.peek_at(1) {
                    Some('"') => {
                        value.push('"');
                        self.pos += 2;
                    }
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                        self.pos += 2;
                    }
                    None => return Err(SyntaxError::UnterminatedString { position: start }),
                },
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }
    }
}
