//! Expression parsing for templated configuration values.
//!
//! Config values may embed expressions using `${{ ... }}` syntax.
//!
//! # Syntax
//!
//! - `${{ vars.tag }}` - path lookup against the evaluation environment
//!   (roots: `ctx`, `vars`, `outputs`; `.field` and `[index]`/`['key']`
//!   accessors)
//! - `${{ 'text' }}`, `${{ 42 }}`, `${{ true }}`, `${{ null }}` - literals
//! - `${{ quote(vars.replicas) }}` - force the string form of a value
//! - `$${{ escaped }}` - produces literal `${{ escaped }}` in output
//!
//! Parsing and evaluation are split: this module turns a raw string into
//! [`Segment`]s and an expression source into an [`Expr`] tree; the
//! [`render`](crate::config::render) module evaluates trees against an
//! environment and applies the substitution rules.

use serde_json::Value;

use crate::error::{CapstanError, Result};

/// A segment of a templated string.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text
    Literal(String),
    /// Expression source: the text between `${{` and `}}`, trimmed
    Expr(String),
}

/// Parse a string into literal and expression segments.
///
/// Supports:
/// - `${{ expression }}` - expression placeholder
/// - `$${{ ... }}` - literal `${{ ... }}` in output
///
/// A `}}` inside a quoted string literal does not terminate the
/// expression. An unterminated `${{` is kept as literal text.
pub fn parse_segments(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = input;

    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix("$${{") {
            // Escaped: $${{ becomes literal ${{
            literal.push_str("${{");
            rest = stripped;
        } else if let Some(body) = rest.strip_prefix("${{") {
            match find_closing(body) {
                Some(end) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Expr(body[..end].trim().to_string()));
                    rest = &body[end + 2..];
                }
                None => {
                    // Unterminated placeholder: keep as literal text
                    literal.push_str(rest);
                    rest = "";
                }
            }
        } else {
            let c = rest.chars().next().unwrap();
            literal.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    segments
}

/// Byte offset of the closing `}}`, skipping quoted string contents.
fn find_closing(body: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = body.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '}' if matches!(chars.peek(), Some((_, '}'))) => return Some(i),
            _ => {}
        }
    }

    None
}

/// Check if a string contains any expression placeholder.
pub fn has_expressions(input: &str) -> bool {
    parse_segments(input)
        .iter()
        .any(|seg| matches!(seg, Segment::Expr(_)))
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    /// A literal JSON value.
    Literal(Value),
    /// A path rooted at an environment name (`ctx`, `vars`, `outputs`).
    Path(Vec<PathSeg>),
    /// `quote(expr)`: force the string form of the inner value.
    Quote(Box<Expr>),
}

/// One step of a path expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PathSeg {
    /// `.name` or `['name']` access.
    Key(String),
    /// `[n]` sequence access.
    Index(usize),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(serde_json::Number),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
}

/// Parse an expression source string into an [`Expr`] tree.
pub(crate) fn parse_expr(source: &str) -> Result<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        source,
    };
    let expr = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(expr_error(source, "unexpected trailing input"));
    }
    Ok(expr)
}

fn expr_error(source: &str, message: &str) -> CapstanError {
    CapstanError::Expression {
        message: format!("{message} in '{source}'"),
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '\'' | '"' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some((_, c2)) = chars.next() {
                    if c2 == '\\' {
                        match chars.next() {
                            Some((_, escaped)) => text.push(escaped),
                            None => break,
                        }
                    } else if c2 == c {
                        closed = true;
                        break;
                    } else {
                        text.push(c2);
                    }
                }
                if !closed {
                    return Err(expr_error(source, "unterminated string literal"));
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut end = start;
                while let Some(&(i, c2)) = chars.peek() {
                    if c2.is_ascii_digit()
                        || matches!(c2, '.' | 'e' | 'E' | '+' | '-')
                    {
                        end = i + c2.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &source[start..end];
                let number: serde_json::Number = text
                    .parse()
                    .map_err(|_| expr_error(source, "invalid number literal"))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(i, c2)) = chars.peek() {
                    if c2.is_ascii_alphanumeric() || c2 == '_' {
                        end = i + c2.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(source[start..end].to_string()));
            }
            other => {
                return Err(expr_error(source, &format!("unexpected character '{other}'")));
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<()> {
        match self.next() {
            Some(ref token) if token == expected => Ok(()),
            _ => Err(expr_error(self.source, &format!("expected {what}"))),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Str(text)) => Ok(Expr::Literal(Value::String(text))),
            Some(Token::Number(number)) => Ok(Expr::Literal(Value::Number(number))),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                "quote" if matches!(self.peek(), Some(Token::LParen)) => {
                    self.next();
                    let inner = self.parse_expr()?;
                    self.expect(&Token::RParen, "')' after quote argument")?;
                    Ok(Expr::Quote(Box::new(inner)))
                }
                _ => self.parse_path(name),
            },
            _ => Err(expr_error(self.source, "expected an expression")),
        }
    }

    fn parse_path(&mut self, root: String) -> Result<Expr> {
        let mut segments = vec![PathSeg::Key(root)];

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.next();
                    match self.next() {
                        Some(Token::Ident(name)) => segments.push(PathSeg::Key(name)),
                        _ => return Err(expr_error(self.source, "expected field name after '.'")),
                    }
                }
                Some(Token::LBracket) => {
                    self.next();
                    match self.next() {
                        Some(Token::Str(key)) => segments.push(PathSeg::Key(key)),
                        Some(Token::Number(number)) => {
                            let index = number
                                .as_u64()
                                .ok_or_else(|| {
                                    expr_error(self.source, "sequence index must be a non-negative integer")
                                })?;
                            segments.push(PathSeg::Index(index as usize));
                        }
                        _ => {
                            return Err(expr_error(
                                self.source,
                                "expected a string key or integer index inside '[]'",
                            ))
                        }
                    }
                    self.expect(&Token::RBracket, "']'")?;
                }
                _ => break,
            }
        }

        Ok(Expr::Path(segments))
    }
}
