//! Tokenizer for Rego source.
//!
//! Keywords are emitted as identifiers; the parser decides where they are
//! reserved. Newlines are kept because they terminate expressions in a body.

use crate::error::{Location, ParseError, ParseResult};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    String(String),
    Number(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Colon,
    Dot,
    Pipe,
    Amp,
    /// `:=`
    Assign,
    /// `=`
    Unify,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Newline,
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier {:?}", name),
            Self::String(value) => format!("string {:?}", value),
            Self::Number(value) => format!("number {}", value),
            Self::Newline => "newline".to_string(),
            Self::Eof => "end of input".to_string(),
            other => format!("{:?}", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Colon => ":",
            Self::Dot => ".",
            Self::Pipe => "|",
            Self::Amp => "&",
            Self::Assign => ":=",
            Self::Unify => "=",
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            _ => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
    /// Whether whitespace separates this token from the previous one.
    pub spaced: bool,
}

/// Split `source` into tokens, always ending with [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> ParseResult<Vec<Token>> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    row: usize,
    col: usize,
    tokens: Vec<Token>,
    spaced: bool,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            row: 1,
            col: 1,
            tokens: Vec::new(),
            spaced: true,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.row += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn here(&self) -> Location {
        Location {
            row: self.row,
            col: self.col,
        }
    }

    fn push(&mut self, kind: TokenKind, location: Location) {
        self.tokens.push(Token {
            kind,
            location,
            spaced: self.spaced,
        });
        self.spaced = false;
    }

    fn run(mut self) -> ParseResult<Vec<Token>> {
        while let Some(&c) = self.chars.peek() {
            let location = self.here();
            match c {
                '\n' => {
                    self.bump();
                    self.push(TokenKind::Newline, location);
                    self.spaced = true;
                }
                c if c.is_whitespace() => {
                    self.bump();
                    self.spaced = true;
                }
                '#' => {
                    while matches!(self.chars.peek(), Some(&c) if c != '\n') {
                        self.bump();
                    }
                    self.spaced = true;
                }
                '"' => {
                    let value = self.quoted_string(location)?;
                    self.push(TokenKind::String(value), location);
                }
                '`' => {
                    let value = self.raw_string(location)?;
                    self.push(TokenKind::String(value), location);
                }
                c if c.is_ascii_digit() => {
                    let value = self.number();
                    self.push(TokenKind::Number(value), location);
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let mut ident = String::new();
                    while let Some(&c) = self.chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            ident.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    self.push(TokenKind::Ident(ident), location);
                }
                _ => {
                    let kind = self.operator(location)?;
                    self.push(kind, location);
                }
            }
        }
        let location = self.here();
        self.push(TokenKind::Eof, location);
        Ok(self.tokens)
    }

    fn operator(&mut self, location: Location) -> ParseResult<TokenKind> {
        let c = self.bump().ok_or(ParseError::UnexpectedEof {
            expected: "token".to_string(),
        })?;
        let next_is_eq = self.chars.peek() == Some(&'=');
        let kind = match c {
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '|' => TokenKind::Pipe,
            '&' => TokenKind::Amp,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            ':' if next_is_eq => {
                self.bump();
                TokenKind::Assign
            }
            ':' => TokenKind::Colon,
            '=' if next_is_eq => {
                self.bump();
                TokenKind::Eq
            }
            '=' => TokenKind::Unify,
            '!' if next_is_eq => {
                self.bump();
                TokenKind::Neq
            }
            '<' if next_is_eq => {
                self.bump();
                TokenKind::Lte
            }
            '<' => TokenKind::Lt,
            '>' if next_is_eq => {
                self.bump();
                TokenKind::Gte
            }
            '>' => TokenKind::Gt,
            found => return Err(ParseError::UnexpectedChar { found, location }),
        };
        Ok(kind)
    }

    fn quoted_string(&mut self, location: Location) -> ParseResult<String> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(ParseError::UnterminatedString { location }),
                Some('"') => return Ok(value),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('u') => {
                            let mut hex = String::new();
                            for _ in 0..4 {
                                match self.bump() {
                                    Some(h) if h.is_ascii_hexdigit() => hex.push(h),
                                    _ => return Err(ParseError::UnterminatedString { location }),
                                }
                            }
                            u32::from_str_radix(&hex, 16)
                                .ok()
                                .and_then(char::from_u32)
                                .unwrap_or('\u{fffd}')
                        }
                        Some(other) => other,
                        None => return Err(ParseError::UnterminatedString { location }),
                    };
                    value.push(escaped);
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn raw_string(&mut self, location: Location) -> ParseResult<String> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(ParseError::UnterminatedString { location }),
                Some('`') => return Ok(value),
                Some(c) => value.push(c),
            }
        }
    }

    fn number(&mut self) -> String {
        let mut value = String::new();
        let mut seen_dot = false;
        let mut seen_exp = false;
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                value.push(c);
            } else if c == '.' && !seen_dot && !seen_exp {
                // `1.foo` is not a number continuation; only accept a digit after the dot.
                let mut lookahead = self.chars.clone();
                lookahead.next();
                if !matches!(lookahead.peek(), Some(d) if d.is_ascii_digit()) {
                    break;
                }
                seen_dot = true;
                value.push(c);
            } else if (c == 'e' || c == 'E') && !seen_exp {
                seen_exp = true;
                value.push(c);
                self.bump();
                if let Some(&sign) = self.chars.peek() {
                    if sign == '+' || sign == '-' {
                        value.push(sign);
                        self.bump();
                    }
                }
                continue;
            } else {
                break;
            }
            self.bump();
        }
        value
    }
}
