//! Tokenizer for filter expressions.

use super::FilterError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    String(String),
    Number(f64),
    True,
    False,
    Null,
    Dot,
    Comma,
    LParen,
    RParen,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Not,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier {}", name),
            Self::String(value) => format!("string {:?}", value),
            Self::Number(value) => format!("number {}", value),
            Self::True => "true".to_string(),
            Self::False => "false".to_string(),
            Self::Null => "null".to_string(),
            Self::Dot => "\".\"".to_string(),
            Self::Comma => "\",\"".to_string(),
            Self::LParen => "\"(\"".to_string(),
            Self::RParen => "\")\"".to_string(),
            Self::Eq => "\"==\"".to_string(),
            Self::Neq => "\"!=\"".to_string(),
            Self::Lt => "\"<\"".to_string(),
            Self::Lte => "\"<=\"".to_string(),
            Self::Gt => "\">\"".to_string(),
            Self::Gte => "\">=\"".to_string(),
            Self::And => "\"&&\"".to_string(),
            Self::Or => "\"||\"".to_string(),
            Self::Not => "\"!\"".to_string(),
        }
    }
}

/// A token and the byte offset it starts at.
pub(crate) type Spanned = (Token, usize);

pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, FilterError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        let next = chars.get(i + 1).map(|(_, c)| *c);

        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '(' => {
                tokens.push((Token::LParen, pos));
                i += 1;
            }
            ')' => {
                tokens.push((Token::RParen, pos));
                i += 1;
            }
            '.' => {
                tokens.push((Token::Dot, pos));
                i += 1;
            }
            ',' => {
                tokens.push((Token::Comma, pos));
                i += 1;
            }
            '=' if next == Some('=') => {
                tokens.push((Token::Eq, pos));
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push((Token::Neq, pos));
                i += 2;
            }
            '!' => {
                tokens.push((Token::Not, pos));
                i += 1;
            }
            '<' if next == Some('=') => {
                tokens.push((Token::Lte, pos));
                i += 2;
            }
            '<' => {
                tokens.push((Token::Lt, pos));
                i += 1;
            }
            '>' if next == Some('=') => {
                tokens.push((Token::Gte, pos));
                i += 2;
            }
            '>' => {
                tokens.push((Token::Gt, pos));
                i += 1;
            }
            '&' if next == Some('&') => {
                tokens.push((Token::And, pos));
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push((Token::Or, pos));
                i += 2;
            }
            '"' | '\'' => {
                let (value, consumed) = read_string(&chars[i..], c, pos)?;
                tokens.push((Token::String(value), pos));
                i += consumed;
            }
            c if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().map(|(_, c)| c).collect();
                let value = text.parse::<f64>().map_err(|_| FilterError {
                    message: format!("invalid number {}", text),
                    position: pos,
                })?;
                tokens.push((Token::Number(value), pos));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_ascii_alphanumeric() || chars[i].1 == '_')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().map(|(_, c)| c).collect();
                let token = match word.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    _ => Token::Ident(word),
                };
                tokens.push((token, pos));
            }
            other => {
                return Err(FilterError {
                    message: format!("unexpected character {:?}", other),
                    position: pos,
                });
            }
        }
    }

    Ok(tokens)
}

/// Read a quoted string starting at `chars[0]`; returns the value and the
/// number of chars consumed including both quotes.
fn read_string(
    chars: &[(usize, char)],
    quote: char,
    start: usize,
) -> Result<(String, usize), FilterError> {
    let mut value = String::new();
    let mut i = 1;

    while i < chars.len() {
        let c = chars[i].1;
        if c == quote {
            return Ok((value, i + 1));
        }
        if c == '\\' {
            let escaped = chars.get(i + 1).map(|(_, c)| *c).ok_or(FilterError {
                message: "unterminated string".to_string(),
                position: start,
            })?;
            value.push(match escaped {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                other => other,
            });
            i += 2;
            continue;
        }
        value.push(c);
        i += 1;
    }

    Err(FilterError {
        message: "unterminated string".to_string(),
        position: start,
    })
}
