//! Recursive-descent parser for filter expressions.

use serde_json::Value;

use super::lexer::{Spanned, Token};
use super::{CompareOp, Expr, FilterError, Function, Operand};

pub(crate) fn parse(tokens: Vec<Spanned>, end: usize) -> Result<Expr, FilterError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        end,
    };
    if parser.tokens.is_empty() {
        return Err(FilterError {
            message: "empty filter".to_string(),
            position: 0,
        });
    }

    let expr = parser.parse_or()?;
    if let Some((token, position)) = parser.tokens.get(parser.pos) {
        return Err(FilterError {
            message: format!("unexpected {}", token.describe()),
            position: *position,
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map(|(_, p)| *p).unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        token
    }

    fn error(&self, expected: &str) -> FilterError {
        let found = self
            .peek()
            .map(Token::describe)
            .unwrap_or_else(|| "end of filter".to_string());
        FilterError {
            message: format!("unexpected {}, expected {}", found, expected),
            position: self.position(),
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), FilterError> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, FilterError> {
        match self.peek() {
            Some(Token::Not) => {
                self.pos += 1;
                Ok(Expr::Not(Box::new(self.parse_unary()?)))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "\")\"")?;
                Ok(inner)
            }
            _ => self.parse_test(),
        }
    }

    fn parse_test(&mut self) -> Result<Expr, FilterError> {
        let left = match self.peek() {
            Some(Token::Ident(_)) => {
                let (field, call) = self.parse_path()?;
                if let Some(function) = call {
                    return self.parse_call(field, function);
                }
                Operand::Field(field)
            }
            _ => self.parse_literal()?,
        };

        let op = match self.peek() {
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::Neq) => CompareOp::Neq,
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Lte) => CompareOp::Lte,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Gte) => CompareOp::Gte,
            _ => {
                return match left {
                    Operand::Field(_) => Ok(Expr::Truthy(left)),
                    Operand::Literal(_) => Err(self.error("comparison operator")),
                };
            }
        };
        self.pos += 1;

        let right = match self.peek() {
            Some(Token::Ident(_)) => {
                let (field, call) = self.parse_path()?;
                if call.is_some() {
                    return Err(self.error("field or literal"));
                }
                Operand::Field(field)
            }
            _ => self.parse_literal()?,
        };

        Ok(Expr::Compare { left, op, right })
    }

    /// Parse `a.b.c`, stopping before `.startsWith(` / `.contains(`.
    fn parse_path(&mut self) -> Result<(Vec<String>, Option<Function>), FilterError> {
        let mut segments = Vec::new();
        match self.advance() {
            Some(Token::Ident(name)) => segments.push(name),
            _ => return Err(self.error("field")),
        }

        while self.peek() == Some(&Token::Dot) {
            let name = match self.peek_at(1) {
                Some(Token::Ident(name)) => name.clone(),
                _ => {
                    self.pos += 1;
                    return Err(self.error("field"));
                }
            };
            if self.peek_at(2) == Some(&Token::LParen) {
                let function = Function::from_name(&name).ok_or_else(|| FilterError {
                    message: format!("unknown function {}", name),
                    position: self.tokens[self.pos + 1].1,
                })?;
                self.pos += 3;
                return Ok((segments, Some(function)));
            }
            self.pos += 2;
            segments.push(name);
        }

        Ok((segments, None))
    }

    fn parse_call(&mut self, field: Vec<String>, function: Function) -> Result<Expr, FilterError> {
        let argument = match self.advance() {
            Some(Token::String(value)) => value,
            _ => {
                self.pos -= 1;
                return Err(self.error("string argument"));
            }
        };
        self.expect(Token::RParen, "\")\"")?;
        Ok(Expr::Call {
            field,
            function,
            argument,
        })
    }

    fn parse_literal(&mut self) -> Result<Operand, FilterError> {
        let value = match self.peek() {
            Some(Token::String(s)) => Value::String(s.clone()),
            Some(Token::Number(n)) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .ok_or_else(|| self.error("finite number"))?,
            Some(Token::True) => Value::Bool(true),
            Some(Token::False) => Value::Bool(false),
            Some(Token::Null) => Value::Null,
            _ => return Err(self.error("field or literal")),
        };
        self.pos += 1;
        Ok(Operand::Literal(value))
    }
}
