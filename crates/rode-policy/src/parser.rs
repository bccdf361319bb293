//! Recursive-descent parser producing a [`Module`].
//!
//! Newline handling follows Rego: inside a query body a newline ends an
//! expression, inside `()`, `[]` and collection literals it is whitespace.

use crate::ast::{
    BinOp, Body, ElseClause, Expr, ExprKind, Import, Module, Package, RefArg, Rule, RuleHead,
    RuleKind, Term, With,
};
use crate::error::{Location, ParseError, ParseResult};
use crate::lexer::{tokenize, Token, TokenKind};

const KEYWORDS: &[&str] = &[
    "package", "import", "as", "default", "not", "with", "some", "every", "if", "contains",
    "else", "in",
];

/// Deepest nesting of terms and bodies a module may use. Deeper input is
/// rejected before it reaches the engine, whose parser is exponential in
/// bracket depth.
pub const MAX_NESTING_DEPTH: usize = 16;

/// Parse a complete Rego module.
pub fn parse_module(source: &str) -> ParseResult<Module> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).module()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    newline_significant: Vec<bool>,
    union_allowed: bool,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            newline_significant: vec![false],
            union_allowed: true,
            depth: 0,
        }
    }

    // --- token plumbing -------------------------------------------------

    fn skip_insignificant(&mut self) {
        if !self.newline_significant.last().copied().unwrap_or(false) {
            self.skip_newlines();
        }
    }

    fn skip_newlines(&mut self) {
        while self.tokens[self.pos].kind == TokenKind::Newline {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> &Token {
        self.skip_insignificant();
        &self.tokens[self.pos]
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.peek().kind.clone()
    }

    fn advance(&mut self) -> Token {
        self.skip_insignificant();
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at(&mut self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn at_tight(&mut self, kind: &TokenKind) -> bool {
        let token = self.peek();
        &token.kind == kind && !token.spaced
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_keyword(&mut self, keyword: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(name) if name == keyword)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&mut self, expected: &str) -> ParseError {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Eof => ParseError::UnexpectedEof {
                expected: expected.to_string(),
            },
            kind => ParseError::UnexpectedToken {
                found: kind.describe(),
                expected: expected.to_string(),
                location: token.location,
            },
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> ParseResult<Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("keyword {:?}", keyword)))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> ParseResult<(String, Location)> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Ident(name) if !KEYWORDS.contains(&name.as_str()) => {
                self.advance();
                Ok((name, token.location))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn with_newlines<T>(
        &mut self,
        significant: bool,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        self.newline_significant.push(significant);
        let result = f(self);
        self.newline_significant.pop();
        result
    }

    fn with_union<T>(
        &mut self,
        allowed: bool,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let saved = std::mem::replace(&mut self.union_allowed, allowed);
        let result = f(self);
        self.union_allowed = saved;
        result
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            let location = self.peek().location;
            return Err(ParseError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
                location,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // --- module level ---------------------------------------------------

    fn module(mut self) -> ParseResult<Module> {
        self.skip_newlines();
        if !self.at_keyword("package") {
            return Err(ParseError::MissingPackage);
        }
        let package = self.package()?;

        let mut imports = Vec::new();
        loop {
            self.skip_newlines();
            if !self.at_keyword("import") {
                break;
            }
            imports.push(self.import()?);
        }

        let mut rules = Vec::new();
        loop {
            self.skip_newlines();
            while self.eat(&TokenKind::Semicolon) {
                self.skip_newlines();
            }
            if self.at(&TokenKind::Eof) {
                break;
            }
            rules.push(self.rule()?);
        }

        Ok(Module {
            package,
            imports,
            rules,
        })
    }

    fn package(&mut self) -> ParseResult<Package> {
        let location = self.advance().location;
        let (first, _) = self.expect_ident("package name")?;
        let mut path = vec![first];
        loop {
            if self.at_tight(&TokenKind::Dot) {
                self.advance();
                let (segment, _) = self.expect_ident("package path segment")?;
                path.push(segment);
            } else if self.at_tight(&TokenKind::LBracket) {
                self.advance();
                match self.advance().kind {
                    TokenKind::String(segment) => path.push(segment),
                    _ => return Err(self.unexpected("string path segment")),
                }
                self.expect(&TokenKind::RBracket, "\"]\"")?;
            } else {
                break;
            }
        }
        Ok(Package { path, location })
    }

    fn import(&mut self) -> ParseResult<Import> {
        let location = self.advance().location;
        let path = self.primary()?;
        let alias = if self.eat_keyword("as") {
            Some(self.expect_ident("import alias")?.0)
        } else {
            None
        };
        Ok(Import {
            path,
            alias,
            location,
        })
    }

    fn rule(&mut self) -> ParseResult<Rule> {
        let location = self.peek().location;
        let default = self.eat_keyword("default");
        let (name, _) = self.expect_ident("rule name")?;

        let mut head = RuleHead {
            name,
            kind: RuleKind::Complete,
            args: Vec::new(),
            key: None,
            value: None,
            assign: false,
        };

        if self.at_tight(&TokenKind::LParen) {
            self.advance();
            head.args = self.term_list(&TokenKind::RParen, "\")\"")?;
            head.kind = RuleKind::Function;
        } else if self.at_tight(&TokenKind::LBracket) {
            self.advance();
            let key = self.with_newlines(false, |p| p.binary(0))?;
            self.expect(&TokenKind::RBracket, "\"]\"")?;
            head.key = Some(key);
            head.kind = RuleKind::PartialSet;
        } else if self.eat_keyword("contains") {
            head.key = Some(self.binary(1)?);
            head.kind = RuleKind::PartialSet;
        }

        if self.at(&TokenKind::Assign) || self.at(&TokenKind::Unify) {
            head.assign = self.advance().kind == TokenKind::Assign;
            head.value = Some(self.binary(1)?);
            if head.kind == RuleKind::PartialSet {
                head.kind = RuleKind::PartialObject;
            }
        }

        let mut bodies = Vec::new();
        if !default {
            if self.eat_keyword("if") {
                bodies.push(self.if_body()?);
            }
            while self.at(&TokenKind::LBrace) {
                bodies.push(self.braced_body()?);
            }
        }

        let mut else_chain = Vec::new();
        while self.at_keyword("else") {
            let else_location = self.advance().location;
            let value = if self.at(&TokenKind::Assign) || self.at(&TokenKind::Unify) {
                self.advance();
                Some(self.binary(1)?)
            } else {
                None
            };
            let body = if self.eat_keyword("if") {
                self.if_body()?
            } else if self.at(&TokenKind::LBrace) {
                self.braced_body()?
            } else {
                Body::default()
            };
            else_chain.push(ElseClause {
                value,
                body,
                location: else_location,
            });
        }

        Ok(Rule {
            default,
            head,
            bodies,
            else_chain,
            location,
        })
    }

    fn if_body(&mut self) -> ParseResult<Body> {
        if self.at(&TokenKind::LBrace) {
            self.braced_body()
        } else {
            let expr = self.literal()?;
            Ok(Body { exprs: vec![expr] })
        }
    }

    fn braced_body(&mut self) -> ParseResult<Body> {
        self.nested(|p| {
            p.expect(&TokenKind::LBrace, "\"{\"")?;
            let body = p.with_newlines(true, |p| p.query(&TokenKind::RBrace))?;
            p.expect(&TokenKind::RBrace, "\"}\"")?;
            Ok(body)
        })
    }

    // --- queries ----------------------------------------------------------

    fn query(&mut self, terminator: &TokenKind) -> ParseResult<Body> {
        let mut exprs = Vec::new();
        loop {
            while matches!(
                self.tokens[self.pos].kind,
                TokenKind::Newline | TokenKind::Semicolon
            ) {
                self.pos += 1;
            }
            if self.at(terminator) {
                break;
            }
            exprs.push(self.literal()?);

            let next = self.peek_kind();
            if next == TokenKind::Newline || next == TokenKind::Semicolon {
                continue;
            }
            if &next != terminator {
                return Err(self.unexpected("\";\" or newline"));
            }
        }
        Ok(Body { exprs })
    }

    fn literal(&mut self) -> ParseResult<Expr> {
        let location = self.peek().location;

        if self.eat_keyword("some") {
            let kind = self.some_decl()?;
            return Ok(Expr {
                kind,
                negated: false,
                with: Vec::new(),
                location,
            });
        }

        if self.eat_keyword("every") {
            let (key, value) = self.iteration_vars()?;
            self.expect_keyword("in")?;
            let domain = self.binary(2)?;
            let body = self.braced_body()?;
            return Ok(Expr {
                kind: ExprKind::Every {
                    key,
                    value,
                    domain,
                    body,
                },
                negated: false,
                with: Vec::new(),
                location,
            });
        }

        let negated = self.eat_keyword("not");
        let term = self.binary(0)?;

        let mut with = Vec::new();
        while self.eat_keyword("with") {
            let target = self.binary(1)?;
            self.expect_keyword("as")?;
            let value = self.binary(1)?;
            with.push(With { target, value });
        }

        Ok(Expr {
            kind: ExprKind::Term(term),
            negated,
            with,
            location,
        })
    }

    fn some_decl(&mut self) -> ParseResult<ExprKind> {
        let mut terms = vec![self.binary(2)?];
        while self.eat(&TokenKind::Comma) {
            terms.push(self.binary(2)?);
        }

        if self.eat_keyword("in") {
            let collection = self.binary(2)?;
            let mut terms = terms.into_iter();
            let (key, value) = match (terms.next(), terms.next(), terms.next()) {
                (Some(value), None, None) => (None, value),
                (Some(key), Some(value), None) => (Some(key), value),
                _ => return Err(self.unexpected("at most two variables before \"in\"")),
            };
            return Ok(ExprKind::SomeIn {
                key,
                value,
                collection,
            });
        }

        let mut vars = Vec::with_capacity(terms.len());
        for term in terms {
            match term {
                Term::Var(name) => vars.push(name),
                _ => return Err(self.unexpected("variable in some declaration")),
            }
        }
        Ok(ExprKind::SomeDecl(vars))
    }

    fn iteration_vars(&mut self) -> ParseResult<(Option<Term>, Term)> {
        let first = self.primary()?;
        if self.eat(&TokenKind::Comma) {
            let second = self.primary()?;
            Ok((Some(first), second))
        } else {
            Ok((None, first))
        }
    }

    // --- terms --------------------------------------------------------------

    fn binop(&mut self) -> Option<(BinOp, u8)> {
        let union_allowed = self.union_allowed;
        let op = match &self.peek().kind {
            TokenKind::Assign => (BinOp::Assign, 0),
            TokenKind::Unify => (BinOp::Unify, 0),
            TokenKind::Ident(name) if name == "in" => (BinOp::Member, 1),
            TokenKind::Eq => (BinOp::Eq, 2),
            TokenKind::Neq => (BinOp::Neq, 2),
            TokenKind::Lt => (BinOp::Lt, 2),
            TokenKind::Lte => (BinOp::Lte, 2),
            TokenKind::Gt => (BinOp::Gt, 2),
            TokenKind::Gte => (BinOp::Gte, 2),
            TokenKind::Pipe if union_allowed => (BinOp::Union, 3),
            TokenKind::Amp => (BinOp::Intersect, 4),
            TokenKind::Plus => (BinOp::Add, 5),
            TokenKind::Minus => (BinOp::Sub, 5),
            TokenKind::Star => (BinOp::Mul, 6),
            TokenKind::Slash => (BinOp::Div, 6),
            TokenKind::Percent => (BinOp::Rem, 6),
            _ => return None,
        };
        Some(op)
    }

    fn binary(&mut self, min_prec: u8) -> ParseResult<Term> {
        let mut lhs = self.primary()?;
        while let Some((op, prec)) = self.binop() {
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.binary(prec + 1)?;
            lhs = Term::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn primary(&mut self) -> ParseResult<Term> {
        self.nested(|p| p.primary_term())
    }

    fn primary_term(&mut self) -> ParseResult<Term> {
        let token = self.peek().clone();
        let term = match token.kind {
            TokenKind::Ident(name) => {
                if KEYWORDS.contains(&name.as_str()) {
                    return Err(self.unexpected("term"));
                }
                self.advance();
                match name.as_str() {
                    "null" => Term::Null,
                    "true" => Term::Bool(true),
                    "false" => Term::Bool(false),
                    _ => self.postfix(Term::Var(name))?,
                }
            }
            TokenKind::String(value) => {
                self.advance();
                Term::String(value)
            }
            TokenKind::Number(value) => {
                self.advance();
                Term::Number(value)
            }
            TokenKind::Minus => {
                self.advance();
                Term::Neg(Box::new(self.primary()?))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.with_newlines(false, |p| p.with_union(true, |p| p.binary(0)))?;
                self.expect(&TokenKind::RParen, "\")\"")?;
                self.postfix(inner)?
            }
            TokenKind::LBracket => {
                self.advance();
                let array = self.with_newlines(false, |p| p.array())?;
                self.postfix(array)?
            }
            TokenKind::LBrace => {
                self.advance();
                self.with_newlines(false, |p| p.brace())?
            }
            _ => return Err(self.unexpected("term")),
        };
        Ok(term)
    }

    fn postfix(&mut self, mut term: Term) -> ParseResult<Term> {
        loop {
            if self.at_tight(&TokenKind::Dot) {
                self.advance();
                let (field, _) = self.expect_ident_or_keyword("field name")?;
                term = push_ref(term, RefArg::Dot(field));
            } else if self.at_tight(&TokenKind::LBracket) {
                self.advance();
                let index = self.with_newlines(false, |p| p.with_union(true, |p| p.binary(0)))?;
                self.expect(&TokenKind::RBracket, "\"]\"")?;
                term = push_ref(term, RefArg::Index(index));
            } else if self.at_tight(&TokenKind::LParen) {
                self.advance();
                let args = self.term_list(&TokenKind::RParen, "\")\"")?;
                term = Term::Call {
                    func: Box::new(term),
                    args,
                };
            } else {
                return Ok(term);
            }
        }
    }

    /// Field names after a dot may reuse keywords (`input.else`).
    fn expect_ident_or_keyword(&mut self, expected: &str) -> ParseResult<(String, Location)> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok((name, token.location))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn term_list(&mut self, close: &TokenKind, expected: &str) -> ParseResult<Vec<Term>> {
        self.with_newlines(false, |p| {
            p.with_union(true, |p| {
                let mut items = Vec::new();
                while !p.at(close) {
                    items.push(p.binary(0)?);
                    if !p.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                p.expect(close, expected)?;
                Ok(items)
            })
        })
    }

    fn element(&mut self) -> ParseResult<Term> {
        self.with_union(false, |p| p.binary(1))
    }

    fn array(&mut self) -> ParseResult<Term> {
        if self.eat(&TokenKind::RBracket) {
            return Ok(Term::Array(Vec::new()));
        }
        let first = self.element()?;
        if self.eat(&TokenKind::Pipe) {
            let body = self.with_newlines(true, |p| p.query(&TokenKind::RBracket))?;
            self.expect(&TokenKind::RBracket, "\"]\"")?;
            return Ok(Term::ArrayCompr {
                term: Box::new(first),
                body,
            });
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at(&TokenKind::RBracket) {
                break;
            }
            items.push(self.element()?);
        }
        self.expect(&TokenKind::RBracket, "\"]\"")?;
        Ok(Term::Array(items))
    }

    fn brace(&mut self) -> ParseResult<Term> {
        if self.eat(&TokenKind::RBrace) {
            return Ok(Term::Object(Vec::new()));
        }
        let first = self.element()?;

        if self.eat(&TokenKind::Colon) {
            let value = self.element()?;
            if self.eat(&TokenKind::Pipe) {
                let body = self.with_newlines(true, |p| p.query(&TokenKind::RBrace))?;
                self.expect(&TokenKind::RBrace, "\"}\"")?;
                return Ok(Term::ObjectCompr {
                    key: Box::new(first),
                    value: Box::new(value),
                    body,
                });
            }
            let mut pairs = vec![(first, value)];
            while self.eat(&TokenKind::Comma) {
                if self.at(&TokenKind::RBrace) {
                    break;
                }
                let key = self.element()?;
                self.expect(&TokenKind::Colon, "\":\"")?;
                let value = self.element()?;
                pairs.push((key, value));
            }
            self.expect(&TokenKind::RBrace, "\"}\"")?;
            return Ok(Term::Object(pairs));
        }

        if self.eat(&TokenKind::Pipe) {
            let body = self.with_newlines(true, |p| p.query(&TokenKind::RBrace))?;
            self.expect(&TokenKind::RBrace, "\"}\"")?;
            return Ok(Term::SetCompr {
                term: Box::new(first),
                body,
            });
        }

        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at(&TokenKind::RBrace) {
                break;
            }
            items.push(self.element()?);
        }
        self.expect(&TokenKind::RBrace, "\"}\"")?;
        Ok(Term::Set(items))
    }
}

fn push_ref(term: Term, arg: RefArg) -> Term {
    match term {
        Term::Ref { head, mut path } => {
            path.push(arg);
            Term::Ref { head, path }
        }
        other => Term::Ref {
            head: Box::new(other),
            path: vec![arg],
        },
    }
}
