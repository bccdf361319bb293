//! Typed AST for Rego modules, plus a recursive [`Visitor`].

use crate::error::Location;

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub package: Package,
    pub imports: Vec<Import>,
    pub rules: Vec<Rule>,
}

impl Module {
    /// Rules with the given name, in source order.
    pub fn rules_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules.iter().filter(move |r| r.head.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub path: Vec<String>,
    pub location: Location,
}

impl Package {
    /// Dotted form, e.g. `rode.demo.harbor`.
    pub fn dotted(&self) -> String {
        self.path.join(".")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub path: Term,
    pub alias: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// `p = v { ... }`, `p { ... }`, `p := v`
    Complete,
    /// `p[x] { ... }`, `p contains x if { ... }`
    PartialSet,
    /// `p[k] = v { ... }`
    PartialObject,
    /// `f(x) = y { ... }`
    Function,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleHead {
    pub name: String,
    pub kind: RuleKind,
    pub args: Vec<Term>,
    pub key: Option<Term>,
    pub value: Option<Term>,
    /// Head used `:=` rather than `=`.
    pub assign: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub default: bool,
    pub head: RuleHead,
    /// Alternative bodies; an empty list means the rule is unconditionally defined.
    pub bodies: Vec<Body>,
    pub else_chain: Vec<ElseClause>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseClause {
    pub value: Option<Term>,
    pub body: Body,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    pub exprs: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub negated: bool,
    pub with: Vec<With>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Term(Term),
    /// `some x, y`
    SomeDecl(Vec<String>),
    /// `some k, v in collection`
    SomeIn {
        key: Option<Term>,
        value: Term,
        collection: Term,
    },
    /// `every k, v in domain { body }`
    Every {
        key: Option<Term>,
        value: Term,
        domain: Term,
        body: Body,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct With {
    pub target: Term,
    pub value: Term,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
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
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Union,
    Intersect,
    Member,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefArg {
    Dot(String),
    Index(Term),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Null,
    Bool(bool),
    Number(String),
    String(String),
    Var(String),
    Ref {
        head: Box<Term>,
        path: Vec<RefArg>,
    },
    Call {
        func: Box<Term>,
        args: Vec<Term>,
    },
    Array(Vec<Term>),
    Object(Vec<(Term, Term)>),
    Set(Vec<Term>),
    ArrayCompr {
        term: Box<Term>,
        body: Body,
    },
    SetCompr {
        term: Box<Term>,
        body: Body,
    },
    ObjectCompr {
        key: Box<Term>,
        value: Box<Term>,
        body: Body,
    },
    Binary {
        op: BinOp,
        lhs: Box<Term>,
        rhs: Box<Term>,
    },
    Neg(Box<Term>),
}

impl Term {
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Self::Var(name) => Some(name),
            _ => None,
        }
    }

    /// String keys of an object literal; non-string keys are skipped.
    pub fn object_string_keys(&self) -> Option<Vec<&str>> {
        match self {
            Self::Object(pairs) => Some(
                pairs
                    .iter()
                    .filter_map(|(k, _)| match k {
                        Term::String(s) => Some(s.as_str()),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Recursive AST visitor. Override a `visit_*` hook and call the matching
/// `walk_*` function to keep descending.
pub trait Visitor {
    fn visit_rule(&mut self, rule: &Rule) {
        walk_rule(self, rule);
    }

    fn visit_body(&mut self, body: &Body) {
        walk_body(self, body);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_term(&mut self, term: &Term) {
        walk_term(self, term);
    }
}

pub fn walk_module<V: Visitor + ?Sized>(visitor: &mut V, module: &Module) {
    for rule in &module.rules {
        visitor.visit_rule(rule);
    }
}

pub fn walk_rule<V: Visitor + ?Sized>(visitor: &mut V, rule: &Rule) {
    for arg in &rule.head.args {
        visitor.visit_term(arg);
    }
    if let Some(key) = &rule.head.key {
        visitor.visit_term(key);
    }
    if let Some(value) = &rule.head.value {
        visitor.visit_term(value);
    }
    for body in &rule.bodies {
        visitor.visit_body(body);
    }
    for clause in &rule.else_chain {
        if let Some(value) = &clause.value {
            visitor.visit_term(value);
        }
        visitor.visit_body(&clause.body);
    }
}

pub fn walk_body<V: Visitor + ?Sized>(visitor: &mut V, body: &Body) {
    for expr in &body.exprs {
        visitor.visit_expr(expr);
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Term(term) => visitor.visit_term(term),
        ExprKind::SomeDecl(_) => {}
        ExprKind::SomeIn {
            key,
            value,
            collection,
        } => {
            if let Some(key) = key {
                visitor.visit_term(key);
            }
            visitor.visit_term(value);
            visitor.visit_term(collection);
        }
        ExprKind::Every {
            key,
            value,
            domain,
            body,
        } => {
            if let Some(key) = key {
                visitor.visit_term(key);
            }
            visitor.visit_term(value);
            visitor.visit_term(domain);
            visitor.visit_body(body);
        }
    }
    for with in &expr.with {
        visitor.visit_term(&with.target);
        visitor.visit_term(&with.value);
    }
}

pub fn walk_term<V: Visitor + ?Sized>(visitor: &mut V, term: &Term) {
    match term {
        Term::Null | Term::Bool(_) | Term::Number(_) | Term::String(_) | Term::Var(_) => {}
        Term::Ref { head, path } => {
            visitor.visit_term(head);
            for arg in path {
                if let RefArg::Index(index) = arg {
                    visitor.visit_term(index);
                }
            }
        }
        Term::Call { func, args } => {
            visitor.visit_term(func);
            for arg in args {
                visitor.visit_term(arg);
            }
        }
        Term::Array(items) | Term::Set(items) => {
            for item in items {
                visitor.visit_term(item);
            }
        }
        Term::Object(pairs) => {
            for (key, value) in pairs {
                visitor.visit_term(key);
                visitor.visit_term(value);
            }
        }
        Term::ArrayCompr { term, body } | Term::SetCompr { term, body } => {
            visitor.visit_term(term);
            visitor.visit_body(body);
        }
        Term::ObjectCompr { key, value, body } => {
            visitor.visit_term(key);
            visitor.visit_term(value);
            visitor.visit_body(body);
        }
        Term::Binary { lhs, rhs, .. } => {
            visitor.visit_term(lhs);
            visitor.visit_term(rhs);
        }
        Term::Neg(inner) => visitor.visit_term(inner),
    }
}
