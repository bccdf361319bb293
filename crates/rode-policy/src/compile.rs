//! Compile-stage checks run on a parsed module.
//!
//! Every problem found is collected; the module is rejected if the list is
//! non-empty. The embedded `regorus` engine provides the general Rego
//! semantics check on top of the local rule-shape checks.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::ast::{walk_body, walk_module, BinOp, Body, ExprKind, Module, RuleKind, Term, Visitor};

/// Compile `module` (parsed from `source`) and return every error found.
pub fn compile_errors(module: &Module, source: &str) -> Vec<String> {
    let mut errors = Vec::new();
    check_rule_conflicts(module, &mut errors);
    check_redeclared_vars(module, &mut errors);
    check_with_engine(module, source, &mut errors);
    errors
}

fn rule_path(module: &Module, name: &str) -> String {
    format!("data.{}.{}", module.package.dotted(), name)
}

fn check_rule_conflicts(module: &Module, errors: &mut Vec<String>) {
    let mut kinds: BTreeMap<&str, HashSet<RuleKind>> = BTreeMap::new();
    let mut defaults: BTreeMap<&str, usize> = BTreeMap::new();

    for rule in &module.rules {
        let name = rule.head.name.as_str();
        kinds.entry(name).or_default().insert(rule.head.kind);
        if rule.default {
            *defaults.entry(name).or_default() += 1;
        }
    }

    for (name, kinds) in &kinds {
        if kinds.len() > 1 {
            errors.push(format!(
                "rego_type_error: conflicting rules {} found",
                rule_path(module, name)
            ));
        }
    }
    for (name, count) in &defaults {
        if *count > 1 {
            errors.push(format!(
                "rego_type_error: multiple default rules {} found",
                rule_path(module, name)
            ));
        }
    }
}

/// `x := 1; x := 2` in one body is rejected by the Rego compiler.
fn check_redeclared_vars(module: &Module, errors: &mut Vec<String>) {
    struct Redeclared<'a> {
        errors: &'a mut Vec<String>,
    }

    impl Visitor for Redeclared<'_> {
        fn visit_body(&mut self, body: &Body) {
            let mut declared: HashSet<&str> = HashSet::new();
            for expr in &body.exprs {
                if let ExprKind::Term(Term::Binary {
                    op: BinOp::Assign,
                    lhs,
                    ..
                }) = &expr.kind
                {
                    if let Some(name) = lhs.as_var() {
                        if name != "_" && !declared.insert(name) {
                            self.errors.push(format!(
                                "{}: rego_compile_error: var {} assigned above",
                                expr.location, name
                            ));
                        }
                    }
                }
            }
            walk_body(self, body);
        }
    }

    let mut visitor = Redeclared { errors };
    walk_module(&mut visitor, module);
}

fn check_with_engine(module: &Module, source: &str, errors: &mut Vec<String>) {
    let mut engine = regorus::Engine::new();
    let path = format!("{}.rego", module.package.dotted());
    if let Err(e) = engine
        .add_policy(path, source.to_string())
        .map(|_| ())
    {
        debug!(package = %module.package.dotted(), error = %e, "rego engine rejected module");
        errors.push(format!("rego_compile_error: {}", e));
    }
}
