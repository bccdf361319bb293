//! Policy validation: parse, compile, then check the Rode policy contract.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::{walk_body, walk_term, BinOp, Body, Module, RuleKind, Term, Visitor};
use crate::compile::compile_errors;
use crate::error::ParseResult;
use crate::parser::parse_module;

pub const PASS_RULE: &str = "pass";
pub const VIOLATIONS_RULE: &str = "violations";
pub const RESULT_VAR: &str = "result";

/// Keys every violation object must carry.
pub const REQUIRED_VIOLATION_FIELDS: [&str; 4] = ["pass", "id", "name", "message"];

pub const MISSING_PASS_RULE: &str = "all policies must contain a \"pass\" rule";
pub const MISSING_VIOLATIONS_RULE: &str = "all policies must contain a \"violations\" rule";
pub const INVALID_VIOLATIONS_SHAPE: &str = "all \"violations\" rules must return a \"result\" object containing \"pass\", \"id\", \"name\" and \"message\"";

/// Outcome of validating a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub compile: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn ok() -> Self {
        Self {
            compile: true,
            errors: Vec::new(),
        }
    }

    fn failed(errors: Vec<String>) -> Self {
        Self {
            compile: false,
            errors,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.compile && self.errors.is_empty()
    }
}

/// Validate Rego source as a Rode policy.
///
/// Syntax errors stop validation immediately. Otherwise compile errors and
/// the structural checks (`pass` rule, `violations` rule, violation shape)
/// are all collected, each failing check contributing its own message.
pub fn validate_policy(source: &str) -> ValidationResult {
    let module = match parse_module(source) {
        Ok(module) => module,
        Err(e) => {
            debug!(error = %e, "policy failed to parse");
            return ValidationResult::failed(vec![e.to_string()]);
        }
    };

    let mut errors = compile_errors(&module, source);
    if !errors.is_empty() {
        debug!(errors = errors.len(), "policy failed to compile");
    }

    errors.extend(contract_errors(&module));
    if errors.is_empty() {
        ValidationResult::ok()
    } else {
        ValidationResult::failed(errors)
    }
}

/// Structural checks against the Rode evaluation contract.
pub fn contract_errors(module: &Module) -> Vec<String> {
    let mut errors = Vec::new();

    if module.rules_named(PASS_RULE).next().is_none() {
        errors.push(MISSING_PASS_RULE.to_string());
    }

    let mut violations = module.rules_named(VIOLATIONS_RULE).peekable();
    if violations.peek().is_none() {
        errors.push(MISSING_VIOLATIONS_RULE.to_string());
    }
    if !violations.all(returns_result_object) {
        errors.push(INVALID_VIOLATIONS_SHAPE.to_string());
    }

    errors
}

fn returns_result_object(rule: &crate::ast::Rule) -> bool {
    let keyed_by_result = matches!(rule.head.kind, RuleKind::PartialSet)
        && rule.head.key.as_ref().and_then(Term::as_var) == Some(RESULT_VAR);
    if !keyed_by_result || rule.bodies.is_empty() {
        return false;
    }
    rule.bodies.iter().all(binds_result_object)
}

fn binds_result_object(body: &Body) -> bool {
    let mut finder = ResultBinding::default();
    finder.visit_body(body);
    finder.found
}

/// Looks for `result := {...}` or `result = {...}` (either side) where the
/// object literal carries every required violation field.
#[derive(Default)]
struct ResultBinding {
    found: bool,
}

impl ResultBinding {
    fn is_complete_violation(term: &Term) -> bool {
        term.object_string_keys().is_some_and(|keys| {
            REQUIRED_VIOLATION_FIELDS
                .iter()
                .all(|field| keys.contains(field))
        })
    }
}

impl Visitor for ResultBinding {
    fn visit_body(&mut self, body: &Body) {
        if !self.found {
            walk_body(self, body);
        }
    }

    fn visit_term(&mut self, term: &Term) {
        if let Term::Binary {
            op: BinOp::Assign | BinOp::Unify,
            lhs,
            rhs,
        } = term
        {
            let binds = (lhs.as_var() == Some(RESULT_VAR) && Self::is_complete_violation(rhs))
                || (rhs.as_var() == Some(RESULT_VAR) && Self::is_complete_violation(lhs));
            if binds {
                self.found = true;
                return;
            }
        }
        walk_term(self, term);
    }
}

/// Data path of the module's package, e.g. `rode/demo/harbor`.
pub fn package_path(source: &str) -> ParseResult<String> {
    let module = parse_module(source)?;
    Ok(module.package.path.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(source: &str) -> Vec<String> {
        contract_errors(&parse_module(source).unwrap())
    }

    #[test]
    fn test_contract_satisfied() {
        let errors = contract(
            r#"package p
pass { true }
violations[result] {
    result := {"pass": true, "id": "a", "name": "b", "message": "c", "link": ""}
}
"#,
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_unification_on_either_side() {
        let errors = contract(
            r#"package p
pass { true }
violations[result] {
    {"pass": true, "id": "a", "name": "b", "message": "c"} = result
}
"#,
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_every_check_reported() {
        let errors = contract(
            r#"package p
allow { true }
"#,
        );
        assert_eq!(
            errors,
            vec![
                MISSING_PASS_RULE.to_string(),
                MISSING_VIOLATIONS_RULE.to_string()
            ]
        );
    }

    #[test]
    fn test_missing_field_in_result() {
        let errors = contract(
            r#"package p
pass { true }
violations[result] {
    result := {"pass": true, "id": "a", "name": "b"}
}
"#,
        );
        assert_eq!(errors, vec![INVALID_VIOLATIONS_SHAPE.to_string()]);
    }

    #[test]
    fn test_head_key_must_be_result() {
        let errors = contract(
            r#"package p
pass { true }
violations[v] {
    v := {"pass": true, "id": "a", "name": "b", "message": "c"}
}
"#,
        );
        assert_eq!(errors, vec![INVALID_VIOLATIONS_SHAPE.to_string()]);
    }

    #[test]
    fn test_one_bad_violation_rule_fails_the_shape_check() {
        let errors = contract(
            r#"package p
pass { true }
violations[result] {
    result := {"pass": true, "id": "a", "name": "b", "message": "c"}
}
violations[result] {
    result := "oops"
}
"#,
        );
        assert_eq!(errors, vec![INVALID_VIOLATIONS_SHAPE.to_string()]);
    }

    #[test]
    fn test_package_path() {
        assert_eq!(
            package_path("package rode.demo.harbor\npass { true }").unwrap(),
            "rode/demo/harbor"
        );
    }
}
