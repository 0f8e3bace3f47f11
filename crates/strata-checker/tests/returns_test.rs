//! Tests for return-path coverage (`is_defined_all_paths`)

use serde_json::{json, Value};
use strata_ast::surface::SurfaceProgram;
use strata_ast::{Diagnostics, Program, Severity, SymbolId};
use strata_checker::{is_defined_all_paths, Rule, ReturnCoverage};

fn lower(items: Value) -> Program {
    let surface: SurfaceProgram =
        serde_json::from_value(json!({"modules": [{"name": "m", "items": items}]}))
            .expect("surface form did not parse");
    surface.lower().expect("lowering failed")
}

fn find(program: &Program, name: &str) -> SymbolId {
    program
        .symbols()
        .find(|(_, sym)| sym.name == name)
        .map(|(id, _)| id)
        .expect("symbol not found")
}

/// Names of functions that draw the missing-return warning
fn warned(items: Value) -> Vec<String> {
    let program = lower(items);
    ReturnCoverage
        .check(&program)
        .into_iter()
        .map(|w| match w {
            strata_checker::CheckError::MissingReturn { function, .. } => function,
            other => panic!("unexpected finding {:?}", other),
        })
        .collect()
}

#[test]
fn return_in_then_only_warns() {
    let items = json!([
        {"kind": "fn", "name": "f", "ret": "int", "formals": [{"name": "c", "ty": "bool"}], "body": [
            {"kind": "if", "cond": "c", "then": [{"kind": "return", "value": 1}]}
        ]}
    ]);
    let program = lower(items.clone());
    assert_eq!(is_defined_all_paths(&program, find(&program, "f")), 0);
    assert_eq!(warned(items), vec!["f"]);
}

#[test]
fn return_in_both_branches_does_not_warn() {
    let items = json!([
        {"kind": "fn", "name": "f", "ret": "int", "formals": [{"name": "c", "ty": "bool"}], "body": [
            {"kind": "if", "cond": "c",
             "then": [{"kind": "return", "value": 1}],
             "else": [{"kind": "return", "value": 2}]}
        ]}
    ]);
    let program = lower(items.clone());
    assert_eq!(is_defined_all_paths(&program, find(&program, "f")), 1);
    assert!(warned(items).is_empty());
}

#[test]
fn default_value_alone_still_warns() {
    let items = json!([
        {"kind": "fn", "name": "f", "ret": "int", "body": [
            {"kind": "var", "name": "ret", "ty": "int", "init": 0, "flags": ["return_value"]}
        ]}
    ]);
    assert_eq!(warned(items), vec!["f"]);

    let items = json!([
        {"kind": "fn", "name": "g", "ret": "int", "formals": [{"name": "c", "ty": "bool"}], "body": [
            {"kind": "var", "name": "ret", "ty": "int", "init": 0, "flags": ["return_value"]},
            {"kind": "if", "cond": "c",
             "then": [{"kind": "assign", "target": "ret", "value": 1}],
             "else": [{"kind": "assign", "target": "ret", "value": 2}]},
            {"kind": "return", "value": "ret"}
        ]}
    ]);
    let program = lower(items.clone());
    assert_eq!(is_defined_all_paths(&program, find(&program, "g")), 3);
    assert!(warned(items).is_empty());
}

#[test]
fn halting_paths_count_as_defined() {
    let items = json!([
        {"kind": "fn", "name": "die", "flags": ["function_terminates_program"]},
        {"kind": "fn", "name": "f", "ret": "int", "body": [
            {"kind": "expr", "expr": {"prim": "halt"}}
        ]},
        {"kind": "fn", "name": "g", "ret": "int", "body": [
            {"kind": "expr", "expr": {"call": "die"}}
        ]}
    ]);
    assert!(warned(items).is_empty());
}

#[test]
fn loops_and_gotos_count_zero() {
    let items = json!([
        {"kind": "fn", "name": "f", "ret": "int", "body": [
            {"kind": "while", "cond": true, "body": [{"kind": "return", "value": 1}]}
        ]},
        {"kind": "fn", "name": "g", "ret": "int", "body": [
            {"kind": "for", "index": "i", "iterable": 3, "body": [{"kind": "return", "value": "i"}]}
        ]},
        {"kind": "fn", "name": "h", "ret": "int", "body": [
            {"kind": "label", "name": "top"},
            {"kind": "goto", "label": "top"}
        ]}
    ]);
    assert_eq!(warned(items), vec!["f", "g", "h"]);
}

#[test]
fn do_while_body_always_runs_once() {
    let items = json!([
        {"kind": "fn", "name": "f", "ret": "int", "formals": [{"name": "c", "ty": "bool"}], "body": [
            {"kind": "do_while", "cond": "c", "body": [{"kind": "return", "value": 1}]}
        ]},
        {"kind": "fn", "name": "g", "ret": "int", "formals": [{"name": "c", "ty": "bool"}], "body": [
            {"kind": "do_while", "cond": "c", "body": [
                {"kind": "if", "cond": "c", "then": [{"kind": "break"}]},
                {"kind": "return", "value": 1}
            ]}
        ]}
    ]);
    let program = lower(items.clone());
    assert_eq!(is_defined_all_paths(&program, find(&program, "f")), 1);
    // a break can leave before the return
    assert_eq!(is_defined_all_paths(&program, find(&program, "g")), 0);
    assert_eq!(warned(items), vec!["g"]);
}

#[test]
fn void_and_iterator_functions_are_skipped() {
    let items = json!([
        {"kind": "fn", "name": "v", "body": []},
        {"kind": "fn", "name": "it", "ret": "int", "flags": ["iterator"], "body": []}
    ]);
    assert!(warned(items).is_empty());
}

#[test]
fn missing_return_is_only_a_warning() {
    let program = lower(json!([
        {"kind": "fn", "name": "f", "ret": "int", "body": []}
    ]));
    let mut diags = Diagnostics::new();
    strata_checker::check_resolved().run(&program, &mut diags);
    assert_eq!(diags.count(Severity::Warning), 1);
    assert!(!diags.should_abort());
    let d = diags.iter().next().expect("one diagnostic");
    assert_eq!(d.message, "control reaches end of function that returns a value");
}
