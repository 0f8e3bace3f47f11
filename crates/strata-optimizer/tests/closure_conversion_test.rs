//! End-to-end tests for closure conversion followed by the resolved checks

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use strata_ast::surface::SurfaceProgram;
use strata_ast::{verify, Diagnostics, Flag, NodeKind, Program, Severity, SymbolId};
use strata_checker::check_resolved;
use strata_optimizer::{FlattenFunctions, OptimizationPass};
use strata_symbols::{check_bidirectional, compute_call_sites};

fn lower(items: Value) -> Program {
    let surface: SurfaceProgram =
        serde_json::from_value(json!({"modules": [{"name": "m", "items": items}]}))
            .expect("surface form did not parse");
    let mut program = surface.lower().expect("lowering failed");
    let mut diags = Diagnostics::new();
    compute_call_sites(&mut program, &mut diags).expect("call sites");
    program
}

fn find(program: &Program, name: &str) -> SymbolId {
    program
        .symbols()
        .find(|(_, sym)| sym.name == name)
        .map(|(id, _)| id)
        .expect("symbol not found")
}

/// Flatten, then hold the result to every post-flattening guarantee
fn flatten_and_check(program: &mut Program) {
    let mut diags = Diagnostics::new();
    FlattenFunctions
        .run(program, &mut diags)
        .expect("flattening failed");
    assert!(verify(program).is_empty(), "{:?}", verify(program));
    assert!(check_bidirectional(program).is_empty());

    check_resolved().run(program, &mut diags);
    assert_eq!(diags.count(Severity::Fatal), 0, "{:?}", diags.iter().collect::<Vec<_>>());

    for &f in program.registries().fns() {
        assert!(!program.is_nested_fn(f));
    }
}

#[test]
fn nested_reader_scenario() {
    let mut program = lower(json!([
        {"kind": "fn", "name": "print", "flags": ["extern"], "formals": [{"name": "v"}]},
        {"kind": "fn", "name": "f", "body": [
            {"kind": "var", "name": "x", "ty": "int", "init": 10},
            {"kind": "fn", "name": "g", "body": [
                {"kind": "expr", "expr": {"call": "print", "args": ["x"]}}
            ]},
            {"kind": "expr", "expr": {"call": "g"}},
            {"kind": "assign", "target": "x", "value": 11},
            {"kind": "expr", "expr": {"call": "g"}}
        ]}
    ]));
    let g = find(&program, "g");
    flatten_and_check(&mut program);

    assert!(program.has_flag(g, Flag::Flattened));
    assert_eq!(program.formals(g).len(), 1);

    // each call in f passes the address of x through a fresh temporary
    let calls = program.symbol(g).fn_data().unwrap().called_by.clone();
    assert_eq!(calls.len(), 2);
    for call in calls {
        assert_eq!(program.enclosing_fn(call), Some(find(&program, "f")));
        let arg = program.call_args(call).unwrap()[0];
        let NodeKind::SymRef(temp) = *program.kind(arg) else {
            panic!("capture actual is not a reference");
        };
        assert!(program.has_flag(temp, Flag::Temp));
        let init = match program.kind(program.symbol(temp).def.unwrap()) {
            NodeKind::Def { value: Some(v), .. } => *v,
            other => panic!("unexpected temp definition {:?}", other),
        };
        assert_eq!(
            strata_ast::dump_node(&program, init).trim(),
            "addr_of(x)"
        );
    }
}

#[test]
fn sibling_caller_is_escalated() {
    // k never mentions x but calls g, which does: k must take x too
    let mut program = lower(json!([
        {"kind": "fn", "name": "f", "body": [
            {"kind": "var", "name": "x", "ty": "int", "init": 1},
            {"kind": "fn", "name": "g", "ret": "int", "body": [{"kind": "return", "value": "x"}]},
            {"kind": "fn", "name": "k", "ret": "int", "body": [{"kind": "return", "value": {"call": "g"}}]},
            {"kind": "expr", "expr": {"call": "k"}}
        ]}
    ]));
    flatten_and_check(&mut program);
    assert_eq!(program.formals(find(&program, "k")).len(), 1);
}

#[test]
fn mutual_recursion_between_nested_functions() {
    let mut program = lower(json!([
        {"kind": "fn", "name": "outer", "formals": [{"name": "limit", "ty": "int"}], "body": [
            {"kind": "var", "name": "count", "ty": "int", "init": 0},
            {"kind": "fn", "name": "ping", "body": [
                {"kind": "assign", "target": "count", "value": {"prim": "add", "args": ["count", 1]}},
                {"kind": "if", "cond": {"prim": "lt", "args": ["count", "limit"]},
                 "then": [{"kind": "expr", "expr": {"call": "pong"}}]}
            ]},
            {"kind": "fn", "name": "pong", "body": [
                {"kind": "expr", "expr": {"call": "ping"}}
            ]},
            {"kind": "expr", "expr": {"call": "ping"}}
        ]}
    ]));
    flatten_and_check(&mut program);
    assert_eq!(program.formals(find(&program, "ping")).len(), 2);
    assert_eq!(program.formals(find(&program, "pong")).len(), 2);
}

#[test]
fn flat_program_is_untouched() {
    let mut program = lower(json!([
        {"kind": "var", "name": "total", "ty": "int", "init": 0},
        {"kind": "fn", "name": "add", "formals": [{"name": "n", "ty": "int"}], "body": [
            {"kind": "assign", "target": "total", "value": {"prim": "add", "args": ["total", "n"]}}
        ]},
        {"kind": "fn", "name": "main", "body": [
            {"kind": "expr", "expr": {"call": "add", "args": [2]}}
        ]}
    ]));
    let before = strata_ast::dump(&program);
    let result = FlattenFunctions
        .run(&mut program, &mut Diagnostics::new())
        .unwrap();
    assert!(!result.modified);
    assert_eq!(strata_ast::dump(&program), before);
}
