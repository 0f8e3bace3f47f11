//! End-to-end tests for the Strata middle-end
//!
//! These run the standard passes over the demo programs in demos/.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use strata::compile;
use strata_ast::{dump, Flag, NodeKind, NodeTag, Severity};
use strata_pipeline::{Outcome, Pipeline, PipelineConfig};

fn stats_config() -> PipelineConfig {
    PipelineConfig {
        stats: true,
        ..PipelineConfig::default()
    }
}

fn demo_name(path: &std::path::Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

#[test]
fn e2e_all_demos_reach_their_expected_outcome() {
    let demos = discover_demos();
    assert!(!demos.is_empty(), "No demos found! Check demos/ directory.");

    for path in &demos {
        let name = demo_name(path);
        let result = compile(&load_demo(&name), PipelineConfig::default())
            .unwrap_or_else(|e| panic!("{}: {}", name, e));

        if name.starts_with("ok_") {
            assert_eq!(result.outcome, Outcome::Completed, "{}", name);
            assert_eq!(result.report.totals.errors, 0, "{}", name);
            assert!(result.output.is_some(), "{}", name);
            assert_ready_for_codegen(&result.program);
        } else {
            assert!(
                matches!(result.outcome, Outcome::Aborted { .. }),
                "{} should abort",
                name
            );
            assert!(result.output.is_none(), "{}", name);
        }
    }
}

#[test]
fn nested_reader_gets_an_extra_formal() {
    let result = compile(&load_demo("ok_nested_reader"), PipelineConfig::default()).unwrap();
    let program = &result.program;
    let g = find(program, "g");
    let x = find(program, "x");

    assert!(!program.is_nested_fn(g));
    assert!(program.has_flag(g, Flag::Flattened));
    assert!(program.has_flag(x, Flag::Captured));
    let formals: Vec<_> = program
        .formals(g)
        .iter()
        .map(|f| program.symbol(*f).name.clone())
        .collect();
    assert_eq!(formals, vec!["a", "x"]);

    // the call inside f now passes x along
    let f_def = program.fn_def(find(program, "f")).unwrap();
    let call = program
        .collect(f_def, NodeTag::Call)
        .find(|c| matches!(program.kind(*c), NodeKind::Call { name, .. } if name == "g"))
        .unwrap();
    assert_eq!(program.call_args(call).unwrap().len(), 2);
}

#[test]
fn counter_writes_through_its_capture() {
    let result = compile(&load_demo("ok_counter"), stats_config()).unwrap();
    assert_eq!(result.outcome, Outcome::Completed);
    let program = &result.program;

    let total = find(program, "total");
    assert!(program.has_flag(total, Flag::Captured));
    assert_eq!(program.formals(find(program, "bump")).len(), 2);

    // `scratch = 5` is never read
    let dse = result.report.record("dead-store-elimination").unwrap();
    assert_eq!(dse.stats.as_ref().unwrap()["removed"], 1);
    let scratch = find(program, "scratch");
    let count_def = program.fn_def(find(program, "count")).unwrap();
    assert!(!program.collect(count_def, NodeTag::Assign).any(|a| {
        match program.kind(a) {
            NodeKind::Assign { target, .. } => {
                matches!(program.kind(*target), NodeKind::SymRef(s) if *s == scratch)
            }
            _ => false,
        }
    }));
}

#[test]
fn mutually_recursive_siblings_share_the_capture() {
    let result = compile(&load_demo("ok_parity"), stats_config()).unwrap();
    assert_eq!(result.outcome, Outcome::Completed);
    let program = &result.program;

    for name in ["even", "odd"] {
        let f = find(program, name);
        assert!(program.has_flag(f, Flag::Flattened), "{}", name);
        assert_eq!(program.formals(f).len(), 2, "{}", name);
    }
    let flatten = result.report.record("flatten-functions").unwrap();
    assert_eq!(flatten.stats.as_ref().unwrap()["flattened"], 2);
}

#[test]
fn missing_return_only_warns() {
    let result = compile(&load_demo("ok_missing_return"), PipelineConfig::default()).unwrap();
    assert_eq!(result.outcome, Outcome::Completed);
    let warnings: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .map(|d| d.code)
        .collect();
    assert_eq!(warnings, vec!["W-CHECK-001"]);
}

#[test]
fn duplicate_named_args_abort_before_flattening() {
    let result = compile(&load_demo("abort_duplicate_named"), PipelineConfig::default()).unwrap();
    assert_eq!(
        result.outcome,
        Outcome::Aborted {
            index: 0,
            pass: "check-parsed"
        }
    );
    let codes: Vec<_> = result.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec!["E-CHECK-001"]);
    assert_eq!(result.report.passes.len(), 1);
}

#[test]
fn receiver_in_default_is_fatal() {
    let result = compile(&load_demo("abort_receiver_default"), PipelineConfig::default()).unwrap();
    assert!(result.diagnostics.has_fatal());
    assert!(result.output.is_none());
    assert_eq!(
        result.outcome,
        Outcome::Aborted {
            index: 0,
            pass: "check-parsed"
        }
    );
}

#[test]
fn runs_are_deterministic() {
    for name in ["ok_counter", "ok_parity", "ok_nested_reader"] {
        let first = compile(&load_demo(name), PipelineConfig::default()).unwrap();
        let second = compile(&load_demo(name), PipelineConfig::default()).unwrap();
        assert_eq!(first.output, second.output, "{}", name);
    }
}

#[test]
fn stepping_matches_a_full_run() {
    let mut pipeline = Pipeline::new(lower_demo("ok_counter"), PipelineConfig::default()).unwrap();
    pipeline.run_to_end().unwrap();
    let stepped = dump(pipeline.program());

    let full = compile(&load_demo("ok_counter"), PipelineConfig::default()).unwrap();
    assert_eq!(Some(stepped), full.output);
}
