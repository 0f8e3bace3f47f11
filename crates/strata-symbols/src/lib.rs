//! strata-symbols: call-site computation
//!
//! This crate materializes the call graph the rest of the middle-end relies
//! on:
//! - Bind calls the front-end left unresolved to a module-level function
//! - Record, for every function, the calls that invoke it (`called_by`)
//! - Report calls that bind nothing (E-SYMBOL-001/002)
//!
//! It also provides [`CallGraph`], the function-level caller/callee view
//! built from the resolved calls.

mod error;
mod graph;
mod resolver;

pub use error::SymbolError;
pub use graph::{check_bidirectional, CallGraph};

use log::debug;
use resolver::CallSiteResolver;
use strata_ast::{AstError, Diagnostics, NodeKind, Program};

/// Outcome counts of one call-site computation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallSiteStats {
    pub calls: usize,
    /// Calls bound by name here rather than by the front-end
    pub late_bound: usize,
    pub unresolved: usize,
}

/// Recompute every function's call-site list from scratch
///
/// Unresolved calls are reported as continuable errors and left unbound.
pub fn compute_call_sites(
    program: &mut Program,
    diags: &mut Diagnostics,
) -> Result<CallSiteStats, AstError> {
    let fns = program.registries().fns().to_vec();
    for f in fns {
        if let Some(data) = program.symbol_mut(f).fn_data_mut() {
            data.called_by.clear();
        }
    }

    let mut stats = CallSiteStats::default();
    let calls = program.registries().calls().to_vec();
    for call in calls {
        stats.calls += 1;
        let (callee, name) = match program.kind(call) {
            NodeKind::Call { callee, name, .. } => (*callee, name.clone()),
            _ => continue,
        };
        let target = match callee {
            Some(f) => f,
            None => match CallSiteResolver::resolve(program, call, &name) {
                Ok(f) => {
                    stats.late_bound += 1;
                    f
                }
                Err(err) => {
                    stats.unresolved += 1;
                    diags.emit(err.to_diagnostic());
                    continue;
                }
            },
        };
        program.set_callee(call, Some(target))?;
    }

    debug!(
        "computed call sites: {} calls, {} late-bound, {} unresolved",
        stats.calls, stats.late_bound, stats.unresolved
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_ast::surface::SurfaceProgram;
    use strata_ast::{verify, SymbolId};

    fn lower(modules: serde_json::Value) -> Program {
        let surface: SurfaceProgram =
            serde_json::from_value(serde_json::json!({ "modules": modules })).unwrap();
        surface.lower().unwrap()
    }

    fn find(program: &Program, name: &str) -> SymbolId {
        program
            .symbols()
            .find(|(_, sym)| sym.name == name)
            .map(|(id, _)| id)
            .unwrap()
    }

    #[test]
    fn called_by_lists_every_call_site() {
        let mut program = lower(serde_json::json!([{"name": "m", "items": [
            {"kind": "fn", "name": "leaf"},
            {"kind": "fn", "name": "a", "body": [
                {"kind": "expr", "expr": {"call": "leaf"}},
                {"kind": "expr", "expr": {"call": "leaf"}}
            ]},
            {"kind": "fn", "name": "b", "body": [{"kind": "expr", "expr": {"call": "a"}}]}
        ]}]));
        let mut diags = Diagnostics::new();
        let stats = compute_call_sites(&mut program, &mut diags).unwrap();

        assert_eq!(stats.calls, 3);
        assert!(diags.is_empty());
        let leaf = find(&program, "leaf");
        assert_eq!(program.symbol(leaf).fn_data().unwrap().called_by.len(), 2);
        assert!(check_bidirectional(&program).is_empty());
        assert!(verify(&program).is_empty());

        let graph = CallGraph::build(&program);
        let a = find(&program, "a");
        let b = find(&program, "b");
        assert_eq!(graph.callees(a), &[leaf]);
        assert_eq!(graph.callers(a), &[b]);
        assert_eq!(graph.callers(leaf), &[a]);
    }

    #[test]
    fn calls_bind_across_modules_by_name() {
        let mut program = lower(serde_json::json!([
            {"name": "lib", "items": [{"kind": "fn", "name": "helper"}]},
            {"name": "main", "items": [{"kind": "expr", "expr": {"call": "helper"}}]}
        ]));
        let mut diags = Diagnostics::new();
        let stats = compute_call_sites(&mut program, &mut diags).unwrap();
        assert_eq!(stats.late_bound, 1);
        assert!(diags.is_empty());
        assert!(check_bidirectional(&program).is_empty());
    }

    #[test]
    fn unresolved_call_is_a_continuable_error() {
        let mut program = lower(serde_json::json!([{"name": "m", "items": [
            {"kind": "fn", "name": "f", "body": [
                {"kind": "expr", "expr": {"call": "missing"}, "span": {"start": 10, "end": 19}}
            ]}
        ]}]));
        let mut diags = Diagnostics::new();
        let stats = compute_call_sites(&mut program, &mut diags).unwrap();

        assert_eq!(stats.unresolved, 1);
        let d = diags.with_code("E-SYMBOL-001").next().unwrap();
        assert_eq!(d.severity, strata_ast::Severity::Error);
        assert_eq!(d.message, "unresolved call to 'missing'");
        assert_eq!(d.notes[0].message, "called from 'f'");
        assert!(!diags.has_fatal());
        assert!(diags.should_abort());
    }

    #[test]
    fn recomputation_drops_stale_entries() {
        let mut program = lower(serde_json::json!([{"name": "m", "items": [
            {"kind": "fn", "name": "g"},
            {"kind": "fn", "name": "f", "body": [{"kind": "expr", "expr": {"call": "g"}}]}
        ]}]));
        let mut diags = Diagnostics::new();
        compute_call_sites(&mut program, &mut diags).unwrap();
        compute_call_sites(&mut program, &mut diags).unwrap();
        let g = find(&program, "g");
        assert_eq!(program.symbol(g).fn_data().unwrap().called_by.len(), 1);
    }
}
