//! Captured-variable analysis for closure conversion
//!
//! A function's captures are the variables and formals of its lexical
//! ancestors that it needs at run time:
//!
//! ```text
//! caps(F) = direct(F) ∪ { s ∈ caps(C) | C called by F, s outer to F }
//! ```
//!
//! The equation is solved with the shared backward fixpoint driver, using
//! callees as successors and set union as the join. Running it over every
//! function (not only nested ones) is what escalates a caller that cannot
//! supply a callee's capture: its own capture set becomes non-empty.

use std::collections::{BTreeSet, HashMap};

use log::debug;
use strata_ast::{NodeKind, NodeTag, Program, SymbolId};
use strata_dataflow::solve_backward;
use strata_symbols::CallGraph;

/// Capture sets of every function at the fixpoint
#[derive(Debug, Clone, Default)]
pub struct Captures {
    /// Function -> captured symbols in capture order (ascending symbol id)
    sets: HashMap<SymbolId, Vec<SymbolId>>,
    /// Sweeps the fixpoint took
    pub sweeps: usize,
}

impl Captures {
    /// Solve the capture equations over the call graph
    pub fn compute(program: &Program, graph: &CallGraph) -> Self {
        let functions = graph.functions();
        let direct: Vec<BTreeSet<SymbolId>> = functions
            .iter()
            .map(|f| direct_captures(program, *f))
            .collect();

        let solution = solve_backward(
            &graph.successors(),
            BTreeSet::new(),
            |acc: &mut BTreeSet<SymbolId>, callee_caps: &BTreeSet<SymbolId>| {
                acc.extend(callee_caps.iter().copied())
            },
            |i, from_callees| {
                let f = functions[i];
                let mut caps = direct[i].clone();
                caps.extend(
                    from_callees
                        .iter()
                        .copied()
                        .filter(|s| program.is_outer_var(*s, f)),
                );
                caps
            },
        );

        let sets: HashMap<SymbolId, Vec<SymbolId>> = functions
            .iter()
            .zip(solution.ins)
            .filter(|(_, caps)| !caps.is_empty())
            .map(|(f, caps)| (*f, caps.into_iter().collect()))
            .collect();

        for (f, caps) in &sets {
            debug!(
                "{} captures {}",
                program.symbol(*f).name,
                caps.iter()
                    .map(|s| program.symbol(*s).name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        Captures {
            sets,
            sweeps: solution.sweeps,
        }
    }

    /// Captured symbols of `f`, in the order extra formals are appended
    pub fn of(&self, f: SymbolId) -> &[SymbolId] {
        self.sets.get(&f).map(Vec::as_slice).unwrap_or_default()
    }

    /// Functions with at least one capture, ascending by symbol id
    pub fn capturing(&self) -> Vec<SymbolId> {
        let mut fns: Vec<SymbolId> = self.sets.keys().copied().collect();
        fns.sort();
        fns
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Number of (function, captured symbol) pairs
    pub fn total(&self) -> usize {
        self.sets.values().map(Vec::len).sum()
    }
}

/// Outer variables `f` references itself, not counting nested functions
pub fn direct_captures(program: &Program, f: SymbolId) -> BTreeSet<SymbolId> {
    let Some(def) = program.fn_def(f) else {
        return BTreeSet::new();
    };
    program
        .collect(def, NodeTag::SymRef)
        .skip_nested_fns()
        .filter_map(|id| match program.kind(id) {
            NodeKind::SymRef(sym) => Some(*sym),
            _ => None,
        })
        .filter(|sym| program.is_outer_var(*sym, f))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{find, lower};

    #[test]
    fn direct_reads_of_outer_variables() {
        let program = lower(serde_json::json!([
            {"kind": "fn", "name": "f", "body": [
                {"kind": "var", "name": "x", "ty": "int", "init": 1},
                {"kind": "var", "name": "y", "ty": "int", "init": 2},
                {"kind": "fn", "name": "g", "body": [
                    {"kind": "var", "name": "z", "init": "x"}
                ]}
            ]}
        ]));
        let g = find(&program, "g");
        let x = find(&program, "x");
        assert_eq!(direct_captures(&program, g), BTreeSet::from([x]));
        assert!(direct_captures(&program, find(&program, "f")).is_empty());
    }

    #[test]
    fn captures_propagate_through_calls() {
        // g reads a's formal; h, a sibling of g, only calls it
        let program = lower(serde_json::json!([
            {"kind": "fn", "name": "a", "formals": [{"name": "p", "ty": "int"}], "body": [
                {"kind": "fn", "name": "g", "body": [
                    {"kind": "expr", "expr": {"call": "print", "args": ["p"]}}
                ]},
                {"kind": "fn", "name": "h", "body": [
                    {"kind": "expr", "expr": {"call": "g"}}
                ]},
                {"kind": "expr", "expr": {"call": "h"}}
            ]},
            {"kind": "fn", "name": "print", "flags": ["extern"], "formals": [{"name": "v"}]}
        ]));
        let graph = CallGraph::build(&program);
        let captures = Captures::compute(&program, &graph);

        let p = find(&program, "p");
        assert_eq!(captures.of(find(&program, "g")), &[p]);
        assert_eq!(captures.of(find(&program, "h")), &[p]);
        // a declares p, so it supplies it rather than capturing it
        assert!(captures.of(find(&program, "a")).is_empty());
        assert_eq!(captures.total(), 2);
    }

    #[test]
    fn recursion_converges() {
        let program = lower(serde_json::json!([
            {"kind": "fn", "name": "f", "body": [
                {"kind": "var", "name": "n", "ty": "int", "init": 3},
                {"kind": "fn", "name": "even", "body": [
                    {"kind": "expr", "expr": {"call": "odd"}}
                ]},
                {"kind": "fn", "name": "odd", "body": [
                    {"kind": "assign", "target": "n", "value": {"prim": "sub", "args": ["n", 1]}},
                    {"kind": "expr", "expr": {"call": "even"}}
                ]}
            ]}
        ]));
        let captures = Captures::compute(&program, &CallGraph::build(&program));
        let n = find(&program, "n");
        assert_eq!(captures.of(find(&program, "odd")), &[n]);
        assert_eq!(captures.of(find(&program, "even")), &[n]);
        assert_eq!(
            captures.capturing(),
            vec![find(&program, "even"), find(&program, "odd")]
        );
    }

    #[test]
    fn flat_program_captures_nothing() {
        let program = lower(serde_json::json!([
            {"kind": "var", "name": "global", "ty": "int", "init": 0},
            {"kind": "fn", "name": "f", "body": [
                {"kind": "assign", "target": "global", "value": 1}
            ]}
        ]));
        let captures = Captures::compute(&program, &CallGraph::build(&program));
        assert!(captures.is_empty());
    }
}
