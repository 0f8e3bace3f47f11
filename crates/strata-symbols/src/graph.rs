//! Function-level call graph

use std::collections::HashMap;

use strata_ast::{NodeId, Program, SymbolId};

/// Caller/callee relation between live functions
///
/// Built from the resolved callee of every registered call. Calls made from
/// module-level code have no calling function and contribute no edge.
#[derive(Debug, Default, Clone)]
pub struct CallGraph {
    /// All live functions in registry order
    functions: Vec<SymbolId>,

    /// Function to its position in `functions`
    index: HashMap<SymbolId, usize>,

    /// Distinct callees per function, in first-call order
    callees: Vec<Vec<SymbolId>>,

    /// Distinct callers per function, in first-call order
    callers: Vec<Vec<SymbolId>>,
}

impl CallGraph {
    /// Build the graph from the program's resolved calls
    pub fn build(program: &Program) -> Self {
        let functions = program.registries().fns().to_vec();
        let index: HashMap<SymbolId, usize> = functions
            .iter()
            .enumerate()
            .map(|(i, f)| (*f, i))
            .collect();
        let mut graph = CallGraph {
            callees: vec![Vec::new(); functions.len()],
            callers: vec![Vec::new(); functions.len()],
            functions,
            index,
        };

        for &call in program.registries().calls() {
            let (Some(caller), Some(callee)) = (program.enclosing_fn(call), program.callee(call))
            else {
                continue;
            };
            graph.add_edge(caller, callee);
        }
        graph
    }

    fn add_edge(&mut self, caller: SymbolId, callee: SymbolId) {
        let (Some(&from), Some(&to)) = (self.index.get(&caller), self.index.get(&callee)) else {
            return;
        };
        if !self.callees[from].contains(&callee) {
            self.callees[from].push(callee);
        }
        if !self.callers[to].contains(&caller) {
            self.callers[to].push(caller);
        }
    }

    pub fn functions(&self) -> &[SymbolId] {
        &self.functions
    }

    /// Position of a function in [`functions`](Self::functions)
    pub fn index_of(&self, f: SymbolId) -> Option<usize> {
        self.index.get(&f).copied()
    }

    pub fn callees(&self, f: SymbolId) -> &[SymbolId] {
        self.index_of(f)
            .map(|i| self.callees[i].as_slice())
            .unwrap_or_default()
    }

    pub fn callers(&self, f: SymbolId) -> &[SymbolId] {
        self.index_of(f)
            .map(|i| self.callers[i].as_slice())
            .unwrap_or_default()
    }

    /// Callee lists as indices into [`functions`](Self::functions), the form
    /// the fixpoint driver takes
    pub fn successors(&self) -> Vec<Vec<usize>> {
        self.callees
            .iter()
            .map(|callees| {
                callees
                    .iter()
                    .filter_map(|f| self.index.get(f).copied())
                    .collect()
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Check that call-site lists and resolved callees agree in both directions
///
/// Returns every (function, call) pair that breaks the correspondence: a
/// resolved call missing from its callee's list, or a listed call that does
/// not target the function.
pub fn check_bidirectional(program: &Program) -> Vec<(SymbolId, NodeId)> {
    let mut broken = Vec::new();
    for &call in program.registries().calls() {
        if let Some(f) = program.callee(call) {
            let listed = program
                .symbol(f)
                .fn_data()
                .is_some_and(|data| data.called_by.contains(&call));
            if !listed {
                broken.push((f, call));
            }
        }
    }
    for &f in program.registries().fns() {
        let Some(data) = program.symbol(f).fn_data() else {
            continue;
        };
        for &call in &data.called_by {
            if program.callee(call) != Some(f) {
                broken.push((f, call));
            }
        }
    }
    broken
}
