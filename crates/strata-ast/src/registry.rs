//! Whole-program registries
//!
//! Passes that sweep the entire program (every call, every function) iterate
//! a registry instead of walking from the roots. An entry is present iff the
//! node or symbol is reachable from a module root; the mutators in
//! [`Program`](crate::Program) keep that true and the checkpoint verifies it.

use std::collections::HashSet;

use crate::{NodeId, SymbolId, SymbolKind};

/// Insertion-ordered, non-owning collections of live program entities
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registries {
    calls: Vec<NodeId>,
    fns: Vec<SymbolId>,
    vars: Vec<SymbolId>,
    args: Vec<SymbolId>,
    types: Vec<SymbolId>,
    modules: Vec<SymbolId>,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    /// All call expressions
    pub fn calls(&self) -> &[NodeId] {
        &self.calls
    }

    /// All function symbols
    pub fn fns(&self) -> &[SymbolId] {
        &self.fns
    }

    /// All variable symbols
    pub fn vars(&self) -> &[SymbolId] {
        &self.vars
    }

    /// All formal argument symbols
    pub fn args(&self) -> &[SymbolId] {
        &self.args
    }

    /// All type symbols
    pub fn types(&self) -> &[SymbolId] {
        &self.types
    }

    pub fn modules(&self) -> &[SymbolId] {
        &self.modules
    }

    pub(crate) fn register_call(&mut self, call: NodeId) {
        if !self.calls.contains(&call) {
            self.calls.push(call);
        }
    }

    pub(crate) fn deregister_call(&mut self, call: NodeId) {
        self.calls.retain(|c| *c != call);
    }

    pub(crate) fn register_symbol(&mut self, sym: SymbolId, kind: &SymbolKind) {
        let list = self.list_for(kind);
        if !list.contains(&sym) {
            list.push(sym);
        }
    }

    pub(crate) fn deregister_symbol(&mut self, sym: SymbolId, kind: &SymbolKind) {
        self.list_for(kind).retain(|s| *s != sym);
    }

    fn list_for(&mut self, kind: &SymbolKind) -> &mut Vec<SymbolId> {
        match kind {
            SymbolKind::Var => &mut self.vars,
            SymbolKind::Arg(_) => &mut self.args,
            SymbolKind::Fn(_) => &mut self.fns,
            SymbolKind::Type => &mut self.types,
            SymbolKind::Module(_) => &mut self.modules,
        }
    }

    /// Compare contents, ignoring order
    pub fn same_entries(&self, other: &Registries) -> bool {
        fn same<T: std::hash::Hash + Eq + Copy>(a: &[T], b: &[T]) -> bool {
            a.len() == b.len()
                && a.iter().copied().collect::<HashSet<_>>()
                    == b.iter().copied().collect::<HashSet<_>>()
        }
        same(&self.calls, &other.calls)
            && same(&self.fns, &other.fns)
            && same(&self.vars, &other.vars)
            && same(&self.args, &other.args)
            && same(&self.types, &other.types)
            && same(&self.modules, &other.modules)
    }
}
