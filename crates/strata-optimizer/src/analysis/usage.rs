//! Per-function usage facts
//!
//! Tracks which locals have their address taken and which expressions are
//! free of side effects, so that dead-store elimination only removes
//! assignments nobody can observe.

use std::collections::HashSet;

use strata_ast::{NodeId, NodeKind, NodeTag, PrimOp, Program, SymbolId};

/// Symbols whose address is taken somewhere in the body of `f`
///
/// A store to such a symbol may be read through the reference, so local
/// liveness says nothing about it.
pub fn address_taken(program: &Program, f: SymbolId) -> HashSet<SymbolId> {
    let Some(def) = program.fn_def(f) else {
        return HashSet::new();
    };
    program
        .collect(def, NodeTag::Prim)
        .filter_map(|id| match program.kind(id) {
            NodeKind::Prim {
                op: PrimOp::AddrOf,
                args,
            } => args.first().copied(),
            _ => None,
        })
        .filter_map(|arg| match program.kind(arg) {
            NodeKind::SymRef(sym) => Some(*sym),
            _ => None,
        })
        .collect()
}

/// Check if evaluating an expression cannot have side effects
///
/// We're conservative here: any call might be effectful, and so is a
/// primitive that terminates the program.
pub fn is_pure(program: &Program, expr: NodeId) -> bool {
    program.collect_all(expr).all(|id| match program.kind(id) {
        NodeKind::Call { .. } => false,
        NodeKind::Prim { op, .. } => !op.has_side_effects(),
        _ => true,
    })
}
