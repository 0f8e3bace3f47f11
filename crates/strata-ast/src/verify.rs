//! Structural invariant checks run at every pipeline checkpoint
//!
//! A violation here is a bug in the pass that just ran, never a problem in
//! the user's program.

use std::collections::HashSet;

use thiserror::Error;

use crate::{NodeId, NodeKind, Program, SymbolId, SymbolKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("node {node} is reachable more than once (shared child or cycle)")]
    SharedNode { node: NodeId },

    #[error("destroyed node {node} is still reachable from {parent}")]
    DeadNodeReachable { node: NodeId, parent: NodeId },

    #[error("node {node} is owned by {owner} but records parent {recorded:?}")]
    ParentMismatch {
        node: NodeId,
        owner: NodeId,
        recorded: Option<NodeId>,
    },

    #[error("node {node} records parent symbol {recorded:?}, expected {expected:?}")]
    ParentSymbolMismatch {
        node: NodeId,
        recorded: Option<SymbolId>,
        expected: Option<SymbolId>,
    },

    #[error("definition {node} binds {sym}, whose declaration points at {recorded:?}")]
    DeclarationMismatch {
        node: NodeId,
        sym: SymbolId,
        recorded: Option<NodeId>,
    },

    #[error("node {node} refers to destroyed symbol {sym}")]
    DanglingSymbol { node: NodeId, sym: SymbolId },

    #[error("call {node} targets {sym}, which is not a function")]
    CalleeNotFunction { node: NodeId, sym: SymbolId },

    #[error("while loop {node} does not test a symbol reference")]
    MalformedWhile { node: NodeId },

    #[error("module root {node} is not a block owned by its module")]
    MalformedRoot { node: NodeId },

    #[error("registries disagree with the nodes reachable from the roots")]
    RegistryMismatch,

    #[error("function {sym} lists call site {call}, which does not call it")]
    StaleCallSite { sym: SymbolId, call: NodeId },
}

/// Check every structural invariant; an empty result means the AST is sound
pub fn verify(program: &Program) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let mut reachable = HashSet::new();

    for &module in program.modules() {
        let Some(root) = program.module_block(module) else {
            continue;
        };
        let node = program.node(root);
        if node.parent.is_some()
            || node.parent_sym != Some(module)
            || !matches!(node.kind, NodeKind::Block { .. })
        {
            violations.push(InvariantViolation::MalformedRoot { node: root });
        }
        walk(program, root, &mut reachable, &mut violations);
    }

    if !program.compute_registries().same_entries(program.registries()) {
        violations.push(InvariantViolation::RegistryMismatch);
    }

    for &f in program.registries().fns() {
        let Some(data) = program.symbol(f).fn_data() else {
            continue;
        };
        for &call in &data.called_by {
            let live = reachable.contains(&call);
            if !live || program.callee(call) != Some(f) {
                violations.push(InvariantViolation::StaleCallSite { sym: f, call });
            }
        }
    }

    violations
}

fn walk(
    program: &Program,
    root: NodeId,
    reachable: &mut HashSet<NodeId>,
    violations: &mut Vec<InvariantViolation>,
) {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !reachable.insert(id) {
            violations.push(InvariantViolation::SharedNode { node: id });
            continue;
        }
        let node = program.node(id);
        check_node(program, id, violations);

        let child_scope = match node.kind {
            NodeKind::FnDef { sym, .. } => Some(sym),
            _ => node.parent_sym,
        };
        for child in node.kind.children() {
            let child_node = program.node(child);
            if !child_node.is_live() {
                violations.push(InvariantViolation::DeadNodeReachable {
                    node: child,
                    parent: id,
                });
                continue;
            }
            if child_node.parent != Some(id) {
                violations.push(InvariantViolation::ParentMismatch {
                    node: child,
                    owner: id,
                    recorded: child_node.parent,
                });
            }
            if child_node.parent_sym != child_scope {
                violations.push(InvariantViolation::ParentSymbolMismatch {
                    node: child,
                    recorded: child_node.parent_sym,
                    expected: child_scope,
                });
            }
            stack.push(child);
        }
    }
}

fn check_node(program: &Program, id: NodeId, violations: &mut Vec<InvariantViolation>) {
    match &program.node(id).kind {
        NodeKind::SymRef(sym) => {
            if !program.symbol(*sym).is_live() {
                violations.push(InvariantViolation::DanglingSymbol { node: id, sym: *sym });
            }
        }
        NodeKind::Call {
            callee: Some(sym), ..
        } => {
            let target = program.symbol(*sym);
            if !target.is_live() {
                violations.push(InvariantViolation::DanglingSymbol { node: id, sym: *sym });
            } else if !matches!(target.kind, SymbolKind::Fn(_)) {
                violations.push(InvariantViolation::CalleeNotFunction { node: id, sym: *sym });
            }
        }
        NodeKind::While { cond, .. } => {
            if !matches!(program.kind(*cond), NodeKind::SymRef(_)) {
                violations.push(InvariantViolation::MalformedWhile { node: id });
            }
        }
        NodeKind::Def { sym, .. } | NodeKind::FnDef { sym, .. } => {
            let symbol = program.symbol(*sym);
            if !symbol.is_live() {
                violations.push(InvariantViolation::DanglingSymbol { node: id, sym: *sym });
            } else if symbol.def != Some(id) {
                violations.push(InvariantViolation::DeclarationMismatch {
                    node: id,
                    sym: *sym,
                    recorded: symbol.def,
                });
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Span, Symbol, Ty};

    #[test]
    fn empty_program_is_sound() {
        let mut program = Program::new();
        program.add_module("m", Span::dummy());
        assert!(verify(&program).is_empty());
    }

    #[test]
    fn reference_to_destroyed_symbol_is_reported() {
        let mut program = Program::new();
        let module = program.add_module("m", Span::dummy());
        let root = program.module_block(module).unwrap();

        let x = program.add_symbol(Symbol::new("x", SymbolKind::Var, Ty::Int));
        let x_def = program.def(x, None, Span::dummy());
        program.append(root, x_def).unwrap();
        let use_x = program.sym_ref(x, Span::dummy());
        let ret = program.add_node(NodeKind::Return { value: Some(use_x) }, Span::dummy());
        program.append(root, ret).unwrap();

        program.remove(x_def).unwrap();

        assert_eq!(
            verify(&program),
            vec![InvariantViolation::DanglingSymbol { node: use_x, sym: x }]
        );
    }
}
