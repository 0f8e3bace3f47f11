//! Return-path coverage
//!
//! Counts, along the least-defining path through a function body, how many
//! times the return value gets defined:
//!
//! - an assignment to the return-value variable, its initialized
//!   definition, `return expr`, a halt, or a call to a function that never
//!   returns each count one;
//! - a block counts the sum of its statements;
//! - a conditional counts the smaller of its branches (a missing `else`
//!   counts zero);
//! - `while`, `for` and `goto` count zero, since their bodies may not run;
//! - a `do-while` counts its body, unless a `break`, `continue` or `goto`
//!   inside it can leave the body early.

use strata_ast::{Flag, NodeId, NodeKind, NodeTag, PrimOp, Program, SymbolId};

use crate::{CheckError, Rule};

/// Minimum number of return-value definitions on any path through `f`
pub fn is_defined_all_paths(program: &Program, f: SymbolId) -> usize {
    let ret_var = program.symbol(f).fn_data().and_then(|data| data.ret_var);
    match program.fn_body(f) {
        Some(body) => count(program, body, ret_var),
        None => 0,
    }
}

fn count(program: &Program, id: NodeId, ret_var: Option<SymbolId>) -> usize {
    match program.kind(id) {
        NodeKind::Block { stmts } => stmts.iter().map(|s| count(program, *s, ret_var)).sum(),
        NodeKind::Cond {
            then_block,
            else_block,
            ..
        } => {
            let then_count = count(program, *then_block, ret_var);
            let else_count = else_block.map_or(0, |e| count(program, e, ret_var));
            then_count.min(else_count)
        }
        NodeKind::While {
            body,
            test_first: false,
            ..
        } if !exits_early(program, *body) => count(program, *body, ret_var),
        NodeKind::Assign { target, .. } => match (program.kind(*target), ret_var) {
            (NodeKind::SymRef(sym), Some(ret)) => usize::from(*sym == ret),
            _ => 0,
        },
        NodeKind::Def {
            sym,
            value: Some(_),
        } => usize::from(Some(*sym) == ret_var),
        NodeKind::Return { value: Some(_) } => 1,
        NodeKind::Prim {
            op: PrimOp::Halt, ..
        } => 1,
        NodeKind::Call {
            callee: Some(callee),
            ..
        } => usize::from(program.has_flag(*callee, Flag::FunctionTerminatesProgram)),
        _ => 0,
    }
}

fn exits_early(program: &Program, body: NodeId) -> bool {
    [NodeTag::Break, NodeTag::Continue, NodeTag::Goto]
        .into_iter()
        .any(|tag| program.collect(body, tag).skip_nested_fns().next().is_some())
}

/// Whether the return value's only definition is the default value its
/// declared type gives it
fn only_default_defines(program: &Program, f: SymbolId) -> bool {
    if !program.has_flag(f, Flag::SpecifiedReturnType) {
        return false;
    }
    let Some(ret_var) = program.symbol(f).fn_data().and_then(|data| data.ret_var) else {
        return false;
    };
    program
        .symbol(ret_var)
        .def
        .is_some_and(|def| matches!(program.kind(def), NodeKind::Def { value: Some(_), .. }))
}

/// Warn when control can fall off the end of a value-returning function
pub struct ReturnCoverage;

impl Rule for ReturnCoverage {
    fn name(&self) -> &'static str {
        "return-coverage"
    }

    fn check(&self, program: &Program) -> Vec<CheckError> {
        let mut warnings = Vec::new();
        for &f in program.registries().fns() {
            let symbol = program.symbol(f);
            if symbol.ty.is_void()
                || symbol.has_flag(Flag::Iterator)
                || symbol.has_flag(Flag::Extern)
            {
                continue;
            }
            let defined = is_defined_all_paths(program, f);
            if defined == 0 || (defined == 1 && only_default_defines(program, f)) {
                warnings.push(CheckError::MissingReturn {
                    function: symbol.name.clone(),
                    span: symbol.def.map(|d| program.span(d)).unwrap_or_default(),
                });
            }
        }
        warnings
    }
}
