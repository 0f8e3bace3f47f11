//! Closure conversion: flatten nested functions to module scope
//!
//! Every function nested inside another becomes a module-level function that
//! receives its captured outer variables as extra trailing formals, and every
//! call to it passes them. The pass runs in three phases:
//!
//! 1. Analysis: capture sets are solved to a fixpoint and every call site is
//!    planned. Nothing is mutated until this phase succeeds.
//! 2. Call-site rewrite: extra actuals are appended while they can still
//!    name the original captured symbols.
//! 3. Function rewrite: extra formals are appended, uses inside the body are
//!    redirected to them, and definitions are relocated to module scope
//!    together with their local type definitions.

use std::collections::HashSet;

use log::{debug, info};
use strata_ast::{
    ArgData, AstError, Diagnostics, Flag, Intent, NodeId, NodeKind, NodeTag, PrimOp, Program,
    Symbol, SymbolId, SymbolKind,
};
use strata_symbols::CallGraph;

use crate::analysis::Captures;
use crate::{FlattenError, OptError, OptimizationPass, PassResult};

/// Iterator-protocol helpers whose calling convention takes captured
/// variables as they are: call sites pass the variable itself and the body
/// uses the new formal directly, with no temporaries on either side
pub const ITERATOR_HELPERS: [&str; 4] = ["these", "to_leader", "to_follower", "to_standalone"];

/// Closure conversion pass
pub struct FlattenFunctions;

impl OptimizationPass for FlattenFunctions {
    fn name(&self) -> &'static str {
        "flatten-functions"
    }

    fn run(&self, program: &mut Program, _diags: &mut Diagnostics) -> Result<PassResult, OptError> {
        check_calls_resolved(program)?;

        let nested = nested_functions(program);
        if nested.is_empty() {
            debug!("flatten-functions: no nested functions");
            return Ok(PassResult::unchanged());
        }

        let graph = CallGraph::build(program);
        let captures = Captures::compute(program, &graph);
        let plan = plan_call_sites(program, &captures)?;

        let mut pass_through = HashSet::new();
        for rewrite in &plan {
            rewrite_call(program, rewrite, &mut pass_through)?;
        }
        for f in captures.capturing() {
            rewrite_function(program, f, captures.of(f), &pass_through)?;
        }
        let hoisted = relocate(program, &nested)?;

        info!(
            "flatten-functions: {} functions moved to module scope, {} captures, {} call sites",
            nested.len(),
            captures.total(),
            plan.len()
        );
        Ok(PassResult {
            modified: true,
            stats: vec![
                ("flattened", nested.len()),
                ("capturing", captures.capturing().len()),
                ("captures", captures.total()),
                ("call-sites", plan.len()),
                ("hoisted-types", hoisted),
                ("fixpoint-sweeps", captures.sweeps),
            ],
        })
    }
}

/// How a call site supplies one captured variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Actual {
    /// The caller declares the variable: pass a take-address temporary
    AddressOf(SymbolId),
    /// The caller declares the variable, which has no reference form: pass
    /// a by-value temporary
    Copy(SymbolId),
    /// Pass the variable itself; when the caller captures it too, its own
    /// new formal takes the variable's place
    Direct(SymbolId),
}

struct CallRewrite {
    call: NodeId,
    actuals: Vec<Actual>,
}

fn check_calls_resolved(program: &Program) -> Result<(), FlattenError> {
    for &call in program.registries().calls() {
        if let NodeKind::Call {
            callee: None, name, ..
        } = program.kind(call)
        {
            return Err(FlattenError::UnresolvedCall {
                name: name.clone(),
                call,
                span: program.span(call),
            });
        }
    }
    Ok(())
}

/// Nested functions in pre-order, outer before inner
fn nested_functions(program: &Program) -> Vec<SymbolId> {
    program
        .roots()
        .flat_map(|root| program.collect(root, NodeTag::FnDef))
        .filter_map(|def| program.kind(def).defined_symbol())
        .filter(|f| program.is_nested_fn(*f))
        .collect()
}

fn is_iterator_helper(program: &Program, f: SymbolId) -> bool {
    ITERATOR_HELPERS.contains(&program.symbol(f).name.as_str())
}

fn plan_call_sites(program: &Program, captures: &Captures) -> Result<Vec<CallRewrite>, FlattenError> {
    let mut plan = Vec::new();
    for callee in captures.capturing() {
        let helper = is_iterator_helper(program, callee);
        let mut calls = program
            .symbol(callee)
            .fn_data()
            .map(|data| data.called_by.clone())
            .unwrap_or_default();
        calls.sort();

        for call in calls {
            let caller = program.enclosing_fn(call);
            let actuals = captures
                .of(callee)
                .iter()
                .map(|&var| plan_actual(program, captures, call, caller, callee, var, helper))
                .collect::<Result<Vec<_>, _>>()?;
            plan.push(CallRewrite { call, actuals });
        }
    }
    Ok(plan)
}

fn plan_actual(
    program: &Program,
    captures: &Captures,
    call: NodeId,
    caller: Option<SymbolId>,
    callee: SymbolId,
    var: SymbolId,
    helper: bool,
) -> Result<Actual, FlattenError> {
    let Some(caller) = caller else {
        return Err(capture_unavailable(program, call, "module scope", callee, var));
    };
    if program.declaring_fn(var) == Some(caller) {
        if helper {
            Ok(Actual::Direct(var))
        } else if program.symbol(var).ty.has_ref_form() {
            Ok(Actual::AddressOf(var))
        } else {
            Ok(Actual::Copy(var))
        }
    } else if captures.of(caller).contains(&var) {
        Ok(Actual::Direct(var))
    } else {
        let caller_name = program.symbol(caller).name.clone();
        Err(capture_unavailable(program, call, &caller_name, callee, var))
    }
}

fn capture_unavailable(
    program: &Program,
    call: NodeId,
    caller: &str,
    callee: SymbolId,
    var: SymbolId,
) -> FlattenError {
    FlattenError::CaptureUnavailable {
        callee: program.symbol(callee).name.clone(),
        caller: caller.to_string(),
        variable: program.symbol(var).name.clone(),
        span: program.span(call),
    }
}

/// Append the planned actuals, materializing temporaries before the
/// statement that contains the call
fn rewrite_call(
    program: &mut Program,
    rewrite: &CallRewrite,
    pass_through: &mut HashSet<NodeId>,
) -> Result<(), AstError> {
    let call = rewrite.call;
    let span = program.span(call);
    let anchor = program
        .enclosing_stmt(call)
        .ok_or(AstError::Detached(call))?;

    for actual in &rewrite.actuals {
        let arg = match *actual {
            Actual::Direct(var) => {
                let arg = program.sym_ref(var, span);
                pass_through.insert(arg);
                arg
            }
            Actual::AddressOf(var) | Actual::Copy(var) => {
                let ty = program.symbol(var).ty.clone();
                let var_ref = program.sym_ref(var, span);
                let (temp_ty, init) = match actual {
                    Actual::AddressOf(_) => {
                        let addr = program.add_node(
                            NodeKind::Prim {
                                op: PrimOp::AddrOf,
                                args: vec![var_ref],
                            },
                            span,
                        );
                        (ty.ref_form().unwrap_or(ty), addr)
                    }
                    _ => (ty, var_ref),
                };
                let temp = program.new_temp(temp_ty);
                let temp_def = program.def(temp, Some(init), span);
                program.insert_before(anchor, temp_def)?;
                program.sym_ref(temp, span)
            }
        };
        program.append(call, arg)?;
    }
    Ok(())
}

/// Role of one reference to a captured variable inside a capturing function
enum Use {
    /// Operand of an address-of primitive (the primitive node)
    AddressOf(NodeId),
    /// Target of an assignment
    Store,
    Read,
}

/// Append one formal per capture and redirect the body's uses to it
fn rewrite_function(
    program: &mut Program,
    f: SymbolId,
    caps: &[SymbolId],
    pass_through: &HashSet<NodeId>,
) -> Result<(), AstError> {
    let Some(def) = program.fn_def(f) else {
        return Ok(());
    };
    let helper = is_iterator_helper(program, f);

    for &var in caps {
        let captured = program.symbol(var);
        let by_ref = captured.ty.ref_form();
        let (ty, intent) = match by_ref.clone() {
            Some(ref_ty) => (ref_ty, Intent::Ref),
            None => (captured.ty.clone(), Intent::Blank),
        };
        let name = captured.name.clone();
        let span = captured.def.map(|d| program.span(d)).unwrap_or_default();

        let formal = program.add_symbol(Symbol::new(name, SymbolKind::Arg(ArgData { intent }), ty));
        let formal_def = program.def(formal, None, span);
        program.append(def, formal_def)?;
        program.attach_flag(var, Flag::Captured);

        let uses: Vec<NodeId> = program
            .collect(def, NodeTag::SymRef)
            .skip_nested_fns()
            .filter(|id| matches!(program.kind(*id), NodeKind::SymRef(sym) if *sym == var))
            .collect();
        for node in uses {
            if !program.node(node).is_live() {
                continue;
            }
            if by_ref.is_none() || helper || pass_through.contains(&node) {
                program.set_ref(node, formal)?;
            } else {
                substitute_through_ref(program, f, node, formal)?;
            }
        }
        debug!(
            "{}: captured '{}' becomes formal {}",
            program.symbol(f).name,
            program.symbol(var).name,
            formal
        );
    }
    Ok(())
}

/// Redirect one use of a by-reference capture to the reference formal
fn substitute_through_ref(
    program: &mut Program,
    f: SymbolId,
    node: NodeId,
    formal: SymbolId,
) -> Result<(), AstError> {
    let span = program.span(node);
    let role = match program.parent(node).map(|p| (p, program.kind(p))) {
        Some((parent, NodeKind::Prim { op: PrimOp::AddrOf, .. })) => Use::AddressOf(parent),
        Some((_, NodeKind::Assign { target, .. })) if *target == node => Use::Store,
        _ => Use::Read,
    };

    let formal_ref = program.sym_ref(formal, span);
    match role {
        // The formal already is the address
        Use::AddressOf(prim) => program.replace(prim, formal_ref),
        Use::Store => {
            let deref = deref_node(program, formal_ref);
            program.replace(node, deref)
        }
        Use::Read => {
            let deref = deref_node(program, formal_ref);
            let body = program.fn_body(f);
            let stmt = program
                .enclosing_stmt(node)
                .filter(|stmt| body.is_some_and(|b| program.is_ancestor(b, *stmt)));
            match stmt {
                Some(stmt) => {
                    let value_ty = program.symbol(formal).ty.value_type().clone();
                    let temp = program.new_temp(value_ty);
                    let temp_def = program.def(temp, Some(deref), span);
                    program.insert_before(stmt, temp_def)?;
                    let temp_ref = program.sym_ref(temp, span);
                    program.replace(node, temp_ref)
                }
                // Formal defaults have no statement to precede
                None => program.replace(node, deref),
            }
        }
    }
}

fn deref_node(program: &mut Program, operand: NodeId) -> NodeId {
    let span = program.span(operand);
    program.add_node(
        NodeKind::Prim {
            op: PrimOp::Deref,
            args: vec![operand],
        },
        span,
    )
}

/// Move nested definitions in front of their outermost enclosing function,
/// then hoist their local types in front of them; returns the number of
/// hoisted types
fn relocate(program: &mut Program, nested: &[SymbolId]) -> Result<usize, AstError> {
    // Anchors are taken before anything moves; module-level functions stay put
    let moves: Vec<(SymbolId, NodeId, NodeId)> = nested
        .iter()
        .filter_map(|&f| {
            let outermost = *program.lexical_ancestors(f).last()?;
            Some((f, program.fn_def(f)?, program.fn_def(outermost)?))
        })
        .collect();

    let mut hoisted = 0;
    for (f, def, anchor) in moves {
        program.detach(def)?;
        program.insert_before(anchor, def)?;
        program.attach_flag(f, Flag::Flattened);

        let Some(body) = program.fn_body(f) else {
            continue;
        };
        let types: Vec<NodeId> = program
            .collect(body, NodeTag::Def)
            .skip_nested_fns()
            .filter(|d| {
                matches!(program.kind(*d), NodeKind::Def { sym, .. }
                    if matches!(program.symbol(*sym).kind, SymbolKind::Type))
            })
            .collect();
        for ty_def in types {
            program.detach(ty_def)?;
            program.insert_before(def, ty_def)?;
            hoisted += 1;
        }
        debug!("flattened {}", program.symbol(f).name);
    }
    Ok(hoisted)
}
