//! Sanity checks once closure conversion has run

use strata_ast::{Flag, Program};

use crate::{CheckError, Rule};

/// Every function lives at module scope
pub struct NoNestedFunctions;

impl Rule for NoNestedFunctions {
    fn name(&self) -> &'static str {
        "no-nested-functions"
    }

    fn check(&self, program: &Program) -> Vec<CheckError> {
        program
            .registries()
            .fns()
            .iter()
            .filter(|f| program.is_nested_fn(**f))
            .map(|f| {
                let symbol = program.symbol(*f);
                CheckError::NestedAfterFlattening {
                    function: symbol.name.clone(),
                    span: symbol.def.map(|d| program.span(d)).unwrap_or_default(),
                }
            })
            .collect()
    }
}

/// Every resolved call passes exactly one actual per formal
pub struct ArityAgreement;

impl Rule for ArityAgreement {
    fn name(&self) -> &'static str {
        "arity-agreement"
    }

    fn check(&self, program: &Program) -> Vec<CheckError> {
        let mut errors = Vec::new();
        for &call in program.registries().calls() {
            let (Some(callee), Some(args)) = (program.callee(call), program.call_args(call)) else {
                continue;
            };
            // Extern declarations may be variadic
            if program.has_flag(callee, Flag::Extern) {
                continue;
            }
            let formals = program.formal_defs(callee).len();
            if args.len() != formals {
                errors.push(CheckError::ArityMismatch {
                    callee: program.symbol(callee).name.clone(),
                    actuals: args.len(),
                    formals,
                    span: program.span(call),
                });
            }
        }
        errors
    }
}
