//! Resolution of calls the front-end left unbound

use strata_ast::{NodeId, Program, SymbolId};

use crate::SymbolError;

/// Binds a call by name to a module-level function of any module
pub struct CallSiteResolver;

impl CallSiteResolver {
    /// Find the target of an unresolved call
    pub fn resolve(program: &Program, call: NodeId, name: &str) -> Result<SymbolId, SymbolError> {
        let candidates: Vec<SymbolId> = program
            .registries()
            .fns()
            .iter()
            .copied()
            .filter(|f| program.symbol(*f).name == name && program.declaring_fn(*f).is_none())
            .collect();

        match candidates.as_slice() {
            [only] => Ok(*only),
            [] => Err(SymbolError::UnresolvedCall {
                name: name.to_string(),
                span: program.span(call),
                caller: Self::caller_name(program, call),
            }),
            many => Err(SymbolError::AmbiguousCall {
                name: name.to_string(),
                span: program.span(call),
                candidates: many.len(),
            }),
        }
    }

    fn caller_name(program: &Program, call: NodeId) -> String {
        program
            .node(call)
            .parent_sym
            .map(|scope| program.symbol(scope).name.clone())
            .unwrap_or_default()
    }
}
