use strata_ast::{Flag, NodeKind, Program};

use crate::{CheckError, Rule};

/// Top-level compile-time constants need an initializer
pub struct ParamsInitialized;

impl Rule for ParamsInitialized {
    fn name(&self) -> &'static str {
        "params-initialized"
    }

    fn check(&self, program: &Program) -> Vec<CheckError> {
        let mut errors = Vec::new();
        for &var in program.registries().vars() {
            if !program.has_flag(var, Flag::Param) || program.declaring_fn(var).is_some() {
                continue;
            }
            let symbol = program.symbol(var);
            let Some(def) = symbol.def else {
                continue;
            };
            if let NodeKind::Def { value: None, .. } = program.kind(def) {
                errors.push(CheckError::UninitializedParam {
                    name: symbol.name.clone(),
                    span: program.span(def),
                });
            }
        }
        errors
    }
}
