use strata_ast::{Flag, Program};

use crate::{CheckError, Rule};

/// Configuration variables are settable from outside the program, so they
/// must live at module scope
pub struct ConfigAtModuleScope;

impl Rule for ConfigAtModuleScope {
    fn name(&self) -> &'static str {
        "config-at-module-scope"
    }

    fn check(&self, program: &Program) -> Vec<CheckError> {
        program
            .registries()
            .vars()
            .iter()
            .filter(|var| program.has_flag(**var, Flag::Config))
            .filter(|var| program.declaring_fn(**var).is_some())
            .map(|var| {
                let symbol = program.symbol(*var);
                CheckError::ConfigNotAtModuleScope {
                    name: symbol.name.clone(),
                    span: symbol.def.map(|d| program.span(d)).unwrap_or_default(),
                }
            })
            .collect()
    }
}
