use strata_ast::{Flag, NodeKind, Program};

use crate::{CheckError, Rule};

/// A local needs a declared type or an initializer to take its type from
///
/// Compiler temporaries, loop index variables and return-value variables
/// get their types elsewhere and are exempt.
pub struct LocalsTypedOrInitialized;

const EXEMPT: [Flag; 3] = [Flag::Temp, Flag::IndexVar, Flag::ReturnValue];

impl Rule for LocalsTypedOrInitialized {
    fn name(&self) -> &'static str {
        "locals-typed-or-initialized"
    }

    fn check(&self, program: &Program) -> Vec<CheckError> {
        let mut errors = Vec::new();
        for &var in program.registries().vars() {
            let symbol = program.symbol(var);
            if program.declaring_fn(var).is_none()
                || !symbol.ty.is_unknown()
                || EXEMPT.iter().any(|flag| symbol.has_flag(*flag))
            {
                continue;
            }
            let Some(def) = symbol.def else {
                continue;
            };
            if let NodeKind::Def { value: None, .. } = program.kind(def) {
                errors.push(CheckError::UntypedLocal {
                    name: symbol.name.clone(),
                    span: program.span(def),
                });
            }
        }
        errors
    }
}
