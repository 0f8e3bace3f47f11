use strata_ast::{Flag, NodeKind, NodeTag, Program};

use crate::{CheckError, Rule};

/// The receiver does not exist yet while a constructor's formals are being
/// defaulted
pub struct ReceiverNotInDefaults;

impl Rule for ReceiverNotInDefaults {
    fn name(&self) -> &'static str {
        "receiver-not-in-defaults"
    }

    fn check(&self, program: &Program) -> Vec<CheckError> {
        let mut errors = Vec::new();
        for &f in program.registries().fns() {
            if !program.has_flag(f, Flag::Constructor)
                || program.has_flag(f, Flag::DefaultConstructor)
            {
                continue;
            }
            for formal_def in program.formal_defs(f) {
                let NodeKind::Def { sym, value: Some(default) } = program.kind(formal_def) else {
                    continue;
                };
                let uses_receiver = program
                    .collect(*default, NodeTag::SymRef)
                    .any(|r| match program.kind(r) {
                        NodeKind::SymRef(target) => program.has_flag(*target, Flag::Receiver),
                        _ => false,
                    });
                if uses_receiver {
                    errors.push(CheckError::ReceiverInDefault {
                        constructor: program.symbol(f).name.clone(),
                        formal: program.symbol(*sym).name.clone(),
                        span: program.span(formal_def),
                    });
                }
            }
        }
        errors
    }
}
