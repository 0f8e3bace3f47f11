use strata_ast::{Flag, Program, RetTag};

use crate::{CheckError, Rule};

/// Iterators yield values lazily, so they cannot bind the caller's storage
/// and cannot return a type or a compile-time constant
pub struct IteratorSignatures;

impl Rule for IteratorSignatures {
    fn name(&self) -> &'static str {
        "iterator-signatures"
    }

    fn check(&self, program: &Program) -> Vec<CheckError> {
        let mut errors = Vec::new();
        for &f in program.registries().fns() {
            if !program.has_flag(f, Flag::Iterator) {
                continue;
            }
            let function = program.symbol(f);
            let span = function.def.map(|d| program.span(d)).unwrap_or_default();

            for formal in program.formals(f) {
                let arg = program.symbol(formal);
                if let Some(intent) = arg.intent().filter(|i| i.is_ref_like()) {
                    errors.push(CheckError::IteratorRefFormal {
                        function: function.name.clone(),
                        formal: arg.name.clone(),
                        intent: intent.as_str(),
                        span: arg.def.map(|d| program.span(d)).unwrap_or(span),
                    });
                }
            }

            if let Some(data) = function.fn_data() {
                if matches!(data.ret_tag, RetTag::Type | RetTag::Param) {
                    errors.push(CheckError::IteratorReturnTag {
                        function: function.name.clone(),
                        tag: data.ret_tag.as_str(),
                        span,
                    });
                }
            }
        }
        errors
    }
}
