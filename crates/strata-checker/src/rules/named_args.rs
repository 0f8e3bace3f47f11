use std::collections::BTreeMap;

use strata_ast::{NodeKind, Program, Span};

use crate::{CheckError, Rule};

/// A call may not pass the same named argument twice
///
/// One finding per distinct duplicated name per call; later occurrences
/// become notes.
pub struct DuplicateNamedArgs;

impl Rule for DuplicateNamedArgs {
    fn name(&self) -> &'static str {
        "duplicate-named-args"
    }

    fn check(&self, program: &Program) -> Vec<CheckError> {
        let mut errors = Vec::new();
        for &call in program.registries().calls() {
            let NodeKind::Call { name: callee, args, .. } = program.kind(call) else {
                continue;
            };

            // name -> spans of every occurrence, ordered by name for stable output
            let mut seen: BTreeMap<&str, Vec<Span>> = BTreeMap::new();
            for &arg in args {
                if let NodeKind::NamedArg { name, .. } = program.kind(arg) {
                    seen.entry(name.as_str()).or_default().push(program.span(arg));
                }
            }

            for (name, spans) in seen {
                if spans.len() > 1 {
                    errors.push(CheckError::DuplicateNamedArg {
                        name: name.to_string(),
                        callee: callee.clone(),
                        span: program.span(call),
                        repeats: spans[1..].to_vec(),
                    });
                }
            }
        }
        errors
    }
}
