use strata_ast::{verify, NodeKind, NodeTag, Program, SymbolId};

pub fn find(program: &Program, name: &str) -> SymbolId {
    program
        .symbols()
        .find(|(_, sym)| sym.name == name)
        .map(|(id, _)| id)
        .unwrap_or_else(|| panic!("Expected a symbol named {}", name))
}

/// Assert every guarantee a backend relies on
pub fn assert_ready_for_codegen(program: &Program) {
    let violations = verify(program);
    assert!(violations.is_empty(), "{:?}", violations);

    for &f in program.registries().fns() {
        assert!(
            !program.is_nested_fn(f),
            "{} is still nested",
            program.symbol(f).name
        );
    }

    for &module in program.modules() {
        let Some(root) = program.module_block(module) else {
            continue;
        };
        for call in program.collect(root, NodeTag::Call) {
            let NodeKind::Call {
                callee: Some(callee),
                name,
                args,
            } = program.kind(call)
            else {
                continue;
            };
            assert_eq!(
                args.len(),
                program.formals(*callee).len(),
                "call to {} disagrees with its formals",
                name
            );
        }
    }
}
