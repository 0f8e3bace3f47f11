//! Dead-store elimination pass
//!
//! Removes assignments to locals whose value is never read afterwards, using
//! live-variable analysis. Removing a store can make an earlier one dead, so
//! each function is re-analyzed (on a fresh CFG) until nothing changes.

use std::collections::HashSet;

use log::{debug, info};
use strata_ast::{Diagnostics, Flag, NodeId, NodeKind, Program, SymbolId};
use strata_dataflow::{analyze, Cfg, Item};

use crate::analysis::{address_taken, is_pure};
use crate::{OptError, OptimizationPass, PassResult};

/// Dead-store elimination pass
///
/// A store `x = e` is removed when:
/// - `x` is a local of the function, not live right after the store
/// - `x` never has its address taken and is not captured by a nested function
/// - `x` is not the function's return-value variable
/// - evaluating `e` has no side effects
pub struct DeadStoreElimination;

impl OptimizationPass for DeadStoreElimination {
    fn name(&self) -> &'static str {
        "dead-store-elimination"
    }

    fn run(&self, program: &mut Program, _diags: &mut Diagnostics) -> Result<PassResult, OptError> {
        let functions: Vec<SymbolId> = program
            .registries()
            .fns()
            .iter()
            .copied()
            .filter(|f| !program.has_flag(*f, Flag::Extern) && program.fn_body(*f).is_some())
            .collect();

        let mut removed = 0;
        let mut rounds = 0;
        for f in functions {
            loop {
                rounds += 1;
                let dead = dead_stores(program, f)?;
                if dead.is_empty() {
                    break;
                }
                for store in &dead {
                    program.remove(*store)?;
                }
                debug!(
                    "{}: removed {} dead stores",
                    program.symbol(f).name,
                    dead.len()
                );
                removed += dead.len();
            }
        }

        info!("dead-store-elimination: removed {} stores", removed);
        Ok(PassResult {
            modified: removed > 0,
            stats: vec![("removed", removed), ("rounds", rounds)],
        })
    }
}

/// Stores in `f` that no later read can observe
pub fn dead_stores(program: &Program, f: SymbolId) -> Result<Vec<NodeId>, OptError> {
    let cfg = Cfg::build(program, f)?;
    let liveness = analyze(program, &cfg)?;
    let escaped = address_taken(program, f);

    let mut dead = Vec::new();
    for block in cfg.block_ids() {
        let live_after = liveness.live_after_items(program, &cfg, block)?;
        for (item, live) in cfg.block(block).items.iter().zip(&live_after) {
            let Item::Stmt(stmt) = *item else {
                continue;
            };
            let NodeKind::Assign { target, value } = program.kind(stmt) else {
                continue;
            };
            let NodeKind::SymRef(var) = program.kind(*target) else {
                continue;
            };
            let Some(&bit) = liveness.index.get(var) else {
                continue;
            };
            if live.contains(bit) || !removable(program, *var, &escaped) || !is_pure(program, *value)
            {
                continue;
            }
            dead.push(stmt);
        }
    }
    Ok(dead)
}

fn removable(program: &Program, var: SymbolId, escaped: &HashSet<SymbolId>) -> bool {
    !escaped.contains(&var)
        && !program.has_flag(var, Flag::Captured)
        && !program.has_flag(var, Flag::ReturnValue)
}
