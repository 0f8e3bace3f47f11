//! Live-variable analysis over a function's locals
//!
//! USE(b): locals read in b before any write to them in b.
//! DEF(b): locals written in b before any read of them in b.
//! The first access to a local within a block decides; later accesses are
//! ignored for the block summary.

use std::collections::HashMap;

use log::debug;
use strata_ast::{NodeId, NodeKind, NodeTag, Program, SymbolId, SymbolKind};

use crate::cfg::{BlockId, Item};
use crate::fixpoint::solve_bitsets;
use crate::{BitSet, Cfg, DataflowError};

/// One read or write of a local by a CFG item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(SymbolId),
    Write(SymbolId),
}

/// Result of the analysis for one function
#[derive(Debug, Clone)]
pub struct Liveness {
    pub function: SymbolId,
    /// Bit index -> local
    pub locals: Vec<SymbolId>,
    /// Local -> bit index
    pub index: HashMap<SymbolId, usize>,
    pub live_in: Vec<BitSet>,
    pub live_out: Vec<BitSet>,
}

/// Run live-variable analysis on a fresh CFG of `cfg.function`
pub fn analyze(program: &Program, cfg: &Cfg) -> Result<Liveness, DataflowError> {
    cfg.check_fresh(program)?;

    let locals = collect_locals(program, cfg.function);
    let index: HashMap<SymbolId, usize> = locals
        .iter()
        .enumerate()
        .map(|(i, sym)| (*sym, i))
        .collect();
    let width = locals.len();

    let mut uses = Vec::with_capacity(cfg.len());
    let mut defs = Vec::with_capacity(cfg.len());
    for id in cfg.block_ids() {
        let (use_set, def_set) = use_def(program, cfg, id, &index, width);
        uses.push(use_set);
        defs.push(def_set);
    }

    let solution = solve_bitsets(cfg, &uses, &defs, width);
    debug!(
        "liveness for {}: {} locals, {} blocks, {} sweeps",
        program.symbol(cfg.function).name,
        width,
        cfg.len(),
        solution.sweeps
    );

    Ok(Liveness {
        function: cfg.function,
        locals,
        index,
        live_in: solution.ins,
        live_out: solution.outs,
    })
}

impl Liveness {
    pub fn is_live_out(&self, block: BlockId, sym: SymbolId) -> bool {
        self.index
            .get(&sym)
            .is_some_and(|i| self.live_out[block.0].contains(*i))
    }

    pub fn is_live_in(&self, block: BlockId, sym: SymbolId) -> bool {
        self.index
            .get(&sym)
            .is_some_and(|i| self.live_in[block.0].contains(*i))
    }

    /// Live locals immediately after each item of a block
    pub fn live_after_items(
        &self,
        program: &Program,
        cfg: &Cfg,
        block: BlockId,
    ) -> Result<Vec<BitSet>, DataflowError> {
        cfg.check_fresh(program)?;
        let items = &cfg.block(block).items;
        let mut live = self.live_out[block.0].clone();
        let mut after = vec![BitSet::new(self.locals.len()); items.len()];
        for (pos, item) in items.iter().enumerate().rev() {
            after[pos] = live.clone();
            // Walk the accesses backwards: a write kills, a read revives
            for access in accesses(program, *item).into_iter().rev() {
                match access {
                    Access::Write(sym) => {
                        if let Some(i) = self.index.get(&sym) {
                            live.remove(*i);
                        }
                    }
                    Access::Read(sym) => {
                        if let Some(i) = self.index.get(&sym) {
                            live.insert(*i);
                        }
                    }
                }
            }
        }
        Ok(after)
    }

    pub fn local_names<'p>(&self, program: &'p Program, set: &BitSet) -> Vec<&'p str> {
        set.iter()
            .map(|i| program.symbol(self.locals[i]).name.as_str())
            .collect()
    }
}

/// Variables declared in the body of `f` (not in nested functions);
/// formals are not locals
pub fn collect_locals(program: &Program, f: SymbolId) -> Vec<SymbolId> {
    let Some(body) = program.fn_body(f) else {
        return Vec::new();
    };
    program
        .collect(body, NodeTag::Def)
        .skip_nested_fns()
        .filter_map(|def| program.kind(def).defined_symbol())
        .filter(|sym| matches!(program.symbol(*sym).kind, SymbolKind::Var))
        .collect()
}

/// Reads and writes of symbols performed by an item, in evaluation order
pub fn accesses(program: &Program, item: Item) -> Vec<Access> {
    let mut out = Vec::new();
    match item {
        Item::Stmt(id) => match program.kind(id) {
            NodeKind::Assign { target, value } => {
                reads(program, *value, &mut out);
                match program.kind(*target) {
                    NodeKind::SymRef(sym) => out.push(Access::Write(*sym)),
                    // Storing through a reference reads the reference
                    _ => reads(program, *target, &mut out),
                }
            }
            NodeKind::Def {
                sym,
                value: Some(value),
            } => {
                reads(program, *value, &mut out);
                out.push(Access::Write(*sym));
            }
            NodeKind::Def { value: None, .. } => {}
            _ => reads(program, id, &mut out),
        },
        Item::Branch(cond) | Item::LoopTest(cond) => reads(program, cond, &mut out),
        Item::ForHeader(id) => {
            if let NodeKind::For {
                index, iterable, ..
            } = program.kind(id)
            {
                reads(program, *iterable, &mut out);
                if let Some(sym) = program.kind(*index).defined_symbol() {
                    out.push(Access::Write(sym));
                }
            }
        }
    }
    out
}

fn reads(program: &Program, root: NodeId, out: &mut Vec<Access>) {
    for id in program.collect(root, NodeTag::SymRef).skip_nested_fns() {
        if let NodeKind::SymRef(sym) = program.kind(id) {
            out.push(Access::Read(*sym));
        }
    }
}

fn use_def(
    program: &Program,
    cfg: &Cfg,
    block: BlockId,
    index: &HashMap<SymbolId, usize>,
    width: usize,
) -> (BitSet, BitSet) {
    let mut uses = BitSet::new(width);
    let mut defs = BitSet::new(width);
    let mut seen = BitSet::new(width);
    for item in &cfg.block(block).items {
        for access in accesses(program, *item) {
            let (sym, is_read) = match access {
                Access::Read(sym) => (sym, true),
                Access::Write(sym) => (sym, false),
            };
            let Some(&i) = index.get(&sym) else {
                continue;
            };
            if !seen.insert(i) {
                continue;
            }
            if is_read {
                uses.insert(i);
            } else {
                defs.insert(i);
            }
        }
    }
    (uses, defs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{find, lower};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn straight_line_code_has_empty_out() {
        let program = lower(json!([
            {"kind": "fn", "name": "f", "body": [
                {"kind": "var", "name": "a", "ty": "int", "init": 1},
                {"kind": "var", "name": "b", "ty": "int", "init": {"prim": "add", "args": ["a", 2]}},
                {"kind": "expr", "expr": {"call": "print", "args": ["b"]}}
            ]}
        ]));
        let f = find(&program, "f");
        let cfg = Cfg::build(&program, f).unwrap();
        let live = analyze(&program, &cfg).unwrap();

        assert_eq!(cfg.len(), 1);
        assert!(live.live_out[0].is_empty());
        assert!(live.live_in[0].is_empty());
    }

    #[test]
    fn first_access_decides_use_or_def() {
        let program = lower(json!([
            {"kind": "fn", "name": "f", "body": [
                {"kind": "var", "name": "a", "ty": "int"},
                {"kind": "var", "name": "b", "ty": "int"},
                {"kind": "assign", "target": "b", "value": "a"},
                {"kind": "assign", "target": "a", "value": 1},
                {"kind": "expr", "expr": {"call": "print", "args": ["b"]}}
            ]}
        ]));
        let f = find(&program, "f");
        let cfg = Cfg::build(&program, f).unwrap();
        let live = analyze(&program, &cfg).unwrap();
        let a = find(&program, "a");
        // `a` is read before it is written, so it is live on entry
        assert!(live.is_live_in(BlockId(0), a));
        assert!(!live.is_live_in(BlockId(0), find(&program, "b")));
    }

    #[test]
    fn loop_carried_variable_is_live_around_the_loop() {
        let program = lower(json!([
            {"kind": "fn", "name": "f", "body": [
                {"kind": "var", "name": "i", "ty": "int", "init": 0},
                {"kind": "while", "cond": {"prim": "lt", "args": ["i", 3]}, "body": [
                    {"kind": "assign", "target": "i", "value": {"prim": "add", "args": ["i", 1]}}
                ]}
            ]}
        ]));
        let f = find(&program, "f");
        let i = find(&program, "i");
        let cfg = Cfg::build(&program, f).unwrap();
        let live = analyze(&program, &cfg).unwrap();

        // bb0 entry, bb1 header, bb2 body, bb3 exit
        assert!(live.is_live_out(BlockId(0), i));
        assert!(live.is_live_out(BlockId(2), i));
        assert!(live.is_live_in(BlockId(1), i));
        assert!(live.live_out[3].is_empty());
        assert_eq!(live.local_names(&program, &live.live_out[0]).len(), 2);
    }

    #[test]
    fn formals_are_not_locals() {
        let program = lower(json!([
            {"kind": "fn", "name": "f", "formals": [{"name": "p", "ty": "int"}], "body": [
                {"kind": "var", "name": "x", "ty": "int", "init": "p"},
                {"kind": "return", "value": "x"}
            ]}
        ]));
        let f = find(&program, "f");
        assert_eq!(collect_locals(&program, f), vec![find(&program, "x")]);
    }

    #[test]
    fn live_after_items_tracks_each_statement() {
        let program = lower(json!([
            {"kind": "fn", "name": "f", "body": [
                {"kind": "var", "name": "a", "ty": "int", "init": 1},
                {"kind": "assign", "target": "a", "value": 2},
                {"kind": "return", "value": "a"}
            ]}
        ]));
        let f = find(&program, "f");
        let a = find(&program, "a");
        let cfg = Cfg::build(&program, f).unwrap();
        let live = analyze(&program, &cfg).unwrap();
        let after = live.live_after_items(&program, &cfg, BlockId(0)).unwrap();
        let bit = live.index[&a];
        // the initial value is overwritten before any read
        assert!(!after[0].contains(bit));
        assert!(after[1].contains(bit));
        assert!(!after[2].contains(bit));
    }

    #[test]
    fn stale_cfg_is_refused() {
        let mut program = lower(json!([
            {"kind": "fn", "name": "f", "body": [{"kind": "var", "name": "a", "ty": "int"}]}
        ]));
        let f = find(&program, "f");
        let cfg = Cfg::build(&program, f).unwrap();
        let def = program.symbol(find(&program, "a")).def.unwrap();
        program.remove(def).unwrap();
        assert!(matches!(
            analyze(&program, &cfg),
            Err(DataflowError::StaleCfg { .. })
        ));
    }
}
