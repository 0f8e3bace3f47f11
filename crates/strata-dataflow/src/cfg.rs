//! Basic blocks of one function body
//!
//! The CFG is derived on demand and stamped with the function's mutation
//! epoch at construction. Any structural change to the function afterwards
//! makes it stale, and analyses refuse a stale CFG.

use std::collections::HashMap;
use std::fmt;

use log::trace;
use strata_ast::{NodeId, NodeKind, Program, SymbolId};

use crate::DataflowError;

/// Index of a block within its CFG
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// One straight-line step of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    /// A simple statement (assignment, definition, call, return, ...)
    Stmt(NodeId),
    /// The condition expression of an `if`, evaluated at the end of the block
    Branch(NodeId),
    /// The condition reference of a `while` or `do-while`
    LoopTest(NodeId),
    /// The header of a `for` loop: evaluates the iterable, binds the index
    ForHeader(NodeId),
}

impl Item {
    pub fn node(&self) -> NodeId {
        match self {
            Item::Stmt(id) | Item::Branch(id) | Item::LoopTest(id) | Item::ForHeader(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    pub items: Vec<Item>,
    pub succ: Vec<BlockId>,
    pub pred: Vec<BlockId>,
}

/// Control flow graph of a function body
///
/// Blocks are numbered in creation order; block 0 is the entry. Blocks with
/// no items exist as join points and loop exits.
#[derive(Debug, Clone)]
pub struct Cfg {
    pub function: SymbolId,
    /// Function epoch at construction
    pub epoch: u64,
    pub blocks: Vec<BasicBlock>,
}

impl Cfg {
    /// Partition the body of `f` into basic blocks
    pub fn build(program: &Program, f: SymbolId) -> Result<Cfg, DataflowError> {
        let body = program
            .fn_body(f)
            .ok_or(DataflowError::NotAFunction(f))?;

        let mut builder = Builder {
            program,
            function: f,
            blocks: vec![BasicBlock::default()],
            current: BlockId(0),
            loops: Vec::new(),
            labels: HashMap::new(),
            gotos: Vec::new(),
        };
        builder.stmts(body);
        builder.resolve_gotos()?;

        let cfg = Cfg {
            function: f,
            epoch: program.epoch(f),
            blocks: builder.blocks,
        };
        trace!(
            "built CFG for {} with {} blocks",
            program.symbol(f).name,
            cfg.len()
        );
        Ok(cfg)
    }

    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len()).map(BlockId)
    }

    /// Successor lists as plain indices, the form the fixpoint driver takes
    pub fn successors(&self) -> Vec<Vec<usize>> {
        self.blocks
            .iter()
            .map(|b| b.succ.iter().map(|s| s.0).collect())
            .collect()
    }

    /// Whether the function changed since this CFG was built
    pub fn is_stale(&self, program: &Program) -> bool {
        program.epoch(self.function) != self.epoch
    }

    /// Refuse a stale CFG
    pub fn check_fresh(&self, program: &Program) -> Result<(), DataflowError> {
        if self.is_stale(program) {
            return Err(DataflowError::StaleCfg {
                function: program.symbol(self.function).name.clone(),
                built: self.epoch,
                current: program.epoch(self.function),
            });
        }
        Ok(())
    }

    /// Block holding a given item node, with its position
    pub fn locate(&self, node: NodeId) -> Option<(BlockId, usize)> {
        self.blocks.iter().enumerate().find_map(|(b, block)| {
            block
                .items
                .iter()
                .position(|item| item.node() == node)
                .map(|pos| (BlockId(b), pos))
        })
    }
}

impl fmt::Display for Cfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in self.block_ids() {
            let block = self.block(id);
            write!(f, "{}: {} items -> [", id, block.items.len())?;
            for (i, succ) in block.succ.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", succ)?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

struct Builder<'a> {
    program: &'a Program,
    function: SymbolId,
    blocks: Vec<BasicBlock>,
    current: BlockId,
    /// (continue target, break target) of each enclosing loop
    loops: Vec<(BlockId, BlockId)>,
    labels: HashMap<String, BlockId>,
    gotos: Vec<(BlockId, String)>,
}

impl Builder<'_> {
    fn new_block(&mut self) -> BlockId {
        self.blocks.push(BasicBlock::default());
        BlockId(self.blocks.len() - 1)
    }

    fn edge(&mut self, from: BlockId, to: BlockId) {
        if !self.blocks[from.0].succ.contains(&to) {
            self.blocks[from.0].succ.push(to);
            self.blocks[to.0].pred.push(from);
        }
    }

    fn push(&mut self, item: Item) {
        self.blocks[self.current.0].items.push(item);
    }

    /// Code after a jump is unreachable; it gets a block with no predecessors
    fn start_unreachable(&mut self) {
        self.current = self.new_block();
    }

    fn stmts(&mut self, block: NodeId) {
        for stmt in self.program.kind(block).children() {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, id: NodeId) {
        match self.program.kind(id) {
            NodeKind::Block { .. } => self.stmts(id),
            NodeKind::Cond {
                cond,
                then_block,
                else_block,
            } => {
                let (cond, then_block, else_block) = (*cond, *then_block, *else_block);
                self.push(Item::Branch(cond));
                let branch = self.current;

                let then_start = self.new_block();
                self.edge(branch, then_start);
                self.current = then_start;
                self.stmts(then_block);
                let then_end = self.current;

                let else_end = else_block.map(|else_block| {
                    let else_start = self.new_block();
                    self.edge(branch, else_start);
                    self.current = else_start;
                    self.stmts(else_block);
                    self.current
                });

                let join = self.new_block();
                self.edge(then_end, join);
                self.edge(else_end.unwrap_or(branch), join);
                self.current = join;
            }
            NodeKind::While {
                cond,
                body,
                test_first: true,
            } => {
                let (cond, body) = (*cond, *body);
                let header = self.new_block();
                self.edge(self.current, header);
                self.current = header;
                self.push(Item::LoopTest(cond));

                let body_start = self.new_block();
                let exit = self.new_block();
                self.edge(header, body_start);
                self.edge(header, exit);

                self.loops.push((header, exit));
                self.current = body_start;
                self.stmts(body);
                self.edge(self.current, header);
                self.loops.pop();
                self.current = exit;
            }
            NodeKind::While {
                cond,
                body,
                test_first: false,
            } => {
                let (cond, body) = (*cond, *body);
                let body_start = self.new_block();
                self.edge(self.current, body_start);
                let test = self.new_block();
                let exit = self.new_block();

                self.loops.push((test, exit));
                self.current = body_start;
                self.stmts(body);
                self.edge(self.current, test);
                self.loops.pop();

                self.current = test;
                self.push(Item::LoopTest(cond));
                self.edge(test, body_start);
                self.edge(test, exit);
                self.current = exit;
            }
            NodeKind::For { body, .. } => {
                let body = *body;
                let header = self.new_block();
                self.edge(self.current, header);
                self.current = header;
                self.push(Item::ForHeader(id));

                let body_start = self.new_block();
                let exit = self.new_block();
                self.edge(header, body_start);
                self.edge(header, exit);

                self.loops.push((header, exit));
                self.current = body_start;
                self.stmts(body);
                self.edge(self.current, header);
                self.loops.pop();
                self.current = exit;
            }
            NodeKind::Return { .. } => {
                self.push(Item::Stmt(id));
                self.start_unreachable();
            }
            NodeKind::Break => {
                if let Some(&(_, exit)) = self.loops.last() {
                    self.edge(self.current, exit);
                }
                self.start_unreachable();
            }
            NodeKind::Continue => {
                if let Some(&(header, _)) = self.loops.last() {
                    self.edge(self.current, header);
                }
                self.start_unreachable();
            }
            NodeKind::Label { name } => {
                let target = self.new_block();
                self.edge(self.current, target);
                self.labels.insert(name.clone(), target);
                self.current = target;
            }
            NodeKind::Goto { label } => {
                self.gotos.push((self.current, label.clone()));
                self.start_unreachable();
            }
            // Nested functions are separate bodies
            NodeKind::FnDef { .. } => {}
            _ => self.push(Item::Stmt(id)),
        }
    }

    fn resolve_gotos(&mut self) -> Result<(), DataflowError> {
        for (from, label) in std::mem::take(&mut self.gotos) {
            let target = *self
                .labels
                .get(&label)
                .ok_or_else(|| DataflowError::UnknownLabel {
                    function: self.program.symbol(self.function).name.clone(),
                    label: label.clone(),
                })?;
            self.edge(from, target);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{find, lower};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn succs(cfg: &Cfg) -> Vec<Vec<usize>> {
        cfg.successors()
    }

    #[test]
    fn straight_line_code_is_one_block() {
        let program = lower(json!([
            {"kind": "fn", "name": "f", "body": [
                {"kind": "var", "name": "a", "ty": "int", "init": 1},
                {"kind": "var", "name": "b", "ty": "int", "init": "a"}
            ]}
        ]));
        let cfg = Cfg::build(&program, find(&program, "f")).unwrap();
        assert_eq!(cfg.len(), 1);
        assert_eq!(cfg.block(cfg.entry()).items.len(), 2);
    }

    #[test]
    fn if_without_else_joins_from_the_branch() {
        let program = lower(json!([
            {"kind": "fn", "name": "f", "formals": [{"name": "c", "ty": "bool"}], "body": [
                {"kind": "if", "cond": "c", "then": [{"kind": "return", "value": 1}]}
            ]}
        ]));
        let cfg = Cfg::build(&program, find(&program, "f")).unwrap();
        // bb0 branch, bb1 then (returns), bb2 unreachable tail, bb3 join
        assert_eq!(succs(&cfg), vec![vec![1, 3], vec![], vec![3], vec![]]);
        assert!(matches!(cfg.block(BlockId(0)).items[0], Item::Branch(_)));
    }

    #[test]
    fn while_loop_has_back_edge_and_exit() {
        let program = lower(json!([
            {"kind": "fn", "name": "f", "body": [
                {"kind": "var", "name": "i", "ty": "int", "init": 0},
                {"kind": "while", "cond": {"prim": "lt", "args": ["i", 3]}, "body": [
                    {"kind": "assign", "target": "i", "value": {"prim": "add", "args": ["i", 1]}}
                ]}
            ]}
        ]));
        let cfg = Cfg::build(&program, find(&program, "f")).unwrap();
        // bb0 entry, bb1 header, bb2 body, bb3 exit
        assert_eq!(succs(&cfg), vec![vec![1], vec![2, 3], vec![1], vec![]]);
        assert!(matches!(cfg.block(BlockId(1)).items[0], Item::LoopTest(_)));
    }

    #[test]
    fn do_while_tests_at_the_end() {
        let program = lower(json!([
            {"kind": "fn", "name": "f", "body": [
                {"kind": "var", "name": "i", "ty": "int", "init": 0},
                {"kind": "do_while", "cond": {"prim": "lt", "args": ["i", 3]}, "body": [
                    {"kind": "continue"}
                ]}
            ]}
        ]));
        let cfg = Cfg::build(&program, find(&program, "f")).unwrap();
        // bb0 entry, bb1 body, bb2 test, bb3 exit, bb4 unreachable after continue
        assert_eq!(
            succs(&cfg),
            vec![vec![1], vec![2], vec![1, 3], vec![], vec![2]]
        );
    }

    #[test]
    fn goto_targets_its_label() {
        let program = lower(json!([
            {"kind": "fn", "name": "f", "body": [
                {"kind": "label", "name": "top"},
                {"kind": "goto", "label": "top"}
            ]}
        ]));
        let cfg = Cfg::build(&program, find(&program, "f")).unwrap();
        assert_eq!(succs(&cfg), vec![vec![1], vec![1], vec![]]);
    }

    #[test]
    fn unknown_label_is_an_error() {
        let program = lower(json!([
            {"kind": "fn", "name": "f", "body": [{"kind": "goto", "label": "nowhere"}]}
        ]));
        let err = Cfg::build(&program, find(&program, "f")).unwrap_err();
        assert!(matches!(err, DataflowError::UnknownLabel { .. }));
    }

    #[test]
    fn mutation_makes_the_cfg_stale() {
        let mut program = lower(json!([
            {"kind": "fn", "name": "f", "body": [{"kind": "break"}]}
        ]));
        let f = find(&program, "f");
        let cfg = Cfg::build(&program, f).unwrap();
        assert!(cfg.check_fresh(&program).is_ok());

        let body = program.fn_body(f).unwrap();
        let stmt = program.kind(body).children()[0];
        program.remove(stmt).unwrap();
        assert!(cfg.is_stale(&program));
        assert!(matches!(
            cfg.check_fresh(&program),
            Err(DataflowError::StaleCfg { .. })
        ));
    }
}
