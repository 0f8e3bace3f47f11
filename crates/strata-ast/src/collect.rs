//! Lazy pre-order traversal

use crate::{NodeId, NodeKind, NodeTag, Program};

/// Pre-order sequence of nodes reachable from a root
///
/// The sequence is lazy (children are expanded as it advances), finite
/// (the tree is acyclic) and restartable: clone it before consuming to walk
/// the same subtree again.
#[derive(Clone)]
pub struct Collect<'a> {
    program: &'a Program,
    root: NodeId,
    stack: Vec<NodeId>,
    filter: Option<NodeTag>,
    skip_nested_fns: bool,
}

impl<'a> Collect<'a> {
    pub(crate) fn new(program: &'a Program, root: NodeId, filter: Option<NodeTag>) -> Self {
        Self {
            program,
            root,
            stack: vec![root],
            filter,
            skip_nested_fns: false,
        }
    }

    /// Do not descend into function definitions below the root
    ///
    /// The nested definition node itself is still yielded.
    pub fn skip_nested_fns(mut self) -> Self {
        self.skip_nested_fns = true;
        self
    }
}

impl Iterator for Collect<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(id) = self.stack.pop() {
            let node = self.program.node(id);
            if !node.is_live() {
                continue;
            }

            let is_nested_fn = id != self.root && matches!(node.kind, NodeKind::FnDef { .. });
            if !(self.skip_nested_fns && is_nested_fn) {
                self.stack.extend(node.kind.children().into_iter().rev());
            }

            match self.filter {
                Some(tag) if node.kind.tag() != tag => continue,
                _ => return Some(id),
            }
        }
        None
    }
}
