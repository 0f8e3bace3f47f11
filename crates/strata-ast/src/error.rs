//! Errors raised by illegal structural mutations
//!
//! These are compiler defects: a pass asked the arena to do something that
//! would break the tree. User-facing problems go through
//! [`Diagnostics`](crate::Diagnostics) instead.

use thiserror::Error;

use crate::{NodeId, SymbolId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AstError {
    #[error("node {0} has been destroyed")]
    DeadNode(NodeId),

    #[error("symbol {0} has been destroyed")]
    DeadSymbol(SymbolId),

    #[error("node {node} is already attached under {parent}")]
    AlreadyAttached { node: NodeId, parent: NodeId },

    #[error("node {0} is a module root")]
    ModuleRoot(NodeId),

    #[error("node {0} has no parent")]
    Detached(NodeId),

    #[error("attaching {node} under {parent} would create a cycle")]
    Cycle { node: NodeId, parent: NodeId },

    #[error("node {parent} has no child list to insert into")]
    NoChildList { parent: NodeId },

    #[error("node {node} fills a required slot of {parent} and cannot be detached")]
    RequiredChild { node: NodeId, parent: NodeId },

    #[error("symbol {0} is not a function")]
    NotAFunction(SymbolId),

    #[error("node {node} is not a {expected}")]
    WrongKind { node: NodeId, expected: &'static str },
}
