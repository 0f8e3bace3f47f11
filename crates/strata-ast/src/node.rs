//! AST node kinds
//!
//! Nodes live in the [`Program`](crate::Program) arena and refer to their
//! children by [`NodeId`]. Child edges are owning; every other id stored in a
//! node (the callee of a call, the symbol of a reference) is a plain
//! back-reference.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Span, SymbolId};

/// Stable index of a node in the program arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Bool(v) => write!(f, "{}", v),
            Literal::Str(v) => write!(f, "{:?}", v),
        }
    }
}

/// Primitive operations the backend implements directly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimOp {
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    /// Take the address of an lvalue, producing a reference
    AddrOf,
    /// Read or store through a reference
    Deref,
    /// Terminate the program
    Halt,
}

impl PrimOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimOp::Add => "add",
            PrimOp::Sub => "sub",
            PrimOp::Mul => "mul",
            PrimOp::Div => "div",
            PrimOp::Neg => "neg",
            PrimOp::Eq => "eq",
            PrimOp::Ne => "ne",
            PrimOp::Lt => "lt",
            PrimOp::Le => "le",
            PrimOp::Gt => "gt",
            PrimOp::Ge => "ge",
            PrimOp::And => "and",
            PrimOp::Or => "or",
            PrimOp::Not => "not",
            PrimOp::AddrOf => "addr_of",
            PrimOp::Deref => "deref",
            PrimOp::Halt => "halt",
        }
    }

    pub fn has_side_effects(&self) -> bool {
        matches!(self, PrimOp::Halt)
    }
}

/// The closed set of syntactic constructs
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // === Expressions ===
    /// Reference to a symbol
    SymRef(SymbolId),
    /// Call to a function; `callee` is filled in by resolution
    Call {
        callee: Option<SymbolId>,
        name: String,
        args: Vec<NodeId>,
    },
    /// `name: value` actual argument
    NamedArg { name: String, value: NodeId },
    Literal(Literal),
    Prim { op: PrimOp, args: Vec<NodeId> },

    // === Statements ===
    Block { stmts: Vec<NodeId> },
    Assign { target: NodeId, value: NodeId },
    Cond {
        cond: NodeId,
        then_block: NodeId,
        else_block: Option<NodeId>,
    },
    /// `while`/`do-while` loop; `cond` is always a reference to the
    /// condition temporary, recomputed by the body
    While {
        cond: NodeId,
        body: NodeId,
        test_first: bool,
    },
    /// `for` loop; `index` is the definition of the index variable
    For {
        index: NodeId,
        iterable: NodeId,
        body: NodeId,
    },
    Return { value: Option<NodeId> },
    Break,
    Continue,
    Label { name: String },
    Goto { label: String },

    // === Definitions ===
    /// Binds a variable, formal or type symbol; `value` is the initializer
    /// (or the default value of a formal)
    Def { sym: SymbolId, value: Option<NodeId> },
    /// Binds a function symbol and owns its formals and body
    FnDef {
        sym: SymbolId,
        formals: Vec<NodeId>,
        body: NodeId,
    },
}

/// Discriminant of [`NodeKind`], used to request nodes of one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTag {
    SymRef,
    Call,
    NamedArg,
    Literal,
    Prim,
    Block,
    Assign,
    Cond,
    While,
    For,
    Return,
    Break,
    Continue,
    Label,
    Goto,
    Def,
    FnDef,
}

impl NodeKind {
    pub fn tag(&self) -> NodeTag {
        match self {
            NodeKind::SymRef(_) => NodeTag::SymRef,
            NodeKind::Call { .. } => NodeTag::Call,
            NodeKind::NamedArg { .. } => NodeTag::NamedArg,
            NodeKind::Literal(_) => NodeTag::Literal,
            NodeKind::Prim { .. } => NodeTag::Prim,
            NodeKind::Block { .. } => NodeTag::Block,
            NodeKind::Assign { .. } => NodeTag::Assign,
            NodeKind::Cond { .. } => NodeTag::Cond,
            NodeKind::While { .. } => NodeTag::While,
            NodeKind::For { .. } => NodeTag::For,
            NodeKind::Return { .. } => NodeTag::Return,
            NodeKind::Break => NodeTag::Break,
            NodeKind::Continue => NodeTag::Continue,
            NodeKind::Label { .. } => NodeTag::Label,
            NodeKind::Goto { .. } => NodeTag::Goto,
            NodeKind::Def { .. } => NodeTag::Def,
            NodeKind::FnDef { .. } => NodeTag::FnDef,
        }
    }

    /// Owned children in source order
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::SymRef(_)
            | NodeKind::Literal(_)
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Label { .. }
            | NodeKind::Goto { .. } => Vec::new(),
            NodeKind::Call { args, .. } | NodeKind::Prim { args, .. } => args.clone(),
            NodeKind::NamedArg { value, .. } => vec![*value],
            NodeKind::Block { stmts } => stmts.clone(),
            NodeKind::Assign { target, value } => vec![*target, *value],
            NodeKind::Cond {
                cond,
                then_block,
                else_block,
            } => {
                let mut children = vec![*cond, *then_block];
                children.extend(else_block);
                children
            }
            NodeKind::While { cond, body, .. } => vec![*cond, *body],
            NodeKind::For {
                index,
                iterable,
                body,
            } => vec![*index, *iterable, *body],
            NodeKind::Return { value } => value.iter().copied().collect(),
            NodeKind::Def { value, .. } => value.iter().copied().collect(),
            NodeKind::FnDef { formals, body, .. } => {
                let mut children = formals.clone();
                children.push(*body);
                children
            }
        }
    }

    /// Mutable access to every single-child slot and list element
    pub(crate) fn child_slots_mut(&mut self) -> Vec<&mut NodeId> {
        match self {
            NodeKind::SymRef(_)
            | NodeKind::Literal(_)
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Label { .. }
            | NodeKind::Goto { .. } => Vec::new(),
            NodeKind::Call { args, .. } | NodeKind::Prim { args, .. } => args.iter_mut().collect(),
            NodeKind::NamedArg { value, .. } => vec![value],
            NodeKind::Block { stmts } => stmts.iter_mut().collect(),
            NodeKind::Assign { target, value } => vec![target, value],
            NodeKind::Cond {
                cond,
                then_block,
                else_block,
            } => {
                let mut slots = vec![cond, then_block];
                slots.extend(else_block.as_mut());
                slots
            }
            NodeKind::While { cond, body, .. } => vec![cond, body],
            NodeKind::For {
                index,
                iterable,
                body,
            } => vec![index, iterable, body],
            NodeKind::Return { value } => value.as_mut().into_iter().collect(),
            NodeKind::Def { value, .. } => value.as_mut().into_iter().collect(),
            NodeKind::FnDef { formals, body, .. } => {
                let mut slots: Vec<&mut NodeId> = formals.iter_mut().collect();
                slots.push(body);
                slots
            }
        }
    }

    /// The child list that positional insertion operates on, if any
    pub(crate) fn child_list_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            NodeKind::Block { stmts } => Some(stmts),
            NodeKind::Call { args, .. } | NodeKind::Prim { args, .. } => Some(args),
            NodeKind::FnDef { formals, .. } => Some(formals),
            _ => None,
        }
    }

    /// Symbol defined by this node, if it is a definition
    pub fn defined_symbol(&self) -> Option<SymbolId> {
        match self {
            NodeKind::Def { sym, .. } | NodeKind::FnDef { sym, .. } => Some(*sym),
            _ => None,
        }
    }

    pub fn is_expr(&self) -> bool {
        matches!(
            self,
            NodeKind::SymRef(_)
                | NodeKind::Call { .. }
                | NodeKind::NamedArg { .. }
                | NodeKind::Literal(_)
                | NodeKind::Prim { .. }
        )
    }
}

/// One arena slot
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    /// Owning parent; `None` for module roots and detached subtrees
    pub parent: Option<NodeId>,
    /// Nearest enclosing function or module symbol
    pub parent_sym: Option<SymbolId>,
    /// Cleared when the node is destroyed; the slot is never reused
    pub(crate) live: bool,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            span,
            parent: None,
            parent_sym: None,
            live: true,
        }
    }

    pub fn is_live(&self) -> bool {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_follow_source_order() {
        let kind = NodeKind::Cond {
            cond: NodeId(1),
            then_block: NodeId(2),
            else_block: Some(NodeId(3)),
        };
        assert_eq!(kind.children(), vec![NodeId(1), NodeId(2), NodeId(3)]);

        let kind = NodeKind::FnDef {
            sym: SymbolId(0),
            formals: vec![NodeId(4), NodeId(5)],
            body: NodeId(6),
        };
        assert_eq!(kind.children(), vec![NodeId(4), NodeId(5), NodeId(6)]);
    }

    #[test]
    fn slots_match_children() {
        let mut kind = NodeKind::For {
            index: NodeId(7),
            iterable: NodeId(8),
            body: NodeId(9),
        };
        let expected = kind.children();
        let slots: Vec<NodeId> = kind.child_slots_mut().into_iter().map(|s| *s).collect();
        assert_eq!(slots, expected);
    }
}
