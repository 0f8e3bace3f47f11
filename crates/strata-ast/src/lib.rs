//! Strata AST - the shared whole-program representation
//!
//! This crate defines the arena that every middle-end pass reads and
//! rewrites: nodes with owning child edges and non-owning back-references,
//! symbols with open flag sets, whole-program registries, the structural
//! mutators that keep all of those consistent, and the checkpoint verifier
//! that proves they stayed consistent.
//!
//! It also carries the pieces every pass shares: the diagnostics sink, the
//! structural dump, and the surface (JSON) form a front-end hands over.

mod collect;
mod diagnostics;
mod error;
mod flags;
mod node;
mod printer;
mod program;
mod registry;
mod span;
mod symbol;
mod types;
mod verify;

pub mod surface;

pub use collect::Collect;
pub use diagnostics::{Diagnostic, Diagnostics, Note, Severity};
pub use error::AstError;
pub use flags::{Flag, FlagSet};
pub use node::{Literal, Node, NodeId, NodeKind, NodeTag, PrimOp};
pub use printer::{dump, dump_node};
pub use program::Program;
pub use registry::Registries;
pub use span::Span;
pub use symbol::{ArgData, FnData, Intent, ModuleData, RetTag, Symbol, SymbolId, SymbolKind};
pub use types::Ty;
pub use verify::{verify, InvariantViolation};
