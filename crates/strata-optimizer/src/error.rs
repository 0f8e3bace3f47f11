//! Errors raised by the rewriting passes
//!
//! All of these are compiler defects: the passes only run on programs that
//! passed the preceding checkpoints.

use strata_ast::{AstError, NodeId, Span};
use strata_dataflow::DataflowError;
use thiserror::Error;

/// Precondition failures of closure conversion
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlattenError {
    #[error("call to '{name}' has no resolved target")]
    UnresolvedCall { name: String, call: NodeId, span: Span },

    #[error("call to '{callee}' in '{caller}' cannot supply captured variable '{variable}'")]
    CaptureUnavailable {
        callee: String,
        caller: String,
        variable: String,
        span: Span,
    },
}

impl FlattenError {
    pub fn code(&self) -> &'static str {
        match self {
            FlattenError::UnresolvedCall { .. } => "E-FLAT-001",
            FlattenError::CaptureUnavailable { .. } => "E-FLAT-002",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            FlattenError::UnresolvedCall { span, .. }
            | FlattenError::CaptureUnavailable { span, .. } => *span,
        }
    }
}

/// Any failure of an optimization pass
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptError {
    #[error(transparent)]
    Flatten(#[from] FlattenError),

    #[error(transparent)]
    Dataflow(#[from] DataflowError),

    #[error("illegal mutation: {0}")]
    Ast(#[from] AstError),
}

impl OptError {
    pub fn code(&self) -> &'static str {
        match self {
            OptError::Flatten(err) => err.code(),
            OptError::Dataflow(err) => err.code(),
            OptError::Ast(_) => "E-OPT-001",
        }
    }
}
