//! Compiler defects raised by the orchestrator
//!
//! Problems in the user's program never show up here; they are diagnostics.

use std::path::PathBuf;

use strata_ast::{AstError, InvariantViolation};
use strata_optimizer::OptError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A pass left the AST structurally unsound
    #[error("checkpoint after '{pass}' found {} invariant violations; first: {}", .violations.len(), .violations.first().map(ToString::to_string).unwrap_or_default())]
    InvariantViolation {
        pass: &'static str,
        violations: Vec<InvariantViolation>,
    },

    #[error("pass '{pass}' failed: {source}")]
    Pass {
        pass: &'static str,
        #[source]
        source: OptError,
    },

    #[error("pass '{pass}' made an illegal mutation: {source}")]
    Mutation {
        pass: &'static str,
        #[source]
        source: AstError,
    },

    #[error("backend '{backend}' failed: {message}")]
    Backend { backend: String, message: String },

    #[error("unknown pass '{0}'")]
    UnknownPass(String),

    #[error("invalid pipeline configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Get the error code
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::InvariantViolation { .. } => "E-PIPE-001",
            PipelineError::Pass { source, .. } => source.code(),
            PipelineError::Mutation { .. } => "E-PIPE-002",
            PipelineError::Backend { .. } => "E-PIPE-003",
            PipelineError::UnknownPass(_) => "E-PIPE-004",
            PipelineError::Config(_) => "E-PIPE-005",
            PipelineError::Io { .. } => "E-PIPE-006",
        }
    }
}
