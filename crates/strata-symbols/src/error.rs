//! Error types for call-site computation

use strata_ast::{Diagnostic, Span};
use thiserror::Error;

/// Problems found while materializing call sites
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    /// E-SYMBOL-001: no function by that name is visible from the call
    #[error("unresolved call to '{name}'")]
    UnresolvedCall {
        name: String,
        span: Span,
        /// The function (or module) containing the call
        caller: String,
    },

    /// E-SYMBOL-002: several module-level functions share the name
    #[error("call to '{name}' is ambiguous between {candidates} functions")]
    AmbiguousCall {
        name: String,
        span: Span,
        candidates: usize,
    },
}

impl SymbolError {
    /// Get the source span of this error
    pub fn span(&self) -> Span {
        match self {
            SymbolError::UnresolvedCall { span, .. } => *span,
            SymbolError::AmbiguousCall { span, .. } => *span,
        }
    }

    /// Error code for machine-readable output
    pub fn code(&self) -> &'static str {
        match self {
            SymbolError::UnresolvedCall { .. } => "E-SYMBOL-001",
            SymbolError::AmbiguousCall { .. } => "E-SYMBOL-002",
        }
    }

    /// Both are continuable: the sweep goes on, the pipeline stops at the
    /// next checkpoint
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.code(), self.span(), self.to_string());
        match self {
            SymbolError::UnresolvedCall { caller, .. } => {
                diagnostic.with_note(self.span(), format!("called from '{}'", caller))
            }
            SymbolError::AmbiguousCall { .. } => diagnostic,
        }
    }
}
