//! Findings of the validation rules

use strata_ast::{Diagnostic, Severity, Span};
use thiserror::Error;

/// A rule violation found in the user's program
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// E-CHECK-001
    #[error("named argument '{name}' is passed more than once in call to '{callee}'")]
    DuplicateNamedArg {
        name: String,
        callee: String,
        span: Span,
        /// Every occurrence after the first
        repeats: Vec<Span>,
    },

    /// E-CHECK-002
    #[error("configuration variable '{name}' must be declared at module scope")]
    ConfigNotAtModuleScope { name: String, span: Span },

    /// E-CHECK-003
    #[error("top-level param '{name}' must be initialized")]
    UninitializedParam { name: String, span: Span },

    /// E-CHECK-004
    #[error("variable '{name}' has neither a type nor an initializer")]
    UntypedLocal { name: String, span: Span },

    /// E-CHECK-005
    #[error("iterator '{function}' may not take formal '{formal}' with '{intent}' intent")]
    IteratorRefFormal {
        function: String,
        formal: String,
        intent: &'static str,
        span: Span,
    },

    /// E-CHECK-006
    #[error("iterator '{function}' may not return by '{tag}'")]
    IteratorReturnTag {
        function: String,
        tag: &'static str,
        span: Span,
    },

    /// E-CHECK-007
    #[error("constructor '{constructor}' refers to the receiver in the default of formal '{formal}'")]
    ReceiverInDefault {
        constructor: String,
        formal: String,
        span: Span,
    },

    /// W-CHECK-001
    #[error("control reaches end of function that returns a value")]
    MissingReturn { function: String, span: Span },

    /// E-CHECK-008
    #[error("function '{function}' is still nested after flattening")]
    NestedAfterFlattening { function: String, span: Span },

    /// E-CHECK-009
    #[error("call to '{callee}' passes {actuals} actuals but it takes {formals} formals")]
    ArityMismatch {
        callee: String,
        actuals: usize,
        formals: usize,
        span: Span,
    },
}

impl CheckError {
    /// Error code for machine-readable output
    pub fn code(&self) -> &'static str {
        match self {
            CheckError::DuplicateNamedArg { .. } => "E-CHECK-001",
            CheckError::ConfigNotAtModuleScope { .. } => "E-CHECK-002",
            CheckError::UninitializedParam { .. } => "E-CHECK-003",
            CheckError::UntypedLocal { .. } => "E-CHECK-004",
            CheckError::IteratorRefFormal { .. } => "E-CHECK-005",
            CheckError::IteratorReturnTag { .. } => "E-CHECK-006",
            CheckError::ReceiverInDefault { .. } => "E-CHECK-007",
            CheckError::MissingReturn { .. } => "W-CHECK-001",
            CheckError::NestedAfterFlattening { .. } => "E-CHECK-008",
            CheckError::ArityMismatch { .. } => "E-CHECK-009",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            CheckError::ReceiverInDefault { .. }
            | CheckError::NestedAfterFlattening { .. }
            | CheckError::ArityMismatch { .. } => Severity::Fatal,
            CheckError::MissingReturn { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Get the source span of this error
    pub fn span(&self) -> Span {
        match self {
            CheckError::DuplicateNamedArg { span, .. }
            | CheckError::ConfigNotAtModuleScope { span, .. }
            | CheckError::UninitializedParam { span, .. }
            | CheckError::UntypedLocal { span, .. }
            | CheckError::IteratorRefFormal { span, .. }
            | CheckError::IteratorReturnTag { span, .. }
            | CheckError::ReceiverInDefault { span, .. }
            | CheckError::MissingReturn { span, .. }
            | CheckError::NestedAfterFlattening { span, .. }
            | CheckError::ArityMismatch { span, .. } => *span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diagnostic = Diagnostic::new(self.severity(), self.code(), self.span(), self.to_string());
        match self {
            CheckError::DuplicateNamedArg { name, repeats, .. } => {
                for span in repeats {
                    diagnostic = diagnostic.with_note(*span, format!("'{}' passed again here", name));
                }
            }
            CheckError::MissingReturn { function, span } => {
                diagnostic = diagnostic.with_note(*span, format!("in function '{}'", function));
            }
            _ => {}
        }
        diagnostic
    }
}
