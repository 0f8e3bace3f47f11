//! User-facing diagnostics
//!
//! Passes never unwind on a problem in the user's program. They record a
//! [`Diagnostic`] and keep sweeping; the pipeline consults
//! [`Diagnostics::should_abort`] at the next checkpoint.

use std::fmt;

use serde::Serialize;

use crate::Span;

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The pipeline cannot continue meaningfully
    Fatal,
    /// The program is ill-formed, but the sweep continues to find more
    Error,
    /// Heuristic finding; never stops compilation
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Fatal => "fatal error",
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A secondary location attached to a diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub message: String,
    pub span: Span,
}

/// A diagnostic with a machine-readable code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Error code (e.g., "E-ARG-001")
    pub code: &'static str,
    pub message: String,
    /// Primary source span
    pub span: Span,
    pub notes: Vec<Note>,
    /// Pass that raised the diagnostic, filled in by the sink
    pub pass: Option<&'static str>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: &'static str, span: Span, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            span,
            notes: Vec::new(),
            pass: None,
        }
    }

    pub fn fatal(code: &'static str, span: Span, message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, code, span, message)
    }

    pub fn error(code: &'static str, span: Span, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, span, message)
    }

    pub fn warning(code: &'static str, span: Span, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, span, message)
    }

    /// Add a related location
    pub fn with_note(mut self, span: Span, message: impl Into<String>) -> Self {
        self.notes.push(Note {
            message: message.into(),
            span,
        });
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)
    }
}

/// The diagnostics sink shared by every pass of one compilation
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    current_pass: Option<&'static str>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute subsequent diagnostics to `pass`
    pub fn enter_pass(&mut self, pass: &'static str) {
        self.current_pass = Some(pass);
    }

    pub fn emit(&mut self, mut diagnostic: Diagnostic) {
        if diagnostic.pass.is_none() {
            diagnostic.pass = self.current_pass;
        }
        log::debug!("{}", diagnostic);
        self.items.push(diagnostic);
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|d| d.severity == severity).count()
    }

    pub fn has_fatal(&self) -> bool {
        self.count(Severity::Fatal) > 0
    }

    /// Whether a fatal or continuable error has been recorded
    pub fn should_abort(&self) -> bool {
        self.items
            .iter()
            .any(|d| matches!(d.severity, Severity::Fatal | Severity::Error))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Diagnostics carrying a given code
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.items.iter().filter(move |d| d.code == code)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
