//! Per-pass instrumentation: timing, statistics and structural dumps
//!
//! Everything recorded here is read-only output. The orchestrator fills it
//! in after each pass when the configuration asks for it.

use std::collections::BTreeMap;
use std::time::Duration;

use log::info;
use serde::Serialize;
use strata_ast::{Diagnostics, Severity};

/// Diagnostic counts by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub fatal: usize,
    pub errors: usize,
    pub warnings: usize,
}

impl Counts {
    pub fn of(diags: &Diagnostics) -> Self {
        Self {
            fatal: diags.count(Severity::Fatal),
            errors: diags.count(Severity::Error),
            warnings: diags.count(Severity::Warning),
        }
    }

    /// Counts added since `earlier`
    pub fn since(self, earlier: Counts) -> Self {
        Self {
            fatal: self.fatal - earlier.fatal,
            errors: self.errors - earlier.errors,
            warnings: self.warnings - earlier.warnings,
        }
    }
}

/// What one pass did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassRecord {
    pub pass: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub micros: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<BTreeMap<&'static str, usize>>,
    /// Diagnostics this pass raised
    pub diagnostics: Counts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump: Option<String>,
}

impl PassRecord {
    pub fn new(pass: &'static str, diagnostics: Counts) -> Self {
        Self {
            pass,
            micros: None,
            stats: None,
            diagnostics,
            dump: None,
        }
    }

    pub fn with_timing(mut self, elapsed: Duration) -> Self {
        info!("{}: {}us", self.pass, elapsed.as_micros());
        self.micros = Some(elapsed.as_micros());
        self
    }

    pub fn with_stats(mut self, stats: &[(&'static str, usize)]) -> Self {
        let rendered: Vec<String> = stats.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        info!("{}: {}", self.pass, rendered.join(" "));
        self.stats = Some(stats.iter().copied().collect());
        self
    }

    pub fn with_dump(mut self, dump: String) -> Self {
        self.dump = Some(dump);
        self
    }
}

/// How a run ended, or that it has not yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    Pending,
    /// Every pass ran; the program went to the backend
    Completed,
    /// Diagnostics stopped the run after pass `index`
    Aborted { index: usize, pass: &'static str },
}

impl Outcome {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

/// The instrumentation side channel of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub passes: Vec<PassRecord>,
    pub outcome: Outcome,
    /// Diagnostic totals over the whole run
    pub totals: Counts,
}

impl RunReport {
    pub fn record(&self, pass: &str) -> Option<&PassRecord> {
        self.passes.iter().find(|r| r.pass == pass)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
