//! Validation passes: named sets of independent whole-program rules

use log::debug;
use strata_ast::{Diagnostics, Program};

use crate::CheckError;

/// One whole-program sweep
///
/// A rule never stops at the first problem: it returns every violation it
/// finds, and the pass records them all.
pub trait Rule {
    /// Short kebab-case name, used in logs
    fn name(&self) -> &'static str;

    fn check(&self, program: &Program) -> Vec<CheckError>;
}

/// A named set of rules run together at a pipeline checkpoint
pub struct ValidationPass {
    name: &'static str,
    rules: Vec<Box<dyn Rule>>,
}

/// Per-rule finding counts of one validation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub findings: Vec<(&'static str, usize)>,
}

impl ValidationReport {
    pub fn total(&self) -> usize {
        self.findings.iter().map(|(_, n)| n).sum()
    }
}

impl ValidationPass {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every rule, recording findings as diagnostics
    pub fn run(&self, program: &Program, diags: &mut Diagnostics) -> ValidationReport {
        let mut report = ValidationReport::default();
        for rule in &self.rules {
            let findings = rule.check(program);
            debug!(
                "{}: rule {} found {} problems",
                self.name,
                rule.name(),
                findings.len()
            );
            report.findings.push((rule.name(), findings.len()));
            for finding in findings {
                diags.emit(finding.to_diagnostic());
            }
        }
        report
    }
}
