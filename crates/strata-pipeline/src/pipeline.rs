//! The pass orchestrator
//!
//! The pipeline owns the program and the diagnostics sink for one
//! compilation and steps through an ordered pass list. After each pass it
//! runs a checkpoint; the first checkpoint that sees a fatal or continuable
//! error ends the run, and no later pass or backend ever sees the program.

use std::time::Instant;

use log::{debug, info, warn};
use strata_ast::{dump, Diagnostics, Program};

use crate::checkpoint::{checkpoint, Verdict};
use crate::instrument::{Counts, Outcome, PassRecord, RunReport};
use crate::{Backend, PassDef, PipelineConfig, PipelineError, PASSES};

/// Result of one [`Pipeline::run_next`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The pass ran; more passes remain
    Ran(&'static str),
    Completed,
    Aborted { index: usize, pass: &'static str },
}

pub struct Pipeline {
    passes: Vec<PassDef>,
    next: usize,
    program: Program,
    diags: Diagnostics,
    config: PipelineConfig,
    report: RunReport,
}

impl Pipeline {
    /// A pipeline over the standard pass order
    pub fn new(program: Program, config: PipelineConfig) -> Result<Self, PipelineError> {
        Self::with_passes(program, PASSES.to_vec(), config)
    }

    pub fn with_passes(
        program: Program,
        passes: Vec<PassDef>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate(&passes)?;
        Ok(Self {
            passes,
            next: 0,
            program,
            diags: Diagnostics::new(),
            config,
            report: RunReport::default(),
        })
    }

    /// Run the next pass and its checkpoint
    ///
    /// Once the run has finished this only repeats the final step.
    pub fn run_next(&mut self) -> Result<Step, PipelineError> {
        match self.report.outcome {
            Outcome::Completed => return Ok(Step::Completed),
            Outcome::Aborted { index, pass } => return Ok(Step::Aborted { index, pass }),
            Outcome::Pending => {}
        }
        let Some(def) = self.passes.get(self.next).copied() else {
            self.report.outcome = Outcome::Completed;
            return Ok(Step::Completed);
        };

        debug!("running pass {} ({}/{})", def.name, self.next + 1, self.passes.len());
        self.diags.enter_pass(def.name);
        let before = Counts::of(&self.diags);
        let start = Instant::now();
        let stats = (def.run)(&mut self.program, &mut self.diags)?;
        let elapsed = start.elapsed();

        let verdict = checkpoint(def.name, &self.program, &self.diags, self.config.verify)?;

        let totals = Counts::of(&self.diags);
        let mut record = PassRecord::new(def.name, totals.since(before));
        if self.config.timing {
            record = record.with_timing(elapsed);
        }
        if self.config.stats {
            record = record.with_stats(&stats);
        }
        if self.config.dumps_after(def.name) {
            record = record.with_dump(dump(&self.program));
        }
        self.report.passes.push(record);
        self.report.totals = totals;

        let index = self.next;
        self.next += 1;
        if verdict == Verdict::Abort {
            warn!(
                "aborting after pass {}: {} fatal, {} errors",
                def.name, totals.fatal, totals.errors
            );
            self.report.outcome = Outcome::Aborted {
                index,
                pass: def.name,
            };
            return Ok(Step::Aborted {
                index,
                pass: def.name,
            });
        }
        if self.next == self.passes.len() {
            info!("all {} passes completed", self.passes.len());
            self.report.outcome = Outcome::Completed;
            return Ok(Step::Completed);
        }
        Ok(Step::Ran(def.name))
    }

    /// Run every remaining pass
    pub fn run_to_end(&mut self) -> Result<Outcome, PipelineError> {
        loop {
            match self.run_next()? {
                Step::Ran(_) => continue,
                Step::Completed | Step::Aborted { .. } => return Ok(self.report.outcome),
            }
        }
    }

    /// Run every remaining pass, then hand the program to `backend` if the
    /// run completed
    pub fn run(&mut self, backend: &mut dyn Backend) -> Result<Outcome, PipelineError> {
        let outcome = self.run_to_end()?;
        if outcome == Outcome::Completed {
            info!("code generation with backend {}", backend.name());
            backend
                .generate(&self.program)
                .map_err(|e| PipelineError::Backend {
                    backend: backend.name().to_string(),
                    message: e.to_string(),
                })?;
        }
        Ok(outcome)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn outcome(&self) -> Outcome {
        self.report.outcome
    }

    /// Names of the passes that have run so far
    pub fn passes_run(&self) -> Vec<&'static str> {
        self.passes[..self.next].iter().map(|p| p.name).collect()
    }

    pub fn into_parts(self) -> (Program, Diagnostics, RunReport) {
        (self.program, self.diags, self.report)
    }
}
