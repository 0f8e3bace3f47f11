//! Checkpoints between passes

use log::warn;
use strata_ast::{verify, Diagnostics, Program};

use crate::PipelineError;

/// What the orchestrator does after a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    /// A fatal or continuable error has been recorded
    Abort,
}

/// Check the program after `pass` ran
///
/// Structural damage is a defect of the pass and comes back as an `Err`;
/// problems in the user's program only turn the verdict to [`Verdict::Abort`].
pub fn checkpoint(
    pass: &'static str,
    program: &Program,
    diags: &Diagnostics,
    verify_structure: bool,
) -> Result<Verdict, PipelineError> {
    if verify_structure {
        let violations = verify(program);
        if !violations.is_empty() {
            for violation in &violations {
                warn!("checkpoint after {}: {}", pass, violation);
            }
            return Err(PipelineError::InvariantViolation { pass, violations });
        }
    }
    if diags.should_abort() {
        Ok(Verdict::Abort)
    } else {
        Ok(Verdict::Continue)
    }
}
