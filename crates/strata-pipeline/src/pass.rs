//! The static pass list
//!
//! Passes are plain entry points: the orchestrator holds the only state
//! (the position in this list), and every pass reads and writes the shared
//! program and diagnostics sink.

use strata_ast::{Diagnostics, Program};
use strata_checker::{check_parsed, check_resolved, ValidationPass};
use strata_optimizer::{DeadStoreElimination, FlattenFunctions, OptimizationPass};
use strata_symbols::compute_call_sites;

use crate::PipelineError;

/// Named counters a pass reports for statistics output
pub type PassStats = Vec<(&'static str, usize)>;

/// Entry point of a pass
pub type PassFn = fn(&mut Program, &mut Diagnostics) -> Result<PassStats, PipelineError>;

/// One entry of the ordered pass list
#[derive(Clone, Copy)]
pub struct PassDef {
    pub name: &'static str,
    pub run: PassFn,
}

impl std::fmt::Debug for PassDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassDef").field("name", &self.name).finish()
    }
}

/// The standard pass order
pub static PASSES: [PassDef; 5] = [
    PassDef {
        name: "check-parsed",
        run: run_check_parsed,
    },
    PassDef {
        name: "compute-call-sites",
        run: run_compute_call_sites,
    },
    PassDef {
        name: "flatten-functions",
        run: run_flatten_functions,
    },
    PassDef {
        name: "check-resolved",
        run: run_check_resolved,
    },
    PassDef {
        name: "dead-store-elimination",
        run: run_dead_store_elimination,
    },
];

/// Look a standard pass up by name
pub fn find_pass(name: &str) -> Option<&'static PassDef> {
    PASSES.iter().find(|p| p.name == name)
}

fn validate(pass: ValidationPass, program: &Program, diags: &mut Diagnostics) -> PassStats {
    pass.run(program, diags).findings
}

fn run_check_parsed(program: &mut Program, diags: &mut Diagnostics) -> Result<PassStats, PipelineError> {
    Ok(validate(check_parsed(), program, diags))
}

fn run_compute_call_sites(
    program: &mut Program,
    diags: &mut Diagnostics,
) -> Result<PassStats, PipelineError> {
    let stats = compute_call_sites(program, diags).map_err(|source| PipelineError::Mutation {
        pass: "compute-call-sites",
        source,
    })?;
    Ok(vec![
        ("calls", stats.calls),
        ("late-bound", stats.late_bound),
        ("unresolved", stats.unresolved),
    ])
}

fn optimize(
    pass: &dyn OptimizationPass,
    program: &mut Program,
    diags: &mut Diagnostics,
) -> Result<PassStats, PipelineError> {
    let result = pass
        .run(program, diags)
        .map_err(|source| PipelineError::Pass {
            pass: pass.name(),
            source,
        })?;
    Ok(result.stats)
}

fn run_flatten_functions(
    program: &mut Program,
    diags: &mut Diagnostics,
) -> Result<PassStats, PipelineError> {
    optimize(&FlattenFunctions, program, diags)
}

fn run_check_resolved(program: &mut Program, diags: &mut Diagnostics) -> Result<PassStats, PipelineError> {
    Ok(validate(check_resolved(), program, diags))
}

fn run_dead_store_elimination(
    program: &mut Program,
    diags: &mut Diagnostics,
) -> Result<PassStats, PipelineError> {
    optimize(&DeadStoreElimination, program, diags)
}
