//! Strata - a whole-program compiler middle-end
//!
//! This is the root workspace crate: a one-call entry point over the member
//! crates plus the workspace integration tests. The passes themselves live
//! in the member crates.

// Re-export main crates for convenience
pub use strata_ast as ast;
pub use strata_pipeline as pipeline;

use strata_ast::surface::{LowerError, SurfaceProgram};
use strata_ast::{Diagnostics, Program};
use strata_pipeline::{DumpBackend, Outcome, Pipeline, PipelineConfig, PipelineError, RunReport};
use thiserror::Error;

/// Why a compilation could not produce an outcome
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("malformed surface program: {0}")]
    Surface(#[from] serde_json::Error),

    #[error(transparent)]
    Lower(#[from] LowerError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl CompileError {
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::Surface(_) => "E-SURFACE-001",
            CompileError::Lower(e) => e.code(),
            CompileError::Pipeline(e) => e.code(),
        }
    }
}

/// Everything one compilation produced
#[derive(Debug)]
pub struct Compilation {
    pub outcome: Outcome,
    pub program: Program,
    pub diagnostics: Diagnostics,
    pub report: RunReport,
    /// Structural dump of the final program, when every pass completed
    pub output: Option<String>,
}

/// Lower a surface program (JSON) and run the standard passes over it
pub fn compile(surface: &str, config: PipelineConfig) -> Result<Compilation, CompileError> {
    let program = SurfaceProgram::from_json(surface)?.lower()?;
    let mut pipeline = Pipeline::new(program, config)?;
    let mut backend = DumpBackend::new();
    let outcome = pipeline.run(&mut backend)?;
    let (program, diagnostics, report) = pipeline.into_parts();
    Ok(Compilation {
        outcome,
        program,
        diagnostics,
        report,
        output: backend.output().map(str::to_string),
    })
}
