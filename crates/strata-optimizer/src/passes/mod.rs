//! Rewriting passes over the whole program

pub mod dead_store;
pub mod flatten;

pub use dead_store::DeadStoreElimination;
pub use flatten::{FlattenFunctions, ITERATOR_HELPERS};

use strata_ast::{Diagnostics, Program};

use crate::OptError;

/// Result of running one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassResult {
    /// Whether the pass modified the program
    pub modified: bool,
    /// Named counters for statistics output
    pub stats: Vec<(&'static str, usize)>,
}

impl PassResult {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn stat(&self, name: &str) -> Option<usize> {
        self.stats.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }
}

/// A pass that rewrites the program in place
///
/// Passes hold no state between runs. User-facing findings go to the
/// diagnostics sink; an `Err` is a compiler defect.
pub trait OptimizationPass {
    /// Short kebab-case name, used in logs and the pass list
    fn name(&self) -> &'static str;

    fn run(&self, program: &mut Program, diags: &mut Diagnostics) -> Result<PassResult, OptError>;
}
