//! strata-dataflow: basic blocks and backward dataflow analysis
//!
//! - [`Cfg`]: per-function basic blocks, derived on demand and stamped with
//!   the function's mutation epoch
//! - [`solve_backward`]: the generic iterate-to-stability driver, shared by
//!   liveness here and by capture analysis in closure conversion
//! - [`liveness`]: live-variable analysis over a function's locals

mod bitset;
pub mod cfg;
mod fixpoint;
pub mod liveness;

pub use bitset::BitSet;
pub use cfg::{BasicBlock, BlockId, Cfg, Item};
pub use fixpoint::{solve_backward, solve_backward_in_order, solve_bitsets, Solution};
pub use liveness::{analyze, Access, Liveness};

use strata_ast::SymbolId;
use thiserror::Error;

/// Errors from dataflow analysis; all of them indicate a compiler defect
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataflowError {
    #[error("{0} is not a function with a body")]
    NotAFunction(SymbolId),

    #[error("CFG of '{function}' is stale (built at epoch {built}, now {current})")]
    StaleCfg {
        function: String,
        built: u64,
        current: u64,
    },

    #[error("goto to unknown label '{label}' in '{function}'")]
    UnknownLabel { function: String, label: String },
}

impl DataflowError {
    /// Get the error code
    pub fn code(&self) -> &'static str {
        match self {
            DataflowError::NotAFunction(_) => "E-FLOW-001",
            DataflowError::StaleCfg { .. } => "E-FLOW-002",
            DataflowError::UnknownLabel { .. } => "E-FLOW-003",
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use strata_ast::surface::SurfaceProgram;
    use strata_ast::{Program, SymbolId};

    /// Lower a single module `m` holding `items`
    pub fn lower(items: serde_json::Value) -> Program {
        let surface: SurfaceProgram = serde_json::from_value(serde_json::json!({
            "modules": [{"name": "m", "items": items}]
        }))
        .unwrap();
        surface.lower().unwrap()
    }

    pub fn find(program: &Program, name: &str) -> SymbolId {
        program
            .symbols()
            .find(|(_, sym)| sym.name == name)
            .map(|(id, _)| id)
            .unwrap()
    }
}
