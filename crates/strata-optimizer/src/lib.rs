//! strata-optimizer: rewriting passes of the middle-end
//!
//! # Passes
//!
//! - **Flatten functions**: closure conversion; every nested function becomes
//!   a module-level function taking its captured outer variables as extra
//!   formals, and every call passes them
//! - **Dead-store elimination**: removes assignments to locals that are not
//!   live afterwards
//!
//! # Usage
//!
//! ```ignore
//! use strata_optimizer::{FlattenFunctions, OptimizationPass};
//!
//! let result = FlattenFunctions.run(&mut program, &mut diags)?;
//! if result.modified {
//!     println!("{}", strata_ast::dump(&program));
//! }
//! ```

pub mod analysis;
mod error;
pub mod passes;

pub use error::{FlattenError, OptError};
pub use passes::{
    DeadStoreElimination, FlattenFunctions, OptimizationPass, PassResult, ITERATOR_HELPERS,
};
