//! strata-checker: checkpoint validation
//!
//! Validation passes are named sets of independent whole-program rules.
//! Each rule sweeps a registry and reports every violation it finds; the
//! pass turns findings into diagnostics and never unwinds.
//!
//! - [`check_parsed`]: well-formedness of the program as the front-end
//!   handed it over
//! - [`check_resolved`]: return-path coverage plus sanity checks after
//!   closure conversion

mod error;
mod framework;
mod returns;
pub mod rules;

pub use error::CheckError;
pub use framework::{Rule, ValidationPass, ValidationReport};
pub use returns::{is_defined_all_paths, ReturnCoverage};

use rules::{
    ArityAgreement, ConfigAtModuleScope, DuplicateNamedArgs, IteratorSignatures,
    LocalsTypedOrInitialized, NoNestedFunctions, ParamsInitialized, ReceiverNotInDefaults,
};

/// Rules run right after the front-end
pub fn check_parsed() -> ValidationPass {
    ValidationPass::new("check-parsed")
        .with_rule(DuplicateNamedArgs)
        .with_rule(ConfigAtModuleScope)
        .with_rule(ParamsInitialized)
        .with_rule(LocalsTypedOrInitialized)
        .with_rule(IteratorSignatures)
        .with_rule(ReceiverNotInDefaults)
}

/// Rules run once functions are flat and calls resolved
pub fn check_resolved() -> ValidationPass {
    ValidationPass::new("check-resolved")
        .with_rule(ReturnCoverage)
        .with_rule(NoNestedFunctions)
        .with_rule(ArityAgreement)
}
