//! Rules run by the `check-parsed` and `check-resolved` passes

mod config_scope;
mod iterator_intents;
mod named_args;
mod param_init;
mod receiver_defaults;
mod resolved;
mod untyped_locals;

pub use config_scope::ConfigAtModuleScope;
pub use iterator_intents::IteratorSignatures;
pub use named_args::DuplicateNamedArgs;
pub use param_init::ParamsInitialized;
pub use receiver_defaults::ReceiverNotInDefaults;
pub use resolved::{ArityAgreement, NoNestedFunctions};
pub use untyped_locals::LocalsTypedOrInitialized;
