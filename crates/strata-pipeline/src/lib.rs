//! strata-pipeline: the pass orchestrator
//!
//! Runs the ordered pass list over one program, checkpointing after every
//! pass, and hands the program to a [`Backend`] only when every pass
//! completed. Timing, statistics and structural dumps go to a [`RunReport`]
//! and the log; they never change what runs.

mod backend;
mod checkpoint;
mod config;
mod error;
mod instrument;
mod pass;
mod pipeline;

pub use backend::{Backend, DumpBackend};
pub use checkpoint::{checkpoint, Verdict};
pub use config::{DumpAfter, PipelineConfig};
pub use error::PipelineError;
pub use instrument::{Counts, Outcome, PassRecord, RunReport};
pub use pass::{find_pass, PassDef, PassFn, PassStats, PASSES};
pub use pipeline::{Pipeline, Step};
