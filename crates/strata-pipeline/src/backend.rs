//! The code generation seam
//!
//! A backend receives the final program only when every pass completed:
//! no nested functions remain, every call is resolved, and flags are final.

use strata_ast::{dump, Program};

/// Code generator invoked at the end of a completed run
pub trait Backend {
    fn name(&self) -> &'static str;

    fn generate(&mut self, program: &Program) -> Result<(), Box<dyn std::error::Error>>;
}

/// Backend that renders the structural dump of the final program
#[derive(Debug, Default)]
pub struct DumpBackend {
    output: Option<String>,
}

impl DumpBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dump, once [`Backend::generate`] ran
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }
}

impl Backend for DumpBackend {
    fn name(&self) -> &'static str {
        "dump"
    }

    fn generate(&mut self, program: &Program) -> Result<(), Box<dyn std::error::Error>> {
        self.output = Some(dump(program));
        Ok(())
    }
}
