//! Pipeline configuration
//!
//! Instrumentation is a side channel: nothing here changes which passes run
//! or what they do.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{PassDef, PipelineError};

/// When to emit the structural dump
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpAfter {
    #[default]
    Never,
    /// After every pass
    Every,
    /// After the named passes only
    Passes(Vec<String>),
}

/// Configuration for the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Time each pass
    pub timing: bool,

    /// Collect per-pass statistics
    pub stats: bool,

    /// Structural dumps between passes
    pub dump: DumpAfter,

    /// Verify structural invariants at every checkpoint
    pub verify: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timing: false,
            stats: false,
            dump: DumpAfter::Never,
            verify: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(text: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Whether the dump is wanted after `pass`
    pub fn dumps_after(&self, pass: &str) -> bool {
        match &self.dump {
            DumpAfter::Never => false,
            DumpAfter::Every => true,
            DumpAfter::Passes(names) => names.iter().any(|n| n == pass),
        }
    }

    /// Reject dump requests that name no pass in `passes`
    pub fn validate(&self, passes: &[PassDef]) -> Result<(), PipelineError> {
        if let DumpAfter::Passes(names) = &self.dump {
            for name in names {
                if !passes.iter().any(|p| p.name == name.as_str()) {
                    return Err(PipelineError::UnknownPass(name.clone()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PASSES;

    #[test]
    fn defaults_verify_and_stay_quiet() {
        let config = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert!(config.verify);
        assert!(!config.dumps_after("flatten-functions"));
    }

    #[test]
    fn dump_after_named_passes() {
        let config = PipelineConfig::from_json(
            r#"{"timing": true, "dump": {"passes": ["flatten-functions"]}}"#,
        )
        .unwrap();
        assert!(config.timing);
        assert!(config.dumps_after("flatten-functions"));
        assert!(!config.dumps_after("check-parsed"));
        assert!(config.validate(&PASSES).is_ok());
    }

    #[test]
    fn unknown_fields_and_passes_are_rejected() {
        assert!(PipelineConfig::from_json(r#"{"timings": true}"#).is_err());

        let config = PipelineConfig::from_json(r#"{"dump": {"passes": ["inline"]}}"#).unwrap();
        let err = config.validate(&PASSES).unwrap_err();
        assert_eq!(err.code(), "E-PIPE-004");
    }

    #[test]
    fn dump_every_pass() {
        let config = PipelineConfig::from_json(r#"{"dump": "every"}"#).unwrap();
        assert!(PASSES.iter().all(|p| config.dumps_after(p.name)));
    }
}
