//! Semantic tags attached to symbols after the fact
//!
//! Passes record derived facts about a symbol by attaching a [`Flag`] rather
//! than changing the symbol's variant. The set is sparse: most symbols carry
//! zero or one tag, and new tags can be introduced without touching any
//! symbol definition.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A semantic tag on a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    /// Compiler-inserted temporary
    Temp,
    /// Configuration variable, settable from outside the program
    Config,
    /// Compile-time constant
    Param,
    /// Immutable after initialization
    Const,
    /// Loop index variable bound by a `for` header
    IndexVar,
    /// The distinguished variable holding a function's return value
    ReturnValue,
    Constructor,
    /// Compiler-generated default constructor
    DefaultConstructor,
    /// Function that yields values (iterator protocol)
    Iterator,
    /// The implicit receiver formal (`this`)
    Receiver,
    /// Function whose return type was written by the user
    SpecifiedReturnType,
    /// Calling this function never returns (halt, exit)
    FunctionTerminatesProgram,
    Extern,
    Export,
    /// Function relocated to module scope by closure conversion
    Flattened,
    /// Variable captured by at least one nested function
    Captured,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::Temp => "temp",
            Flag::Config => "config",
            Flag::Param => "param",
            Flag::Const => "const",
            Flag::IndexVar => "index_var",
            Flag::ReturnValue => "return_value",
            Flag::Constructor => "constructor",
            Flag::DefaultConstructor => "default_constructor",
            Flag::Iterator => "iterator",
            Flag::Receiver => "receiver",
            Flag::SpecifiedReturnType => "specified_return_type",
            Flag::FunctionTerminatesProgram => "function_terminates_program",
            Flag::Extern => "extern",
            Flag::Export => "export",
            Flag::Flattened => "flattened",
            Flag::Captured => "captured",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of flags on one symbol, kept ordered so dumps are deterministic
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSet(BTreeSet<Flag>);

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a flag; returns true if it was not already present
    pub fn insert(&mut self, flag: Flag) -> bool {
        self.0.insert(flag)
    }

    pub fn remove(&mut self, flag: Flag) -> bool {
        self.0.remove(&flag)
    }

    pub fn contains(&self, flag: Flag) -> bool {
        self.0.contains(&flag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Flag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.iter().map(|flag| flag.as_str()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_novelty() {
        let mut flags = FlagSet::new();
        assert!(flags.insert(Flag::Temp));
        assert!(!flags.insert(Flag::Temp));
        assert!(flags.contains(Flag::Temp));
        assert!(!flags.contains(Flag::Config));
    }

    #[test]
    fn display_is_ordered() {
        let flags: FlagSet = [Flag::Captured, Flag::Temp, Flag::Config].into_iter().collect();
        assert_eq!(flags.to_string(), "[temp, config, captured]");
    }

    #[test]
    fn deserializes_snake_case() {
        let flags: FlagSet = serde_json::from_str(r#"["config", "index_var"]"#).unwrap();
        assert!(flags.contains(Flag::Config));
        assert!(flags.contains(Flag::IndexVar));
    }
}
