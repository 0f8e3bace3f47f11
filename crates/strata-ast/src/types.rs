//! Type handles
//!
//! The middle-end does not type check; it only needs enough of a type to
//! decide how values are passed and whether a declaration was typed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::SymbolId;

/// A type handle on a symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Ty {
    /// No declared type; inferred later (or never)
    #[default]
    Unknown,
    Void,
    Int,
    Bool,
    Str,
    /// A user-defined type, referring to its type symbol
    Named(SymbolId),
    /// Reference to a value of the inner type
    Ref(Box<Ty>),
}

impl Ty {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Ty::Unknown)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Ty::Void)
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Ty::Ref(_))
    }

    /// The reference form of this type, if values of it can be referenced
    pub fn ref_form(&self) -> Option<Ty> {
        match self {
            Ty::Int | Ty::Bool | Ty::Str | Ty::Named(_) => Some(Ty::Ref(Box::new(self.clone()))),
            Ty::Unknown | Ty::Void | Ty::Ref(_) => None,
        }
    }

    pub fn has_ref_form(&self) -> bool {
        self.ref_form().is_some()
    }

    /// Strip one level of reference
    pub fn value_type(&self) -> &Ty {
        match self {
            Ty::Ref(inner) => inner,
            other => other,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Unknown => f.write_str("?"),
            Ty::Void => f.write_str("void"),
            Ty::Int => f.write_str("int"),
            Ty::Bool => f.write_str("bool"),
            Ty::Str => f.write_str("string"),
            Ty::Named(id) => write!(f, "type#{}", id.0),
            Ty::Ref(inner) => write!(f, "ref {}", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_types_have_ref_form() {
        assert_eq!(Ty::Int.ref_form(), Some(Ty::Ref(Box::new(Ty::Int))));
        assert!(Ty::Named(SymbolId(3)).has_ref_form());
        assert!(!Ty::Ref(Box::new(Ty::Int)).has_ref_form());
        assert!(!Ty::Unknown.has_ref_form());
        assert!(!Ty::Void.has_ref_form());
    }
}
