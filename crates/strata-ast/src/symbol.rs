//! Symbols: named, typed entities introduced by definition nodes

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Flag, FlagSet, NodeId, Ty};

/// Stable index of a symbol in the program arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// How a formal receives its actual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    #[default]
    Blank,
    In,
    Const,
    ConstIn,
    ConstRef,
    Ref,
    Out,
    InOut,
    Param,
    Type,
}

impl Intent {
    /// Intents that bind the formal to the caller's storage
    pub fn is_ref_like(&self) -> bool {
        matches!(
            self,
            Intent::Ref | Intent::ConstRef | Intent::Out | Intent::InOut
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Blank => "",
            Intent::In => "in",
            Intent::Const => "const",
            Intent::ConstIn => "const in",
            Intent::ConstRef => "const ref",
            Intent::Ref => "ref",
            Intent::Out => "out",
            Intent::InOut => "inout",
            Intent::Param => "param",
            Intent::Type => "type",
        }
    }
}

/// What a function returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetTag {
    #[default]
    Value,
    Ref,
    ConstRef,
    Type,
    Param,
}

impl RetTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetTag::Value => "value",
            RetTag::Ref => "ref",
            RetTag::ConstRef => "const ref",
            RetTag::Type => "type",
            RetTag::Param => "param",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgData {
    pub intent: Intent,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FnData {
    pub ret_tag: RetTag,
    /// Variable holding the return value, when the body assigns one
    pub ret_var: Option<SymbolId>,
    /// Calls that invoke this function; filled in by call-site computation
    pub called_by: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleData {
    /// Root block of the module's top level
    pub block: NodeId,
}

/// Variant data per symbol kind
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Var,
    Arg(ArgData),
    Fn(FnData),
    Type,
    Module(ModuleData),
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Var => "var",
            SymbolKind::Arg(_) => "arg",
            SymbolKind::Fn(_) => "fn",
            SymbolKind::Type => "type",
            SymbolKind::Module(_) => "module",
        }
    }
}

/// A named entity
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Declared type; for functions, the return type
    pub ty: Ty,
    /// The definition node that introduces this symbol
    pub def: Option<NodeId>,
    pub flags: FlagSet,
    pub(crate) live: bool,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, ty: Ty) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            def: None,
            flags: FlagSet::new(),
            live: true,
        }
    }

    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn is_fn(&self) -> bool {
        matches!(self.kind, SymbolKind::Fn(_))
    }

    /// Variables and formals: the symbols a function can capture
    pub fn is_value(&self) -> bool {
        matches!(self.kind, SymbolKind::Var | SymbolKind::Arg(_))
    }

    pub fn fn_data(&self) -> Option<&FnData> {
        match &self.kind {
            SymbolKind::Fn(data) => Some(data),
            _ => None,
        }
    }

    pub fn fn_data_mut(&mut self) -> Option<&mut FnData> {
        match &mut self.kind {
            SymbolKind::Fn(data) => Some(data),
            _ => None,
        }
    }

    pub fn intent(&self) -> Option<Intent> {
        match &self.kind {
            SymbolKind::Arg(arg) => Some(arg.intent),
            _ => None,
        }
    }
}
