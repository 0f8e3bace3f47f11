//! Surface form: the serialized AST a front-end hands to the middle-end
//!
//! The surface form is plain JSON. Statements are objects tagged by `kind`;
//! expressions are written compactly:
//!
//! ```text
//! "x"                              reference to the nearest `x`
//! 42, true                         literals
//! {"str": "hi"}                    string literal
//! {"call": "f", "args": [..]}      call
//! {"named": "a", "value": 1}       named actual
//! {"prim": "add", "args": [..]}    primitive operation
//! {"addr_of": "x"}, {"deref": "r"} reference primitives
//! ```
//!
//! Lowering binds every name to the nearest enclosing declaration. Functions
//! and types are visible throughout the block that declares them; variables
//! from their declaration onward. Calls whose name binds nothing are left
//! unresolved for call-site computation to report.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::{
    ArgData, Flag, FnData, Intent, Literal, NodeId, NodeKind, PrimOp, Program, RetTag, Span,
    Symbol, SymbolId, SymbolKind, Ty,
};

/// Errors raised while lowering a surface program
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("unknown name '{name}'")]
    UnknownName { name: String, span: Span },

    #[error("'{name}' is already declared in this scope")]
    Duplicate { name: String, span: Span },

    #[error("malformed type '{text}'")]
    MalformedType { text: String, span: Span },

    #[error("unknown type '{name}'")]
    UnknownType { name: String, span: Span },

    #[error("the return value variable of '{function}' is declared twice")]
    DuplicateReturnVar { function: String, span: Span },

    #[error("arena rejected the lowered tree: {0}")]
    Ast(#[from] crate::AstError),
}

impl LowerError {
    /// Get the error code
    pub fn code(&self) -> &'static str {
        match self {
            LowerError::UnknownName { .. } => "E-LOWER-001",
            LowerError::Duplicate { .. } => "E-LOWER-002",
            LowerError::MalformedType { .. } => "E-LOWER-003",
            LowerError::UnknownType { .. } => "E-LOWER-004",
            LowerError::DuplicateReturnVar { .. } => "E-LOWER-005",
            LowerError::Ast(_) => "E-LOWER-006",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            LowerError::UnknownName { span, .. }
            | LowerError::Duplicate { span, .. }
            | LowerError::MalformedType { span, .. }
            | LowerError::UnknownType { span, .. }
            | LowerError::DuplicateReturnVar { span, .. } => *span,
            LowerError::Ast(_) => Span::dummy(),
        }
    }
}

// ===== Surface types =====

#[derive(Debug, Clone, Deserialize)]
pub struct SurfaceProgram {
    pub modules: Vec<SurfaceModule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurfaceModule {
    pub name: String,
    #[serde(default)]
    pub items: Vec<SurfaceStmt>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurfaceStmt {
    #[serde(flatten)]
    pub kind: StmtKind,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StmtKind {
    Var {
        name: String,
        #[serde(default)]
        ty: Option<String>,
        #[serde(default)]
        init: Option<SurfaceExpr>,
        #[serde(default)]
        flags: Vec<Flag>,
    },
    Type {
        name: String,
    },
    Fn {
        name: String,
        #[serde(default)]
        formals: Vec<SurfaceFormal>,
        /// Declared return type; omitted means void
        #[serde(default)]
        ret: Option<String>,
        #[serde(default)]
        ret_tag: RetTag,
        #[serde(default)]
        flags: Vec<Flag>,
        #[serde(default)]
        body: Vec<SurfaceStmt>,
    },
    Assign {
        target: SurfaceExpr,
        value: SurfaceExpr,
    },
    If {
        cond: SurfaceExpr,
        then: Vec<SurfaceStmt>,
        #[serde(default, rename = "else")]
        otherwise: Option<Vec<SurfaceStmt>>,
    },
    While {
        cond: SurfaceExpr,
        #[serde(default)]
        body: Vec<SurfaceStmt>,
    },
    DoWhile {
        cond: SurfaceExpr,
        #[serde(default)]
        body: Vec<SurfaceStmt>,
    },
    For {
        index: String,
        iterable: SurfaceExpr,
        #[serde(default)]
        body: Vec<SurfaceStmt>,
    },
    Return {
        #[serde(default)]
        value: Option<SurfaceExpr>,
    },
    Break,
    Continue,
    Label {
        name: String,
    },
    Goto {
        label: String,
    },
    Expr {
        expr: SurfaceExpr,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurfaceFormal {
    pub name: String,
    #[serde(default)]
    pub ty: Option<String>,
    #[serde(default)]
    pub intent: Intent,
    #[serde(default)]
    pub default: Option<SurfaceExpr>,
    #[serde(default)]
    pub flags: Vec<Flag>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SurfaceExpr {
    Int(i64),
    Bool(bool),
    Name(String),
    Str {
        str: String,
    },
    Call {
        call: String,
        #[serde(default)]
        args: Vec<SurfaceExpr>,
    },
    Named {
        named: String,
        value: Box<SurfaceExpr>,
    },
    Prim {
        prim: PrimOp,
        #[serde(default)]
        args: Vec<SurfaceExpr>,
    },
    AddrOf {
        addr_of: Box<SurfaceExpr>,
    },
    Deref {
        deref: Box<SurfaceExpr>,
    },
}

impl SurfaceProgram {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Build a populated arena from the surface form
    pub fn lower(&self) -> Result<Program, LowerError> {
        let mut lowerer = Lowerer {
            program: Program::new(),
            scopes: Vec::new(),
            current_fn: None,
        };
        for module in &self.modules {
            lowerer.module(module)?;
        }
        Ok(lowerer.program)
    }
}

// ===== Lowering =====

struct Lowerer {
    program: Program,
    scopes: Vec<HashMap<String, SymbolId>>,
    current_fn: Option<SymbolId>,
}

impl Lowerer {
    fn module(&mut self, module: &SurfaceModule) -> Result<(), LowerError> {
        let sym = self.program.add_module(module.name.clone(), module.span);
        let Some(root) = self.program.module_block(sym) else {
            return Ok(());
        };
        self.scopes.push(HashMap::new());
        let result = self.block_items(&module.items, root);
        self.scopes.pop();
        result
    }

    /// Lower a statement list into an existing (possibly attached) block
    fn block_items(&mut self, items: &[SurfaceStmt], block: NodeId) -> Result<(), LowerError> {
        self.hoist(items)?;
        for item in items {
            let stmts = self.stmt(item)?;
            for stmt in stmts {
                self.program.append(block, stmt)?;
            }
        }
        Ok(())
    }

    /// Lower a statement list into a fresh block with its own scope
    fn block(&mut self, items: &[SurfaceStmt], span: Span) -> Result<NodeId, LowerError> {
        let block = self
            .program
            .add_node(NodeKind::Block { stmts: Vec::new() }, span);
        self.scopes.push(HashMap::new());
        let result = self.block_items(items, block);
        self.scopes.pop();
        result.map(|_| block)
    }

    /// Declare the functions and types of a block before lowering its
    /// statements, so they can be used ahead of their definition
    fn hoist(&mut self, items: &[SurfaceStmt]) -> Result<(), LowerError> {
        for item in items {
            match &item.kind {
                StmtKind::Type { name } => {
                    let sym = Symbol::new(name.clone(), SymbolKind::Type, Ty::Unknown);
                    let id = self.program.add_symbol(sym);
                    self.program.symbol_mut(id).ty = Ty::Named(id);
                    self.declare(name, id, item.span)?;
                }
                StmtKind::Fn {
                    name,
                    ret,
                    ret_tag,
                    flags,
                    ..
                } => {
                    let data = FnData {
                        ret_tag: *ret_tag,
                        ..FnData::default()
                    };
                    let id = self
                        .program
                        .add_symbol(Symbol::new(name.clone(), SymbolKind::Fn(data), Ty::Void));
                    for flag in flags {
                        self.program.attach_flag(id, *flag);
                    }
                    if ret.is_some() {
                        self.program.attach_flag(id, Flag::SpecifiedReturnType);
                    }
                    self.declare(name, id, item.span)?;
                }
                _ => {}
            }
        }
        // Return types may name types hoisted above
        for item in items {
            if let StmtKind::Fn {
                name, ret: Some(ret), ..
            } = &item.kind
            {
                let ty = self.ty(ret, item.span)?;
                if let Some(id) = self.lookup(name) {
                    self.program.symbol_mut(id).ty = ty;
                }
            }
        }
        Ok(())
    }

    fn declare(&mut self, name: &str, sym: SymbolId, span: Span) -> Result<(), LowerError> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| LowerError::UnknownName {
                name: name.to_string(),
                span,
            })?;
        if scope.insert(name.to_string(), sym).is_some() {
            return Err(LowerError::Duplicate {
                name: name.to_string(),
                span,
            });
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn value(&self, name: &str, span: Span) -> Result<SymbolId, LowerError> {
        self.lookup(name)
            .filter(|sym| self.program.symbol(*sym).is_value())
            .ok_or_else(|| LowerError::UnknownName {
                name: name.to_string(),
                span,
            })
    }

    fn ty(&self, text: &str, span: Span) -> Result<Ty, LowerError> {
        let text = text.trim();
        if let Some(inner) = text.strip_prefix("ref ") {
            let inner = self.ty(inner, span)?;
            return match inner {
                Ty::Void | Ty::Unknown | Ty::Ref(_) => Err(LowerError::MalformedType {
                    text: text.to_string(),
                    span,
                }),
                inner => Ok(Ty::Ref(Box::new(inner))),
            };
        }
        match text {
            "int" => Ok(Ty::Int),
            "bool" => Ok(Ty::Bool),
            "string" => Ok(Ty::Str),
            "void" => Ok(Ty::Void),
            "" | "ref" => Err(LowerError::MalformedType {
                text: text.to_string(),
                span,
            }),
            name if name.contains(char::is_whitespace) => Err(LowerError::MalformedType {
                text: text.to_string(),
                span,
            }),
            name => match self.lookup(name) {
                Some(sym) if matches!(self.program.symbol(sym).kind, SymbolKind::Type) => {
                    Ok(Ty::Named(sym))
                }
                _ => Err(LowerError::UnknownType {
                    name: name.to_string(),
                    span,
                }),
            },
        }
    }

    /// Lower one statement; some surface statements expand to several
    fn stmt(&mut self, stmt: &SurfaceStmt) -> Result<Vec<NodeId>, LowerError> {
        let span = stmt.span;
        let node = match &stmt.kind {
            StmtKind::Var {
                name,
                ty,
                init,
                flags,
            } => {
                let ty = match ty {
                    Some(text) => self.ty(text, span)?,
                    None => Ty::Unknown,
                };
                // The initializer cannot see the variable it initializes
                let value = init.as_ref().map(|e| self.expr(e, span)).transpose()?;
                let sym = self
                    .program
                    .add_symbol(Symbol::new(name.clone(), SymbolKind::Var, ty));
                for flag in flags {
                    self.program.attach_flag(sym, *flag);
                }
                if flags.contains(&Flag::ReturnValue) {
                    self.bind_ret_var(sym, span)?;
                }
                self.declare(name, sym, span)?;
                self.program.def(sym, value, span)
            }
            StmtKind::Type { name } => {
                let sym = self.lookup_declared(name, span)?;
                self.program.def(sym, None, span)
            }
            StmtKind::Fn {
                name,
                formals,
                body,
                ..
            } => {
                let sym = self.lookup_declared(name, span)?;
                self.function(sym, formals, body, span)?
            }
            StmtKind::Assign { target, value } => {
                let value = self.expr(value, span)?;
                let target = self.expr(target, span)?;
                self.program
                    .add_node(NodeKind::Assign { target, value }, span)
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.expr(cond, span)?;
                let then_block = self.block(then, span)?;
                let else_block = otherwise
                    .as_ref()
                    .map(|items| self.block(items, span))
                    .transpose()?;
                self.program.add_node(
                    NodeKind::Cond {
                        cond,
                        then_block,
                        else_block,
                    },
                    span,
                )
            }
            StmtKind::While { cond, body } => return self.while_loop(cond, body, true, span),
            StmtKind::DoWhile { cond, body } => return self.while_loop(cond, body, false, span),
            StmtKind::For {
                index,
                iterable,
                body,
            } => {
                let iterable = self.expr(iterable, span)?;
                let index_sym = self
                    .program
                    .add_symbol(Symbol::new(index.clone(), SymbolKind::Var, Ty::Unknown));
                self.program.attach_flag(index_sym, Flag::IndexVar);
                let index_def = self.program.def(index_sym, None, span);

                self.scopes.push(HashMap::new());
                let declared = self.declare(index, index_sym, span);
                let body = declared.and_then(|_| self.block(body, span));
                self.scopes.pop();
                let body = body?;

                self.program.add_node(
                    NodeKind::For {
                        index: index_def,
                        iterable,
                        body,
                    },
                    span,
                )
            }
            StmtKind::Return { value } => {
                let value = value.as_ref().map(|e| self.expr(e, span)).transpose()?;
                self.program.add_node(NodeKind::Return { value }, span)
            }
            StmtKind::Break => self.program.add_node(NodeKind::Break, span),
            StmtKind::Continue => self.program.add_node(NodeKind::Continue, span),
            StmtKind::Label { name } => self
                .program
                .add_node(NodeKind::Label { name: name.clone() }, span),
            StmtKind::Goto { label } => self.program.add_node(
                NodeKind::Goto {
                    label: label.clone(),
                },
                span,
            ),
            StmtKind::Expr { expr } => self.expr(expr, span)?,
        };
        Ok(vec![node])
    }

    fn lookup_declared(&self, name: &str, span: Span) -> Result<SymbolId, LowerError> {
        self.scopes
            .last()
            .and_then(|scope| scope.get(name).copied())
            .ok_or_else(|| LowerError::UnknownName {
                name: name.to_string(),
                span,
            })
    }

    fn bind_ret_var(&mut self, sym: SymbolId, span: Span) -> Result<(), LowerError> {
        let Some(f) = self.current_fn else {
            return Ok(());
        };
        let function = self.program.symbol(f).name.clone();
        match self.program.symbol_mut(f).fn_data_mut() {
            Some(data) if data.ret_var.is_some() => {
                Err(LowerError::DuplicateReturnVar { function, span })
            }
            Some(data) => {
                data.ret_var = Some(sym);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn function(
        &mut self,
        sym: SymbolId,
        formals: &[SurfaceFormal],
        body: &[SurfaceStmt],
        span: Span,
    ) -> Result<NodeId, LowerError> {
        let outer_fn = self.current_fn.replace(sym);
        self.scopes.push(HashMap::new());
        let result = self.function_inner(sym, formals, body, span);
        self.scopes.pop();
        self.current_fn = outer_fn;
        result
    }

    fn function_inner(
        &mut self,
        sym: SymbolId,
        formals: &[SurfaceFormal],
        body: &[SurfaceStmt],
        span: Span,
    ) -> Result<NodeId, LowerError> {
        // Every formal is visible in every default value
        let mut formal_syms = Vec::with_capacity(formals.len());
        for formal in formals {
            let ty = match &formal.ty {
                Some(text) => self.ty(text, span)?,
                None => Ty::Unknown,
            };
            let arg = self.program.add_symbol(Symbol::new(
                formal.name.clone(),
                SymbolKind::Arg(ArgData {
                    intent: formal.intent,
                }),
                ty,
            ));
            for flag in &formal.flags {
                self.program.attach_flag(arg, *flag);
            }
            self.declare(&formal.name, arg, span)?;
            formal_syms.push(arg);
        }

        let mut formal_defs = Vec::with_capacity(formals.len());
        for (formal, arg) in formals.iter().zip(formal_syms) {
            let value = formal
                .default
                .as_ref()
                .map(|e| self.expr(e, span))
                .transpose()?;
            formal_defs.push(self.program.def(arg, value, span));
        }

        let body = self.block(body, span)?;
        Ok(self.program.add_node(
            NodeKind::FnDef {
                sym,
                formals: formal_defs,
                body,
            },
            span,
        ))
    }

    /// `while` and `do-while` test a condition temporary that the body
    /// recomputes as its last statement
    fn while_loop(
        &mut self,
        cond: &SurfaceExpr,
        body: &[SurfaceStmt],
        test_first: bool,
        span: Span,
    ) -> Result<Vec<NodeId>, LowerError> {
        let temp = self.program.new_temp(Ty::Bool);
        let init = if test_first {
            Some(self.expr(cond, span)?)
        } else {
            None
        };
        let temp_def = self.program.def(temp, init, span);

        let body = self.block(body, span)?;
        let recompute = self.expr(cond, span)?;
        let target = self.program.sym_ref(temp, span);
        let assign = self.program.add_node(
            NodeKind::Assign {
                target,
                value: recompute,
            },
            span,
        );
        self.program.append(body, assign)?;

        let cond = self.program.sym_ref(temp, span);
        let while_loop = self.program.add_node(
            NodeKind::While {
                cond,
                body,
                test_first,
            },
            span,
        );
        Ok(vec![temp_def, while_loop])
    }

    fn expr(&mut self, expr: &SurfaceExpr, span: Span) -> Result<NodeId, LowerError> {
        let node = match expr {
            SurfaceExpr::Int(v) => self
                .program
                .add_node(NodeKind::Literal(Literal::Int(*v)), span),
            SurfaceExpr::Bool(v) => self
                .program
                .add_node(NodeKind::Literal(Literal::Bool(*v)), span),
            SurfaceExpr::Str { str } => self
                .program
                .add_node(NodeKind::Literal(Literal::Str(str.clone())), span),
            SurfaceExpr::Name(name) => {
                let sym = self.value(name, span)?;
                self.program.sym_ref(sym, span)
            }
            SurfaceExpr::Call { call, args } => {
                let args = args
                    .iter()
                    .map(|a| self.expr(a, span))
                    .collect::<Result<Vec<_>, _>>()?;
                let callee = self
                    .lookup(call)
                    .filter(|sym| self.program.symbol(*sym).is_fn());
                self.program.add_node(
                    NodeKind::Call {
                        callee,
                        name: call.clone(),
                        args,
                    },
                    span,
                )
            }
            SurfaceExpr::Named { named, value } => {
                let value = self.expr(value, span)?;
                self.program.add_node(
                    NodeKind::NamedArg {
                        name: named.clone(),
                        value,
                    },
                    span,
                )
            }
            SurfaceExpr::Prim { prim, args } => {
                let args = args
                    .iter()
                    .map(|a| self.expr(a, span))
                    .collect::<Result<Vec<_>, _>>()?;
                self.program
                    .add_node(NodeKind::Prim { op: *prim, args }, span)
            }
            SurfaceExpr::AddrOf { addr_of } => {
                let operand = self.expr(addr_of, span)?;
                self.program.add_node(
                    NodeKind::Prim {
                        op: PrimOp::AddrOf,
                        args: vec![operand],
                    },
                    span,
                )
            }
            SurfaceExpr::Deref { deref } => {
                let operand = self.expr(deref, span)?;
                self.program.add_node(
                    NodeKind::Prim {
                        op: PrimOp::Deref,
                        args: vec![operand],
                    },
                    span,
                )
            }
        };
        Ok(node)
    }
}
