//! Structural dump of the AST
//!
//! A read-only, indented rendering used for debugging dumps between passes.
//! Two spaces per level, one statement per line, expressions inline.

use crate::{NodeId, NodeKind, Program, SymbolId, SymbolKind};

/// Render every module
pub fn dump(program: &Program) -> String {
    let mut printer = Printer::new(program);
    for &module in program.modules() {
        printer.line(0, &format!("module {}", program.symbol(module).name));
        if let Some(root) = program.module_block(module) {
            printer.block_contents(root, 1);
        }
    }
    printer.out
}

/// Render one subtree
pub fn dump_node(program: &Program, id: NodeId) -> String {
    let mut printer = Printer::new(program);
    printer.stmt(id, 0);
    printer.out
}

/// Helper to generate indentation string (two spaces per level).
fn indent_str(level: usize) -> String {
    "  ".repeat(level)
}

struct Printer<'a> {
    program: &'a Program,
    out: String,
}

impl<'a> Printer<'a> {
    fn new(program: &'a Program) -> Self {
        Self {
            program,
            out: String::new(),
        }
    }

    fn line(&mut self, indent: usize, text: &str) {
        self.out.push_str(&indent_str(indent));
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn block_contents(&mut self, block: NodeId, indent: usize) {
        for child in self.program.kind(block).children() {
            self.stmt(child, indent);
        }
    }

    fn stmt(&mut self, id: NodeId, indent: usize) {
        let program = self.program;
        match program.kind(id) {
            NodeKind::Block { .. } => {
                self.line(indent, "{");
                self.block_contents(id, indent + 1);
                self.line(indent, "}");
            }
            NodeKind::Assign { target, value } => {
                let text = format!("{} = {}", self.expr(*target), self.expr(*value));
                self.line(indent, &text);
            }
            NodeKind::Cond {
                cond,
                then_block,
                else_block,
            } => {
                let text = format!("if {}", self.expr(*cond));
                self.line(indent, &text);
                self.block_contents(*then_block, indent + 1);
                if let Some(else_block) = else_block {
                    self.line(indent, "else");
                    self.block_contents(*else_block, indent + 1);
                }
            }
            NodeKind::While {
                cond,
                body,
                test_first,
            } => {
                let keyword = if *test_first { "while" } else { "do-while" };
                let text = format!("{} {}", keyword, self.expr(*cond));
                self.line(indent, &text);
                self.block_contents(*body, indent + 1);
            }
            NodeKind::For {
                index,
                iterable,
                body,
            } => {
                let index_name = program
                    .kind(*index)
                    .defined_symbol()
                    .map(|sym| self.symbol_name(sym))
                    .unwrap_or_default();
                let text = format!("for {} in {}", index_name, self.expr(*iterable));
                self.line(indent, &text);
                self.block_contents(*body, indent + 1);
            }
            NodeKind::Return { value } => {
                let text = match value {
                    Some(value) => format!("return {}", self.expr(*value)),
                    None => "return".to_string(),
                };
                self.line(indent, &text);
            }
            NodeKind::Break => self.line(indent, "break"),
            NodeKind::Continue => self.line(indent, "continue"),
            NodeKind::Label { name } => self.line(indent, &format!("label {}", name)),
            NodeKind::Goto { label } => self.line(indent, &format!("goto {}", label)),
            NodeKind::Def { sym, value } => {
                let text = self.def_header(*sym, *value);
                self.line(indent, &text);
            }
            NodeKind::FnDef { sym, formals, body } => {
                let symbol = program.symbol(*sym);
                let params: Vec<String> = formals
                    .iter()
                    .filter_map(|formal| match program.kind(*formal) {
                        NodeKind::Def { sym, value } => Some(self.formal(*sym, *value)),
                        _ => None,
                    })
                    .collect();
                let mut text = format!("fn {}({})", symbol.name, params.join(", "));
                if !symbol.ty.is_unknown() && !symbol.ty.is_void() {
                    text.push_str(&format!(" -> {}", symbol.ty));
                }
                if !symbol.flags.is_empty() {
                    text.push_str(&format!(" {}", symbol.flags));
                }
                self.line(indent, &text);
                self.block_contents(*body, indent + 1);
            }
            _ => {
                let text = self.expr(id);
                self.line(indent, &text);
            }
        }
    }

    fn def_header(&self, sym: SymbolId, value: Option<NodeId>) -> String {
        let symbol = self.program.symbol(sym);
        let keyword = match symbol.kind {
            SymbolKind::Type => "type",
            _ => "var",
        };
        let mut text = format!("{} {}", keyword, symbol.name);
        if !symbol.ty.is_unknown() && !matches!(symbol.kind, SymbolKind::Type) {
            text.push_str(&format!(": {}", symbol.ty));
        }
        if let Some(value) = value {
            text.push_str(&format!(" = {}", self.expr(value)));
        }
        if !symbol.flags.is_empty() {
            text.push_str(&format!(" {}", symbol.flags));
        }
        text
    }

    fn formal(&self, sym: SymbolId, value: Option<NodeId>) -> String {
        let symbol = self.program.symbol(sym);
        let mut text = String::new();
        if let Some(intent) = symbol.intent() {
            if !intent.as_str().is_empty() {
                text.push_str(intent.as_str());
                text.push(' ');
            }
        }
        text.push_str(&symbol.name);
        if !symbol.ty.is_unknown() {
            text.push_str(&format!(": {}", symbol.ty));
        }
        if let Some(value) = value {
            text.push_str(&format!(" = {}", self.expr(value)));
        }
        text
    }

    fn symbol_name(&self, sym: SymbolId) -> String {
        self.program.symbol(sym).name.clone()
    }

    fn expr(&self, id: NodeId) -> String {
        let program = self.program;
        match program.kind(id) {
            NodeKind::SymRef(sym) => self.symbol_name(*sym),
            NodeKind::Literal(lit) => lit.to_string(),
            NodeKind::Call { name, args, .. } => {
                let args: Vec<String> = args.iter().map(|a| self.expr(*a)).collect();
                format!("{}({})", name, args.join(", "))
            }
            NodeKind::NamedArg { name, value } => format!("{}: {}", name, self.expr(*value)),
            NodeKind::Prim { op, args } => {
                let args: Vec<String> = args.iter().map(|a| self.expr(*a)).collect();
                format!("{}({})", op.as_str(), args.join(", "))
            }
            other => format!("<{:?}>", other.tag()),
        }
    }
}
