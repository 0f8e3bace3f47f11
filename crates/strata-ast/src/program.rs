//! The program arena and its structural mutators

use std::collections::HashMap;

use log::trace;

use crate::{
    AstError, Collect, Flag, ModuleData, Node, NodeId, NodeKind, NodeTag, Registries, Span,
    Symbol, SymbolId, SymbolKind, Ty,
};

/// One compilation's worth of AST, symbols and registries
///
/// Ids index into arenas that only grow; destroyed entries stay in place
/// with their live bit cleared, so an id never changes meaning. Back
/// references (parent, parent symbol, callee, call sites) are plain ids that
/// the mutators below keep consistent and that [`verify`](crate::verify)
/// checks at every checkpoint. Between a mutation and the next checkpoint an
/// id held by a pass may refer to a destroyed entry.
#[derive(Debug, Clone, Default)]
pub struct Program {
    nodes: Vec<Node>,
    symbols: Vec<Symbol>,
    modules: Vec<SymbolId>,
    registries: Registries,
    epochs: HashMap<SymbolId, u64>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything; the next compilation starts from empty arenas
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // ===== Arena access =====

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    /// Live nodes, including detached ones
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_live())
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    /// Live symbols
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .filter(|(_, sym)| sym.is_live())
            .map(|(i, sym)| (SymbolId(i as u32), sym))
    }

    pub fn modules(&self) -> &[SymbolId] {
        &self.modules
    }

    pub fn module_block(&self, module: SymbolId) -> Option<NodeId> {
        match &self.symbol(module).kind {
            SymbolKind::Module(data) => Some(data.block),
            _ => None,
        }
    }

    /// Root blocks of every module
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.modules.iter().filter_map(|m| self.module_block(*m))
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    // ===== Creation =====

    /// Create a module with an empty top-level block
    pub fn add_module(&mut self, name: impl Into<String>, span: Span) -> SymbolId {
        let block = self.push_node(Node::new(NodeKind::Block { stmts: Vec::new() }, span));
        let module = self.add_symbol(Symbol::new(
            name,
            SymbolKind::Module(ModuleData { block }),
            Ty::Void,
        ));
        self.nodes[block.0 as usize].parent_sym = Some(module);
        self.modules.push(module);
        self.registries
            .register_symbol(module, &self.symbols[module.0 as usize].kind);
        module
    }

    /// Add a symbol; it becomes reachable once its definition node is attached
    pub fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    /// Add a detached node, adopting the (fresh, detached) children its kind
    /// names and recording it as the definition of the symbol it binds
    pub fn add_node(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let children = kind.children();
        let defined = kind.defined_symbol();
        let id = self.push_node(Node::new(kind, span));
        for child in children {
            self.nodes[child.0 as usize].parent = Some(id);
        }
        if let Some(sym) = defined {
            self.symbols[sym.0 as usize].def = Some(id);
        }
        id
    }

    /// A fresh compiler temporary variable
    pub fn new_temp(&mut self, ty: Ty) -> SymbolId {
        let name = format!("_t{}", self.symbols.len());
        let id = self.add_symbol(Symbol::new(name, SymbolKind::Var, ty));
        self.attach_flag(id, Flag::Temp);
        id
    }

    pub fn sym_ref(&mut self, sym: SymbolId, span: Span) -> NodeId {
        self.add_node(NodeKind::SymRef(sym), span)
    }

    pub fn def(&mut self, sym: SymbolId, value: Option<NodeId>, span: Span) -> NodeId {
        self.add_node(NodeKind::Def { sym, value }, span)
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    // ===== Flags =====

    /// Attach a flag; returns true if the symbol did not have it yet
    pub fn attach_flag(&mut self, sym: SymbolId, flag: Flag) -> bool {
        self.symbol_mut(sym).flags.insert(flag)
    }

    pub fn has_flag(&self, sym: SymbolId, flag: Flag) -> bool {
        self.symbol(sym).has_flag(flag)
    }

    pub fn remove_flag(&mut self, sym: SymbolId, flag: Flag) -> bool {
        self.symbol_mut(sym).flags.remove(flag)
    }

    // ===== Structure queries =====

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.roots().any(|root| root == id)
    }

    /// Whether the node is reachable from a module root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if !self.node(current).is_live() {
                return false;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return self.is_root(current),
            }
        }
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).parent;
        }
        false
    }

    /// The statement containing `id`: the ancestor-or-self whose parent is a block
    pub fn enclosing_stmt(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let parent = self.node(current).parent?;
            if matches!(self.kind(parent), NodeKind::Block { .. }) {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Function whose body contains the node
    pub fn enclosing_fn(&self, id: NodeId) -> Option<SymbolId> {
        self.node(id)
            .parent_sym
            .filter(|sym| self.symbol(*sym).is_fn())
    }

    /// Function or module in which a symbol is declared
    pub fn declaring_scope(&self, sym: SymbolId) -> Option<SymbolId> {
        self.symbol(sym).def.and_then(|def| self.node(def).parent_sym)
    }

    /// Function in which a symbol is declared, if it is not module-level
    pub fn declaring_fn(&self, sym: SymbolId) -> Option<SymbolId> {
        self.declaring_scope(sym)
            .filter(|scope| self.symbol(*scope).is_fn())
    }

    /// Functions lexically enclosing `f`, innermost first
    pub fn lexical_ancestors(&self, f: SymbolId) -> Vec<SymbolId> {
        let mut ancestors = Vec::new();
        let mut current = self.declaring_fn(f);
        while let Some(outer) = current {
            ancestors.push(outer);
            current = self.declaring_fn(outer);
        }
        ancestors
    }

    pub fn is_nested_fn(&self, f: SymbolId) -> bool {
        self.symbol(f).is_fn() && self.declaring_fn(f).is_some()
    }

    /// Whether `sym` is a variable or formal of a function enclosing `f`
    pub fn is_outer_var(&self, sym: SymbolId, f: SymbolId) -> bool {
        if !self.symbol(sym).is_value() {
            return false;
        }
        match self.declaring_fn(sym) {
            Some(owner) => owner != f && self.lexical_ancestors(f).contains(&owner),
            None => false,
        }
    }

    pub fn fn_def(&self, f: SymbolId) -> Option<NodeId> {
        self.symbol(f)
            .def
            .filter(|def| matches!(self.kind(*def), NodeKind::FnDef { .. }))
    }

    pub fn fn_body(&self, f: SymbolId) -> Option<NodeId> {
        match self.kind(self.fn_def(f)?) {
            NodeKind::FnDef { body, .. } => Some(*body),
            _ => None,
        }
    }

    /// Definition nodes of a function's formals
    pub fn formal_defs(&self, f: SymbolId) -> Vec<NodeId> {
        match self.fn_def(f).map(|def| self.kind(def)) {
            Some(NodeKind::FnDef { formals, .. }) => formals.clone(),
            _ => Vec::new(),
        }
    }

    pub fn formals(&self, f: SymbolId) -> Vec<SymbolId> {
        self.formal_defs(f)
            .into_iter()
            .filter_map(|def| self.kind(def).defined_symbol())
            .collect()
    }

    /// Actual arguments of a call, `None` if the node is not a call
    pub fn call_args(&self, call: NodeId) -> Option<&[NodeId]> {
        match self.kind(call) {
            NodeKind::Call { args, .. } => Some(args),
            _ => None,
        }
    }

    pub fn callee(&self, call: NodeId) -> Option<SymbolId> {
        match self.kind(call) {
            NodeKind::Call { callee, .. } => *callee,
            _ => None,
        }
    }

    // ===== Traversal =====

    /// Nodes of one kind reachable from `root`, in pre-order
    pub fn collect(&self, root: NodeId, tag: NodeTag) -> Collect<'_> {
        Collect::new(self, root, Some(tag))
    }

    /// Every node reachable from `root`, in pre-order
    pub fn collect_all(&self, root: NodeId) -> Collect<'_> {
        Collect::new(self, root, None)
    }

    // ===== Mutation epochs =====

    /// Mutation counter of a function; bumped by every structural change in it
    pub fn epoch(&self, f: SymbolId) -> u64 {
        self.epochs.get(&f).copied().unwrap_or(0)
    }

    fn touch(&mut self, scope: Option<SymbolId>) {
        if let Some(scope) = scope {
            *self.epochs.entry(scope).or_insert(0) += 1;
        }
    }

    /// Scope that children of `parent` belong to
    fn child_scope(&self, parent: NodeId) -> Option<SymbolId> {
        match self.kind(parent) {
            NodeKind::FnDef { sym, .. } => Some(*sym),
            _ => self.node(parent).parent_sym,
        }
    }

    // ===== Mutators =====

    /// Append `node` to the child list of `owner` (block, call, primitive or
    /// function formals)
    pub fn append(&mut self, owner: NodeId, node: NodeId) -> Result<(), AstError> {
        self.check_attachable(owner, node)?;
        self.nodes[owner.0 as usize]
            .kind
            .child_list_mut()
            .ok_or(AstError::NoChildList { parent: owner })?
            .push(node);
        self.adopt(owner, node);
        Ok(())
    }

    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) -> Result<(), AstError> {
        self.insert_near(anchor, node, 0)
    }

    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> Result<(), AstError> {
        self.insert_near(anchor, node, 1)
    }

    fn insert_near(&mut self, anchor: NodeId, node: NodeId, offset: usize) -> Result<(), AstError> {
        let parent = self.live_parent(anchor)?;
        self.check_attachable(parent, node)?;
        let list = self.nodes[parent.0 as usize]
            .kind
            .child_list_mut()
            .filter(|list| list.contains(&anchor))
            .ok_or(AstError::NoChildList { parent })?;
        let pos = list.iter().position(|c| *c == anchor).unwrap_or(0);
        list.insert(pos + offset, node);
        self.adopt(parent, node);
        Ok(())
    }

    /// Put `new` in the slot `old` occupies and destroy `old`
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), AstError> {
        let parent = self.live_parent(old)?;
        self.check_attachable(parent, new)?;
        let was_attached = self.is_attached(old);

        if let Some(slot) = self.nodes[parent.0 as usize]
            .kind
            .child_slots_mut()
            .into_iter()
            .find(|slot| **slot == old)
        {
            *slot = new;
        }
        self.nodes[old.0 as usize].parent = None;
        if was_attached {
            self.deregister_subtree(old);
        }
        self.destroy(old);
        self.adopt(parent, new);
        Ok(())
    }

    /// Unlink a subtree from its parent without destroying it, so it can be
    /// attached elsewhere
    pub fn detach(&mut self, node: NodeId) -> Result<(), AstError> {
        let parent = self.live_parent(node)?;
        let was_attached = self.is_attached(node);

        let unlinked = match &mut self.nodes[parent.0 as usize].kind {
            NodeKind::Return { value: slot @ Some(_) }
            | NodeKind::Def { value: slot @ Some(_), .. }
            | NodeKind::Cond {
                else_block: slot @ Some(_),
                ..
            } if *slot == Some(node) => {
                *slot = None;
                true
            }
            kind => match kind.child_list_mut() {
                Some(list) if list.contains(&node) => {
                    list.retain(|c| *c != node);
                    true
                }
                _ => false,
            },
        };
        if !unlinked {
            return Err(AstError::RequiredChild { node, parent });
        }

        self.nodes[node.0 as usize].parent = None;
        if was_attached {
            self.deregister_subtree(node);
        }
        let scope = self.child_scope(parent);
        self.touch(scope);
        Ok(())
    }

    /// Detach and destroy a subtree, together with the symbols it defines
    pub fn remove(&mut self, node: NodeId) -> Result<(), AstError> {
        self.detach(node)?;
        self.destroy(node);
        Ok(())
    }

    /// Point a symbol reference at a different symbol
    pub fn set_ref(&mut self, node: NodeId, sym: SymbolId) -> Result<(), AstError> {
        self.check_live(node)?;
        match &mut self.nodes[node.0 as usize].kind {
            NodeKind::SymRef(target) => *target = sym,
            _ => {
                return Err(AstError::WrongKind {
                    node,
                    expected: "symbol reference",
                })
            }
        }
        let scope = self.node(node).parent_sym;
        self.touch(scope);
        Ok(())
    }

    /// Resolve (or re-resolve) the target of a call, keeping call-site lists
    /// in step
    pub fn set_callee(&mut self, call: NodeId, target: Option<SymbolId>) -> Result<(), AstError> {
        self.check_live(call)?;
        if let Some(f) = target {
            if !self.symbol(f).is_fn() {
                return Err(AstError::NotAFunction(f));
            }
        }
        let previous = match &mut self.nodes[call.0 as usize].kind {
            NodeKind::Call { callee, .. } => std::mem::replace(callee, target),
            _ => {
                return Err(AstError::WrongKind {
                    node: call,
                    expected: "call",
                })
            }
        };
        if let Some(old) = previous {
            if let Some(data) = self.symbol_mut(old).fn_data_mut() {
                data.called_by.retain(|c| *c != call);
            }
        }
        if let Some(f) = target {
            if let Some(data) = self.symbol_mut(f).fn_data_mut() {
                if !data.called_by.contains(&call) {
                    data.called_by.push(call);
                }
            }
        }
        Ok(())
    }

    /// Recompute every registry by walking from the module roots
    pub fn rebuild_registries(&mut self) {
        self.registries = self.compute_registries();
    }

    /// Registries as a fresh walk from the roots would build them
    pub fn compute_registries(&self) -> Registries {
        let mut registries = Registries::new();
        for module in &self.modules {
            registries.register_symbol(*module, &self.symbol(*module).kind);
        }
        for root in self.roots() {
            for id in self.collect_all(root) {
                let kind = self.kind(id);
                if let NodeKind::Call { .. } = kind {
                    registries.register_call(id);
                }
                if let Some(sym) = kind.defined_symbol() {
                    registries.register_symbol(sym, &self.symbol(sym).kind);
                }
            }
        }
        registries
    }

    // ===== Mutation internals =====

    fn check_live(&self, node: NodeId) -> Result<(), AstError> {
        if self.node(node).is_live() {
            Ok(())
        } else {
            Err(AstError::DeadNode(node))
        }
    }

    fn live_parent(&self, node: NodeId) -> Result<NodeId, AstError> {
        self.check_live(node)?;
        match self.node(node).parent {
            Some(parent) => Ok(parent),
            None if self.is_root(node) => Err(AstError::ModuleRoot(node)),
            None => Err(AstError::Detached(node)),
        }
    }

    fn check_attachable(&self, parent: NodeId, node: NodeId) -> Result<(), AstError> {
        self.check_live(parent)?;
        self.check_live(node)?;
        if self.is_root(node) {
            return Err(AstError::ModuleRoot(node));
        }
        if let Some(current) = self.node(node).parent {
            return Err(AstError::AlreadyAttached {
                node,
                parent: current,
            });
        }
        if self.is_ancestor(node, parent) {
            return Err(AstError::Cycle { node, parent });
        }
        Ok(())
    }

    /// Finish attaching `node` under `parent`: back-references, registries,
    /// epochs
    fn adopt(&mut self, parent: NodeId, node: NodeId) {
        self.nodes[node.0 as usize].parent = Some(parent);
        let scope = self.child_scope(parent);
        self.set_scope(node, scope);
        if self.is_attached(parent) {
            self.register_subtree(node);
        }
        self.touch(scope);
    }

    /// Rewrite parent-symbol back-references of a subtree
    fn set_scope(&mut self, root: NodeId, scope: Option<SymbolId>) {
        let mut stack = vec![(root, scope)];
        while let Some((id, scope)) = stack.pop() {
            let node = &mut self.nodes[id.0 as usize];
            node.parent_sym = scope;
            let inner = match node.kind {
                NodeKind::FnDef { sym, .. } => Some(sym),
                _ => scope,
            };
            stack.extend(node.kind.children().into_iter().map(|child| (child, inner)));
        }
    }

    fn register_subtree(&mut self, root: NodeId) {
        let ids: Vec<NodeId> = self.collect_all(root).collect();
        for id in ids {
            let kind = &self.nodes[id.0 as usize].kind;
            if let NodeKind::Call { .. } = kind {
                self.registries.register_call(id);
            }
            if let Some(sym) = kind.defined_symbol() {
                self.registries
                    .register_symbol(sym, &self.symbols[sym.0 as usize].kind);
            }
        }
    }

    fn deregister_subtree(&mut self, root: NodeId) {
        let ids: Vec<NodeId> = self.collect_all(root).collect();
        for id in ids {
            let kind = &self.nodes[id.0 as usize].kind;
            if let NodeKind::Call { .. } = kind {
                self.registries.deregister_call(id);
            }
            if let Some(sym) = kind.defined_symbol() {
                self.registries
                    .deregister_symbol(sym, &self.symbols[sym.0 as usize].kind);
            }
        }
    }

    /// Clear the live bit of a detached subtree and everything it defines
    fn destroy(&mut self, root: NodeId) {
        let ids: Vec<NodeId> = self.collect_all(root).collect();
        trace!("destroying {} nodes under {}", ids.len(), root);
        for id in ids {
            let callee = match &self.nodes[id.0 as usize].kind {
                NodeKind::Call { callee, .. } => *callee,
                _ => None,
            };
            if let Some(f) = callee {
                if let Some(data) = self.symbols[f.0 as usize].fn_data_mut() {
                    data.called_by.retain(|c| *c != id);
                }
            }
            if let Some(sym) = self.nodes[id.0 as usize].kind.defined_symbol() {
                self.symbols[sym.0 as usize].live = false;
            }
            self.nodes[id.0 as usize].live = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{verify, FnData, Literal};

    fn int(program: &mut Program, value: i64) -> NodeId {
        program.add_node(NodeKind::Literal(Literal::Int(value)), Span::dummy())
    }

    /// module m { fn f() { var x = 1; } }
    fn small_program() -> (Program, SymbolId, SymbolId, NodeId) {
        let mut program = Program::new();
        let module = program.add_module("m", Span::dummy());
        let root = program.module_block(module).unwrap();

        let f = program.add_symbol(Symbol::new("f", SymbolKind::Fn(FnData::default()), Ty::Void));
        let body = program.add_node(NodeKind::Block { stmts: vec![] }, Span::dummy());
        let f_def = program.add_node(
            NodeKind::FnDef {
                sym: f,
                formals: vec![],
                body,
            },
            Span::dummy(),
        );
        program.append(root, f_def).unwrap();

        let x = program.add_symbol(Symbol::new("x", SymbolKind::Var, Ty::Int));
        let one = int(&mut program, 1);
        let x_def = program.def(x, Some(one), Span::dummy());
        program.append(body, x_def).unwrap();

        (program, f, x, body)
    }

    #[test]
    fn attaching_registers_and_scopes() {
        let (program, f, x, body) = small_program();
        assert_eq!(program.registries().fns(), &[f]);
        assert_eq!(program.registries().vars(), &[x]);
        assert_eq!(program.declaring_fn(x), Some(f));
        assert_eq!(program.node(body).parent_sym, Some(f));
        assert!(verify(&program).is_empty());
    }

    #[test]
    fn remove_cascades_and_excises() {
        let (mut program, f, x, _) = small_program();
        let x_def = program.symbol(x).def.unwrap();
        program.remove(x_def).unwrap();

        assert!(!program.symbol(x).is_live());
        assert!(!program.node(x_def).is_live());
        assert!(program.registries().vars().is_empty());
        assert_eq!(program.registries().fns(), &[f]);
        assert!(verify(&program).is_empty());
    }

    #[test]
    fn insert_before_and_after_keep_order() {
        let (mut program, _, x, body) = small_program();
        let x_def = program.symbol(x).def.unwrap();

        let before = program.add_node(NodeKind::Break, Span::dummy());
        let after = program.add_node(NodeKind::Continue, Span::dummy());
        program.insert_before(x_def, before).unwrap();
        program.insert_after(x_def, after).unwrap();

        assert_eq!(program.kind(body).children(), vec![before, x_def, after]);
        assert!(verify(&program).is_empty());
    }

    #[test]
    fn replace_destroys_old_subtree() {
        let (mut program, _, x, _) = small_program();
        let x_def = program.symbol(x).def.unwrap();
        let old_value = program.kind(x_def).children()[0];
        let new_value = int(&mut program, 2);

        program.replace(old_value, new_value).unwrap();

        assert!(!program.node(old_value).is_live());
        assert_eq!(program.parent(new_value), Some(x_def));
        assert!(verify(&program).is_empty());
    }

    #[test]
    fn cycles_are_rejected() {
        let (mut program, f, _, body) = small_program();
        let f_def = program.fn_def(f).unwrap();
        program.detach(f_def).unwrap();

        // body is now inside a detached subtree rooted at f_def
        let err = program.append(body, f_def).unwrap_err();
        assert_eq!(err, AstError::Cycle { node: f_def, parent: body });
    }

    #[test]
    fn double_attach_is_rejected() {
        let (mut program, _, x, body) = small_program();
        let x_def = program.symbol(x).def.unwrap();
        let err = program.append(body, x_def).unwrap_err();
        assert_eq!(err, AstError::AlreadyAttached { node: x_def, parent: body });
    }

    #[test]
    fn required_slots_cannot_be_detached() {
        let mut program = Program::new();
        let module = program.add_module("m", Span::dummy());
        let root = program.module_block(module).unwrap();
        let x = program.add_symbol(Symbol::new("x", SymbolKind::Var, Ty::Int));
        let x_def = program.def(x, None, Span::dummy());
        program.append(root, x_def).unwrap();

        let target = program.sym_ref(x, Span::dummy());
        let value = int(&mut program, 3);
        let assign = program.add_node(NodeKind::Assign { target, value }, Span::dummy());
        program.append(root, assign).unwrap();

        let err = program.detach(target).unwrap_err();
        assert_eq!(err, AstError::RequiredChild { node: target, parent: assign });
    }

    #[test]
    fn mutations_bump_the_enclosing_epoch() {
        let (mut program, f, x, _) = small_program();
        let before = program.epoch(f);
        let x_def = program.symbol(x).def.unwrap();
        program.remove(x_def).unwrap();
        assert!(program.epoch(f) > before);
    }

    #[test]
    fn moving_a_function_rescopes_its_subtree() {
        let (mut program, f, x, _) = small_program();
        // nest a function g inside f, then move it back to module scope
        let g = program.add_symbol(Symbol::new("g", SymbolKind::Fn(FnData::default()), Ty::Void));
        let g_body = program.add_node(NodeKind::Block { stmts: vec![] }, Span::dummy());
        let g_def = program.add_node(
            NodeKind::FnDef {
                sym: g,
                formals: vec![],
                body: g_body,
            },
            Span::dummy(),
        );
        let x_def = program.symbol(x).def.unwrap();
        program.insert_after(x_def, g_def).unwrap();
        assert_eq!(program.lexical_ancestors(g), vec![f]);
        assert!(program.is_nested_fn(g));
        assert!(program.is_outer_var(x, g));

        program.detach(g_def).unwrap();
        let f_def = program.fn_def(f).unwrap();
        program.insert_before(f_def, g_def).unwrap();

        assert!(!program.is_nested_fn(g));
        assert_eq!(program.node(g_body).parent_sym, Some(g));
        assert!(verify(&program).is_empty());
    }

    #[test]
    fn collect_is_restartable_and_filtered() {
        let (program, _, _, _) = small_program();
        let root = program.roots().next().unwrap();
        let defs = program.collect(root, NodeTag::Def);
        let again = defs.clone();
        assert_eq!(defs.count(), 1);
        assert_eq!(again.count(), 1);
        assert_eq!(program.collect(root, NodeTag::FnDef).count(), 1);
    }
}
