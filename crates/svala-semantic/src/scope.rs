use std::collections::HashMap;

use smol_str::SmolStr;
use svala_arena::Idx;
use svala_source::Span;
use svala_syntax::{FunctionDecl, ImportedName, NodeKind, NodeRef};

use crate::compilation::Compilation;
use crate::symbols::{DeclaredType, Lazy, Symbol, SymbolId, SymbolKind};

pub type ScopeId = Idx<ScopeData>;
pub type DeferredMemberIndex = Idx<DeferredMemberData>;
pub type ImportDataIndex = Idx<Vec<SymbolId>>;

/// Per-scope bookkeeping for a scope-kinded symbol.
///
/// Members form a singly-linked chain from `first`; `name_map` holds only
/// named members. Deferred members and wildcard imports live in pools on
/// the compilation, referenced by index.
#[derive(Debug)]
pub struct ScopeData {
    pub symbol: SymbolId,
    pub first: Option<SymbolId>,
    pub last: Option<SymbolId>,
    pub name_map: HashMap<SmolStr, SymbolId>,
    pub deferred: Option<DeferredMemberIndex>,
    pub imports: Option<ImportDataIndex>,
}

impl ScopeData {
    pub fn new(symbol: SymbolId) -> Self {
        Self {
            symbol,
            first: None,
            last: None,
            name_map: HashMap::new(),
            deferred: None,
            imports: None,
        }
    }
}

/// Queued work for a scope: raw member syntax to elaborate on demand,
/// members whose declared type may inject transparent enum values, and an
/// optional statement body.
#[derive(Debug, Default)]
pub struct DeferredMemberData {
    /// Members whose declared type syntax is an enum declaration; realized
    /// enum values splice in right after the introducing member.
    pub(crate) transparent_types: Vec<SymbolId>,
    /// (syntax, insertion point) pairs queued by `add_deferred_member`.
    pub(crate) members: Vec<(NodeRef, Option<SymbolId>)>,
    /// Statement body of a statement-bodied scope.
    pub(crate) statement: Option<NodeRef>,
}

impl Compilation {
    /// Allocate an orphan symbol.
    pub fn create_symbol(&mut self, kind: SymbolKind, name: SmolStr, span: Span) -> SymbolId {
        self.symbols_mut().alloc(Symbol::new(kind, name, span))
    }

    /// Give `symbol` a fresh scope of its own.
    pub fn create_scope(&mut self, symbol: SymbolId) -> ScopeId {
        let scope = self.scopes_mut().alloc(ScopeData::new(symbol));
        self.symbol_mut(symbol).scope = Some(scope);
        scope
    }

    pub(crate) fn get_or_add_deferred(&mut self, scope: ScopeId) -> DeferredMemberIndex {
        if let Some(idx) = self.scope_data(scope).deferred {
            return idx;
        }
        let idx = self.deferred_pool_mut().alloc(DeferredMemberData::default());
        self.scope_data_mut(scope).deferred = Some(idx);
        idx
    }

    pub(crate) fn track_import(&mut self, scope: ScopeId, import: SymbolId) {
        if let Some(idx) = self.scope_data(scope).imports {
            self.import_pool_mut()[idx].push(import);
        } else {
            let idx = self.import_pool_mut().alloc(vec![import]);
            self.scope_data_mut(scope).imports = Some(idx);
        }
    }

    pub(crate) fn query_imports(&self, scope: ScopeId) -> &[SymbolId] {
        match self.scope_data(scope).imports {
            Some(idx) => &self.import_pool()[idx],
            None => &[],
        }
    }

    /// Append `member` to the scope, registering enum-typed members for
    /// transparent-value injection.
    pub fn add_member(&mut self, scope: ScopeId, member: SymbolId) {
        let at = self.scope_data(scope).last;
        self.insert_member(scope, member, at);

        let is_enum_typed = self
            .symbol(member)
            .kind
            .declared_type()
            .and_then(|dt| dt.type_syntax)
            .map(|ts| {
                let tree = self.tree(ts.tree);
                matches!(tree.node(ts.node).kind, NodeKind::EnumType { .. })
            })
            .unwrap_or(false);
        if is_enum_typed {
            let idx = self.get_or_add_deferred(scope);
            self.deferred_pool_mut()[idx].transparent_types.push(member);
        }
    }

    /// Splice `member` into the chain after `at` (or prepend when `at` is
    /// `None`). Non-tail splices share the anchor's in-scope index, which
    /// is how transparent members avoid shifting later siblings'
    /// visibility.
    pub fn insert_member(&mut self, scope: ScopeId, member: SymbolId, at: Option<SymbolId>) {
        debug_assert!(self.symbol(member).parent.is_none(), "member must be orphan");
        debug_assert!(self.symbol(member).next.is_none(), "member must be unlinked");

        let last = self.scope_data(scope).last;
        match at {
            None => {
                let old_first = self.scope_data(scope).first;
                let m = self.symbol_mut(member);
                m.index = 1;
                m.next = old_first;
                self.scope_data_mut(scope).first = Some(member);
            }
            Some(at) => {
                let at_index = self.symbol(at).index;
                let bump = (Some(at) == last) as u32;
                let old_next = self.symbol(at).next;
                self.symbol_mut(at).next = Some(member);
                let m = self.symbol_mut(member);
                m.index = at_index + bump;
                m.next = old_next;
            }
        }

        if self.symbol(member).next.is_none() {
            self.scope_data_mut(scope).last = Some(member);
        }

        let scope_sym = self.scope_data(scope).symbol;
        self.symbol_mut(member).parent = Some(scope_sym);

        let name = self.symbol(member).name.clone();
        if !name.is_empty() {
            self.scope_data_mut(scope)
                .name_map
                .entry(name)
                .or_insert(member);
        }
    }

    pub(crate) fn add_deferred_member(&mut self, scope: ScopeId, syntax: NodeRef) {
        let at = self.scope_data(scope).last;
        let idx = self.get_or_add_deferred(scope);
        self.deferred_pool_mut()[idx].members.push((syntax, at));
    }

    pub(crate) fn add_deferred_statement(&mut self, scope: ScopeId, syntax: NodeRef) {
        let idx = self.get_or_add_deferred(scope);
        self.deferred_pool_mut()[idx].statement = Some(syntax);
    }

    /// Realize queued members once; invoked at the top of every lookup.
    pub fn ensure_members(&mut self, scope: ScopeId) {
        if self.scope_data(scope).deferred.is_some() {
            self.realize_deferred_members(scope);
        }
    }

    fn realize_deferred_members(&mut self, scope: ScopeId) {
        // Clear the index first: elaboration below may reentrantly drive
        // lookups into this same scope.
        let idx = self
            .scope_data_mut(scope)
            .deferred
            .take()
            .expect("caller checked");
        let deferred = std::mem::take(&mut self.deferred_pool_mut()[idx]);

        for introducer in deferred.transparent_types {
            let ty = self.declared_type_ty(introducer);
            let values = match &self.type_data(ty).kind {
                crate::types::TypeKind::Enum { symbol, .. } => self.scope_members(*symbol),
                _ => Vec::new(),
            };

            let mut insert_at = introducer;
            for value in values {
                let (name, span) = {
                    let v = self.symbol(value);
                    (v.name.clone(), v.span)
                };
                let wrapped =
                    self.create_symbol(SymbolKind::TransparentMember { wrapped: value }, name, span);
                self.insert_member(scope, wrapped, Some(insert_at));
                insert_at = wrapped;
            }
        }

        if let Some(stmt) = deferred.statement {
            self.bind_statement_body(scope, stmt);
            return;
        }

        for (syntax, insertion_point) in deferred.members {
            let tree = self.tree(syntax.tree);
            let kind = tree.node(syntax.node).kind.clone();
            drop(tree);
            match kind {
                NodeKind::HierarchyInstantiation { .. } => {
                    let instances = self.elaborate_instantiation(scope, syntax, insertion_point);
                    let mut last = insertion_point;
                    for inst in instances {
                        self.insert_member(scope, inst, last);
                        last = Some(inst);
                    }
                }
                NodeKind::IfGenerate { .. } => {
                    if let Some(block) = self.elaborate_if_generate(scope, syntax, insertion_point)
                    {
                        self.insert_member(scope, block, insertion_point);
                    }
                }
                NodeKind::LoopGenerate { .. } => {
                    let array = self.elaborate_loop_generate(scope, syntax, insertion_point);
                    self.insert_member(scope, array, insertion_point);
                }
                _ => unreachable!("only instantiations and generates defer"),
            }
        }
    }

    /// Member symbols of `scope_sym`'s scope, in sibling-chain order.
    pub fn scope_members(&self, scope_sym: SymbolId) -> Vec<SymbolId> {
        let mut members = Vec::new();
        let Some(scope) = self.symbol(scope_sym).scope else {
            return members;
        };
        let mut cursor = self.scope_data(scope).first;
        while let Some(m) = cursor {
            members.push(m);
            cursor = self.symbol(m).next;
        }
        members
    }

    /// Dispatch one member-item syntax node into this scope.
    pub fn add_members(&mut self, scope: ScopeId, syntax: NodeRef) {
        let tree = self.tree(syntax.tree);
        let node = tree.node(syntax.node);
        let span = node.span;
        let kind = node.kind.clone();
        drop(tree);

        match kind {
            NodeKind::CompilationUnit { members } => {
                for member in members {
                    let r = NodeRef {
                        tree: syntax.tree,
                        node: member,
                    };
                    self.add_members(scope, r);
                }
            }
            NodeKind::ModuleDecl(decl) => match decl.keyword {
                svala_syntax::DefinitionKeyword::Package => {
                    self.create_package(syntax, &decl);
                }
                _ => {
                    self.create_definition(scope, syntax, &decl);
                }
            },
            NodeKind::DataDecl { ty, declarators } => {
                for d in declarators {
                    let (name, init) = self.declarator_parts(syntax.tree, d);
                    let declared = DeclaredType::new(
                        Some(NodeRef {
                            tree: syntax.tree,
                            node: ty,
                        }),
                        init,
                    );
                    let var =
                        self.create_symbol(SymbolKind::Variable { declared }, name, span);
                    self.add_member(scope, var);
                }
            }
            NodeKind::ParamDecl {
                ty,
                declarators,
                is_local,
            } => {
                for d in declarators {
                    let (name, init) = self.declarator_parts(syntax.tree, d);
                    let declared = DeclaredType::new(
                        ty.map(|t| NodeRef {
                            tree: syntax.tree,
                            node: t,
                        }),
                        init,
                    );
                    let param = self.create_symbol(
                        SymbolKind::Parameter {
                            declared,
                            is_local,
                            override_syntax: None,
                            override_scope: None,
                            value: Lazy::Unforced,
                        },
                        name,
                        span,
                    );
                    self.add_member(scope, param);
                }
            }
            NodeKind::TypedefDecl { ty, name } => {
                let ty_ref = NodeRef {
                    tree: syntax.tree,
                    node: ty,
                };
                let declared = DeclaredType::new(Some(ty_ref), None);
                let tree = self.tree(syntax.tree);
                let is_enum = matches!(tree.node(ty).kind, NodeKind::EnumType { .. });
                drop(tree);
                let kind = if is_enum {
                    SymbolKind::EnumType { declared }
                } else {
                    SymbolKind::TypeAlias { declared }
                };
                let sym = self.create_symbol(kind, name, span);
                if is_enum {
                    self.create_scope(sym);
                }
                self.add_member(scope, sym);
            }
            NodeKind::FunctionDecl(decl) => {
                self.add_subroutine(scope, syntax, &decl, span);
            }
            NodeKind::ProceduralBlock { kind, body } => {
                let sym = self.create_symbol(
                    SymbolKind::ProceduralBlock {
                        kind,
                        body: Lazy::Unforced,
                    },
                    SmolStr::default(),
                    span,
                );
                let block_scope = self.create_scope(sym);
                self.add_member(scope, sym);
                self.add_deferred_statement(
                    block_scope,
                    NodeRef {
                        tree: syntax.tree,
                        node: body,
                    },
                );
            }
            NodeKind::PackageImportDecl { items } => {
                for item in items {
                    match item.name {
                        ImportedName::Wildcard => {
                            let import = self.create_symbol(
                                SymbolKind::WildcardImport {
                                    package: item.package.clone(),
                                    resolved: Lazy::Unforced,
                                },
                                SmolStr::default(),
                                item.span,
                            );
                            self.add_member(scope, import);
                            self.track_import(scope, import);
                        }
                        ImportedName::Name(member) => {
                            let import = self.create_symbol(
                                SymbolKind::ExplicitImport {
                                    package: item.package.clone(),
                                    member: member.clone(),
                                    imported: Lazy::Unforced,
                                },
                                member,
                                item.span,
                            );
                            self.add_member(scope, import);
                        }
                    }
                }
            }
            NodeKind::HierarchyInstantiation { .. }
            | NodeKind::IfGenerate { .. }
            | NodeKind::LoopGenerate { .. } => {
                self.add_deferred_member(scope, syntax);
            }
            NodeKind::GenerateBlock { members, .. } => {
                for member in members {
                    let r = NodeRef {
                        tree: syntax.tree,
                        node: member,
                    };
                    self.add_members(scope, r);
                }
            }
            NodeKind::ContinuousAssign { assignments } => {
                for assign in assignments {
                    let r = NodeRef {
                        tree: syntax.tree,
                        node: assign,
                    };
                    let sym = self.create_symbol(
                        SymbolKind::ContinuousAssign {
                            syntax: r,
                            assignment: Lazy::Unforced,
                        },
                        SmolStr::default(),
                        span,
                    );
                    self.add_member(scope, sym);
                }
            }
            NodeKind::PortDecl {
                direction,
                name,
                ty,
            } => {
                let declared = DeclaredType::new(
                    ty.map(|t| NodeRef {
                        tree: syntax.tree,
                        node: t,
                    }),
                    None,
                );
                let port = self.create_symbol(
                    SymbolKind::Port {
                        direction,
                        declared,
                        connection_syntax: None,
                        connection_scope: None,
                        connection: Lazy::Unforced,
                    },
                    name,
                    span,
                );
                self.add_member(scope, port);
            }
            NodeKind::InterfacePortDecl { interface, name } => {
                let port =
                    self.create_symbol(SymbolKind::InterfacePort { interface }, name, span);
                self.add_member(scope, port);
            }
            NodeKind::GenvarDecl { names } => {
                for name in names {
                    let sym = self.create_symbol(SymbolKind::Genvar, name, span);
                    self.add_member(scope, sym);
                }
            }
            _ => unreachable!("not a member item"),
        }
    }

    fn add_subroutine(
        &mut self,
        scope: ScopeId,
        syntax: NodeRef,
        decl: &FunctionDecl,
        span: Span,
    ) {
        let declared = DeclaredType::new(
            decl.return_ty.map(|t| NodeRef {
                tree: syntax.tree,
                node: t,
            }),
            None,
        );
        let sym = self.create_symbol(
            SymbolKind::Subroutine {
                declared,
                is_task: decl.is_task,
                body: Lazy::Unforced,
            },
            decl.name.clone(),
            span,
        );
        let sub_scope = self.create_scope(sym);
        self.add_member(scope, sym);

        for arg in &decl.args {
            let tree = self.tree(syntax.tree);
            let (direction, name, ty) = match &tree.node(*arg).kind {
                NodeKind::PortDecl {
                    direction,
                    name,
                    ty,
                } => (*direction, name.clone(), *ty),
                _ => continue,
            };
            let arg_span = tree.node(*arg).span;
            drop(tree);
            let declared = DeclaredType::new(
                ty.map(|t| NodeRef {
                    tree: syntax.tree,
                    node: t,
                }),
                None,
            );
            let formal = self.create_symbol(
                SymbolKind::FormalArgument {
                    declared,
                    direction,
                },
                name,
                arg_span,
            );
            self.add_member(sub_scope, formal);
        }

        if let Some(body) = decl.body {
            self.add_deferred_statement(
                sub_scope,
                NodeRef {
                    tree: syntax.tree,
                    node: body,
                },
            );
        }
    }

    pub(crate) fn declarator_parts(
        &self,
        tree: svala_syntax::TreeId,
        node: svala_syntax::NodeId,
    ) -> (SmolStr, Option<NodeRef>) {
        let t = self.tree(tree);
        match &t.node(node).kind {
            NodeKind::Declarator { name, init } => (
                name.clone(),
                init.map(|i| NodeRef { tree, node: i }),
            ),
            _ => (SmolStr::default(), None),
        }
    }
}
