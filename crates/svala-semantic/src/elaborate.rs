use smallvec::SmallVec;
use smol_str::SmolStr;
use svala_diag::DiagnosticCode;
use svala_source::Span;
use svala_syntax::{NodeKind, NodeRef, PortConnection, TreeId};

use crate::compilation::Compilation;
use crate::definition::{DefinitionId, DefinitionKind};
use crate::diagnostics::Diagnostic;
use crate::lookup::LookupRefPoint;
use crate::scope::ScopeId;
use crate::symbols::{DeclaredType, Lazy, SymbolId, SymbolKind};
use crate::types::{ConstEvalError, ConstInt};

/// Where an instantiation happened: the tree its connection expressions
/// live in and the scope they bind in.
pub(crate) struct InstantiationSite<'a> {
    pub(crate) tree: TreeId,
    pub(crate) scope: ScopeId,
    pub(crate) connections: &'a [PortConnection],
    pub(crate) param_overrides: &'a [PortConnection],
}

impl Compilation {
    /// Stamp an instance of `def` named `inst_name`.
    ///
    /// The returned symbol is an orphan; the caller splices it into the
    /// owning scope.
    pub(crate) fn instantiate_definition(
        &mut self,
        def: DefinitionId,
        inst_name: SmolStr,
        span: Span,
        site: Option<&InstantiationSite<'_>>,
    ) -> SymbolId {
        let (def_kind, def_syntax) = {
            let d = self.definition_data(def);
            (d.kind, d.syntax)
        };
        let kind = match def_kind {
            DefinitionKind::Module => SymbolKind::ModuleInstance { definition: def },
            DefinitionKind::Interface => SymbolKind::InterfaceInstance { definition: def },
            DefinitionKind::Program => SymbolKind::ProgramInstance { definition: def },
        };
        let sym = self.create_symbol(kind, inst_name, span);
        let scope = self.create_scope(sym);
        self.symbol_mut(sym).syntax = Some(def_syntax);

        let decl = {
            let tree = self.tree(def_syntax.tree);
            match &tree.node(def_syntax.node).kind {
                NodeKind::ModuleDecl(decl) => decl.clone(),
                _ => return sym,
            }
        };

        for param in &decl.params {
            self.add_header_param(scope, def_syntax.with(*param), site);
        }
        for port in &decl.ports {
            self.add_header_port(scope, def_syntax.with(*port), site);
        }
        for member in &decl.members {
            self.add_members(scope, def_syntax.with(*member));
        }
        sym
    }

    pub(crate) fn add_header_param(
        &mut self,
        scope: ScopeId,
        syntax: NodeRef,
        site: Option<&InstantiationSite<'_>>,
    ) {
        let tree = self.tree(syntax.tree);
        let node = tree.node(syntax.node);
        let span = node.span;
        let (ty, declarators, is_local) = match &node.kind {
            NodeKind::ParamDecl {
                ty,
                declarators,
                is_local,
            } => (*ty, declarators.clone(), *is_local),
            _ => return,
        };
        drop(tree);

        for d in declarators {
            let (name, init) = self.declarator_parts(syntax.tree, d);
            let override_conn = site.and_then(|s| {
                s.param_overrides
                    .iter()
                    .find(|o| o.port == name)
                    .and_then(|o| o.expr.map(|e| (s.tree, e, s.scope)))
            });
            let (override_syntax, override_scope) = match override_conn {
                Some((tree, node, scope)) => (Some(NodeRef { tree, node }), Some(scope)),
                None => (None, None),
            };
            let declared = DeclaredType::new(ty.map(|t| syntax.with(t)), init);
            let param = self.create_symbol(
                SymbolKind::Parameter {
                    declared,
                    is_local,
                    override_syntax,
                    override_scope,
                    value: Lazy::Unforced,
                },
                name,
                span,
            );
            self.add_member(scope, param);
        }
    }

    fn add_header_port(
        &mut self,
        scope: ScopeId,
        syntax: NodeRef,
        site: Option<&InstantiationSite<'_>>,
    ) {
        let tree = self.tree(syntax.tree);
        let node = tree.node(syntax.node);
        let span = node.span;
        let kind = node.kind.clone();
        drop(tree);

        match kind {
            NodeKind::PortDecl {
                direction,
                name,
                ty,
            } => {
                let conn = site.and_then(|s| {
                    s.connections
                        .iter()
                        .find(|c| c.port == name)
                        .and_then(|c| c.expr.map(|e| (s.tree, e, s.scope)))
                });
                let (connection_syntax, connection_scope) = match conn {
                    Some((tree, node, scope)) => (Some(NodeRef { tree, node }), Some(scope)),
                    None => (None, None),
                };
                let declared = DeclaredType::new(ty.map(|t| syntax.with(t)), None);
                let port = self.create_symbol(
                    SymbolKind::Port {
                        direction,
                        declared,
                        connection_syntax,
                        connection_scope,
                        connection: Lazy::Unforced,
                    },
                    name,
                    span,
                );
                self.add_member(scope, port);
            }
            NodeKind::InterfacePortDecl { interface, name } => {
                let port = self.create_symbol(SymbolKind::InterfacePort { interface }, name, span);
                self.add_member(scope, port);
            }
            _ => {}
        }
    }

    /// Elaborate a deferred hierarchy instantiation into instance symbols,
    /// in declaration order. Unknown targets produce one diagnostic and no
    /// symbols.
    pub(crate) fn elaborate_instantiation(
        &mut self,
        scope: ScopeId,
        syntax: NodeRef,
        _insertion_point: Option<SymbolId>,
    ) -> SmallVec<[SymbolId; 4]> {
        let tree = self.tree(syntax.tree);
        let node = tree.node(syntax.node);
        let span = node.span;
        let (type_name, param_overrides, instances) = match &node.kind {
            NodeKind::HierarchyInstantiation {
                type_name,
                param_overrides,
                instances,
            } => (type_name.clone(), param_overrides.clone(), instances.clone()),
            _ => return SmallVec::new(),
        };
        drop(tree);

        let def = match self.definition(&type_name, scope) {
            Some(def) => def,
            None => {
                let origin = self.scope_data(scope).symbol;
                self.add_diag(Diagnostic::error(
                    DiagnosticCode::UNKNOWN_MODULE,
                    span,
                    origin,
                    format!("unknown module `{type_name}`"),
                ));
                return SmallVec::new();
            }
        };

        let mut result = SmallVec::new();
        for inst in instances {
            let tree = self.tree(syntax.tree);
            let inst_node = tree.node(inst);
            let inst_span = inst_node.span;
            let (name, connections) = match &inst_node.kind {
                NodeKind::HierarchicalInstance { name, connections } => {
                    (name.clone(), connections.clone())
                }
                _ => continue,
            };
            drop(tree);

            let site = InstantiationSite {
                tree: syntax.tree,
                scope,
                connections: &connections,
                param_overrides: &param_overrides,
            };
            let sym = self.instantiate_definition(def, name, inst_span, Some(&site));
            result.push(sym);
        }
        result
    }

    /// Elaborate a deferred if-generate.
    ///
    /// A constant-true condition produces the body block; constant-false
    /// picks the else block when present, or the body marked
    /// uninstantiated so its contents still exist for suppression. A
    /// non-constant condition diagnoses and produces nothing.
    pub(crate) fn elaborate_if_generate(
        &mut self,
        scope: ScopeId,
        syntax: NodeRef,
        insertion_point: Option<SymbolId>,
    ) -> Option<SymbolId> {
        let tree = self.tree(syntax.tree);
        let node = tree.node(syntax.node);
        let (condition, block, else_block) = match &node.kind {
            NodeKind::IfGenerate {
                condition,
                block,
                else_block,
            } => (*condition, *block, *else_block),
            _ => return None,
        };
        let cond_span = tree.node(condition).span;
        drop(tree);

        let point = match insertion_point {
            Some(at) => self.lookup_after(at),
            None => LookupRefPoint::start_of_scope(scope),
        };
        let origin = self.scope_data(scope).symbol;
        let cond = self.bind_expr(syntax.with(condition), scope, point, origin);
        match self.eval_const(cond) {
            ConstInt::Known(v) if v != 0 => Some(self.build_generate_block(syntax.with(block), true)),
            ConstInt::Known(_) => match else_block {
                Some(else_block) => Some(self.build_generate_block(syntax.with(else_block), true)),
                None => Some(self.build_generate_block(syntax.with(block), false)),
            },
            ConstInt::Error(_) => {
                self.add_diag(Diagnostic::error(
                    DiagnosticCode::GEN_COND_NOT_CONST,
                    cond_span,
                    origin,
                    "generate condition is not constant",
                ));
                None
            }
        }
    }

    /// Elaborate a deferred loop-generate into a generate-block array with
    /// one instantiated block per loop value.
    pub(crate) fn elaborate_loop_generate(
        &mut self,
        scope: ScopeId,
        syntax: NodeRef,
        insertion_point: Option<SymbolId>,
    ) -> SymbolId {
        let tree = self.tree(syntax.tree);
        let node = tree.node(syntax.node);
        let span = node.span;
        let (genvar, lo, hi, block) = match &node.kind {
            NodeKind::LoopGenerate {
                genvar,
                lo,
                hi,
                block,
            } => (genvar.clone(), *lo, *hi, *block),
            _ => {
                drop(tree);
                let array = self.create_symbol(
                    SymbolKind::GenerateBlockArray,
                    SmolStr::default(),
                    span,
                );
                self.create_scope(array);
                return array;
            }
        };
        let label = match &tree.node(block).kind {
            NodeKind::GenerateBlock { label, .. } => label.clone().unwrap_or_default(),
            _ => SmolStr::default(),
        };
        drop(tree);

        let array = self.create_symbol(SymbolKind::GenerateBlockArray, label, span);
        let array_scope = self.create_scope(array);

        let point = match insertion_point {
            Some(at) => self.lookup_after(at),
            None => LookupRefPoint::start_of_scope(scope),
        };
        let origin = self.scope_data(scope).symbol;
        let lo_expr = self.bind_expr(syntax.with(lo), scope, point, origin);
        let hi_expr = self.bind_expr(syntax.with(hi), scope, point, origin);
        let lo_val = self.eval_const(lo_expr);
        let hi_val = self.eval_const(hi_expr);

        let (lo_val, hi_val) = match (lo_val.known(), hi_val.known()) {
            (Some(l), Some(h)) => (l, h),
            _ => {
                self.add_diag(Diagnostic::error(
                    DiagnosticCode::GENVAR_NOT_CONST,
                    span,
                    origin,
                    format!("bounds of generate loop over `{genvar}` are not constant"),
                ));
                return array;
            }
        };

        let (block_span, block_members) = {
            let tree = self.tree(syntax.tree);
            let node = tree.node(block);
            let members = match &node.kind {
                NodeKind::GenerateBlock { members, .. } => members.clone(),
                _ => Vec::new(),
            };
            (node.span, members)
        };

        for v in lo_val..=hi_val {
            let block_sym = self.create_symbol(
                SymbolKind::GenerateBlock {
                    is_instantiated: true,
                },
                SmolStr::new(v.to_string()),
                block_span,
            );
            let block_scope = self.create_scope(block_sym);

            // The genvar goes in first so iteration members can see it.
            let genvar_sym = self.create_symbol(
                SymbolKind::Parameter {
                    declared: DeclaredType::default(),
                    is_local: true,
                    override_syntax: None,
                    override_scope: None,
                    value: Lazy::Forced(ConstInt::Known(v)),
                },
                genvar.clone(),
                span,
            );
            self.add_member(block_scope, genvar_sym);

            for member in &block_members {
                self.add_members(block_scope, syntax.with(*member));
            }
            self.add_member(array_scope, block_sym);
        }
        array
    }

    pub(crate) fn build_generate_block(
        &mut self,
        syntax: NodeRef,
        is_instantiated: bool,
    ) -> SymbolId {
        let label = {
            let tree = self.tree(syntax.tree);
            match &tree.node(syntax.node).kind {
                NodeKind::GenerateBlock { label, .. } => label.clone().unwrap_or_default(),
                _ => SmolStr::default(),
            }
        };
        self.build_generate_block_named(syntax, label, is_instantiated)
    }

    fn build_generate_block_named(
        &mut self,
        syntax: NodeRef,
        name: SmolStr,
        is_instantiated: bool,
    ) -> SymbolId {
        let tree = self.tree(syntax.tree);
        let node = tree.node(syntax.node);
        let span = node.span;
        let members = match &node.kind {
            NodeKind::GenerateBlock { members, .. } => members.clone(),
            _ => Vec::new(),
        };
        drop(tree);

        let sym = self.create_symbol(SymbolKind::GenerateBlock { is_instantiated }, name, span);
        let block_scope = self.create_scope(sym);
        for member in members {
            self.add_members(block_scope, syntax.with(member));
        }
        sym
    }

    /// Top-level instantiation used by finalization: no connections, no
    /// overrides.
    pub(crate) fn instantiate_top(&mut self, def: DefinitionId) -> SymbolId {
        let (name, span) = {
            let d = self.definition_data(def);
            (d.name.clone(), d.span)
        };
        self.instantiate_definition(def, name, span, None)
    }

    /// Whether a parameter ever received a value. Used by tests and hosts
    /// probing definition eligibility.
    pub fn parameter_has_value(&mut self, sym: SymbolId) -> bool {
        !matches!(
            self.parameter_value(sym),
            ConstInt::Error(ConstEvalError::NonConstant)
        )
    }
}
