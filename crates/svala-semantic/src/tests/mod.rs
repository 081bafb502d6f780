//! Scenario tests driving the compilation through hand-built syntax
//! trees. The tree builder here is the stand-in for a parser front-end.

use std::sync::Arc;

use smol_str::SmolStr;
use svala_source::{FileId, SourceManagerHandle, Span};
use svala_syntax::{
    BinaryOp, BuiltinTypeKind, DefinitionKeyword, FunctionDecl, ImportItem, ImportedName,
    ModuleDecl, NodeId, NodeKind, PortConnection, SyntaxTree, SyntaxTreeBuilder,
};

use crate::{Compilation, ScopeId, SymbolId, SymbolKind};

mod api;
mod coalesce;
mod generate;

/// Builds one syntax tree with unique, monotonically increasing spans.
pub(crate) struct TreeBuilder {
    b: SyntaxTreeBuilder,
    file: FileId,
    cursor: u32,
}

impl TreeBuilder {
    pub(crate) fn new(sm: &SourceManagerHandle) -> Self {
        let buffer = sm.assign_text("");
        Self {
            b: SyntaxTreeBuilder::new(),
            file: buffer.file,
            cursor: 0,
        }
    }

    pub(crate) fn span(&mut self) -> Span {
        let span = Span::at(self.file, self.cursor, 1);
        self.cursor += 2;
        span
    }

    pub(crate) fn node(&mut self, kind: NodeKind) -> NodeId {
        let span = self.span();
        self.b.push(kind, span)
    }

    pub(crate) fn lit(&mut self, value: i64) -> NodeId {
        self.node(NodeKind::Literal { value })
    }

    pub(crate) fn ident(&mut self, name: &str) -> NodeId {
        self.node(NodeKind::Ident {
            name: SmolStr::new(name),
        })
    }

    pub(crate) fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.node(NodeKind::Binary { op, lhs, rhs })
    }

    pub(crate) fn assign(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.node(NodeKind::Assign { lhs, rhs })
    }

    pub(crate) fn declarator(&mut self, name: &str, init: Option<NodeId>) -> NodeId {
        self.node(NodeKind::Declarator {
            name: SmolStr::new(name),
            init,
        })
    }

    pub(crate) fn builtin_ty(&mut self, kind: BuiltinTypeKind) -> NodeId {
        self.node(NodeKind::BuiltinType { kind, packed: None })
    }

    pub(crate) fn named_ty(&mut self, name: &str) -> NodeId {
        self.node(NodeKind::NamedType {
            name: SmolStr::new(name),
        })
    }

    pub(crate) fn enum_ty(&mut self, variants: &[(&str, Option<NodeId>)]) -> NodeId {
        let variants = variants
            .iter()
            .map(|(name, init)| self.declarator(name, *init))
            .collect();
        self.node(NodeKind::EnumType {
            base: None,
            variants,
        })
    }

    pub(crate) fn typedef(&mut self, name: &str, ty: NodeId) -> NodeId {
        self.node(NodeKind::TypedefDecl {
            ty,
            name: SmolStr::new(name),
        })
    }

    /// `parameter <name> = <init>;` (untyped).
    pub(crate) fn param(&mut self, name: &str, init: Option<NodeId>) -> NodeId {
        let d = self.declarator(name, init);
        self.node(NodeKind::ParamDecl {
            ty: None,
            declarators: vec![d],
            is_local: false,
        })
    }

    /// `logic <name> = <init>;`
    pub(crate) fn variable(&mut self, name: &str, init: Option<NodeId>) -> NodeId {
        let ty = self.builtin_ty(BuiltinTypeKind::Logic);
        let d = self.declarator(name, init);
        self.node(NodeKind::DataDecl {
            ty,
            declarators: vec![d],
        })
    }

    pub(crate) fn cont_assign(&mut self, lhs: &str, rhs: NodeId) -> NodeId {
        let lhs = self.ident(lhs);
        let assign = self.assign(lhs, rhs);
        self.node(NodeKind::ContinuousAssign {
            assignments: vec![assign],
        })
    }

    pub(crate) fn import_wildcard(&mut self, package: &str) -> NodeId {
        let span = self.span();
        self.b.push(
            NodeKind::PackageImportDecl {
                items: vec![ImportItem {
                    package: SmolStr::new(package),
                    name: ImportedName::Wildcard,
                    span,
                }],
            },
            span,
        )
    }

    pub(crate) fn import_explicit(&mut self, package: &str, member: &str) -> NodeId {
        let span = self.span();
        self.b.push(
            NodeKind::PackageImportDecl {
                items: vec![ImportItem {
                    package: SmolStr::new(package),
                    name: ImportedName::Name(SmolStr::new(member)),
                    span,
                }],
            },
            span,
        )
    }

    pub(crate) fn module(&mut self, name: &str, params: Vec<NodeId>, members: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::ModuleDecl(ModuleDecl {
            keyword: DefinitionKeyword::Module,
            name: SmolStr::new(name),
            params,
            ports: Vec::new(),
            members,
        }))
    }

    pub(crate) fn module_with_ports(
        &mut self,
        name: &str,
        ports: Vec<NodeId>,
        members: Vec<NodeId>,
    ) -> NodeId {
        self.node(NodeKind::ModuleDecl(ModuleDecl {
            keyword: DefinitionKeyword::Module,
            name: SmolStr::new(name),
            params: Vec::new(),
            ports,
            members,
        }))
    }

    pub(crate) fn package(&mut self, name: &str, members: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::ModuleDecl(ModuleDecl {
            keyword: DefinitionKeyword::Package,
            name: SmolStr::new(name),
            params: Vec::new(),
            ports: Vec::new(),
            members,
        }))
    }

    pub(crate) fn port(&mut self, name: &str) -> NodeId {
        self.node(NodeKind::PortDecl {
            direction: svala_syntax::PortDirection::Input,
            name: SmolStr::new(name),
            ty: None,
        })
    }

    pub(crate) fn hier_inst(&mut self, type_name: &str, names: &[&str]) -> NodeId {
        self.hier_inst_with_params(type_name, names, Vec::new())
    }

    pub(crate) fn hier_inst_with_params(
        &mut self,
        type_name: &str,
        names: &[&str],
        param_overrides: Vec<PortConnection>,
    ) -> NodeId {
        let instances = names
            .iter()
            .map(|n| {
                self.node(NodeKind::HierarchicalInstance {
                    name: SmolStr::new(*n),
                    connections: Vec::new(),
                })
            })
            .collect();
        self.node(NodeKind::HierarchyInstantiation {
            type_name: SmolStr::new(type_name),
            param_overrides,
            instances,
        })
    }

    pub(crate) fn param_override(&mut self, name: &str, value: NodeId) -> PortConnection {
        PortConnection {
            port: SmolStr::new(name),
            expr: Some(value),
            span: self.span(),
        }
    }

    pub(crate) fn gen_block(&mut self, label: Option<&str>, members: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::GenerateBlock {
            label: label.map(SmolStr::new),
            members,
        })
    }

    pub(crate) fn if_generate(
        &mut self,
        condition: NodeId,
        block: NodeId,
        else_block: Option<NodeId>,
    ) -> NodeId {
        self.node(NodeKind::IfGenerate {
            condition,
            block,
            else_block,
        })
    }

    pub(crate) fn loop_generate(
        &mut self,
        genvar: &str,
        lo: NodeId,
        hi: NodeId,
        block: NodeId,
    ) -> NodeId {
        self.node(NodeKind::LoopGenerate {
            genvar: SmolStr::new(genvar),
            lo,
            hi,
            block,
        })
    }

    pub(crate) fn function(&mut self, name: &str, body: Option<NodeId>) -> NodeId {
        let return_ty = self.builtin_ty(BuiltinTypeKind::Int);
        self.node(NodeKind::FunctionDecl(FunctionDecl {
            name: SmolStr::new(name),
            is_task: false,
            return_ty: Some(return_ty),
            args: Vec::new(),
            body,
        }))
    }

    pub(crate) fn add_global_instantiation(&mut self, name: &str) {
        self.b.add_global_instantiation(name);
    }

    pub(crate) fn add_parse_diag(&mut self, diag: svala_diag::Diagnostic) {
        self.b.add_diagnostic(diag);
    }

    pub(crate) fn set_metadata(&mut self, decl: NodeId, meta: svala_syntax::DeclMetadata) {
        self.b.set_metadata(decl, meta);
    }

    pub(crate) fn finish(mut self, members: Vec<NodeId>, sm: &SourceManagerHandle) -> Arc<SyntaxTree> {
        let root = self.node(NodeKind::CompilationUnit { members });
        Arc::new(self.b.finish(root, sm.clone()))
    }
}

/// Build a compilation from one tree-building closure.
pub(crate) fn compile_one(
    build: impl FnOnce(&mut TreeBuilder) -> Vec<NodeId>,
) -> Compilation {
    let sm = svala_source::SourceManager::new();
    let mut b = TreeBuilder::new(&sm);
    let members = build(&mut b);
    let tree = b.finish(members, &sm);
    let mut comp = Compilation::default();
    comp.add_syntax_tree(tree).expect("tree accepted");
    comp
}

/// Member of `scope_sym`'s scope with the given name, after realization.
pub(crate) fn find_member(comp: &mut Compilation, scope_sym: SymbolId, name: &str) -> SymbolId {
    let scope = comp
        .symbol(scope_sym)
        .scope
        .expect("symbol should be a scope");
    comp.lookup_direct(scope, name)
        .unwrap_or_else(|| panic!("member `{name}` not found"))
}

pub(crate) fn scope_of(comp: &Compilation, sym: SymbolId) -> ScopeId {
    comp.symbol(sym).scope.expect("symbol should be a scope")
}

/// The unique compilation unit of a single-tree compilation.
pub(crate) fn only_unit(comp: &Compilation) -> SymbolId {
    assert_eq!(comp.compilation_units().len(), 1);
    comp.compilation_units()[0]
}

/// Instance symbols under the root, by name.
pub(crate) fn top_instance(comp: &mut Compilation, name: &str) -> SymbolId {
    let root = comp.root();
    let instances = comp.top_instances().to_vec();
    instances
        .into_iter()
        .find(|&i| comp.symbol(i).name == name)
        .unwrap_or_else(|| {
            let names: Vec<_> = comp
                .top_instances()
                .iter()
                .map(|&i| comp.symbol(i).name.clone())
                .collect();
            panic!("no top instance `{name}`; have {names:?} under {root:?}")
        })
}

/// Names of the sibling chain of `scope_sym`, in order.
pub(crate) fn member_names(comp: &Compilation, scope_sym: SymbolId) -> Vec<String> {
    comp.scope_members(scope_sym)
        .iter()
        .map(|&m| comp.symbol(m).name.to_string())
        .collect()
}

pub(crate) fn is_enum_value(comp: &Compilation, sym: SymbolId) -> bool {
    matches!(comp.symbol(sym).kind, SymbolKind::EnumValue { .. })
}
