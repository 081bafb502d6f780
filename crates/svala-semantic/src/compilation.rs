use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;
use svala_arena::{Arena, Idx};
use svala_source::{SourceManager, SourceManagerHandle, Span};
use svala_syntax::{
    BuiltinTypeKind, DriveKeyword, ModuleDecl, NameSyntax, NetTypeToken, NodeKind, NodeRef,
    SyntaxTree, TimeScale, TreeId,
};

use crate::binder::{Expr, ExprId, Stmt, StmtId};
use crate::definition::{DefParam, Definition, DefinitionId, DefinitionKind, UnconnectedDrive};
use crate::diagnostics::{Diagnostic, DiagnosticStore};
use crate::scope::{DeferredMemberData, ScopeData, ScopeId};
use crate::symbols::{Lazy, Symbol, SymbolId, SymbolKind};
use crate::types::{
    ConstInt, FloatKind, IntegralFlags, NetType, NetTypeId, PredefinedIntKind, ScalarKind, Type,
    TypeId, TypeKind, TypeTag,
};
use crate::visitor::DiagnosticVisitor;

/// Option bag for a compilation.
#[derive(Debug, Clone, Copy)]
pub struct CompilationOptions {
    /// Maximum number of errors before demand-driven exploration stops.
    /// Zero means unlimited.
    pub error_limit: u32,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self { error_limit: 64 }
    }
}

/// Usage errors: the embedding program misused the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilationError {
    AlreadyFinalized,
    SourceManagerMismatch,
}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyFinalized => {
                write!(f, "the compilation has already been finalized")
            }
            Self::SourceManagerMismatch => write!(
                f,
                "all syntax trees added to the compilation must use the same source manager"
            ),
        }
    }
}

impl std::error::Error for CompilationError {}

/// Error aggregating the diagnostics produced by `parse_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNameError(pub String);

impl fmt::Display for ParseNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseNameError {}

/// A free system subroutine or a per-type method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSubroutine {
    pub name: SmolStr,
    pub kind: SystemSubroutineKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemSubroutineKind {
    Task,
    Function,
}

impl SystemSubroutine {
    pub fn task(name: &str) -> Self {
        Self {
            name: SmolStr::new(name),
            kind: SystemSubroutineKind::Task,
        }
    }

    pub fn function(name: &str) -> Self {
        Self {
            name: SmolStr::new(name),
            kind: SystemSubroutineKind::Function,
        }
    }
}

pub type AttributeId = Idx<Attribute>;

/// An attribute instance attached to a symbol, statement, or expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: SmolStr,
    pub span: Span,
    pub expr: Option<NodeRef>,
    /// Scope the value expression binds in.
    pub scope: ScopeId,
    pub value: Lazy<ConstInt>,
}

/// Identity key for attribute attachment. Arena ids make this attach to a
/// specific instance, never to structurally-equal nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrTarget {
    Symbol(SymbolId),
    Statement(StmtId),
    Expression(ExprId),
}

/// Central owner of the semantic graph: arenas, the root scope, the
/// definition and package maps, the diagnostic store, and the
/// finalization state machine.
pub struct Compilation {
    options: CompilationOptions,

    symbols: Arena<Symbol>,
    scopes: Arena<ScopeData>,
    types: Arena<Type>,
    net_types: Arena<NetType>,
    exprs: Arena<Expr>,
    stmts: Arena<Stmt>,
    attributes: Arena<Attribute>,
    definitions: Arena<Definition>,
    deferred_pool: Arena<DeferredMemberData>,
    import_pool: Arena<Vec<SymbolId>>,

    root: SymbolId,
    root_scope: ScopeId,
    top_instances: Vec<SymbolId>,
    units: Vec<SymbolId>,
    syntax_trees: Vec<Arc<SyntaxTree>>,
    tree_index: HashMap<TreeId, usize>,
    source_manager: Option<SourceManagerHandle>,
    fallback_source_manager: Option<SourceManagerHandle>,

    definition_map: HashMap<(SmolStr, ScopeId), DefinitionId>,
    packages: HashMap<SmolStr, SymbolId>,
    global_instantiations: HashSet<SmolStr>,

    default_net_type_map: HashMap<NodeRef, NetTypeId>,
    unconnected_drive_map: HashMap<NodeRef, UnconnectedDrive>,
    time_scale_map: HashMap<NodeRef, TimeScale>,
    default_time_scale: TimeScale,

    known_types: HashMap<BuiltinTypeKind, TypeId>,
    scalar_table: [Option<TypeId>; 8],
    vector_cache: HashMap<u32, TypeId>,
    known_net_types: HashMap<NetTypeToken, NetTypeId>,
    error_type: TypeId,

    subroutines: HashMap<SmolStr, SystemSubroutine>,
    methods: HashMap<(SmolStr, TypeTag), SystemSubroutine>,
    attribute_map: HashMap<AttrTarget, Vec<AttributeId>>,

    pub(crate) diags: DiagnosticStore,
    finalizing: bool,
    finalized: bool,
    cached_parse: Option<Vec<Diagnostic>>,
    cached_semantic: Option<Vec<Diagnostic>>,
    cached_all: Option<Vec<Diagnostic>>,
}

impl Compilation {
    pub fn new(options: CompilationOptions) -> Self {
        let mut symbols = Arena::new();
        let root = symbols.alloc(Symbol::new(
            SymbolKind::Root,
            SmolStr::new("$root"),
            Span::at(svala_source::FileId(0), 0, 0),
        ));
        let mut scopes = Arena::new();
        let root_scope = scopes.alloc(ScopeData::new(root));
        symbols[root].scope = Some(root_scope);

        let mut comp = Self {
            options,
            symbols,
            scopes,
            types: Arena::new(),
            net_types: Arena::new(),
            exprs: Arena::new(),
            stmts: Arena::new(),
            attributes: Arena::new(),
            definitions: Arena::new(),
            deferred_pool: Arena::new(),
            import_pool: Arena::new(),
            root,
            root_scope,
            top_instances: Vec::new(),
            units: Vec::new(),
            syntax_trees: Vec::new(),
            tree_index: HashMap::new(),
            source_manager: None,
            fallback_source_manager: None,
            definition_map: HashMap::new(),
            packages: HashMap::new(),
            global_instantiations: HashSet::new(),
            default_net_type_map: HashMap::new(),
            unconnected_drive_map: HashMap::new(),
            time_scale_map: HashMap::new(),
            default_time_scale: TimeScale::default(),
            known_types: HashMap::new(),
            scalar_table: [None; 8],
            vector_cache: HashMap::new(),
            known_net_types: HashMap::new(),
            error_type: Idx::from_raw(0),
            subroutines: HashMap::new(),
            methods: HashMap::new(),
            attribute_map: HashMap::new(),
            diags: DiagnosticStore::default(),
            finalizing: false,
            finalized: false,
            cached_parse: None,
            cached_semantic: None,
            cached_all: None,
        };
        comp.register_builtin_types();
        comp.register_net_types();
        crate::builtins::register_all(&mut comp);
        comp
    }

    fn register_builtin_types(&mut self) {
        use BuiltinTypeKind as Bk;

        let scalar = |comp: &mut Self, scalar: ScalarKind, signed: bool| {
            let name = if signed {
                SmolStr::new(format!("{} signed", scalar.keyword_str()))
            } else {
                SmolStr::new(scalar.keyword_str())
            };
            comp.types.alloc(Type {
                kind: TypeKind::Scalar { scalar, signed },
                name,
            })
        };
        let bit = scalar(self, ScalarKind::Bit, false);
        let logic = scalar(self, ScalarKind::Logic, false);
        let reg = scalar(self, ScalarKind::Reg, false);
        let signed_bit = scalar(self, ScalarKind::Bit, true);
        let signed_logic = scalar(self, ScalarKind::Logic, true);
        let signed_reg = scalar(self, ScalarKind::Reg, true);

        let predefined = |comp: &mut Self, int: PredefinedIntKind| {
            comp.types.alloc(Type {
                kind: TypeKind::PredefinedInteger {
                    int,
                    signed: int.default_signed(),
                },
                name: SmolStr::new(int.keyword_str()),
            })
        };
        let short_int = predefined(self, PredefinedIntKind::ShortInt);
        let int = predefined(self, PredefinedIntKind::Int);
        let long_int = predefined(self, PredefinedIntKind::LongInt);
        let byte = predefined(self, PredefinedIntKind::Byte);
        let integer = predefined(self, PredefinedIntKind::Integer);
        let time = predefined(self, PredefinedIntKind::Time);

        let float = |comp: &mut Self, float: FloatKind| {
            comp.types.alloc(Type {
                kind: TypeKind::Floating { float },
                name: SmolStr::new(float.keyword_str()),
            })
        };
        let real = float(self, FloatKind::Real);
        let real_time = float(self, FloatKind::RealTime);
        let short_real = float(self, FloatKind::ShortReal);

        let simple = |comp: &mut Self, kind: TypeKind, name: &str| {
            comp.types.alloc(Type {
                kind,
                name: SmolStr::new(name),
            })
        };
        let string = simple(self, TypeKind::String, "string");
        let chandle = simple(self, TypeKind::CHandle, "chandle");
        let void = simple(self, TypeKind::Void, "void");
        let _null = simple(self, TypeKind::Null, "null");
        let event = simple(self, TypeKind::Event, "event");
        let error = simple(self, TypeKind::Error, "<error>");
        self.error_type = error;

        self.known_types.insert(Bk::ShortInt, short_int);
        self.known_types.insert(Bk::Int, int);
        self.known_types.insert(Bk::LongInt, long_int);
        self.known_types.insert(Bk::Byte, byte);
        self.known_types.insert(Bk::Bit, bit);
        self.known_types.insert(Bk::Logic, logic);
        self.known_types.insert(Bk::Reg, reg);
        self.known_types.insert(Bk::Integer, integer);
        self.known_types.insert(Bk::Time, time);
        self.known_types.insert(Bk::Real, real);
        self.known_types.insert(Bk::RealTime, real_time);
        self.known_types.insert(Bk::ShortReal, short_real);
        self.known_types.insert(Bk::String, string);
        self.known_types.insert(Bk::CHandle, chandle);
        self.known_types.insert(Bk::Void, void);
        self.known_types.insert(Bk::Event, event);
        self.known_types.insert(Bk::Unknown, error);

        // Scalar types are indexed by the low three flag bits.
        for ty in [bit, logic, reg, signed_bit, signed_logic, signed_reg] {
            let flags = self.types[ty]
                .integral_flags()
                .expect("scalar types have flags");
            self.scalar_table[(flags.bits() & 0x7) as usize] = Some(ty);
        }
    }

    fn register_net_types(&mut self) {
        use NetTypeToken as Nt;
        let logic = self.known_types[&BuiltinTypeKind::Logic];
        for (token, name) in [
            (Nt::Wire, "wire"),
            (Nt::WAnd, "wand"),
            (Nt::WOr, "wor"),
            (Nt::Tri, "tri"),
            (Nt::TriAnd, "triand"),
            (Nt::TriOr, "trior"),
            (Nt::Tri0, "tri0"),
            (Nt::Tri1, "tri1"),
            (Nt::TriReg, "trireg"),
            (Nt::Supply0, "supply0"),
            (Nt::Supply1, "supply1"),
            (Nt::UWire, "uwire"),
            (Nt::Unknown, "<error>"),
        ] {
            let id = self.net_types.alloc(NetType {
                token,
                name: SmolStr::new(name),
                data_type: logic,
            });
            self.known_net_types.insert(token, id);
        }
    }

    // ---- arena accessors -------------------------------------------------

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub(crate) fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    pub(crate) fn symbols_mut(&mut self) -> &mut Arena<Symbol> {
        &mut self.symbols
    }

    pub fn scope_data(&self, id: ScopeId) -> &ScopeData {
        &self.scopes[id]
    }

    pub(crate) fn scope_data_mut(&mut self, id: ScopeId) -> &mut ScopeData {
        &mut self.scopes[id]
    }

    pub(crate) fn scopes_mut(&mut self) -> &mut Arena<ScopeData> {
        &mut self.scopes
    }

    pub fn type_data(&self, id: TypeId) -> &Type {
        &self.types[id]
    }

    pub(crate) fn alloc_type(&mut self, kind: TypeKind, name: SmolStr) -> TypeId {
        self.types.alloc(Type { kind, name })
    }

    pub fn net_type_data(&self, id: NetTypeId) -> &NetType {
        &self.net_types[id]
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }

    pub(crate) fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        self.exprs.alloc(expr)
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }

    pub(crate) fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        self.stmts.alloc(stmt)
    }

    pub fn definition_data(&self, id: DefinitionId) -> &Definition {
        &self.definitions[id]
    }

    pub(crate) fn deferred_pool_mut(&mut self) -> &mut Arena<DeferredMemberData> {
        &mut self.deferred_pool
    }

    pub(crate) fn import_pool(&self) -> &Arena<Vec<SymbolId>> {
        &self.import_pool
    }

    pub(crate) fn import_pool_mut(&mut self) -> &mut Arena<Vec<SymbolId>> {
        &mut self.import_pool
    }

    pub fn options(&self) -> &CompilationOptions {
        &self.options
    }

    pub fn root_scope(&self) -> ScopeId {
        self.root_scope
    }

    pub fn root_symbol(&self) -> SymbolId {
        self.root
    }

    pub fn num_errors(&self) -> usize {
        self.diags.num_errors()
    }

    /// Look up a tree by identity. The tree must have been added.
    pub fn tree(&self, id: TreeId) -> Arc<SyntaxTree> {
        let idx = self.tree_index[&id];
        self.syntax_trees[idx].clone()
    }

    // ---- syntax tree intake ----------------------------------------------

    /// Add a parsed tree: creates its compilation unit, extracts metadata,
    /// merges global instantiation names, and queues top-level members.
    pub fn add_syntax_tree(&mut self, tree: Arc<SyntaxTree>) -> Result<(), CompilationError> {
        if self.finalized {
            return Err(CompilationError::AlreadyFinalized);
        }
        match &self.source_manager {
            None => self.source_manager = Some(tree.source_manager().clone()),
            Some(sm) => {
                if !SourceManager::same(sm, tree.source_manager()) {
                    return Err(CompilationError::SourceManagerMismatch);
                }
            }
        }

        let root_ref = tree.root_ref();
        let root_span = tree.node(tree.root()).span;
        let unit = self.create_symbol(SymbolKind::CompilationUnit, SmolStr::default(), root_span);
        let unit_scope = self.create_scope(unit);
        self.symbol_mut(unit).syntax = Some(root_ref);
        self.add_member(self.root_scope, unit);
        self.units.push(unit);

        for (&node, meta) in tree.metadata() {
            let decl = tree.node_ref(node);
            let net = self.net_type(meta.default_net_type);
            self.default_net_type_map.insert(decl, net);
            match meta.unconnected_drive {
                Some(DriveKeyword::Pull0) => {
                    self.unconnected_drive_map
                        .insert(decl, UnconnectedDrive::Pull0);
                }
                Some(DriveKeyword::Pull1) => {
                    self.unconnected_drive_map
                        .insert(decl, UnconnectedDrive::Pull1);
                }
                None => {}
            }
            if let Some(ts) = meta.time_scale {
                self.time_scale_map.insert(decl, ts);
            }
        }

        for name in tree.global_instantiations() {
            self.global_instantiations.insert(name.clone());
        }

        self.tree_index.insert(tree.id(), self.syntax_trees.len());
        self.syntax_trees.push(tree.clone());

        match &tree.node(tree.root()).kind {
            NodeKind::CompilationUnit { members } => {
                for &member in members {
                    self.add_members(unit_scope, root_ref.with(member));
                }
            }
            _ => self.add_members(unit_scope, root_ref),
        }

        self.cached_parse = None;
        Ok(())
    }

    pub fn syntax_trees(&self) -> &[Arc<SyntaxTree>] {
        &self.syntax_trees
    }

    pub fn compilation_units(&self) -> &[SymbolId] {
        &self.units
    }

    /// Find the compilation unit created for a tree root.
    pub fn compilation_unit_for(&self, root: NodeRef) -> Option<SymbolId> {
        self.units
            .iter()
            .copied()
            .find(|&u| self.symbol(u).syntax == Some(root))
    }

    // ---- finalization ----------------------------------------------------

    /// Finalize the design and return the root symbol. Idempotent; the
    /// first call selects and instantiates top-level modules.
    ///
    /// Top-level definitions are modules, lexically at root, never
    /// instantiated anywhere, with all parameters defaulted. They are
    /// instantiated in name order for determinism.
    pub fn root(&mut self) -> SymbolId {
        if self.finalized {
            return self.root;
        }
        assert!(!self.finalizing, "re-entrant finalization");
        self.finalizing = true;

        let mut top_defs: Vec<DefinitionId> = self
            .definition_map
            .iter()
            .filter_map(|((name, scope), &def)| {
                if *scope != self.root_scope {
                    return None;
                }
                let d = &self.definitions[def];
                if d.kind != DefinitionKind::Module {
                    return None;
                }
                if self.global_instantiations.contains(name) {
                    return None;
                }
                if !d.all_params_defaulted() {
                    return None;
                }
                Some(def)
            })
            .collect();
        top_defs.sort_by(|&a, &b| self.definitions[a].name.cmp(&self.definitions[b].name));

        let mut top_list = Vec::with_capacity(top_defs.len());
        for def in top_defs {
            let instance = self.instantiate_top(def);
            self.add_member(self.root_scope, instance);
            top_list.push(instance);
        }

        self.top_instances = top_list;
        self.finalizing = false;
        self.finalized = true;
        self.root
    }

    pub fn top_instances(&self) -> &[SymbolId] {
        &self.top_instances
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    // ---- definitions & packages ------------------------------------------

    /// Create a definition record and symbol from declaration syntax.
    ///
    /// Definitions declared in a compilation unit are keyed under the root
    /// scope instead, so sibling units see each other's top-level
    /// definitions.
    pub(crate) fn create_definition(
        &mut self,
        scope: ScopeId,
        syntax: NodeRef,
        decl: &ModuleDecl,
    ) -> DefinitionId {
        let kind = match decl.keyword {
            svala_syntax::DefinitionKeyword::Interface => DefinitionKind::Interface,
            svala_syntax::DefinitionKeyword::Program => DefinitionKind::Program,
            _ => DefinitionKind::Module,
        };
        let span = {
            let tree = self.tree(syntax.tree);
            tree.node(syntax.node).span
        };

        let mut params = Vec::new();
        for &p in &decl.params {
            let tree = self.tree(syntax.tree);
            if let NodeKind::ParamDecl {
                declarators,
                is_local: false,
                ..
            } = &tree.node(p).kind
            {
                let declarators = declarators.clone();
                drop(tree);
                for d in declarators {
                    let (name, init) = self.declarator_parts(syntax.tree, d);
                    params.push(DefParam {
                        name,
                        has_default: init.is_some(),
                    });
                }
            }
        }

        let default_net_type = self.default_net_type(syntax);
        let unconnected_drive = self.unconnected_drive(syntax);
        let time_scale = self.directive_time_scale(syntax);

        let def = self.definitions.alloc(Definition {
            name: decl.name.clone(),
            kind,
            span,
            scope,
            syntax,
            params,
            default_net_type,
            unconnected_drive,
            time_scale,
        });

        // The definition symbol's scope holds the header parameters, so
        // declaration-site diagnostics have a home.
        let sym = self.create_symbol(SymbolKind::Definition { definition: def }, decl.name.clone(), span);
        let def_scope = self.create_scope(sym);
        self.symbol_mut(sym).syntax = Some(syntax);
        self.add_member(scope, sym);
        let param_nodes = decl.params.clone();
        for p in param_nodes {
            self.add_header_param(def_scope, syntax.with(p), None);
        }

        self.add_definition(def);
        def
    }

    /// Record `def` under (name, lexical scope), re-keying compilation
    /// units to root.
    pub fn add_definition(&mut self, def: DefinitionId) {
        let (name, scope) = {
            let d = &self.definitions[def];
            (d.name.clone(), d.scope)
        };
        let scope_sym = self.scopes[scope].symbol;
        let target = if matches!(self.symbols[scope_sym].kind, SymbolKind::CompilationUnit) {
            self.root_scope
        } else {
            scope
        };
        self.definition_map.insert((name, target), def);
    }

    /// Find a definition visible from `scope`, climbing lexical parents
    /// and ending with one root-scope lookup.
    pub fn definition(&self, name: &str, scope: ScopeId) -> Option<DefinitionId> {
        let mut search = Some(scope);
        while let Some(s) = search {
            if let Some(&def) = self.definition_map.get(&(SmolStr::new(name), s)) {
                return Some(def);
            }
            let sym = self.scopes[s].symbol;
            if matches!(self.symbols[sym].kind, SymbolKind::Root) {
                return None;
            }
            search = self
                .symbols[sym]
                .parent
                .and_then(|p| self.symbols[p].scope);
        }
        None
    }

    /// Root-scope definition lookup.
    pub fn definition_at_root(&self, name: &str) -> Option<DefinitionId> {
        self.definition(name, self.root_scope)
    }

    /// Create a package symbol from declaration syntax and register it.
    ///
    /// Packages live in their own namespace: the symbol gets a root parent
    /// back-reference so lookups inside it can climb out, but it never
    /// appears in the root member chain or name map.
    pub(crate) fn create_package(&mut self, syntax: NodeRef, decl: &ModuleDecl) -> SymbolId {
        let span = {
            let tree = self.tree(syntax.tree);
            tree.node(syntax.node).span
        };
        let sym = self.create_symbol(SymbolKind::Package, decl.name.clone(), span);
        let pkg_scope = self.create_scope(sym);
        self.symbol_mut(sym).syntax = Some(syntax);
        self.symbol_mut(sym).parent = Some(self.root);

        for &member in &decl.members.clone() {
            self.add_members(pkg_scope, syntax.with(member));
        }
        self.add_package(sym);
        sym
    }

    /// Register an existing package symbol by name.
    pub fn add_package(&mut self, package: SymbolId) {
        let name = self.symbols[package].name.clone();
        self.packages.insert(name, package);
    }

    pub fn package(&self, name: &str) -> Option<SymbolId> {
        self.packages.get(name).copied()
    }

    // ---- system subroutines & methods ------------------------------------

    pub fn add_system_subroutine(&mut self, subroutine: SystemSubroutine) {
        self.subroutines.insert(subroutine.name.clone(), subroutine);
    }

    pub fn system_subroutine(&self, name: &str) -> Option<&SystemSubroutine> {
        self.subroutines.get(name)
    }

    pub fn add_system_method(&mut self, type_tag: TypeTag, method: SystemSubroutine) {
        self.methods
            .insert((method.name.clone(), type_tag), method);
    }

    pub fn system_method(&self, type_tag: TypeTag, name: &str) -> Option<&SystemSubroutine> {
        self.methods.get(&(SmolStr::new(name), type_tag))
    }

    // ---- attributes ------------------------------------------------------

    pub fn create_attribute(
        &mut self,
        name: SmolStr,
        span: Span,
        expr: Option<NodeRef>,
        scope: ScopeId,
    ) -> AttributeId {
        self.attributes.alloc(Attribute {
            name,
            span,
            expr,
            scope,
            value: Lazy::Unforced,
        })
    }

    pub fn attribute(&self, id: AttributeId) -> &Attribute {
        &self.attributes[id]
    }

    pub fn set_symbol_attributes(&mut self, symbol: SymbolId, attrs: Vec<AttributeId>) {
        self.attribute_map.insert(AttrTarget::Symbol(symbol), attrs);
    }

    pub fn set_statement_attributes(&mut self, stmt: StmtId, attrs: Vec<AttributeId>) {
        self.attribute_map.insert(AttrTarget::Statement(stmt), attrs);
    }

    pub fn set_expression_attributes(&mut self, expr: ExprId, attrs: Vec<AttributeId>) {
        self.attribute_map.insert(AttrTarget::Expression(expr), attrs);
    }

    pub fn attributes_for(&self, target: AttrTarget) -> &[AttributeId] {
        self.attribute_map
            .get(&target)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Force an attribute's constant value. Attributes with no value
    /// expression default to 1.
    pub fn attribute_value(&mut self, id: AttributeId) -> ConstInt {
        let (state, expr, scope) = {
            let a = &self.attributes[id];
            (a.value, a.expr, a.scope)
        };
        match state {
            Lazy::Forced(v) => return v,
            Lazy::Forcing => {
                let cycle = ConstInt::Error(crate::types::ConstEvalError::Cycle);
                self.attributes[id].value = Lazy::Forced(cycle);
                return cycle;
            }
            Lazy::Unforced => {}
        }
        self.attributes[id].value = Lazy::Forcing;
        let origin = self.scopes[scope].symbol;
        let result = match expr {
            Some(e) => {
                let bound = self.bind_expr(e, scope, crate::lookup::LookupRefPoint::MAX, origin);
                self.eval_const(bound)
            }
            None => ConstInt::Known(1),
        };
        self.attributes[id].value = Lazy::Forced(result);
        result
    }

    // ---- types & net types -----------------------------------------------

    pub fn error_type(&self) -> TypeId {
        self.error_type
    }

    /// Built-in type for a type-keyword syntax kind; unknown kinds map to
    /// the error type.
    pub fn type_for_syntax(&self, kind: BuiltinTypeKind) -> TypeId {
        self.known_types
            .get(&kind)
            .copied()
            .unwrap_or(self.error_type)
    }

    /// Interned packed vector type of `width` bits over the scalar picked
    /// by `flags`.
    pub fn vector_type(&mut self, width: u32, flags: IntegralFlags) -> TypeId {
        assert!(width > 0, "vector width must be positive");
        let key = width | (u32::from(flags.bits()) << IntegralFlags::BITWIDTH_BITS);
        if let Some(&ty) = self.vector_cache.get(&key) {
            return ty;
        }
        let element = self.scalar_type(flags);
        let name = SmolStr::new(format!(
            "{} [{}:0]",
            self.types[element].name,
            width - 1
        ));
        let ty = self.types.alloc(Type {
            kind: TypeKind::PackedArray {
                element,
                width,
                flags,
            },
            name,
        });
        self.vector_cache.insert(key, ty);
        ty
    }

    /// Scalar type selected by the low three flag bits.
    pub fn scalar_type(&self, flags: IntegralFlags) -> TypeId {
        self.scalar_table[(flags.bits() & 0x7) as usize]
            .expect("no scalar type for flag combination")
    }

    /// The 32-bit unsigned two-state type.
    pub fn unsigned_int_type(&mut self) -> TypeId {
        self.vector_type(32, IntegralFlags::TWO_STATE)
    }

    /// Net type singleton for a keyword token; unknown tokens map to the
    /// error net type.
    pub fn net_type(&self, token: NetTypeToken) -> NetTypeId {
        self.known_net_types
            .get(&token)
            .copied()
            .unwrap_or_else(|| self.known_net_types[&NetTypeToken::Unknown])
    }

    pub fn wire_net_type(&self) -> NetTypeId {
        self.known_net_types[&NetTypeToken::Wire]
    }

    // ---- per-declaration metadata ----------------------------------------

    pub fn default_net_type(&self, decl: NodeRef) -> NetTypeId {
        self.default_net_type_map
            .get(&decl)
            .copied()
            .unwrap_or_else(|| self.net_type(NetTypeToken::Unknown))
    }

    pub fn unconnected_drive(&self, decl: NodeRef) -> UnconnectedDrive {
        self.unconnected_drive_map
            .get(&decl)
            .copied()
            .unwrap_or_default()
    }

    pub fn directive_time_scale(&self, decl: NodeRef) -> Option<TimeScale> {
        self.time_scale_map.get(&decl).copied()
    }

    pub fn default_time_scale(&self) -> TimeScale {
        self.default_time_scale
    }

    // ---- name parsing & script scopes ------------------------------------

    /// Parse a name from literal text via the default source manager,
    /// aggregating any diagnostics into a single error string.
    pub fn parse_name(&mut self, text: &str) -> Result<NameSyntax, ParseNameError> {
        let sm = match &self.source_manager {
            Some(sm) => sm.clone(),
            None => self
                .fallback_source_manager
                .get_or_insert_with(SourceManager::new)
                .clone(),
        };
        let buffer = sm.assign_text(text);
        let mut parsed = svala_syntax::parse_name(&buffer);
        if !parsed.diagnostics.is_empty() {
            parsed
                .diagnostics
                .sort_by(|a, b| sm.cmp_loc(a.span, b.span));
            let rendered: Vec<String> = parsed
                .diagnostics
                .iter()
                .map(|d| format!("{}: {}", d.code, d.message))
                .collect();
            return Err(ParseNameError(rendered.join("\n")));
        }
        parsed
            .name
            .ok_or_else(|| ParseNameError(String::from("no name parsed")))
    }

    /// Create an ad-hoc compilation-unit scope under the root, for
    /// REPL-style hosts.
    pub fn create_script_scope(&mut self) -> SymbolId {
        let span = self.symbols[self.root].span;
        let unit = self.create_symbol(SymbolKind::CompilationUnit, SmolStr::default(), span);
        self.create_scope(unit);
        self.add_member(self.root_scope, unit);
        unit
    }

    // ---- diagnostics -----------------------------------------------------

    /// Parse-stage diagnostics from every added tree, sorted by location.
    pub fn parse_diagnostics(&mut self) -> &[Diagnostic] {
        if self.cached_parse.is_none() {
            let mut diags: Vec<Diagnostic> = self
                .syntax_trees
                .iter()
                .flat_map(|t| t.diagnostics().iter().map(Diagnostic::from_parse))
                .collect();
            self.sort_diagnostics(&mut diags);
            self.cached_parse = Some(diags);
        }
        self.cached_parse.as_deref().expect("just filled")
    }

    /// Semantic diagnostics: forces all deferred work via the visitor,
    /// then renders the coalesced store.
    pub fn semantic_diagnostics(&mut self) -> &[Diagnostic] {
        if self.cached_semantic.is_none() {
            let error_limit = if self.options.error_limit == 0 {
                usize::MAX
            } else {
                self.options.error_limit as usize
            };
            let mut visitor = DiagnosticVisitor::new(error_limit);
            let root = self.root();
            visitor.visit(self, root);

            let mut diags = self.render_coalesced(visitor.instance_count());
            self.sort_diagnostics(&mut diags);
            self.cached_semantic = Some(diags);
        }
        self.cached_semantic.as_deref().expect("just filled")
    }

    /// Parse plus semantic diagnostics, re-sorted together.
    pub fn all_diagnostics(&mut self) -> &[Diagnostic] {
        if self.cached_all.is_none() {
            let mut diags = self.parse_diagnostics().to_vec();
            diags.extend(self.semantic_diagnostics().iter().cloned());
            self.sort_diagnostics(&mut diags);
            self.cached_all = Some(diags);
        }
        self.cached_all.as_deref().expect("just filled")
    }

    fn sort_diagnostics(&self, diags: &mut [Diagnostic]) {
        if let Some(sm) = &self.source_manager {
            diags.sort_by(|a, b| sm.cmp_loc(a.span, b.span));
        }
    }
}

impl Default for Compilation {
    fn default() -> Self {
        Self::new(CompilationOptions::default())
    }
}
