use smol_str::SmolStr;
use svala_arena::Idx;
use svala_source::Span;
use svala_syntax::{NodeRef, PortDirection, ProceduralBlockKind};

use crate::binder::{ExprId, StmtId};
use crate::definition::DefinitionId;
use crate::scope::ScopeId;
use crate::types::{ConstInt, TypeId};

pub type SymbolId = Idx<Symbol>;

/// A demand-driven slot: `Unforced -> Forcing -> Forced`.
///
/// Re-entry while `Forcing` is a cycle; the forcing code breaks it by
/// storing the error value, so evaluation stays deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lazy<T> {
    #[default]
    Unforced,
    Forcing,
    Forced(T),
}

impl<T: Copy> Lazy<T> {
    pub fn forced(&self) -> Option<T> {
        match self {
            Lazy::Forced(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_forcing(&self) -> bool {
        matches!(self, Lazy::Forcing)
    }
}

/// The lazily resolved type and initializer of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeclaredType {
    pub type_syntax: Option<NodeRef>,
    pub init_syntax: Option<NodeRef>,
    pub ty: Lazy<TypeId>,
    pub init: Lazy<Option<ExprId>>,
}

impl DeclaredType {
    pub fn new(type_syntax: Option<NodeRef>, init_syntax: Option<NodeRef>) -> Self {
        Self {
            type_syntax,
            init_syntax,
            ty: Lazy::Unforced,
            init: Lazy::Unforced,
        }
    }
}

/// Kind tag plus per-kind payload for a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Root,
    CompilationUnit,
    Package,
    Definition {
        definition: DefinitionId,
    },
    ModuleInstance {
        definition: DefinitionId,
    },
    InterfaceInstance {
        definition: DefinitionId,
    },
    ProgramInstance {
        definition: DefinitionId,
    },
    GenerateBlock {
        is_instantiated: bool,
    },
    GenerateBlockArray,
    Variable {
        declared: DeclaredType,
    },
    FormalArgument {
        declared: DeclaredType,
        direction: PortDirection,
    },
    Subroutine {
        /// Return type; `void` for tasks.
        declared: DeclaredType,
        is_task: bool,
        body: Lazy<Option<StmtId>>,
    },
    Parameter {
        declared: DeclaredType,
        is_local: bool,
        /// Instantiation-site override, bound in the instantiating scope.
        override_syntax: Option<NodeRef>,
        override_scope: Option<ScopeId>,
        value: Lazy<ConstInt>,
    },
    Genvar,
    EnumType {
        declared: DeclaredType,
    },
    EnumValue {
        base: TypeId,
        init_syntax: Option<NodeRef>,
        /// Previous value in declaration order; successor values count up
        /// from it when they have no initializer.
        prev: Option<SymbolId>,
        value: Lazy<ConstInt>,
    },
    TypeAlias {
        declared: DeclaredType,
    },
    ExplicitImport {
        package: SmolStr,
        member: SmolStr,
        imported: Lazy<Option<SymbolId>>,
    },
    WildcardImport {
        package: SmolStr,
        resolved: Lazy<Option<SymbolId>>,
    },
    /// Injects `wrapped` into an enclosing scope's name map without moving
    /// its ownership.
    TransparentMember {
        wrapped: SymbolId,
    },
    Port {
        direction: PortDirection,
        declared: DeclaredType,
        connection_syntax: Option<NodeRef>,
        connection_scope: Option<ScopeId>,
        connection: Lazy<Option<ExprId>>,
    },
    InterfacePort {
        interface: SmolStr,
    },
    ContinuousAssign {
        syntax: NodeRef,
        assignment: Lazy<Option<ExprId>>,
    },
    ProceduralBlock {
        kind: ProceduralBlockKind,
        body: Lazy<Option<StmtId>>,
    },
}

impl SymbolKind {
    pub fn is_instance(&self) -> bool {
        matches!(
            self,
            SymbolKind::ModuleInstance { .. }
                | SymbolKind::InterfaceInstance { .. }
                | SymbolKind::ProgramInstance { .. }
        )
    }

    /// The definition an instance was stamped from.
    pub fn instance_definition(&self) -> Option<DefinitionId> {
        match self {
            SymbolKind::ModuleInstance { definition }
            | SymbolKind::InterfaceInstance { definition }
            | SymbolKind::ProgramInstance { definition } => Some(*definition),
            _ => None,
        }
    }

    pub fn declared_type(&self) -> Option<&DeclaredType> {
        match self {
            SymbolKind::Variable { declared }
            | SymbolKind::FormalArgument { declared, .. }
            | SymbolKind::Subroutine { declared, .. }
            | SymbolKind::Parameter { declared, .. }
            | SymbolKind::EnumType { declared }
            | SymbolKind::TypeAlias { declared }
            | SymbolKind::Port { declared, .. } => Some(declared),
            _ => None,
        }
    }

    pub fn declared_type_mut(&mut self) -> Option<&mut DeclaredType> {
        match self {
            SymbolKind::Variable { declared }
            | SymbolKind::FormalArgument { declared, .. }
            | SymbolKind::Subroutine { declared, .. }
            | SymbolKind::Parameter { declared, .. }
            | SymbolKind::EnumType { declared }
            | SymbolKind::TypeAlias { declared }
            | SymbolKind::Port { declared, .. } => Some(declared),
            _ => None,
        }
    }
}

/// A node in the semantic graph.
///
/// `parent` is the owning scope's symbol; `index` is the in-scope index
/// used for declared-before-use checks; `next` is the sibling link. All
/// three are maintained by `insert_member` only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: SmolStr,
    pub span: Span,
    pub parent: Option<SymbolId>,
    pub index: u32,
    pub next: Option<SymbolId>,
    /// Set iff this symbol is itself a scope.
    pub scope: Option<ScopeId>,
    /// Attached syntax, when the symbol came from a tree.
    pub syntax: Option<NodeRef>,
}

impl Symbol {
    pub fn new(kind: SymbolKind, name: SmolStr, span: Span) -> Self {
        Self {
            kind,
            name,
            span,
            parent: None,
            index: 0,
            next: None,
            scope: None,
            syntax: None,
        }
    }
}
