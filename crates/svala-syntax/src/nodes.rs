use smol_str::SmolStr;
use svala_source::Span;

use crate::tree::NodeId;

/// Which declaration keyword introduced a definition-like construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKeyword {
    Module,
    Interface,
    Program,
    Package,
}

/// A module/interface/program/package declaration.
///
/// Packages reuse this shape, as in the source language's grammar; the
/// keyword distinguishes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDecl {
    pub keyword: DefinitionKeyword,
    pub name: SmolStr,
    /// Header parameter declarations (`#(parameter ...)`); `ParamDecl` nodes.
    pub params: Vec<NodeId>,
    /// Header ports; `PortDecl` or `InterfacePortDecl` nodes.
    pub ports: Vec<NodeId>,
    pub members: Vec<NodeId>,
}

/// A function or task declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: SmolStr,
    pub is_task: bool,
    /// Return type syntax; absent for tasks.
    pub return_ty: Option<NodeId>,
    /// Formal arguments; `PortDecl` nodes.
    pub args: Vec<NodeId>,
    /// Statement body; absent for prototypes.
    pub body: Option<NodeId>,
}

/// One item of a package import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportItem {
    pub package: SmolStr,
    pub name: ImportedName,
    pub span: Span,
}

/// Whether an import names a member explicitly or is a wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    Name(SmolStr),
    Wildcard,
}

/// A named port connection on a hierarchical instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConnection {
    pub port: SmolStr,
    /// Connected expression; `None` for an explicitly open connection.
    pub expr: Option<NodeId>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
    Inout,
    Ref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProceduralBlockKind {
    Initial,
    Final,
    Always,
    AlwaysComb,
    AlwaysLatch,
    AlwaysFf,
}

/// Built-in type keywords, plus `Unknown` for error recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinTypeKind {
    Bit,
    Logic,
    Reg,
    ShortInt,
    Int,
    LongInt,
    Byte,
    Integer,
    Time,
    Real,
    RealTime,
    ShortReal,
    String,
    CHandle,
    Void,
    Event,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    LogicAnd,
    LogicOr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Node payloads. Item, type, expression, and statement kinds share one
/// enum; the semantic layer dispatches on the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    // Items
    CompilationUnit {
        members: Vec<NodeId>,
    },
    ModuleDecl(ModuleDecl),
    DataDecl {
        ty: NodeId,
        declarators: Vec<NodeId>,
    },
    Declarator {
        name: SmolStr,
        init: Option<NodeId>,
    },
    ParamDecl {
        ty: Option<NodeId>,
        declarators: Vec<NodeId>,
        is_local: bool,
    },
    TypedefDecl {
        ty: NodeId,
        name: SmolStr,
    },
    FunctionDecl(FunctionDecl),
    ProceduralBlock {
        kind: ProceduralBlockKind,
        body: NodeId,
    },
    PackageImportDecl {
        items: Vec<ImportItem>,
    },
    HierarchyInstantiation {
        type_name: SmolStr,
        /// Named parameter value assignments (`#(.P(8))`).
        param_overrides: Vec<PortConnection>,
        instances: Vec<NodeId>,
    },
    HierarchicalInstance {
        name: SmolStr,
        connections: Vec<PortConnection>,
    },
    IfGenerate {
        condition: NodeId,
        block: NodeId,
        else_block: Option<NodeId>,
    },
    LoopGenerate {
        genvar: SmolStr,
        lo: NodeId,
        hi: NodeId,
        block: NodeId,
    },
    GenerateBlock {
        label: Option<SmolStr>,
        members: Vec<NodeId>,
    },
    ContinuousAssign {
        /// One `Assign` expression node per assignment in the statement.
        assignments: Vec<NodeId>,
    },
    PortDecl {
        direction: PortDirection,
        name: SmolStr,
        ty: Option<NodeId>,
    },
    InterfacePortDecl {
        interface: SmolStr,
        name: SmolStr,
    },
    GenvarDecl {
        names: Vec<SmolStr>,
    },

    // Types
    BuiltinType {
        kind: BuiltinTypeKind,
        /// Optional packed dimension `[msb:lsb]` as expression nodes.
        packed: Option<(NodeId, NodeId)>,
    },
    NamedType {
        name: SmolStr,
    },
    EnumType {
        base: Option<NodeId>,
        /// `Declarator` nodes, one per enum value.
        variants: Vec<NodeId>,
    },

    // Expressions
    Literal {
        value: i64,
    },
    Ident {
        name: SmolStr,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Paren {
        inner: NodeId,
    },
    Call {
        callee: SmolStr,
        args: Vec<NodeId>,
        is_system: bool,
    },
    Assign {
        lhs: NodeId,
        rhs: NodeId,
    },

    // Statements
    BlockStmt {
        stmts: Vec<NodeId>,
    },
    ExprStmt {
        expr: NodeId,
    },
}
