//! Syntax-tree contract consumed by the semantic core.
//!
//! Parsing proper is out of scope for this repository; a host front-end (or
//! a test) builds trees through [`SyntaxTreeBuilder`]. Trees carry the
//! per-declaration metadata, global-instantiation names, and parse
//! diagnostics the compilation manager extracts in `add_syntax_tree`.

mod meta;
mod name;
mod nodes;
mod tree;

pub use meta::{DeclMetadata, DriveKeyword, NetTypeToken, TimeScale, TimeScaleValue, TimeUnit};
pub use name::{parse_name, NameSyntax, ParsedName};
pub use nodes::{
    BinaryOp, BuiltinTypeKind, DefinitionKeyword, FunctionDecl, ImportItem, ImportedName,
    ModuleDecl, NodeKind, PortConnection, PortDirection, ProceduralBlockKind, UnaryOp,
};
pub use tree::{Node, NodeId, NodeRef, SyntaxTree, SyntaxTreeBuilder, TreeId};
