//! Semantic-elaboration core for a SystemVerilog-like front-end.
//!
//! The [`Compilation`] owns every symbol, type, and scope; scopes expand
//! their queued syntax on first access, and diagnostics collect into a
//! coalescing store rendered once the whole graph has been forced.

mod binder;
mod builtins;
mod compilation;
mod definition;
mod diagnostics;
mod elaborate;
mod lookup;
mod scope;
mod symbols;
mod types;
mod visitor;

#[cfg(test)]
mod tests;

pub use binder::{Expr, ExprId, ExprKind, Stmt, StmtId, StmtKind};
pub use compilation::{
    AttrTarget, Attribute, AttributeId, Compilation, CompilationError, CompilationOptions,
    ParseNameError, SystemSubroutine, SystemSubroutineKind,
};
pub use definition::{DefParam, Definition, DefinitionId, DefinitionKind, UnconnectedDrive};
pub use diagnostics::{Diagnostic, DiagnosticStore};
pub use lookup::{LookupNameKind, LookupRefPoint, LookupResult, LookupResultKind};
pub use scope::{DeferredMemberData, ScopeData, ScopeId};
pub use symbols::{DeclaredType, Lazy, Symbol, SymbolId, SymbolKind};
pub use types::{
    ConstEvalError, ConstInt, FloatKind, IntegralFlags, NetType, NetTypeId, PredefinedIntKind,
    ScalarKind, Type, TypeId, TypeKind, TypeTag,
};
