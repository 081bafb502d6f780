use smol_str::SmolStr;
use svala_arena::Idx;
use svala_source::Span;
use svala_syntax::{NodeRef, TimeScale};

use crate::scope::ScopeId;
use crate::types::NetTypeId;

pub type DefinitionId = Idx<Definition>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Module,
    Interface,
    Program,
}

/// Drive applied to unconnected input ports of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnconnectedDrive {
    #[default]
    None,
    Pull0,
    Pull1,
}

/// Header parameter of a definition. `has_default` decides whether the
/// definition is eligible for automatic top-level instantiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefParam {
    pub name: SmolStr,
    pub has_default: bool,
}

/// A module/interface/program declaration record.
///
/// The record is what instantiation stamps from; the accompanying
/// `Definition` symbol carries the header parameters for diagnostics
/// raised at the declaration site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: SmolStr,
    pub kind: DefinitionKind,
    pub span: Span,
    /// Lexical scope the declaration appeared in.
    pub scope: ScopeId,
    pub syntax: NodeRef,
    pub params: Vec<DefParam>,
    pub default_net_type: NetTypeId,
    pub unconnected_drive: UnconnectedDrive,
    pub time_scale: Option<TimeScale>,
}

impl Definition {
    pub fn all_params_defaulted(&self) -> bool {
        self.params.iter().all(|p| p.has_default)
    }
}
