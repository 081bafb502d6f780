use smallvec::SmallVec;

use crate::compilation::Compilation;
use crate::scope::ScopeId;
use crate::symbols::{SymbolId, SymbolKind};

/// A (scope, index) pair used to enforce declared-before-use.
///
/// Ordering is by `index` only; comparisons are meaningful when both
/// points refer to the same scope, and the lookup engine rewrites the
/// point explicitly when climbing parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupRefPoint {
    pub scope: Option<ScopeId>,
    pub index: u32,
}

impl LookupRefPoint {
    pub const MIN: Self = Self {
        scope: None,
        index: 0,
    };
    pub const MAX: Self = Self {
        scope: None,
        index: u32::MAX,
    };

    pub fn new(scope: ScopeId, index: u32) -> Self {
        Self {
            scope: Some(scope),
            index,
        }
    }

    pub fn start_of_scope(scope: ScopeId) -> Self {
        Self::new(scope, 0)
    }

    pub fn end_of_scope(scope: ScopeId) -> Self {
        Self::new(scope, u32::MAX)
    }

    pub fn is_before(self, other: Self) -> bool {
        self.index < other.index
    }
}

/// What the caller is trying to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupNameKind {
    Local,
    Scoped,
    Callable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResultKind {
    NotFound,
    Found,
    AmbiguousImport,
}

/// Mutable output of a name lookup.
#[derive(Debug, Clone)]
pub struct LookupResult {
    pub name_kind: LookupNameKind,
    pub reference_point: LookupRefPoint,
    pub result_kind: LookupResultKind,
    pub was_imported: bool,
    pub symbol: Option<SymbolId>,
    /// Candidate wildcard-imported symbols; more than one means ambiguity.
    pub imports: SmallVec<[SymbolId; 4]>,
}

impl LookupResult {
    pub fn new(name_kind: LookupNameKind, reference_point: LookupRefPoint) -> Self {
        Self {
            name_kind,
            reference_point,
            result_kind: LookupResultKind::NotFound,
            was_imported: false,
            symbol: None,
            imports: SmallVec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.name_kind = LookupNameKind::Local;
        self.reference_point = LookupRefPoint::MAX;
        self.result_kind = LookupResultKind::NotFound;
        self.was_imported = false;
        self.symbol = None;
        self.imports.clear();
    }

    pub fn set_symbol(&mut self, symbol: SymbolId, was_imported: bool) {
        self.symbol = Some(symbol);
        self.was_imported = was_imported;
        self.result_kind = LookupResultKind::Found;
    }

    pub fn add_potential_import(&mut self, import: SymbolId) {
        if !self.imports.is_empty() {
            self.result_kind = LookupResultKind::AmbiguousImport;
        }
        self.imports.push(import);
    }

    /// Declared-before-use applies to local and scoped lookups; callables
    /// may be referenced anywhere in the scope.
    pub fn reference_point_matters(&self) -> bool {
        matches!(
            self.name_kind,
            LookupNameKind::Local | LookupNameKind::Scoped
        )
    }
}

impl Compilation {
    /// The reference point just before `symbol`'s declaration.
    pub fn lookup_before(&self, symbol: SymbolId) -> LookupRefPoint {
        let sym = self.symbol(symbol);
        LookupRefPoint {
            scope: sym.parent.and_then(|p| self.symbol(p).scope),
            index: sym.index,
        }
    }

    /// The reference point just after `symbol`'s declaration.
    pub fn lookup_after(&self, symbol: SymbolId) -> LookupRefPoint {
        let sym = self.symbol(symbol);
        LookupRefPoint {
            scope: sym.parent.and_then(|p| self.symbol(p).scope),
            index: sym.index.saturating_add(1),
        }
    }

    /// Multi-phase name search, mutating `result` in place.
    ///
    /// Phases: local name map (with visibility check), wildcard imports in
    /// declaration order, root package fallback for scoped lookups, then
    /// the lexical parent with a rewritten reference point.
    pub fn lookup_name(&mut self, scope: ScopeId, name: &str, result: &mut LookupResult) {
        self.ensure_members(scope);

        if let Some(&found) = self.scope_data(scope).name_map.get(name) {
            let mut location_good = true;
            if result.reference_point_matters() {
                location_good = self.lookup_before(found).is_before(result.reference_point);
            }

            if location_good {
                // Unwrap wrapped symbols before handing them out.
                enum Unwrap {
                    Import,
                    Transparent(SymbolId),
                    Plain,
                }
                let unwrap = match &self.symbol(found).kind {
                    SymbolKind::ExplicitImport { .. } => Unwrap::Import,
                    SymbolKind::TransparentMember { wrapped } => Unwrap::Transparent(*wrapped),
                    _ => Unwrap::Plain,
                };
                match unwrap {
                    Unwrap::Import => {
                        if let Some(target) = self.explicit_import_target(found) {
                            result.set_symbol(target, true);
                        }
                    }
                    Unwrap::Transparent(wrapped) => result.set_symbol(wrapped, false),
                    Unwrap::Plain => result.set_symbol(found, false),
                }
                return;
            }
        }

        // Nothing viable locally; consult wildcard imports in declaration
        // order, skipping any declared at or after the reference point.
        let import_syms: SmallVec<[SymbolId; 4]> =
            SmallVec::from_slice(self.query_imports(scope));
        let mut import_hits: SmallVec<[SymbolId; 4]> = SmallVec::new();
        for import in import_syms {
            if result.reference_point.is_before(self.lookup_after(import)) {
                break;
            }

            if let Some(package) = self.wildcard_import_package(import) {
                let pkg_scope = self.symbol(package).scope;
                if let Some(pkg_scope) = pkg_scope {
                    if let Some(symbol) = self.lookup_direct(pkg_scope, name) {
                        import_hits.push(symbol);
                        result.add_potential_import(symbol);
                    }
                }
            }
        }

        if !import_hits.is_empty() {
            if import_hits.len() == 1 {
                result.set_symbol(import_hits[0], true);
            }
            return;
        }

        let this_sym = self.scope_data(scope).symbol;
        if matches!(self.symbol(this_sym).kind, SymbolKind::Root) {
            // For scoped lookups that reach the root without a hit, fall
            // back to the package namespace.
            if result.name_kind == LookupNameKind::Scoped {
                if let Some(package) = self.package(name) {
                    result.set_symbol(package, false);
                }
            }
            return;
        }

        // Continue up the scope chain; from the parent's perspective the
        // use site sits just after this child scope's declaration.
        result.reference_point = self.lookup_after(this_sym);
        let parent_scope = self
            .symbol(this_sym)
            .parent
            .and_then(|p| self.symbol(p).scope);
        if let Some(parent_scope) = parent_scope {
            self.lookup_name(parent_scope, name, result);
        }
    }

    /// Non-climbing, non-import-considering lookup used for package
    /// contents. Empty names short-circuit; explicit imports are hidden.
    pub fn lookup_direct(&mut self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        if name.is_empty() {
            return None;
        }

        self.ensure_members(scope);
        let found = *self.scope_data(scope).name_map.get(name)?;
        match &self.symbol(found).kind {
            SymbolKind::ExplicitImport { .. } => None,
            SymbolKind::TransparentMember { wrapped } => Some(*wrapped),
            _ => Some(found),
        }
    }
}
