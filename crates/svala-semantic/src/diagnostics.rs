use indexmap::IndexMap;
use svala_diag::{DiagnosticCode, Severity};
use svala_source::Span;

use crate::compilation::Compilation;
use crate::symbols::{SymbolId, SymbolKind};

/// A semantic diagnostic: code identity, location, originating symbol,
/// and the coalescing annotation filled in at rendering time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub span: Span,
    pub origin: Option<SymbolId>,
    pub message: String,
    /// Number of instances the diagnostic occurred in, when it was
    /// coalesced across a strict subset of a definition's instances.
    pub coalesce_count: Option<usize>,
}

impl Diagnostic {
    pub fn error(
        code: DiagnosticCode,
        span: Span,
        origin: SymbolId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            severity: Severity::Error,
            span,
            origin: Some(origin),
            message: message.into(),
            coalesce_count: None,
        }
    }

    pub fn warning(
        code: DiagnosticCode,
        span: Span,
        origin: SymbolId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            span,
            origin: Some(origin),
            message: message.into(),
            coalesce_count: None,
        }
    }

    pub(crate) fn from_parse(diag: &svala_diag::Diagnostic) -> Self {
        Self {
            code: diag.code,
            severity: diag.severity,
            span: diag.span,
            origin: None,
            message: diag.message.clone(),
            coalesce_count: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// One coalesce group: every occurrence of a (code, location) pair, plus
/// the index of the definition-site occurrence when one exists.
#[derive(Debug, Clone)]
pub(crate) struct DiagGroup {
    pub(crate) occurrences: Vec<Diagnostic>,
    /// Index into `occurrences`, or `usize::MAX` when no occurrence came
    /// from a definition.
    pub(crate) definition_index: usize,
}

/// Append-and-coalesce diagnostic map.
///
/// Insertion order of groups is preserved so output stays deterministic
/// even without a source manager to sort by.
#[derive(Debug, Default)]
pub struct DiagnosticStore {
    pub(crate) map: IndexMap<(DiagnosticCode, Span), DiagGroup>,
    num_errors: usize,
    /// Single-slot scratch for suppressed diagnostics, so callers still
    /// get a reference to what they emitted.
    scratch: Option<Diagnostic>,
}

impl DiagnosticStore {
    pub fn num_errors(&self) -> usize {
        self.num_errors
    }
}

impl Compilation {
    /// Resolve the "effective instance" of a symbol: the nearest ancestor
    /// that is a definition or an instance, if any.
    pub(crate) fn instance_or_def(&self, mut symbol: Option<SymbolId>) -> Option<SymbolId> {
        while let Some(sym) = symbol {
            let data = self.symbol(sym);
            if matches!(data.kind, SymbolKind::Definition { .. }) || data.kind.is_instance() {
                return Some(sym);
            }
            symbol = data.parent;
        }
        None
    }

    fn is_suppressed(&self, mut symbol: Option<SymbolId>) -> bool {
        while let Some(sym) = symbol {
            let data = self.symbol(sym);
            if matches!(
                data.kind,
                SymbolKind::GenerateBlock {
                    is_instantiated: false
                }
            ) {
                return true;
            }
            symbol = data.parent;
        }
        false
    }

    pub(crate) fn is_inside_def(&self, mut symbol: Option<SymbolId>) -> bool {
        while let Some(sym) = symbol {
            let data = self.symbol(sym);
            if matches!(data.kind, SymbolKind::Definition { .. }) {
                return true;
            }
            symbol = data.parent;
        }
        false
    }

    /// Record a diagnostic, coalescing on (code, location).
    ///
    /// Diagnostics originating inside an uninstantiated generate block are
    /// dropped into a scratch slot instead of the persistent store.
    pub fn add_diag(&mut self, diag: Diagnostic) -> &Diagnostic {
        assert!(diag.origin.is_some(), "diagnostic must carry a symbol");

        if self.is_suppressed(diag.origin) {
            self.diags.scratch = Some(diag);
            return self.diags.scratch.as_ref().expect("just stored");
        }

        let inst = self.instance_or_def(diag.origin);
        let inst_is_def = inst
            .map(|i| matches!(self.symbol(i).kind, SymbolKind::Definition { .. }))
            .unwrap_or(false);

        let key = (diag.code, diag.span);
        if self.diags.map.contains_key(&key) {
            let group = self.diags.map.get_mut(&key).expect("checked above");
            group.occurrences.push(diag);
            if inst_is_def {
                group.definition_index = group.occurrences.len() - 1;
            }
            return group.occurrences.last().expect("just pushed");
        }

        if diag.is_error() {
            self.diags.num_errors += 1;
        }

        let group = DiagGroup {
            occurrences: vec![diag],
            definition_index: if inst_is_def { 0 } else { usize::MAX },
        };
        let group = self.diags.map.entry(key).or_insert(group);
        group.occurrences.last().expect("one occurrence")
    }

    /// Render the coalesced view of the store. Pure; assumes all lazy
    /// work was already forced by the visitor.
    pub(crate) fn render_coalesced(
        &self,
        instance_count: &std::collections::HashMap<crate::definition::DefinitionId, usize>,
    ) -> Vec<Diagnostic> {
        let mut results = Vec::new();
        for group in self.diags.map.values() {
            // A definition-site occurrence trumps per-instance variants.
            if group.definition_index < group.occurrences.len() {
                results.push(group.occurrences[group.definition_index].clone());
                continue;
            }

            // Pick one per-instance occurrence, preferring one that is not
            // directly under the root or a compilation unit so that the
            // hierarchical note reads sensibly.
            let mut found: Option<&Diagnostic> = None;
            let mut inst: Option<SymbolId> = None;
            let mut count = 0usize;

            for diag in &group.occurrences {
                let symbol = match self.instance_or_def(diag.origin) {
                    Some(s) => s,
                    None => continue,
                };
                if self.symbol(symbol).parent.is_none() {
                    continue;
                }
                if self.is_inside_def(Some(symbol)) {
                    continue;
                }

                count += 1;
                let parent = self.symbol(symbol).parent.expect("checked above");
                if !matches!(
                    self.symbol(parent).kind,
                    SymbolKind::Root | SymbolKind::CompilationUnit
                ) {
                    found = Some(diag);
                    inst = Some(symbol);
                }
            }

            // If the diagnostic shows up in every instance of the
            // definition, specific instantiation info adds nothing.
            let total = inst
                .and_then(|i| self.symbol(i).kind.instance_definition())
                .and_then(|d| instance_count.get(&d).copied())
                .unwrap_or(0);
            if let (Some(found), Some(inst)) = (found, inst) {
                if total > count {
                    let mut diag = found.clone();
                    diag.origin = Some(inst);
                    diag.coalesce_count = Some(count);
                    results.push(diag);
                    continue;
                }
            }
            results.push(group.occurrences[0].clone());
        }
        results
    }
}
