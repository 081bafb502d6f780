use std::collections::HashMap;

use crate::binder::{ExprKind, StmtKind};
use crate::compilation::{AttrTarget, Compilation};
use crate::definition::DefinitionId;
use crate::symbols::{SymbolId, SymbolKind};

/// Single-pass walker that touches every lazily evaluated field so that
/// diagnostic collection is complete.
///
/// The walk honors the error limit: once the store crosses it, every
/// visit returns early and child traversal stops. Instance counts feed
/// the coalescing heuristic.
pub(crate) struct DiagnosticVisitor {
    error_limit: usize,
    instance_count: HashMap<DefinitionId, usize>,
    in_def: bool,
}

impl DiagnosticVisitor {
    pub(crate) fn new(error_limit: usize) -> Self {
        Self {
            error_limit,
            instance_count: HashMap::new(),
            in_def: false,
        }
    }

    pub(crate) fn instance_count(&self) -> &HashMap<DefinitionId, usize> {
        &self.instance_count
    }

    pub(crate) fn visit(&mut self, comp: &mut Compilation, symbol: SymbolId) {
        self.visit_symbol(comp, symbol);
    }

    fn visit_symbol(&mut self, comp: &mut Compilation, symbol: SymbolId) -> bool {
        if comp.num_errors() > self.error_limit {
            return false;
        }

        enum Dispatch {
            SkippedGenerate,
            Definition,
            Instance(DefinitionId),
            ExplicitImport,
            WildcardImport,
            ContinuousAssign,
            Port,
            Default,
        }
        let dispatch = match &comp.symbol(symbol).kind {
            SymbolKind::GenerateBlock {
                is_instantiated: false,
            } => Dispatch::SkippedGenerate,
            SymbolKind::Definition { .. } => Dispatch::Definition,
            kind if kind.is_instance() => {
                Dispatch::Instance(kind.instance_definition().expect("instance"))
            }
            SymbolKind::ExplicitImport { .. } => Dispatch::ExplicitImport,
            SymbolKind::WildcardImport { .. } => Dispatch::WildcardImport,
            SymbolKind::ContinuousAssign { .. } => Dispatch::ContinuousAssign,
            SymbolKind::Port { .. } => Dispatch::Port,
            _ => Dispatch::Default,
        };

        match dispatch {
            Dispatch::SkippedGenerate => true,
            Dispatch::Definition => {
                let saved = self.in_def;
                self.in_def = true;
                let result = self.handle_default(comp, symbol);
                self.in_def = saved;
                result
            }
            Dispatch::Instance(definition) => {
                if !self.in_def {
                    *self.instance_count.entry(definition).or_insert(0) += 1;
                }
                self.handle_default(comp, symbol)
            }
            Dispatch::ExplicitImport => {
                if !self.handle_default(comp, symbol) {
                    return false;
                }
                comp.explicit_import_target(symbol);
                true
            }
            Dispatch::WildcardImport => {
                if !self.handle_default(comp, symbol) {
                    return false;
                }
                comp.wildcard_import_package(symbol);
                true
            }
            Dispatch::ContinuousAssign => {
                if !self.handle_default(comp, symbol) {
                    return false;
                }
                if let Some(expr) = comp.continuous_assign_expr(symbol) {
                    self.touch_expr_attributes(comp, expr);
                }
                true
            }
            Dispatch::Port => {
                if !self.handle_default(comp, symbol) {
                    return false;
                }
                if let Some(conn) = comp.port_connection(symbol) {
                    self.touch_expr_attributes(comp, conn);
                }
                true
            }
            Dispatch::Default => self.handle_default(comp, symbol),
        }
    }

    fn handle_default(&mut self, comp: &mut Compilation, symbol: SymbolId) -> bool {
        if comp.num_errors() > self.error_limit {
            return false;
        }

        if comp.symbol(symbol).kind.declared_type().is_some() {
            comp.declared_type_ty(symbol);
            comp.declared_init(symbol);
        }
        match &comp.symbol(symbol).kind {
            SymbolKind::Parameter { .. } => {
                comp.parameter_value(symbol);
            }
            SymbolKind::EnumValue { .. } => {
                comp.enum_value(symbol);
            }
            _ => {}
        }

        let attrs: Vec<_> = comp.attributes_for(AttrTarget::Symbol(symbol)).to_vec();
        for attr in attrs {
            comp.attribute_value(attr);
        }

        if let Some(scope) = comp.symbol(symbol).scope {
            // Realization also binds any queued statement body.
            comp.ensure_members(scope);
            if let Some(body) = comp.body_of(symbol) {
                self.touch_stmt(comp, body);
            }
            let mut cursor = comp.scope_data(scope).first;
            while let Some(member) = cursor {
                let next = comp.symbol(member).next;
                self.visit_symbol(comp, member);
                cursor = next;
            }
        }
        true
    }

    fn touch_stmt(&mut self, comp: &mut Compilation, stmt: crate::binder::StmtId) {
        let kind = comp.stmt(stmt).kind.clone();
        match kind {
            StmtKind::Block(stmts) => {
                let attrs: Vec<_> = comp.attributes_for(AttrTarget::Statement(stmt)).to_vec();
                for attr in attrs {
                    comp.attribute_value(attr);
                }
                for s in stmts {
                    self.touch_stmt(comp, s);
                }
            }
            StmtKind::Expr(expr) => {
                let attrs: Vec<_> = comp.attributes_for(AttrTarget::Statement(stmt)).to_vec();
                for attr in attrs {
                    comp.attribute_value(attr);
                }
                self.touch_expr_attributes(comp, expr);
            }
        }
    }

    fn touch_expr_attributes(&mut self, comp: &mut Compilation, expr: crate::binder::ExprId) {
        let attrs: Vec<_> = comp.attributes_for(AttrTarget::Expression(expr)).to_vec();
        for attr in attrs {
            comp.attribute_value(attr);
        }
        let kind = comp.expr(expr).kind.clone();
        match kind {
            ExprKind::Unary { operand, .. } => self.touch_expr_attributes(comp, operand),
            ExprKind::Binary { lhs, rhs, .. } | ExprKind::Assign { lhs, rhs } => {
                self.touch_expr_attributes(comp, lhs);
                self.touch_expr_attributes(comp, rhs);
            }
            ExprKind::Call { args, .. } | ExprKind::SystemCall { args, .. } => {
                for arg in args {
                    self.touch_expr_attributes(comp, arg);
                }
            }
            _ => {}
        }
    }
}
